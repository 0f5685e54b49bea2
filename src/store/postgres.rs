// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::error::AppError;
use crate::grading::{AttemptSummary, CorrectAnswer, GradedDetail, QuestionKey};
use crate::models::history::{AttemptDetailRecord, HistoryEntry, HistoryStats};
use crate::models::question::{QuestionOption, QuestionRow, QuestionView};
use crate::store::{HistoryStore, QuestionStore};

/// Question lookups backed by the 'questions' table.
#[derive(Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Helper struct for fetching answer keys from the database.
#[derive(FromRow)]
struct AnswerKeyRow {
    id: i64,
    points: i64,
    correct_option: Option<String>,
    correct_options: Option<Vec<String>>,
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn answer_keys(&self, ids: &[i64]) -> Result<Vec<QuestionKey>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Dynamic IN clause for the id list.
        let mut query_builder = QueryBuilder::<Postgres>::new(
            "SELECT id, points, correct_option, correct_options FROM questions WHERE id IN (",
        );
        let mut separated = query_builder.separated(",");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows: Vec<AnswerKeyRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch answer keys: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(rows
            .into_iter()
            .map(|row| QuestionKey {
                id: row.id,
                points: row.points,
                correct: match row.correct_options {
                    Some(letters) => CorrectAnswer::multiple(letters),
                    None => CorrectAnswer::single(row.correct_option.as_deref().unwrap_or_default()),
                },
            })
            .collect())
    }
}

/// Attempt persistence backed by 'test_history' / 'test_history_details'.
#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct DetailJoinRow {
    detail_id: i64,
    user_answer: Option<String>,
    correct_answer: String,
    is_correct: bool,
    question_id: i64,
    text: String,
    explanation: Option<String>,
    points: i64,
    category: String,
    license_class: String,
    correct_option: Option<String>,
    correct_options: Option<Vec<String>>,
}

#[derive(FromRow)]
struct OptionJoinRow {
    question_id: i64,
    letter: String,
    text: String,
}

#[derive(FromRow)]
struct StatsRow {
    total_attempts: i64,
    total_passed: i64,
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn record_attempt(
        &self,
        user_id: i64,
        license_class: &str,
        summary: &AttemptSummary,
        details: &[GradedDetail],
    ) -> Result<i64, AppError> {
        // Single transaction: summary row plus every detail row, or nothing.
        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.pool.begin().await?;

        let history_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO test_history (user_id, score, total_questions, status, license_class)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(summary.score)
        .bind(summary.total_questions)
        .bind(summary.status.as_str())
        .bind(license_class)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert attempt summary: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        for detail in details {
            sqlx::query(
                r#"
                INSERT INTO test_history_details
                    (history_id, question_id, user_answer, correct_answer, is_correct)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(history_id)
            .bind(detail.question_id)
            .bind(detail.user_answer.as_deref())
            .bind(&detail.correct_answer)
            .bind(detail.is_correct)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to insert detail for question {}: {:?}",
                    detail.question_id,
                    e
                );
                AppError::InternalServerError(e.to_string())
            })?;
        }

        tx.commit().await?;

        Ok(history_id)
    }

    async fn list_attempts(
        &self,
        user_id: i64,
        license_class: &str,
    ) -> Result<Vec<HistoryEntry>, AppError> {
        let entries = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT id, user_id, score, total_questions, status, license_class, created_at
            FROM test_history
            WHERE user_id = $1 AND license_class = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(license_class)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch history: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(entries)
    }

    async fn attempt_detail(
        &self,
        user_id: i64,
        history_id: i64,
    ) -> Result<(HistoryEntry, Vec<AttemptDetailRecord>), AppError> {
        // Ownership check first: the attempt must exist and belong to the
        // requesting user, otherwise it is indistinguishable from missing.
        let entry = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT id, user_id, score, total_questions, status, license_class, created_at
            FROM test_history
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(history_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

        let rows = sqlx::query_as::<_, DetailJoinRow>(
            r#"
            SELECT
                hd.id AS detail_id,
                hd.user_answer,
                hd.correct_answer,
                hd.is_correct,
                q.id AS question_id,
                q.text,
                q.explanation,
                q.points,
                c.name AS category,
                q.license_class,
                q.correct_option,
                q.correct_options
            FROM test_history_details hd
            JOIN questions q ON hd.question_id = q.id
            JOIN categories c ON q.category_id = c.id
            WHERE hd.history_id = $1
            ORDER BY q.id
            "#,
        )
        .bind(history_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch attempt details: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        let question_ids: Vec<i64> = rows.iter().map(|r| r.question_id).collect();
        let mut options = fetch_options(&self.pool, &question_ids).await?;

        let details = rows
            .into_iter()
            .map(|row| AttemptDetailRecord {
                detail_id: row.detail_id,
                user_answer: row.user_answer,
                correct_answer: row.correct_answer,
                is_correct: row.is_correct,
                question: QuestionView {
                    options: options.remove(&row.question_id).unwrap_or_default(),
                    row: QuestionRow {
                        id: row.question_id,
                        text: row.text,
                        explanation: row.explanation,
                        points: row.points,
                        category: row.category,
                        license_class: row.license_class,
                        correct_option: row.correct_option,
                        correct_options: row.correct_options,
                    },
                },
            })
            .collect();

        Ok((entry, details))
    }

    async fn stats(&self, user_id: i64, license_class: &str) -> Result<HistoryStats, AppError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                COUNT(*) AS total_attempts,
                COUNT(*) FILTER (WHERE status = 'Passed') AS total_passed
            FROM test_history
            WHERE user_id = $1 AND license_class = $2
            "#,
        )
        .bind(user_id)
        .bind(license_class)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch history stats: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(HistoryStats {
            total_attempts: row.total_attempts,
            total_passed: row.total_passed,
        })
    }
}

/// Option rows for a set of questions, grouped by question id. Shared by
/// the history detail view and the question handlers.
pub async fn fetch_options(
    pool: &PgPool,
    question_ids: &[i64],
) -> Result<HashMap<i64, Vec<QuestionOption>>, AppError> {
    if question_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "SELECT question_id, letter, text FROM options WHERE question_id IN (",
    );
    let mut separated = query_builder.separated(",");
    for id in question_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY letter");

    let rows: Vec<OptionJoinRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch options: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let mut grouped: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for row in rows {
        grouped.entry(row.question_id).or_default().push(QuestionOption {
            letter: row.letter,
            text: row.text,
        });
    }
    Ok(grouped)
}
