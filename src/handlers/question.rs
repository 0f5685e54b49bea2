// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    grading::CorrectAnswer,
    models::question::{QuestionDto, QuestionRow, QuestionView, UpsertQuestionRequest},
    store::postgres::fetch_options,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuestionsParams {
    pub class_type: Option<String>,
}

/// Lists all questions for a license class (default 'B'), each with its
/// ordered options and answer key.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(params): Query<ListQuestionsParams>,
) -> Result<impl IntoResponse, AppError> {
    let license_class = params
        .class_type
        .as_deref()
        .unwrap_or("B")
        .to_uppercase();

    let rows = sqlx::query_as::<_, QuestionRow>(
        r#"
        SELECT
            q.id, q.text, q.explanation, q.points,
            c.name AS category, q.license_class,
            q.correct_option, q.correct_options
        FROM questions q
        JOIN categories c ON q.category_id = c.id
        WHERE q.license_class = $1
        ORDER BY q.id
        "#,
    )
    .bind(&license_class)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut options = fetch_options(&pool, &ids).await?;

    let questions: Vec<QuestionDto> = rows
        .into_iter()
        .map(|row| {
            QuestionView {
                options: options.remove(&row.id).unwrap_or_default(),
                row,
            }
            .into()
        })
        .collect();

    Ok(Json(questions))
}

/// Fetches a single question by id.
pub async fn get_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query_as::<_, QuestionRow>(
        r#"
        SELECT
            q.id, q.text, q.explanation, q.points,
            c.name AS category, q.license_class,
            q.correct_option, q.correct_options
        FROM questions q
        JOIN categories c ON q.category_id = c.id
        WHERE q.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let mut options = fetch_options(&pool, &[id]).await?;
    let view = QuestionView {
        options: options.remove(&id).unwrap_or_default(),
        row,
    };

    Ok(Json(QuestionDto::from(view)))
}

/// Creates a question and its option rows in one transaction.
pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<UpsertQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    payload
        .check_answer_letters()
        .map_err(AppError::BadRequest)?;

    let mut tx = pool.begin().await?;

    let category_id: i64 = sqlx::query_scalar("SELECT id FROM categories WHERE name = $1")
        .bind(&payload.category)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!("Category '{}' does not exist", payload.category))
        })?;

    let (correct_option, correct_options) = split_answer_key(payload.answer_key());

    let question_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions
            (text, explanation, points, category_id, correct_option, correct_options, license_class)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&payload.text)
    .bind(payload.explanation.as_deref())
    .bind(payload.points)
    .bind(category_id)
    .bind(correct_option.as_deref())
    .bind(correct_options.as_deref())
    .bind(payload.license_class_or_default())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    insert_options(&mut tx, question_id, &payload).await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": question_id, "message": "Question created successfully" })),
    ))
}

/// Replaces a question and its option rows in one transaction.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpsertQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    payload
        .check_answer_letters()
        .map_err(AppError::BadRequest)?;

    let mut tx = pool.begin().await?;

    let category_id: i64 = sqlx::query_scalar("SELECT id FROM categories WHERE name = $1")
        .bind(&payload.category)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!("Category '{}' does not exist", payload.category))
        })?;

    let (correct_option, correct_options) = split_answer_key(payload.answer_key());

    let updated = sqlx::query(
        r#"
        UPDATE questions
        SET text = $1, explanation = $2, points = $3, category_id = $4,
            correct_option = $5, correct_options = $6, license_class = $7
        WHERE id = $8
        "#,
    )
    .bind(&payload.text)
    .bind(payload.explanation.as_deref())
    .bind(payload.points)
    .bind(category_id)
    .bind(correct_option.as_deref())
    .bind(correct_options.as_deref())
    .bind(payload.license_class_or_default())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    sqlx::query("DELETE FROM options WHERE question_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    insert_options(&mut tx, id, &payload).await?;

    tx.commit().await?;

    Ok(Json(json!({ "message": "Question updated successfully" })))
}

/// Splits the answer key back into the two mutually exclusive columns.
fn split_answer_key(key: CorrectAnswer) -> (Option<String>, Option<Vec<String>>) {
    match key {
        CorrectAnswer::Single(letter) => (Some(letter), None),
        CorrectAnswer::Multiple(letters) => (None, Some(letters.into_iter().collect())),
    }
}

async fn insert_options(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    question_id: i64,
    payload: &UpsertQuestionRequest,
) -> Result<(), AppError> {
    for option in &payload.options {
        sqlx::query("INSERT INTO options (question_id, letter, text) VALUES ($1, $2, $3)")
            .bind(question_id)
            .bind(option.letter.to_lowercase())
            .bind(&option.text)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert option: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;
    }
    Ok(())
}
