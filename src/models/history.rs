// src/models/history.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::grading::SubmittedAnswer;
use crate::models::question::{QuestionDto, QuestionView};

/// Represents the 'test_history' table in the database.
/// One row per graded attempt, owned by exactly one user.
/// Serialized as-is (snake_case) for the history list endpoint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub score: i64,
    pub total_questions: i64,
    /// 'Passed' or 'Failed'.
    pub status: String,
    pub license_class: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting a completed test.
///
/// `questions` carries the ids (and order) of the paper the client took;
/// `userAnswers` maps question id to a letter, a checkbox map, or null.
/// The client also sends its locally computed `score`/`status` for instant
/// feedback parity, but the server regrades from its own question
/// definitions and never persists the client's numbers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestRequest {
    pub score: Option<i64>,
    pub total_questions: Option<i64>,
    pub status: Option<String>,
    pub questions: Option<Vec<SubmittedQuestion>>,
    pub user_answers: Option<HashMap<i64, Option<SubmittedAnswer>>>,
    pub class_type: Option<String>,
}

/// Only the id matters server-side; the rest of the client's question
/// object is ignored.
#[derive(Debug, Deserialize)]
pub struct SubmittedQuestion {
    pub id: i64,
}

/// One detail row joined with its question, as returned by the store.
#[derive(Debug, Clone)]
pub struct AttemptDetailRecord {
    pub detail_id: i64,
    /// Canonical serialization of the submitted answer, None if unanswered.
    pub user_answer: Option<String>,
    /// Answer key snapshotted at grading time.
    pub correct_answer: String,
    pub is_correct: bool,
    pub question: QuestionView,
}

/// Aggregate pass/attempt counters for one user and license class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    pub total_attempts: i64,
    pub total_passed: i64,
}

/// Summary block of the detail view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummaryDto {
    pub id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub status: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&HistoryEntry> for AttemptSummaryDto {
    fn from(entry: &HistoryEntry) -> Self {
        AttemptSummaryDto {
            id: entry.id,
            score: entry.score,
            total_questions: entry.total_questions,
            status: entry.status.clone(),
            created_at: entry.created_at,
        }
    }
}

/// One graded detail row on the wire: `userAnswer` is a letter, an array
/// of letters, or null, reconstructed from the canonical stored text.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDetailDto {
    pub detail_id: i64,
    pub is_correct: bool,
    pub user_answer: serde_json::Value,
    pub correct_answer_snapshot: serde_json::Value,
    pub question: QuestionDto,
}

impl From<AttemptDetailRecord> for AttemptDetailDto {
    fn from(record: AttemptDetailRecord) -> Self {
        AttemptDetailDto {
            detail_id: record.detail_id,
            is_correct: record.is_correct,
            user_answer: answer_text_to_value(record.user_answer.as_deref()),
            correct_answer_snapshot: answer_text_to_value(Some(&record.correct_answer)),
            question: record.question.into(),
        }
    }
}

/// DTO for the full detail view of one attempt.
#[derive(Debug, Serialize)]
pub struct AttemptDetailResponse {
    pub summary: AttemptSummaryDto,
    pub details: Vec<AttemptDetailDto>,
}

/// DTO for the stats endpoint. Field names are part of the original client
/// contract.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(rename = "totalRealizados")]
    pub total_realizados: i64,
    #[serde(rename = "totalAprobados")]
    pub total_aprobados: i64,
}

/// Stored answers are either a bare letter or a JSON array of letters;
/// unanswered questions are stored as NULL.
fn answer_text_to_value(text: Option<&str>) -> serde_json::Value {
    match text {
        None => serde_json::Value::Null,
        Some(raw) if raw.starts_with('[') => {
            serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
        }
        Some(raw) => serde_json::Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_text_round_trips_both_shapes() {
        assert_eq!(answer_text_to_value(None), serde_json::Value::Null);
        assert_eq!(
            answer_text_to_value(Some("a")),
            serde_json::Value::String("a".to_string())
        );
        assert_eq!(
            answer_text_to_value(Some(r#"["a","c"]"#)),
            serde_json::json!(["a", "c"])
        );
    }
}
