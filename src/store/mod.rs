// src/store/mod.rs

pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::grading::{AttemptSummary, GradedDetail, QuestionKey};
use crate::models::history::{AttemptDetailRecord, HistoryEntry, HistoryStats};

pub use postgres::{PgHistoryStore, PgQuestionStore};

/// Lookup of question definitions for server-side grading. The grader
/// never trusts client-supplied answer keys; it fetches its own.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Answer keys and point values for the given question ids, in no
    /// particular order. Ids with no definition are simply absent from the
    /// result.
    async fn answer_keys(&self, ids: &[i64]) -> Result<Vec<QuestionKey>, AppError>;
}

/// Persistence seam for graded attempts. Injected into the handlers so
/// tests can substitute an in-memory fake.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persists an attempt summary and all its detail rows as a single
    /// all-or-nothing unit. Returns the new attempt id.
    async fn record_attempt(
        &self,
        user_id: i64,
        license_class: &str,
        summary: &AttemptSummary,
        details: &[GradedDetail],
    ) -> Result<i64, AppError>;

    /// All attempts owned by the user for the class, most recent first.
    async fn list_attempts(
        &self,
        user_id: i64,
        license_class: &str,
    ) -> Result<Vec<HistoryEntry>, AppError>;

    /// Summary plus joined detail rows for one attempt. Fails with
    /// `NotFound` if the attempt does not exist or belongs to another user.
    async fn attempt_detail(
        &self,
        user_id: i64,
        history_id: i64,
    ) -> Result<(HistoryEntry, Vec<AttemptDetailRecord>), AppError>;

    /// Attempt/pass counters for the user and class.
    async fn stats(&self, user_id: i64, license_class: &str) -> Result<HistoryStats, AppError>;
}
