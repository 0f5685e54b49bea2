// src/handlers/history.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    grading::{QuestionKey, SubmittedAnswer, grade_test},
    models::history::{
        AttemptDetailResponse, AttemptSummaryDto, StatsResponse, SubmitTestRequest,
    },
    state::AppState,
    utils::jwt::Claims,
};

/// Submits a completed test.
///
/// * Validates the detailed payload (question list + answer map).
/// * Regrades every answer against question definitions fetched by id —
///   the client's own score/status is never persisted.
/// * Persists the summary and all detail rows in one transaction.
pub async fn submit_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let questions = req
        .questions
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing detailed test data.".to_string()))?;
    let user_answers = req
        .user_answers
        .ok_or_else(|| AppError::BadRequest("Missing detailed test data.".to_string()))?;

    let license_class = req.class_type.as_deref().unwrap_or("B").to_uppercase();
    let user_id = claims.user_id()?;

    // JSON nulls in the answer map mean "unanswered".
    let answers: HashMap<i64, SubmittedAnswer> = user_answers
        .into_iter()
        .filter_map(|(id, answer)| answer.map(|a| (id, a)))
        .collect();

    // Fetch authoritative definitions for the submitted paper, keeping the
    // client's question order for the detail rows. Duplicate ids are
    // collapsed to their first occurrence so a question can never score
    // more than once.
    let mut seen = HashSet::new();
    let ids: Vec<i64> = questions
        .iter()
        .map(|q| q.id)
        .filter(|id| seen.insert(*id))
        .collect();
    let keys = state.questions.answer_keys(&ids).await?;
    let by_id: HashMap<i64, QuestionKey> = keys.into_iter().map(|k| (k.id, k)).collect();

    let mut paper = Vec::with_capacity(ids.len());
    for id in &ids {
        let key = by_id.get(id).cloned().ok_or_else(|| {
            AppError::Upstream(format!("Question {} has no definition", id))
        })?;
        paper.push(key);
    }

    let threshold = state.config.pass_threshold(&license_class);
    let (summary, details) = grade_test(&paper, &answers, threshold);

    let score_disagrees = req.score.is_some_and(|s| s != summary.score);
    let status_disagrees = req
        .status
        .as_deref()
        .is_some_and(|s| s != summary.status.as_str());
    if score_disagrees || status_disagrees {
        tracing::warn!(
            user_id,
            client_score = ?req.score,
            client_status = ?req.status,
            server_score = summary.score,
            server_status = summary.status.as_str(),
            "Client-reported result disagrees with server grading"
        );
    }

    let history_id = state
        .history
        .record_attempt(user_id, &license_class, &summary, &details)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": history_id,
            "message": "Attempt recorded successfully",
            "score": summary.score,
            "status": summary.status.as_str(),
        })),
    ))
}

/// Lists the caller's attempts for a license class, most recent first.
pub async fn list_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(class_type): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let entries = state
        .history
        .list_attempts(user_id, &class_type.to_uppercase())
        .await?;

    Ok(Json(entries))
}

/// Full detail view of one attempt: summary plus every graded question.
/// Returns 404 if the attempt does not exist or belongs to another user.
pub async fn get_history_detail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(history_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let (entry, records) = state.history.attempt_detail(user_id, history_id).await?;

    let response = AttemptDetailResponse {
        summary: AttemptSummaryDto::from(&entry),
        details: records.into_iter().map(Into::into).collect(),
    };

    Ok(Json(response))
}

/// Aggregate attempt/pass counters for the caller and class.
pub async fn get_history_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(class_type): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let stats = state
        .history
        .stats(user_id, &class_type.to_uppercase())
        .await?;

    Ok(Json(StatsResponse {
        total_realizados: stats.total_attempts,
        total_aprobados: stats.total_passed,
    }))
}
