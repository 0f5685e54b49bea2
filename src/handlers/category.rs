// src/handlers/category.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{error::AppError, models::category::Category};

/// Lists all question categories, ordered by name.
pub async fn list_categories(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch categories: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(categories))
}
