// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::store::{HistoryStore, PgHistoryStore, PgQuestionStore, QuestionStore};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Injected store seams so tests can substitute in-memory fakes.
    pub questions: Arc<dyn QuestionStore>,
    pub history: Arc<dyn HistoryStore>,
}

impl AppState {
    /// Production wiring: both stores backed by the Postgres pool.
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            questions: Arc::new(PgQuestionStore::new(pool.clone())),
            history: Arc::new(PgHistoryStore::new(pool.clone())),
            pool,
            config,
        }
    }

    pub fn with_stores(
        pool: PgPool,
        config: Config,
        questions: Arc<dyn QuestionStore>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            pool,
            config,
            questions,
            history,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
