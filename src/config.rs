// src/config.rs

use std::collections::HashMap;
use std::env;

use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Minimum score to pass when no per-class override exists.
    pub default_pass_threshold: i64,
    /// Per-license-class threshold overrides, e.g. PASS_THRESHOLDS="B=33,C=30".
    pub pass_thresholds: HashMap<String, i64>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let default_pass_threshold = env::var("PASS_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(33);

        let pass_thresholds = env::var("PASS_THRESHOLDS")
            .map(|v| parse_thresholds(&v))
            .unwrap_or_default();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            default_pass_threshold,
            pass_thresholds,
        }
    }

    /// Pass threshold for a license class, falling back to the default.
    pub fn pass_threshold(&self, license_class: &str) -> i64 {
        self.pass_thresholds
            .get(&license_class.to_uppercase())
            .copied()
            .unwrap_or(self.default_pass_threshold)
    }
}

/// Parses "B=33,C=30" into a class→threshold map. Malformed entries are
/// skipped.
fn parse_thresholds(raw: &str) -> HashMap<String, i64> {
    raw.split(',')
        .filter_map(|entry| {
            let (class, value) = entry.split_once('=')?;
            let threshold = value.trim().parse().ok()?;
            Some((class.trim().to_uppercase(), threshold))
        })
        .collect()
}
