use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::harness::BenchResult;

/// Machine-readable summary of one CLI run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub version: &'static str,
    pub build: &'static str,
    pub results: Vec<BenchResult>,
}

impl Report {
    pub fn new(started_at: DateTime<Utc>, results: Vec<BenchResult>) -> Self {
        Self {
            started_at,
            version: env!("CARGO_PKG_VERSION"),
            build: option_env!("GIT_COMMIT_HASH").unwrap_or("unknown"),
            results,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
