use serde::{Deserialize, Serialize};

use super::suite_result::SuiteResult;
use crate::scoring::Grade;

/// Final artifact of a run: one entry per registered suite, in registration
/// order, plus the derived grade. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: uuid::Uuid,
    pub grade: Grade,
    pub target: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
    pub suites: Vec<SuiteResult>,
}

impl Report {
    pub fn suite(&self, name: &str) -> Option<&SuiteResult> {
        self.suites.iter().find(|s| s.suite == name)
    }
}
