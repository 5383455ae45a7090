use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::probe::ProbeRecord;
use super::risk::RiskLevel;

/// How a suite execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteStatus {
    Completed,
    /// The suite returned an error or panicked; the run continued.
    Failed,
    /// The suite was still in flight when the run deadline expired.
    Incomplete,
}

/// The result produced by one probe suite against one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    /// Name of the suite that produced this result.
    pub suite: String,
    pub status: SuiteStatus,
    pub risk_level: RiskLevel,
    /// Ordered (probe, outcome) pairs, in send order.
    pub probes: Vec<ProbeRecord>,
    /// Free-form findings payload specific to each suite.
    pub findings: Value,
}

impl SuiteResult {
    pub fn completed(suite: impl Into<String>, risk_level: RiskLevel, probes: Vec<ProbeRecord>, findings: Value) -> Self {
        Self {
            suite: suite.into(),
            status: SuiteStatus::Completed,
            risk_level,
            probes,
            findings,
        }
    }

    /// A suite that failed during execution degrades to CRITICAL with the
    /// failure description as its only finding. The run itself never aborts
    /// because one suite misbehaved.
    pub fn failed(suite: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            suite: suite.into(),
            status: SuiteStatus::Failed,
            risk_level: RiskLevel::Critical,
            probes: Vec::new(),
            findings: serde_json::json!({ "error": error.to_string() }),
        }
    }

    /// A suite abandoned at the run deadline. Partial results are better than
    /// none, so the entry still appears in the report.
    pub fn incomplete(suite: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            suite: suite.into(),
            status: SuiteStatus::Incomplete,
            risk_level: RiskLevel::Critical,
            probes: Vec::new(),
            findings: serde_json::json!({ "error": reason.to_string() }),
        }
    }

    pub fn crash_count(&self) -> usize {
        self.probes.iter().filter(|r| r.outcome.is_crash()).count()
    }

    pub fn timeout_count(&self) -> usize {
        self.probes.iter().filter(|r| r.outcome.is_timeout()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::probe::{Probe, ProbeOutcome, ProbeRecord};

    #[test]
    fn test_failed_result_is_critical() {
        let result = SuiteResult::failed("fuzzer", "worker panicked");
        assert_eq!(result.status, SuiteStatus::Failed);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(result.findings["error"], "worker panicked");
    }

    #[test]
    fn test_incomplete_result_is_critical() {
        let result = SuiteResult::incomplete("injection", "run deadline exceeded");
        assert_eq!(result.status, SuiteStatus::Incomplete);
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_crash_and_timeout_counts() {
        let probe = Probe::raw("Empty Payload", "empty-payload", "");
        let probes = vec![
            ProbeRecord::new(&probe, ProbeOutcome::Crashed { evidence: "exit 1".into() }),
            ProbeRecord::new(&probe, ProbeOutcome::TimedOut),
            ProbeRecord::new(&probe, ProbeOutcome::TimedOut),
        ];
        let result = SuiteResult::completed("fuzzer", RiskLevel::High, probes, Value::Null);
        assert_eq!(result.crash_count(), 1);
        assert_eq!(result.timeout_count(), 2);
    }
}
