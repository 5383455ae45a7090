use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::ProbeSuite;
use crate::errors::TestbenchError;
use crate::models::{Probe, ProbeRecord, RiskLevel, SuiteResult};
use crate::transport::Transport;

/// Upper bound on the oversized-string fuzz case.
const HUGE_STRING_LEN: usize = 100_000;
/// Nesting depth for the deeply-nested fuzz case.
const NESTING_DEPTH: usize = 1_000;

/// Fuzzes the target with structurally adversarial requests, independent of
/// target semantics. Every probe is expected to be rejected gracefully; a
/// crash or timeout is a finding.
pub struct Fuzzer;

/// Fixed corpus of malformed and boundary inputs. Deterministic: the same
/// probes in the same order on every run.
pub fn corpus() -> Vec<Probe> {
    let huge = "A".repeat(HUGE_STRING_LEN);
    let nested = format!(
        "{}1{}",
        r#"{"a":"#.repeat(NESTING_DEPTH),
        "}".repeat(NESTING_DEPTH)
    );

    vec![
        Probe::raw("Empty Payload", "empty-payload", ""),
        Probe::raw("Invalid JSON", "invalid-encoding", "{invalid json"),
        Probe::raw("Array Instead of Object", "top-level-array", "[]"),
        Probe::raw(
            "Missing Method",
            "missing-field:method",
            r#"{"jsonrpc": "2.0", "id": 1}"#,
        ),
        Probe::raw(
            "Invalid Method Type",
            "wrong-type:method",
            r#"{"jsonrpc": "2.0", "method": 123, "id": 1}"#,
        ),
        Probe::raw(
            "Missing JSONRPC Version",
            "missing-field:jsonrpc",
            r#"{"method": "tools/list", "id": 1}"#,
        ),
        Probe::raw(
            "Invalid JSONRPC Version",
            "wrong-value:jsonrpc",
            r#"{"jsonrpc": "3.0", "method": "tools/list", "id": 1}"#,
        ),
        Probe::raw(
            "Huge String",
            "oversized-string",
            format!(
                r#"{{"jsonrpc": "2.0", "method": "test", "params": {{"data": "{}"}}, "id": 1}}"#,
                huge
            ),
        ),
        Probe::raw("Deeply Nested", "deep-nesting", nested),
        Probe::raw(
            "Control Characters",
            "control-characters",
            "{\"jsonrpc\": \"2.0\", \"method\": \"\u{0}\u{1}\u{2}\", \"id\": 1}",
        ),
        Probe::raw(
            "Null Byte In Method",
            "null-bytes",
            "{\"jsonrpc\": \"2.0\", \"method\": \"test\\u0000\", \"id\": 1}",
        ),
        Probe::raw(
            "Boundary Numeric Id",
            "boundary-number:id",
            r#"{"jsonrpc": "2.0", "method": "tools/list", "id": 18446744073709551615}"#,
        ),
        Probe::raw(
            "Negative Float Id",
            "boundary-number:id",
            r#"{"jsonrpc": "2.0", "method": "tools/list", "id": -1.7976931348623157e308}"#,
        ),
        Probe::raw(
            "String Id Instead of Number",
            "wrong-type:id",
            r#"{"jsonrpc": "2.0", "method": "tools/list", "id": "not_a_number"}"#,
        ),
        Probe::raw(
            "Params as String",
            "wrong-type:params",
            r#"{"jsonrpc": "2.0", "method": "tools/list", "params": "not_an_object", "id": 1}"#,
        ),
    ]
}

/// Map the observed outcomes to a risk level.
///
/// Any crash is at least HIGH; crashes escalate to CRITICAL when failures are
/// a majority of the corpus. Timeouts without crashes are at least MEDIUM,
/// HIGH when a majority. Crash presence always dominates a larger count of
/// timeout-only outcomes.
pub fn derive_risk(records: &[ProbeRecord]) -> RiskLevel {
    let total = records.len();
    if total == 0 {
        return RiskLevel::None;
    }

    let crashes = records.iter().filter(|r| r.outcome.is_crash()).count();
    let timeouts = records.iter().filter(|r| r.outcome.is_timeout()).count();
    let failures = crashes + timeouts;
    let majority = failures * 2 > total;

    if crashes > 0 {
        if majority {
            RiskLevel::Critical
        } else {
            RiskLevel::High
        }
    } else if timeouts > 0 {
        if timeouts * 2 > total {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    } else {
        RiskLevel::None
    }
}

#[async_trait]
impl ProbeSuite for Fuzzer {
    fn name(&self) -> &'static str {
        "fuzzer"
    }

    async fn run(&self, transport: Arc<dyn Transport>) -> Result<SuiteResult, TestbenchError> {
        let probes = corpus();
        let mut records = Vec::with_capacity(probes.len());

        for probe in &probes {
            let outcome = transport.send(probe).await;
            debug!(probe = %probe.name, outcome = ?outcome, "Fuzz probe classified");
            records.push(ProbeRecord::new(probe, outcome));
        }

        let crashes = records.iter().filter(|r| r.outcome.is_crash()).count();
        let timeouts = records.iter().filter(|r| r.outcome.is_timeout()).count();
        let risk_level = derive_risk(&records);

        info!(
            tests_run = records.len(),
            crashes,
            timeouts,
            risk = %risk_level,
            "Fuzzing complete"
        );

        let findings = json!({
            "tests_run": records.len(),
            "crashes": crashes,
            "timeouts": timeouts,
            "total_issues": crashes + timeouts,
        });

        Ok(SuiteResult::completed(self.name(), risk_level, records, findings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeOutcome;
    use crate::protocol::RpcError;

    fn record(outcome: ProbeOutcome) -> ProbeRecord {
        let probe = Probe::raw("p", "tag", "{}");
        ProbeRecord::new(&probe, outcome)
    }

    fn rejected() -> ProbeOutcome {
        ProbeOutcome::RejectedGracefully {
            error: RpcError { code: -32600, message: "Invalid Request".into(), data: None },
        }
    }

    fn crashed() -> ProbeOutcome {
        ProbeOutcome::Crashed { evidence: "connection reset".into() }
    }

    #[test]
    fn test_corpus_is_deterministic() {
        let a = corpus();
        let b = corpus();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.body, y.body);
        }
    }

    #[test]
    fn test_corpus_covers_required_cases() {
        let intents: Vec<String> = corpus().into_iter().map(|p| p.intent).collect();
        for expected in [
            "empty-payload",
            "invalid-encoding",
            "top-level-array",
            "missing-field:method",
            "oversized-string",
            "deep-nesting",
            "null-bytes",
        ] {
            assert!(intents.iter().any(|i| i == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_all_graceful_is_none() {
        let records: Vec<_> = (0..10).map(|_| record(rejected())).collect();
        assert_eq!(derive_risk(&records), RiskLevel::None);
    }

    #[test]
    fn test_single_crash_is_high() {
        let mut records: Vec<_> = (0..9).map(|_| record(rejected())).collect();
        records.push(record(crashed()));
        assert_eq!(derive_risk(&records), RiskLevel::High);
    }

    #[test]
    fn test_all_crashes_is_critical_regardless_of_corpus_size() {
        for n in [1, 2, 15] {
            let records: Vec<_> = (0..n).map(|_| record(crashed())).collect();
            assert_eq!(derive_risk(&records), RiskLevel::Critical, "corpus size {}", n);
        }
    }

    #[test]
    fn test_single_timeout_is_medium() {
        let mut records: Vec<_> = (0..9).map(|_| record(rejected())).collect();
        records.push(record(ProbeOutcome::TimedOut));
        assert_eq!(derive_risk(&records), RiskLevel::Medium);
    }

    #[test]
    fn test_majority_timeouts_without_crash_is_high() {
        let mut records: Vec<_> = (0..3).map(|_| record(rejected())).collect();
        records.extend((0..7).map(|_| record(ProbeOutcome::TimedOut)));
        assert_eq!(derive_risk(&records), RiskLevel::High);
    }

    #[test]
    fn test_crash_dominates_timeouts() {
        // One crash among few failures outranks many timeout-only outcomes
        let mut with_crash: Vec<_> = (0..9).map(|_| record(rejected())).collect();
        with_crash.push(record(crashed()));

        let mut timeouts_only: Vec<_> = (0..6).map(|_| record(rejected())).collect();
        timeouts_only.extend((0..4).map(|_| record(ProbeOutcome::TimedOut)));

        assert!(derive_risk(&with_crash).rank() >= derive_risk(&timeouts_only).rank());
    }

    #[test]
    fn test_empty_records_is_none() {
        assert_eq!(derive_risk(&[]), RiskLevel::None);
    }
}
