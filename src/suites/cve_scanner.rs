use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::ProbeSuite;
use crate::errors::TestbenchError;
use crate::models::{Probe, ProbeOutcome, ProbeRecord, RiskLevel, SuiteResult};
use crate::protocol::RpcRequest;
use crate::transport::Transport;

/// One known-vulnerability signature: version/banner indicators matched
/// against fingerprint responses, with a fixed severity per identifier.
pub struct CveSignature {
    pub id: &'static str,
    pub cvss: f64,
    pub description: &'static str,
    pub indicators: &'static [&'static str],
    pub severity: RiskLevel,
}

/// Static lookup table of known MCP ecosystem CVEs.
pub const KNOWN_CVES: &[CveSignature] = &[
    CveSignature {
        id: "CVE-2025-6514",
        cvss: 9.6,
        description: "Critical RCE in mcp-remote",
        indicators: &["mcp-remote", "/remote/"],
        severity: RiskLevel::Critical,
    },
    CveSignature {
        id: "CVE-2025-49596",
        cvss: 9.4,
        description: "RCE in MCP Inspector",
        indicators: &["mcp-inspector", "/inspector/"],
        severity: RiskLevel::Critical,
    },
];

/// Match the collected fingerprint text against the signature table.
pub fn match_signatures(fingerprint: &str) -> Vec<&'static CveSignature> {
    let haystack = fingerprint.to_lowercase();
    KNOWN_CVES
        .iter()
        .filter(|sig| {
            sig.indicators
                .iter()
                .any(|needle| haystack.contains(&needle.to_lowercase()))
        })
        .collect()
}

fn fingerprint_probes() -> Vec<Probe> {
    vec![
        Probe::rpc(
            "Initialize Handshake",
            "fingerprint:initialize",
            &RpcRequest::new(
                1,
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "mcp-testbench", "version": env!("CARGO_PKG_VERSION")},
                })),
            ),
        ),
        Probe::rpc(
            "Tool Listing",
            "fingerprint:tools-list",
            &RpcRequest::new(2, "tools/list", None),
        ),
    ]
}

/// Sends fingerprinting probes and matches observed banners and version
/// strings against the static CVE table.
pub struct CveScanner;

#[async_trait]
impl ProbeSuite for CveScanner {
    fn name(&self) -> &'static str {
        "cve_scanner"
    }

    async fn run(&self, transport: Arc<dyn Transport>) -> Result<SuiteResult, TestbenchError> {
        let probes = fingerprint_probes();
        let mut records = Vec::with_capacity(probes.len());
        let mut fingerprint = String::new();

        for probe in &probes {
            let outcome = transport.send(probe).await;
            if let ProbeOutcome::Accepted { response } = &outcome {
                fingerprint.push_str(&response.to_string());
                fingerprint.push('\n');
            }
            records.push(ProbeRecord::new(probe, outcome));
        }

        let matches = match_signatures(&fingerprint);
        let risk_level = matches
            .iter()
            .map(|sig| sig.severity)
            .fold(RiskLevel::None, RiskLevel::max);

        for sig in &matches {
            debug!(cve = sig.id, cvss = sig.cvss, "Signature matched");
        }
        info!(matched = matches.len(), risk = %risk_level, "CVE scan complete");

        let findings = json!({
            "vulnerabilities_found": matches.len(),
            "vulnerabilities": matches.iter().map(|sig| json!({
                "cve_id": sig.id,
                "cvss": sig.cvss,
                "description": sig.description,
                "severity": sig.severity,
            })).collect::<Vec<_>>(),
        });

        Ok(SuiteResult::completed(self.name(), risk_level, records, findings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_on_clean_fingerprint() {
        let matches = match_signatures(r#"{"serverInfo": {"name": "time-server", "version": "1.0"}}"#);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let matches = match_signatures(r#"{"serverInfo": {"name": "MCP-Remote", "version": "0.1"}}"#);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "CVE-2025-6514");
    }

    #[test]
    fn test_multiple_matches_collected() {
        let matches = match_signatures("mcp-remote and mcp-inspector both present");
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_severity_is_max_of_matches() {
        let matches = match_signatures("mcp-inspector");
        let risk = matches
            .iter()
            .map(|sig| sig.severity)
            .fold(RiskLevel::None, RiskLevel::max);
        assert_eq!(risk, RiskLevel::Critical);
    }

    #[test]
    fn test_fingerprint_probes_are_well_formed() {
        for probe in fingerprint_probes() {
            let value: serde_json::Value = serde_json::from_str(&probe.body).unwrap();
            assert_eq!(value["jsonrpc"], "2.0");
            assert!(value["method"].is_string());
        }
    }
}
