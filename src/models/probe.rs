use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{RpcError, RpcRequest};

/// A single adversarial or structural request sent to the target.
///
/// `body` holds the exact bytes written to the wire. Several fuzz cases are
/// deliberately not valid JSON, so the body is kept as a raw string rather
/// than a structured value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    /// Human-readable name shown in reports (e.g. "Invalid JSON").
    pub name: String,
    /// Machine tag describing intent (e.g. "sql-injection:classic").
    pub intent: String,
    pub body: String,
}

impl Probe {
    pub fn raw(name: impl Into<String>, intent: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            intent: intent.into(),
            body: body.into(),
        }
    }

    /// Build a probe from a well-formed JSON-RPC request.
    pub fn rpc(name: impl Into<String>, intent: impl Into<String>, request: &RpcRequest) -> Self {
        Self {
            name: name.into(),
            intent: intent.into(),
            body: request.to_body(),
        }
    }
}

/// Result of sending one probe, derived purely from transport-observable
/// signals. Classification is total: every sent probe gets exactly one
/// outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The target returned a success response.
    Accepted { response: Value },
    /// The target returned a well-formed protocol error object.
    RejectedGracefully { error: RpcError },
    /// Connection reset, process death, or a malformed response frame.
    Crashed { evidence: String },
    /// No response within the per-probe deadline.
    TimedOut,
}

impl ProbeOutcome {
    pub fn is_crash(&self) -> bool {
        matches!(self, ProbeOutcome::Crashed { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeOutcome::TimedOut)
    }

    /// Crashed and TimedOut both count as failures against the
    /// expected-safe outcome class.
    pub fn is_failure(&self) -> bool {
        self.is_crash() || self.is_timeout()
    }
}

/// One (probe, outcome) pair recorded in a suite result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub probe: String,
    pub intent: String,
    pub outcome: ProbeOutcome,
}

impl ProbeRecord {
    pub fn new(probe: &Probe, outcome: ProbeOutcome) -> Self {
        Self {
            probe: probe.name.clone(),
            intent: probe.intent.clone(),
            outcome,
        }
    }
}
