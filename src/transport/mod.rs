pub mod http;
pub mod stdio;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::errors::TestbenchError;
use crate::models::{Probe, ProbeOutcome};
use crate::protocol::RpcResponse;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

/// The server under test: a local process spoken to over stdio, or a remote
/// HTTP endpoint. Mutually exclusive, immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetDescriptor {
    Process { command: String, args: Vec<String> },
    Network { base_url: String },
}

impl std::fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetDescriptor::Process { command, args } => {
                write!(f, "stdio:{}", command)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            TargetDescriptor::Network { base_url } => f.write_str(base_url),
        }
    }
}

/// Uniform request/response channel to one target.
///
/// `send` never returns an error: every failure mode folds into the
/// [`ProbeOutcome`] classification. Concurrent sends on one handle are
/// serialized internally; concurrency across targets is achieved by opening
/// independent handles.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, probe: &Probe) -> ProbeOutcome;

    /// Liveness check run once right after connect.
    async fn health_check(&self) -> Result<(), TestbenchError>;

    /// Release the underlying process handle or connection.
    async fn close(&self);
}

/// Open a transport for the given target and verify it is reachable.
pub async fn connect(
    descriptor: &TargetDescriptor,
    config: &EngineConfig,
) -> Result<Arc<dyn Transport>, TestbenchError> {
    let transport: Arc<dyn Transport> = match descriptor {
        TargetDescriptor::Process { command, args } => {
            Arc::new(StdioTransport::spawn(command, args, config.probe_timeout).await?)
        }
        TargetDescriptor::Network { base_url } => {
            Arc::new(HttpTransport::new(base_url, config)?)
        }
    };

    transport.health_check().await?;
    Ok(transport)
}

/// Classify one response frame from the target.
///
/// A well-formed frame carrying an error object is a graceful rejection; one
/// carrying a result is an acceptance; anything else is evidence the target
/// mangled the protocol and counts as a crash.
pub(crate) fn classify_frame(raw: &str) -> ProbeOutcome {
    let parsed: Result<RpcResponse, _> = serde_json::from_str(raw);
    match parsed {
        Ok(resp) => {
            if resp.is_well_formed() {
                if let Some(error) = resp.error {
                    return ProbeOutcome::RejectedGracefully { error };
                }
                if let Some(result) = resp.result {
                    return ProbeOutcome::Accepted { response: result };
                }
            }
            ProbeOutcome::Crashed {
                evidence: format!(
                    "malformed response frame: {}",
                    crate::utils::truncation::truncate_error(raw.trim()),
                ),
            }
        }
        Err(_) => ProbeOutcome::Crashed {
            evidence: format!(
                "response frame is not valid JSON: {}",
                crate::utils::truncation::truncate_error(raw.trim()),
            ),
        },
    }
}

/// Parse a body into a JSON value for report evidence, falling back to the
/// raw string when it is not JSON.
pub(crate) fn body_as_value(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
