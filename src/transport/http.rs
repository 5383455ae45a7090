use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::debug;

use super::{body_as_value, Transport};
use crate::config::EngineConfig;
use crate::errors::TestbenchError;
use crate::models::{Probe, ProbeOutcome};
use crate::protocol::{RpcResponse, INVALID_REQUEST, JSONRPC_VERSION};
use crate::utils::truncation::truncate_error;

/// Network-backed transport: one HTTP POST per send against the target's
/// base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    probe_timeout: Duration,
    connect_timeout: Duration,
    // One in-flight request per handle
    gate: Mutex<()>,
}

impl HttpTransport {
    pub fn new(base_url: &str, config: &EngineConfig) -> Result<Self, TestbenchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TestbenchError::Connect(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            probe_timeout: config.probe_timeout,
            connect_timeout: config.connect_timeout,
            gate: Mutex::new(()),
        })
    }
}

/// Classify an HTTP status plus body into a probe outcome.
///
/// A well-formed protocol error object is a graceful rejection whatever the
/// status. A 2xx without one is an acceptance. A 5xx whose body is not a
/// protocol error object is a crash. Remaining non-success statuses count as
/// handled rejections of the bad input.
fn classify_http(status: StatusCode, body: &str) -> ProbeOutcome {
    if let Ok(resp) = serde_json::from_str::<RpcResponse>(body) {
        if resp.jsonrpc.as_deref() == Some(JSONRPC_VERSION) {
            if let Some(error) = resp.error {
                return ProbeOutcome::RejectedGracefully { error };
            }
        }
        if status.is_success() {
            if let Some(result) = resp.result {
                return ProbeOutcome::Accepted { response: result };
            }
        }
    }

    if status.is_success() {
        return ProbeOutcome::Accepted { response: body_as_value(body) };
    }

    if status.is_server_error() {
        return ProbeOutcome::Crashed {
            evidence: format!(
                "HTTP {} with malformed body: {}",
                status.as_u16(),
                truncate_error(body.trim()),
            ),
        };
    }

    ProbeOutcome::RejectedGracefully {
        error: crate::protocol::RpcError {
            code: INVALID_REQUEST,
            message: format!("HTTP {}", status.as_u16()),
            data: None,
        },
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, probe: &Probe) -> ProbeOutcome {
        let _guard = self.gate.lock().await;
        debug!(probe = %probe.name, url = %self.base_url, "Sending probe");

        let result = self
            .client
            .post(&self.base_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(probe.body.clone())
            .timeout(self.probe_timeout)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return ProbeOutcome::TimedOut,
            Err(e) => {
                return ProbeOutcome::Crashed {
                    evidence: truncate_error(&format!("transport error: {}", e)),
                }
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => classify_http(status, &body),
            Err(e) if e.is_timeout() => ProbeOutcome::TimedOut,
            Err(e) => ProbeOutcome::Crashed {
                evidence: truncate_error(&format!("body read failed: {}", e)),
            },
        }
    }

    async fn health_check(&self) -> Result<(), TestbenchError> {
        let result = self
            .client
            .get(&self.base_url)
            .timeout(self.connect_timeout)
            .send()
            .await;

        match result {
            // Any HTTP answer means the endpoint is reachable
            Ok(_) => Ok(()),
            Err(e) => Err(TestbenchError::Connect(format!(
                "target unreachable at {}: {}",
                self.base_url, e
            ))),
        }
    }

    async fn close(&self) {
        // Connection pool is released on drop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_2xx_with_result_is_accepted() {
        let outcome = classify_http(
            StatusCode::OK,
            r#"{"jsonrpc": "2.0", "id": 1, "result": {"ok": true}}"#,
        );
        assert!(matches!(outcome, ProbeOutcome::Accepted { .. }));
    }

    #[test]
    fn test_error_object_is_graceful_whatever_the_status() {
        let body = r#"{"jsonrpc": "2.0", "id": 1, "error": {"code": -32700, "message": "parse error"}}"#;
        for status in [StatusCode::OK, StatusCode::BAD_REQUEST, StatusCode::INTERNAL_SERVER_ERROR] {
            let outcome = classify_http(status, body);
            assert!(
                matches!(outcome, ProbeOutcome::RejectedGracefully { .. }),
                "status {} misclassified",
                status
            );
        }
    }

    #[test]
    fn test_5xx_with_garbage_body_is_crash() {
        let outcome = classify_http(StatusCode::INTERNAL_SERVER_ERROR, "stack trace here");
        assert!(outcome.is_crash());
    }

    #[test]
    fn test_4xx_with_garbage_body_is_handled_rejection() {
        let outcome = classify_http(StatusCode::NOT_FOUND, "not found");
        assert!(matches!(outcome, ProbeOutcome::RejectedGracefully { .. }));
    }

    #[test]
    fn test_2xx_with_non_rpc_body_is_accepted_raw() {
        let outcome = classify_http(StatusCode::OK, "plain text");
        match outcome {
            ProbeOutcome::Accepted { response } => {
                assert_eq!(response, serde_json::Value::String("plain text".into()))
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }
}
