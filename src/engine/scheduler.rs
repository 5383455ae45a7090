use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::models::{Report, SuiteResult};
use crate::scoring;
use crate::suites::ProbeSuite;
use crate::transport::Transport;

/// Executes every registered suite against one transport handle with bounded
/// concurrency and fault isolation.
///
/// Suites run as independent tasks; the transport serializes their sends onto
/// the handle. A suite that fails or panics degrades to a CRITICAL entry, and
/// suites still in flight at the run deadline are abandoned and recorded as
/// incomplete. The report always contains exactly one entry per registered
/// suite, in registration order.
pub struct Scheduler {
    config: EngineConfig,
    cancel_token: CancellationToken,
}

impl Scheduler {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Replace the scheduler's cancel token with an external one so a caller
    /// can stop the run from outside.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub async fn run(
        &self,
        target: &str,
        transport: Arc<dyn Transport>,
        suites: Vec<Box<dyn ProbeSuite>>,
    ) -> Report {
        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let deadline = start + self.config.run_deadline;
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        info!(
            target,
            suites = suites.len(),
            concurrency = self.config.concurrency,
            run_deadline_secs = self.config.run_deadline.as_secs(),
            "Scheduler started"
        );

        // Registration order is captured before spawning; completion order
        // does not affect the report
        let names: Vec<&'static str> = suites.iter().map(|s| s.name()).collect();

        let handles: Vec<_> = suites
            .into_iter()
            .map(|suite| {
                let transport = transport.clone();
                let semaphore = semaphore.clone();
                let name = suite.name();

                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| crate::errors::TestbenchError::Internal("semaphore closed".into()))?;
                    info!(suite = name, "Suite started");
                    suite.run(transport).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (name, mut handle) in names.iter().copied().zip(handles) {
            let result = tokio::select! {
                // Polled first so a suite that already finished keeps its
                // result even when the deadline or cancellation fires in the
                // same tick
                biased;
                joined = tokio::time::timeout_at(deadline, &mut handle) => match joined {
                    // Run deadline expired while this suite was in flight
                    Err(_) => {
                        handle.abort();
                        warn!(suite = name, "Suite abandoned: run deadline exceeded");
                        SuiteResult::incomplete(name, "incomplete: run deadline exceeded")
                    }
                    Ok(joined) => Self::record_joined(name, joined),
                },
                _ = self.cancel_token.cancelled() => {
                    if handle.is_finished() {
                        Self::record_joined(name, handle.await)
                    } else {
                        handle.abort();
                        warn!(suite = name, "Suite abandoned: run cancelled");
                        SuiteResult::incomplete(name, "incomplete: run cancelled")
                    }
                }
            };
            results.push(result);
        }

        debug_assert_eq!(results.len(), names.len());

        let levels: Vec<_> = results.iter().map(|r| r.risk_level).collect();
        let grade = scoring::score(&levels);
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(%grade, duration_ms, "Scheduler finished");

        Report {
            run_id: uuid::Uuid::new_v4(),
            grade,
            target: target.to_string(),
            started_at,
            duration_ms,
            suites: results,
        }
    }

    fn record_joined(
        name: &'static str,
        joined: Result<Result<SuiteResult, crate::errors::TestbenchError>, tokio::task::JoinError>,
    ) -> SuiteResult {
        match joined {
            // Suite task panicked
            Err(join_error) => {
                warn!(suite = name, error = %join_error, "Suite panicked");
                SuiteResult::failed(name, format!("suite panicked: {}", join_error))
            }
            // Suite returned an error
            Ok(Err(e)) => {
                warn!(suite = name, error = %e, "Suite failed");
                SuiteResult::failed(name, e)
            }
            Ok(Ok(result)) => {
                info!(suite = name, risk = %result.risk_level, "Suite completed");
                result
            }
        }
    }
}
