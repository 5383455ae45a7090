use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{classify_frame, Transport};
use crate::errors::TestbenchError;
use crate::models::{Probe, ProbeOutcome};

const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Process-backed transport: one newline-framed JSON message per send on the
/// child's stdin, one line read back from its stdout.
pub struct StdioTransport {
    inner: Mutex<StdioInner>,
    probe_timeout: Duration,
}

struct StdioInner {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StdioTransport {
    pub async fn spawn(
        command: &str,
        args: &[String],
        probe_timeout: Duration,
    ) -> Result<Self, TestbenchError> {
        debug!(command, ?args, "Spawning stdio target");

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TestbenchError::Connect(format!("failed to spawn '{}': {}", command, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TestbenchError::Connect("child stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| TestbenchError::Connect("child stdout not captured".into()))?;

        Ok(Self {
            inner: Mutex::new(StdioInner { child, stdin, stdout }),
            probe_timeout,
        })
    }

    fn exit_evidence(status: Option<std::process::ExitStatus>, context: &str) -> String {
        match status {
            Some(status) => format!("{}: process exited with {}", context, status),
            None => format!("{}: process state unknown", context),
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&self, probe: &Probe) -> ProbeOutcome {
        // The mutex enforces one in-flight request per handle
        let mut inner = self.inner.lock().await;

        // Lazy death detection: a process that died after a previous timeout
        // is noticed here
        if let Ok(Some(status)) = inner.child.try_wait() {
            return ProbeOutcome::Crashed {
                evidence: format!("process already exited with {}", status),
            };
        }

        let frame = format!("{}\n", probe.body);
        if let Err(e) = inner.stdin.write_all(frame.as_bytes()).await {
            let status = inner.child.try_wait().ok().flatten();
            return ProbeOutcome::Crashed {
                evidence: Self::exit_evidence(status, &format!("write failed ({})", e)),
            };
        }
        if let Err(e) = inner.stdin.flush().await {
            let status = inner.child.try_wait().ok().flatten();
            return ProbeOutcome::Crashed {
                evidence: Self::exit_evidence(status, &format!("flush failed ({})", e)),
            };
        }

        let mut line = String::new();
        match tokio::time::timeout(self.probe_timeout, inner.stdout.read_line(&mut line)).await {
            // No response within the deadline: the process is left running and
            // stays usable for subsequent probes. A straggler response frame is
            // not drained; the next read may observe it.
            Err(_) => ProbeOutcome::TimedOut,
            Ok(Err(e)) => ProbeOutcome::Crashed {
                evidence: format!("read failed: {}", e),
            },
            Ok(Ok(0)) => {
                // EOF before a complete response frame
                let status = inner.child.wait().await.ok();
                ProbeOutcome::Crashed {
                    evidence: Self::exit_evidence(status, "stdout closed before response"),
                }
            }
            Ok(Ok(_)) => classify_frame(&line),
        }
    }

    async fn health_check(&self) -> Result<(), TestbenchError> {
        // Spawning succeeded; an instantly-dying target is still reportable,
        // so probes against it classify as Crashed rather than failing the run
        Ok(())
    }

    async fn close(&self) {
        let mut inner = self.inner.lock().await;

        // Close stdin first to signal EOF, then terminate
        let _ = inner.stdin.shutdown().await;
        if let Err(e) = inner.child.start_kill() {
            debug!(error = %e, "Kill signal failed (process likely already dead)");
        }
        match tokio::time::timeout(CLOSE_GRACE, inner.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Stdio target reaped"),
            Ok(Err(e)) => warn!(error = %e, "Failed to reap stdio target"),
            Err(_) => warn!("Stdio target did not exit within close grace period"),
        }
    }
}
