use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use mcp_testbench::config::EngineConfig;
use mcp_testbench::engine::Scheduler;
use mcp_testbench::errors::TestbenchError;
use mcp_testbench::models::{Probe, ProbeOutcome, RiskLevel, SuiteResult, SuiteStatus};
use mcp_testbench::protocol::RpcError;
use mcp_testbench::scoring::Grade;
use mcp_testbench::suites::{builtin_suites, ProbeSuite};
use mcp_testbench::transport::Transport;

/// Transport that answers every probe the same way, without a real target.
struct ScriptedTransport {
    outcome: fn() -> ProbeOutcome,
}

impl ScriptedTransport {
    fn rejecting() -> Arc<dyn Transport> {
        Arc::new(Self {
            outcome: || ProbeOutcome::RejectedGracefully {
                error: RpcError {
                    code: -32600,
                    message: "Invalid Request".into(),
                    data: None,
                },
            },
        })
    }

    fn crashing() -> Arc<dyn Transport> {
        Arc::new(Self {
            outcome: || ProbeOutcome::Crashed {
                evidence: "connection reset by peer".into(),
            },
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, _probe: &Probe) -> ProbeOutcome {
        (self.outcome)()
    }

    async fn health_check(&self) -> Result<(), TestbenchError> {
        Ok(())
    }

    async fn close(&self) {}
}

/// Suite that sleeps and then reports a fixed risk level.
struct DelaySuite {
    name: &'static str,
    delay: Duration,
    risk: RiskLevel,
}

#[async_trait]
impl ProbeSuite for DelaySuite {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, _transport: Arc<dyn Transport>) -> Result<SuiteResult, TestbenchError> {
        tokio::time::sleep(self.delay).await;
        Ok(SuiteResult::completed(self.name, self.risk, Vec::new(), json!({})))
    }
}

struct FailingSuite;

#[async_trait]
impl ProbeSuite for FailingSuite {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn run(&self, _transport: Arc<dyn Transport>) -> Result<SuiteResult, TestbenchError> {
        Err(TestbenchError::Suite("simulated worker failure".into()))
    }
}

struct PanickingSuite;

#[async_trait]
impl ProbeSuite for PanickingSuite {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn run(&self, _transport: Arc<dyn Transport>) -> Result<SuiteResult, TestbenchError> {
        panic!("simulated panic inside a suite");
    }
}

fn quick_config() -> EngineConfig {
    EngineConfig {
        probe_timeout: Duration::from_millis(200),
        connect_timeout: Duration::from_secs(1),
        run_deadline: Duration::from_secs(30),
        concurrency: 4,
    }
}

#[tokio::test]
async fn test_report_keeps_registration_order() {
    // Completion order is reversed from registration order on purpose
    let suites: Vec<Box<dyn ProbeSuite>> = vec![
        Box::new(DelaySuite { name: "slowest", delay: Duration::from_millis(120), risk: RiskLevel::None }),
        Box::new(DelaySuite { name: "middle", delay: Duration::from_millis(60), risk: RiskLevel::Low }),
        Box::new(DelaySuite { name: "fastest", delay: Duration::from_millis(1), risk: RiskLevel::None }),
    ];

    let report = Scheduler::new(quick_config())
        .run("scripted", ScriptedTransport::rejecting(), suites)
        .await;

    let names: Vec<&str> = report.suites.iter().map(|s| s.suite.as_str()).collect();
    assert_eq!(names, vec!["slowest", "middle", "fastest"]);
    assert_eq!(report.grade, Grade::B);
}

#[tokio::test]
async fn test_suite_failure_is_isolated() {
    let suites: Vec<Box<dyn ProbeSuite>> = vec![
        Box::new(DelaySuite { name: "healthy", delay: Duration::from_millis(1), risk: RiskLevel::None }),
        Box::new(FailingSuite),
        Box::new(PanickingSuite),
    ];

    let report = Scheduler::new(quick_config())
        .run("scripted", ScriptedTransport::rejecting(), suites)
        .await;

    assert_eq!(report.suites.len(), 3);
    assert_eq!(report.suites[0].status, SuiteStatus::Completed);

    let failed = &report.suites[1];
    assert_eq!(failed.status, SuiteStatus::Failed);
    assert_eq!(failed.risk_level, RiskLevel::Critical);
    assert!(failed.findings["error"].as_str().unwrap().contains("simulated worker failure"));

    let panicked = &report.suites[2];
    assert_eq!(panicked.status, SuiteStatus::Failed);
    assert_eq!(panicked.risk_level, RiskLevel::Critical);

    assert_eq!(report.grade, Grade::F);
}

#[tokio::test]
async fn test_run_deadline_marks_stragglers_incomplete() {
    let mut config = quick_config();
    config.run_deadline = Duration::from_millis(150);

    let suites: Vec<Box<dyn ProbeSuite>> = vec![
        Box::new(DelaySuite { name: "fast", delay: Duration::from_millis(1), risk: RiskLevel::None }),
        Box::new(DelaySuite { name: "stuck", delay: Duration::from_secs(60), risk: RiskLevel::None }),
    ];

    let start = std::time::Instant::now();
    let report = Scheduler::new(config)
        .run("scripted", ScriptedTransport::rejecting(), suites)
        .await;

    // The run returns at the deadline, not after the stuck suite's sleep
    assert!(start.elapsed() < Duration::from_secs(5));

    assert_eq!(report.suites[0].status, SuiteStatus::Completed);
    let stuck = &report.suites[1];
    assert_eq!(stuck.status, SuiteStatus::Incomplete);
    assert_eq!(stuck.risk_level, RiskLevel::Critical);
    assert!(stuck.findings["error"].as_str().unwrap().contains("deadline"));
    assert_eq!(report.grade, Grade::F);
}

#[tokio::test]
async fn test_cancellation_yields_incomplete_entries() {
    let suites: Vec<Box<dyn ProbeSuite>> = vec![
        Box::new(DelaySuite { name: "stuck", delay: Duration::from_secs(60), risk: RiskLevel::None }),
    ];

    let scheduler = Scheduler::new(quick_config());
    let cancel = scheduler.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let start = std::time::Instant::now();
    let report = scheduler
        .run("scripted", ScriptedTransport::rejecting(), suites)
        .await;

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(report.suites[0].status, SuiteStatus::Incomplete);
    assert!(report.suites[0].findings["error"].as_str().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn test_bounded_concurrency_still_runs_everything() {
    let mut config = quick_config();
    config.concurrency = 1;

    let suites: Vec<Box<dyn ProbeSuite>> = (0..4)
        .map(|i| {
            Box::new(DelaySuite {
                name: ["s0", "s1", "s2", "s3"][i],
                delay: Duration::from_millis(10),
                risk: RiskLevel::None,
            }) as Box<dyn ProbeSuite>
        })
        .collect();

    let report = Scheduler::new(config)
        .run("scripted", ScriptedTransport::rejecting(), suites)
        .await;

    assert_eq!(report.suites.len(), 4);
    assert!(report.suites.iter().all(|s| s.status == SuiteStatus::Completed));
    assert_eq!(report.grade, Grade::A);
}

#[tokio::test]
async fn test_builtin_battery_grades_a_on_graceful_target() {
    let report = Scheduler::new(quick_config())
        .run("scripted", ScriptedTransport::rejecting(), builtin_suites())
        .await;

    let names: Vec<&str> = report.suites.iter().map(|s| s.suite.as_str()).collect();
    assert_eq!(names, vec!["fuzzer", "cve_scanner", "injection"]);
    assert!(report.suites.iter().all(|s| s.status == SuiteStatus::Completed));
    assert_eq!(report.grade, Grade::A);
}

#[tokio::test]
async fn test_builtin_battery_grades_f_on_crashing_target() {
    let report = Scheduler::new(quick_config())
        .run("scripted", ScriptedTransport::crashing(), builtin_suites())
        .await;

    let fuzzer = report.suite("fuzzer").expect("fuzzer entry present");
    assert_eq!(fuzzer.risk_level, RiskLevel::Critical);
    assert!(fuzzer.crash_count() > 0);
    assert_eq!(report.grade, Grade::F);
}
