use std::path::Path;

use tracing::{info, warn};

use super::commands::{RunArgs, ValidateArgs};
use crate::config::{parse_config, EngineConfig, SandboxLimits, TestbenchConfig};
use crate::engine::Scheduler;
use crate::errors::TestbenchError;
use crate::models::Report;
use crate::reporting::{format_summary, write_report};
use crate::sandbox::SandboxLauncher;
use crate::scoring::Grade;
use crate::suites::builtin_suites;
use crate::transport::{self, TargetDescriptor};

pub async fn handle_run(args: RunArgs) -> Result<(), TestbenchError> {
    let file_config = match &args.config {
        Some(path) => Some(parse_config(Path::new(path)).await?),
        None => None,
    };

    let engine_config = build_engine_config(&args, file_config.as_ref());
    let grade_threshold = resolve_grade_threshold(&args, file_config.as_ref())?;
    let output_dir = resolve_output_dir(&args, file_config.as_ref());

    // Sandbox mode launches the target first; the isolation boundary must
    // come down on every exit path after this point.
    let (descriptor, sandbox) = resolve_target(&args, file_config.as_ref()).await?;

    let outcome = execute(&descriptor, &engine_config).await;

    if let Some(launcher) = &sandbox {
        launcher.teardown().await;
    }

    let report = outcome?;

    println!("{}", format_summary(&report));

    let badge_path = write_report(&report, Path::new(&output_dir)).await?;
    println!("\nReport written to {}", output_dir);
    println!("Badge: {}", badge_path.display());

    if let Some(threshold) = grade_threshold {
        if report.grade.rank() > threshold.rank() {
            return Err(TestbenchError::GradeThreshold(format!(
                "grade {} is worse than required {}",
                report.grade, threshold
            )));
        }
        info!(grade = %report.grade, threshold = %threshold, "Grade threshold satisfied");
    }

    Ok(())
}

/// Connect, run every suite, and detach. Ctrl-C cancels the run but still
/// yields a report with the remaining suites marked incomplete.
async fn execute(
    descriptor: &TargetDescriptor,
    config: &EngineConfig,
) -> Result<Report, TestbenchError> {
    let transport = transport::connect(descriptor, config).await?;

    let scheduler = Scheduler::new(config.clone());
    let cancel = scheduler.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping run");
            cancel.cancel();
        }
    });

    let report = scheduler
        .run(&descriptor.to_string(), transport.clone(), builtin_suites())
        .await;

    transport.close().await;
    Ok(report)
}

async fn resolve_target(
    args: &RunArgs,
    file_config: Option<&TestbenchConfig>,
) -> Result<(TargetDescriptor, Option<SandboxLauncher>), TestbenchError> {
    if let Some(dir) = &args.docker_path {
        let mut limits = SandboxLimits::default();
        if let Some(section) = file_config.and_then(|c| c.sandbox.as_ref()) {
            limits.apply_section(section);
        }
        if args.isolated {
            limits.network_disabled = true;
        }

        let launcher = SandboxLauncher::new(limits)?;
        if args.rebuild {
            launcher.build_image(&Path::new(dir).join("Dockerfile")).await?;
        }
        let descriptor = launcher.launch(Path::new(dir)).await?;
        return Ok((descriptor, Some(launcher)));
    }

    if let Some(command_line) = &args.stdio {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let command = parts.next().ok_or_else(|| {
            TestbenchError::InvalidTarget("--stdio requires a non-empty command".into())
        })?;
        let descriptor = TargetDescriptor::Process {
            command,
            args: parts.collect(),
        };
        return Ok((descriptor, None));
    }

    if let Some(url) = &args.target {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TestbenchError::InvalidTarget(format!(
                "Target must be an http(s) URL, got '{}'",
                url
            )));
        }
        return Ok((
            TargetDescriptor::Network {
                base_url: url.trim_end_matches('/').to_string(),
            },
            None,
        ));
    }

    Err(TestbenchError::InvalidTarget(
        "Provide a target URL, --stdio command, or --docker-path directory".into(),
    ))
}

/// CLI flags win over the config file; the file fills in what the CLI left
/// unset; everything else uses defaults.
fn build_engine_config(args: &RunArgs, file_config: Option<&TestbenchConfig>) -> EngineConfig {
    let mut config = EngineConfig::default();
    let section = file_config.and_then(|c| c.engine.as_ref());

    if let Some(ms) = args.probe_timeout_ms.or(section.and_then(|s| s.probe_timeout_ms)) {
        config.probe_timeout = std::time::Duration::from_millis(ms);
    }
    if let Some(ms) = section.and_then(|s| s.connect_timeout_ms) {
        config.connect_timeout = std::time::Duration::from_millis(ms);
    }
    if let Some(secs) = args.run_deadline_secs.or(section.and_then(|s| s.run_deadline_secs)) {
        config.run_deadline = std::time::Duration::from_secs(secs);
    }
    if let Some(n) = args.concurrency.or(section.and_then(|s| s.concurrency)) {
        config.concurrency = n.max(1);
    }

    config
}

fn resolve_grade_threshold(
    args: &RunArgs,
    file_config: Option<&TestbenchConfig>,
) -> Result<Option<Grade>, TestbenchError> {
    let raw = args
        .grade_threshold
        .clone()
        .or_else(|| {
            file_config
                .and_then(|c| c.engine.as_ref())
                .and_then(|e| e.grade_threshold.clone())
        });

    match raw {
        None => Ok(None),
        Some(raw) => Grade::parse(&raw).map(Some).ok_or_else(|| {
            TestbenchError::Config(format!(
                "Invalid grade threshold '{}': expected one of A, B, C, D, F",
                raw
            ))
        }),
    }
}

fn resolve_output_dir(args: &RunArgs, file_config: Option<&TestbenchConfig>) -> String {
    args.output
        .clone()
        .or_else(|| {
            file_config
                .and_then(|c| c.output.as_ref())
                .and_then(|o| o.directory.clone())
        })
        .unwrap_or_else(|| "./mcp_testbench_report".to_string())
}

pub async fn handle_validate(args: ValidateArgs) -> Result<(), TestbenchError> {
    let config = parse_config(Path::new(&args.config)).await?;
    println!("Configuration is valid: {}", args.config);
    if let Some(engine) = &config.engine {
        if let Some(threshold) = &engine.grade_threshold {
            println!("  grade threshold: {}", threshold);
        }
    }
    Ok(())
}
