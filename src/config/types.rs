use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Optional YAML file configuration, merged under CLI arguments.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TestbenchConfig {
    pub engine: Option<EngineSection>,
    pub sandbox: Option<SandboxSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EngineSection {
    pub probe_timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub run_deadline_secs: Option<u64>,
    pub concurrency: Option<usize>,
    /// Worst acceptable grade for the external gating step ("A".."F").
    pub grade_threshold: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SandboxSection {
    pub image: Option<String>,
    pub name: Option<String>,
    pub cpus: Option<f64>,
    pub memory_mb: Option<u64>,
    pub network_disabled: Option<bool>,
    pub port: Option<u16>,
    pub health_wait_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputSection {
    pub directory: Option<String>,
}

/// Resolved engine knobs handed to the scheduler and transports.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for a single probe round-trip.
    pub probe_timeout: Duration,
    /// Deadline for establishing the transport and its initial health check.
    pub connect_timeout: Duration,
    /// Overall wall-clock bound for the whole run, independent of per-probe
    /// timeouts.
    pub run_deadline: Duration,
    /// Maximum number of suites in flight at once.
    pub concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            run_deadline: Duration::from_secs(300),
            concurrency: 4,
        }
    }
}

/// Resource ceilings for the sandbox launcher.
#[derive(Debug, Clone)]
pub struct SandboxLimits {
    pub image: String,
    pub container_name: String,
    pub cpus: f64,
    pub memory_mb: u64,
    /// When set the container runs with no network at all; otherwise the
    /// target port is published so the harness can reach it from the host.
    pub network_disabled: bool,
    pub port: u16,
    /// Ceiling wait for the target to become healthy before LaunchError.
    pub health_wait: Duration,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            image: "mcp-testbench-runner:latest".to_string(),
            container_name: "mcp-testbench-target".to_string(),
            cpus: 2.0,
            memory_mb: 2048,
            network_disabled: false,
            port: 8000,
            health_wait: Duration::from_secs(30),
        }
    }
}

impl SandboxLimits {
    pub fn apply_section(&mut self, section: &SandboxSection) {
        if let Some(image) = &section.image {
            self.image = image.clone();
        }
        if let Some(name) = &section.name {
            self.container_name = name.clone();
        }
        if let Some(cpus) = section.cpus {
            self.cpus = cpus;
        }
        if let Some(mb) = section.memory_mb {
            self.memory_mb = mb;
        }
        if let Some(flag) = section.network_disabled {
            self.network_disabled = flag;
        }
        if let Some(port) = section.port {
            self.port = port;
        }
        if let Some(secs) = section.health_wait_secs {
            self.health_wait = Duration::from_secs(secs);
        }
    }
}
