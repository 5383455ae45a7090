use std::path::Path;

use tracing::warn;

use super::types::TestbenchConfig;
use crate::errors::TestbenchError;
use crate::scoring::Grade;

pub async fn parse_config(path: &Path) -> Result<TestbenchConfig, TestbenchError> {
    if !path.exists() {
        return Err(TestbenchError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(TestbenchError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: TestbenchConfig = serde_yaml::from_str(&content)?;

    validate_conflicts(&config)?;

    Ok(config)
}

/// Detect semantic conflicts in the parsed configuration.
fn validate_conflicts(config: &TestbenchConfig) -> Result<(), TestbenchError> {
    if let Some(engine) = &config.engine {
        if engine.concurrency == Some(0) {
            return Err(TestbenchError::Config("engine.concurrency must be at least 1".into()));
        }

        if let Some(threshold) = &engine.grade_threshold {
            if Grade::parse(threshold).is_none() {
                return Err(TestbenchError::Config(format!(
                    "Invalid grade_threshold '{}': expected one of A, B, C, D, F",
                    threshold
                )));
            }
        }

        if let (Some(probe_ms), Some(deadline_secs)) =
            (engine.probe_timeout_ms, engine.run_deadline_secs)
        {
            if deadline_secs * 1000 < probe_ms {
                warn!(
                    probe_timeout_ms = probe_ms,
                    run_deadline_secs = deadline_secs,
                    "Run deadline is shorter than a single probe timeout; most suites will be cut off"
                );
            }
        }
    }

    if let Some(sandbox) = &config.sandbox {
        if sandbox.cpus.map_or(false, |c| c <= 0.0) {
            return Err(TestbenchError::Config("sandbox.cpus must be positive".into()));
        }
        if sandbox.memory_mb == Some(0) {
            return Err(TestbenchError::Config("sandbox.memory_mb must be positive".into()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{EngineSection, SandboxSection};

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = TestbenchConfig {
            engine: Some(EngineSection {
                concurrency: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_bad_grade_threshold_rejected() {
        let config = TestbenchConfig {
            engine: Some(EngineSection {
                grade_threshold: Some("Z".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_zero_memory_rejected() {
        let config = TestbenchConfig {
            sandbox: Some(SandboxSection {
                image: None,
                name: None,
                cpus: None,
                memory_mb: Some(0),
                network_disabled: None,
                port: None,
                health_wait_secs: None,
            }),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_empty_config_ok() {
        assert!(validate_conflicts(&TestbenchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_parse_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testbench.yaml");
        tokio::fs::write(
            &path,
            "engine:\n  concurrency: 8\n  grade_threshold: C\nsandbox:\n  cpus: 1.5\n",
        )
        .await
        .unwrap();

        let config = parse_config(&path).await.unwrap();
        assert_eq!(config.engine.as_ref().unwrap().concurrency, Some(8));
        assert_eq!(config.sandbox.as_ref().unwrap().cpus, Some(1.5));
    }

    #[tokio::test]
    async fn test_parse_config_missing_file() {
        let result = parse_config(Path::new("/nonexistent/testbench.yaml")).await;
        assert!(matches!(result, Err(TestbenchError::Config(_))));
    }
}
