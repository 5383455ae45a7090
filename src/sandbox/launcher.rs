use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::models::{HostConfig, PortBinding};
use bollard::Docker;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SandboxLimits;
use crate::errors::TestbenchError;
use crate::transport::TargetDescriptor;

const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Starts the target inside a resource- and network-constrained container,
/// and guarantees teardown of that boundary when the run ends.
pub struct SandboxLauncher {
    docker: Docker,
    limits: SandboxLimits,
    container_id: Mutex<Option<String>>,
}

impl SandboxLauncher {
    pub fn new(limits: SandboxLimits) -> Result<Self, TestbenchError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| TestbenchError::Launch(format!("Failed to connect to Docker: {}", e)))?;

        Ok(Self {
            docker,
            limits,
            container_id: Mutex::new(None),
        })
    }

    /// Start the target server directory inside the sandbox and wait for it
    /// to become healthy. Returns the network target the harness can attach
    /// a transport to.
    pub async fn launch(&self, server_dir: &Path) -> Result<TargetDescriptor, TestbenchError> {
        let server_dir = server_dir
            .canonicalize()
            .map_err(|e| TestbenchError::Launch(format!("Invalid server directory: {}", e)))?;

        self.ensure_image(&server_dir).await?;

        let port_key = format!("{}/tcp", self.limits.port);
        let mut host_config = HostConfig {
            binds: Some(vec![format!("{}:/app", server_dir.display())]),
            nano_cpus: Some((self.limits.cpus * 1_000_000_000.0) as i64),
            memory: Some(self.limits.memory_mb as i64 * 1024 * 1024),
            ..Default::default()
        };

        let mut config = Config {
            image: Some(self.limits.image.clone()),
            working_dir: Some("/app".to_string()),
            host_config: None,
            ..Default::default()
        };

        if self.limits.network_disabled {
            // Full isolation: the target cannot make outbound requests
            host_config.network_mode = Some("none".to_string());
        } else {
            // Publish the target port so the harness can probe it from the host
            let mut bindings = HashMap::new();
            bindings.insert(
                port_key.clone(),
                Some(vec![PortBinding {
                    host_ip: Some("127.0.0.1".to_string()),
                    host_port: Some(self.limits.port.to_string()),
                }]),
            );
            host_config.port_bindings = Some(bindings);

            let mut exposed = HashMap::new();
            exposed.insert(port_key, HashMap::new());
            config.exposed_ports = Some(exposed);
        }
        config.host_config = Some(host_config);

        let options = CreateContainerOptions {
            name: &self.limits.container_name,
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| TestbenchError::Launch(format!("Failed to create container: {}", e)))?;
        *self.container_id.lock().await = Some(created.id.clone());

        self.docker
            .start_container(&self.limits.container_name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| TestbenchError::Launch(format!("Failed to start container: {}", e)))?;

        info!(
            container = %self.limits.container_name,
            cpus = self.limits.cpus,
            memory_mb = self.limits.memory_mb,
            network_disabled = self.limits.network_disabled,
            "Sandbox container started"
        );

        let base_url = format!("http://127.0.0.1:{}", self.limits.port);
        self.wait_healthy(&base_url).await?;

        Ok(TargetDescriptor::Network { base_url })
    }

    async fn ensure_image(&self, server_dir: &Path) -> Result<(), TestbenchError> {
        if self.docker.inspect_image(&self.limits.image).await.is_ok() {
            debug!(image = %self.limits.image, "Image found locally");
            return Ok(());
        }

        // Missing image: build it from the server directory's Dockerfile
        let dockerfile = server_dir.join("Dockerfile");
        if dockerfile.exists() {
            return self.build_image(&dockerfile).await;
        }

        Err(TestbenchError::Launch(format!(
            "Image '{}' not found and no Dockerfile in {}. Build it with: docker build -t {} .",
            self.limits.image,
            server_dir.display(),
            self.limits.image
        )))
    }

    /// Poll the target's liveness with bounded retries, separating "never
    /// became ready" from "crashed immediately".
    async fn wait_healthy(&self, base_url: &str) -> Result<(), TestbenchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| TestbenchError::Launch(format!("Health client build failed: {}", e)))?;

        let attempts = self.limits.health_wait.as_secs().max(1);
        for attempt in 0..attempts {
            if !self.is_running().await? {
                self.teardown().await;
                return Err(TestbenchError::Launch(
                    "Target crashed during startup (container exited)".into(),
                ));
            }

            // With networking disabled the port is not reachable from the
            // host; container liveness is the only observable health signal
            if self.limits.network_disabled {
                if attempt >= 2 {
                    return Ok(());
                }
            } else if client
                .get(base_url)
                .timeout(Duration::from_secs(2))
                .send()
                .await
                .is_ok()
            {
                info!(url = %base_url, "Sandbox target is healthy");
                return Ok(());
            }

            tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
        }

        self.teardown().await;
        Err(TestbenchError::Launch(format!(
            "Target never became ready within {}s",
            self.limits.health_wait.as_secs()
        )))
    }

    async fn is_running(&self) -> Result<bool, TestbenchError> {
        let inspect = self
            .docker
            .inspect_container(&self.limits.container_name, None)
            .await
            .map_err(|e| TestbenchError::Launch(format!("Failed to inspect container: {}", e)))?;

        Ok(inspect
            .state
            .and_then(|s| s.running)
            .unwrap_or(false))
    }

    pub(crate) fn docker(&self) -> &Docker {
        &self.docker
    }

    pub(crate) fn image(&self) -> &str {
        &self.limits.image
    }

    /// Stop and remove the isolation boundary. Safe to call more than once;
    /// only the first call does the work.
    pub async fn teardown(&self) {
        let id = self.container_id.lock().await.take();
        if id.is_none() {
            return;
        }

        if let Err(e) = self
            .docker
            .stop_container(&self.limits.container_name, Some(StopContainerOptions { t: 10 }))
            .await
        {
            debug!(error = %e, "Container stop failed (may already be stopped)");
        }

        if let Err(e) = self
            .docker
            .remove_container(
                &self.limits.container_name,
                Some(RemoveContainerOptions { force: true, ..Default::default() }),
            )
            .await
        {
            warn!(error = %e, "Failed to remove sandbox container");
        } else {
            info!(container = %self.limits.container_name, "Sandbox torn down");
        }
    }
}
