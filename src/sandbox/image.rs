use std::path::Path;

use bollard::image::BuildImageOptions;
use futures::StreamExt;
use tracing::info;

use super::launcher::SandboxLauncher;
use crate::errors::TestbenchError;

impl SandboxLauncher {
    /// Build the runner image from a Dockerfile, streaming build output.
    pub async fn build_image(&self, dockerfile_path: &Path) -> Result<(), TestbenchError> {
        if !dockerfile_path.exists() {
            return Err(TestbenchError::Launch(format!(
                "Dockerfile not found: {}",
                dockerfile_path.display()
            )));
        }

        let context_dir = dockerfile_path
            .parent()
            .ok_or_else(|| TestbenchError::Launch("Invalid Dockerfile path".into()))?;

        info!(
            image = %self.image(),
            dockerfile = %dockerfile_path.display(),
            "Building runner image (this may take a while)..."
        );

        let mut archive = tar::Builder::new(Vec::new());
        archive
            .append_dir_all(".", context_dir)
            .map_err(|e| TestbenchError::Launch(format!("Failed to create build context: {}", e)))?;
        let context = archive
            .into_inner()
            .map_err(|e| TestbenchError::Launch(format!("Failed to finalize build context: {}", e)))?;

        let options = BuildImageOptions {
            dockerfile: dockerfile_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("Dockerfile"),
            t: self.image(),
            rm: true,
            ..Default::default()
        };

        let mut stream = self.docker().build_image(options, None, Some(context.into()));
        while let Some(result) = stream.next().await {
            match result {
                Ok(output) => {
                    if let Some(line) = output.stream {
                        print!("{}", line);
                    }
                }
                Err(e) => {
                    return Err(TestbenchError::Launch(format!("Build failed: {}", e)));
                }
            }
        }

        info!("Runner image built successfully");
        Ok(())
    }
}
