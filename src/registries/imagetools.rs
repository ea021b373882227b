//! Manifest-level image copies through `docker buildx imagetools`

#[cfg(test)]
use mockall::automock;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::RegistryError;

/// Copies an image manifest to one or more target references without
/// touching its layers
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ImageCopier: Send + Sync {
    /// Points every fully qualified reference in `targets` at `source_ref`
    async fn create(&self, source_ref: &str, targets: &[String]) -> Result<(), RegistryError>;
}

/// Runs `docker buildx imagetools create -t <target>... <source>`
pub struct BuildxImageTools {
    program: String,
}

impl BuildxImageTools {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Use a different docker-compatible executable
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Default for BuildxImageTools {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments for `imagetools create`, one `-t` per target
fn create_args(source_ref: &str, targets: &[String]) -> Vec<String> {
    let mut args = vec![
        "buildx".to_string(),
        "imagetools".to_string(),
        "create".to_string(),
    ];
    for target in targets {
        args.push("-t".to_string());
        args.push(target.clone());
    }
    args.push(source_ref.to_string());
    args
}

#[async_trait::async_trait]
impl ImageCopier for BuildxImageTools {
    async fn create(&self, source_ref: &str, targets: &[String]) -> Result<(), RegistryError> {
        let args = create_args(source_ref, targets);
        debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| RegistryError::Copy(format!("failed to run {}: {}", self.program, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        warn!("imagetools create {} failed: {}", source_ref, message);

        Err(RegistryError::Copy(if message.is_empty() {
            format!("{} exited with {}", self.program, output.status)
        } else {
            message
        }))
    }
}
