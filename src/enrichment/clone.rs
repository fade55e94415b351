use std::{path::Path, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::EnrichmentError;

/// Materializes a repository into a directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Cloner: Send + Sync {
    async fn clone_into(&self, locator: &str, destination: &Path) -> Result<(), EnrichmentError>;
}

/// Shells out to `git clone`. Only the tip is fetched since history isn't measured.
pub struct GitCloner;

#[async_trait]
impl Cloner for GitCloner {
    async fn clone_into(&self, locator: &str, destination: &Path) -> Result<(), EnrichmentError> {
        debug!("Cloning {locator} into {destination:?}");
        let clone_error = |reason: String| EnrichmentError::Clone {
            locator: locator.to_string(),
            reason,
        };

        // A timed out clone drops this future, and with it the child.
        let output = Command::new("git")
            .args(["clone", "--quiet", "--depth", "1", locator])
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| clone_error(format!("executing git: {e}")))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| format!("git exited with {}", output.status));
        Err(clone_error(reason))
    }
}
