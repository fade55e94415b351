use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::trace;

use super::EnrichmentError;

/// Measures how much code lives in a directory.
#[async_trait]
pub trait LineCounter: Send + Sync {
    async fn count(&self, dir: &Path) -> Result<usize, EnrichmentError>;
}

/// Counts lines in every file with a given extension, e.g. `go`. A file has one more line than it
/// has newline characters, so a trailing newline counts as an extra (empty) line.
pub struct ExtensionLineCounter {
    extension: String,
}

impl ExtensionLineCounter {
    pub fn new(extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.to_string_lossy() == self.extension.as_str())
    }
}

fn count_error(path: &Path) -> impl FnOnce(std::io::Error) -> EnrichmentError + '_ {
    move |source| EnrichmentError::Count {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl LineCounter for ExtensionLineCounter {
    async fn count(&self, dir: &Path) -> Result<usize, EnrichmentError> {
        let mut pending: Vec<PathBuf> = vec![dir.to_path_buf()];
        let mut lines = 0;

        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .map_err(count_error(&current))?;
            while let Some(entry) = entries.next_entry().await.map_err(count_error(&current))? {
                let path = entry.path();
                // DirEntry::file_type doesn't follow symlinks, so links are skipped entirely.
                let file_type = entry.file_type().await.map_err(count_error(&path))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && self.matches(&path) {
                    let content = tokio::fs::read(&path).await.map_err(count_error(&path))?;
                    let file_lines = content.iter().filter(|b| **b == b'\n').count() + 1;
                    trace!("{path:?} has {file_lines} lines");
                    lines += file_lines;
                }
            }
        }

        Ok(lines)
    }
}
