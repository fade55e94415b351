//! Enrichment clones every kata into a throwaway workspace and measures it.
//!
//! Katas are processed concurrently, but never more than
//! [EnrichmentConfig::concurrency] at a time, and each one gets its own deadline. A kata that
//! fails is returned as a [FailedEnrichment] next to the ones that succeeded, so a single broken
//! repository doesn't hide the rest.

pub mod clone;
pub mod lines;

use std::{path::PathBuf, time::Duration};

use futures::{stream, StreamExt};
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::catalog::Kata;

use clone::Cloner;
use lines::LineCounter;

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("creating workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("executing 'git clone {locator}': {reason}")]
    Clone { locator: String, reason: String },

    #[error("counting lines in {path:?}: {source}")]
    Count {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("gave up after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug)]
pub struct FailedEnrichment {
    pub kata: Kata,
    pub error: EnrichmentError,
}

pub type EnrichmentOutcome = Result<Kata, FailedEnrichment>;

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub concurrency: usize,
    pub task_timeout: Duration,
    /// Where workspaces are created. The system temp directory when absent.
    pub workspace_root: Option<PathBuf>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            workspace_root: None,
        }
    }
}

pub struct Enricher {
    cloner: Box<dyn Cloner>,
    counter: Box<dyn LineCounter>,
    config: EnrichmentConfig,
}

impl Enricher {
    pub fn new(
        cloner: Box<dyn Cloner>,
        counter: Box<dyn LineCounter>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            cloner,
            counter,
            config,
        }
    }

    /// Returns one outcome per kata, in the same order as `katas`.
    pub async fn enrich_all(&self, katas: Vec<Kata>) -> Vec<EnrichmentOutcome> {
        let total = katas.len();
        let outcomes = stream::iter(katas)
            .map(|kata| self.enrich(kata))
            .buffered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let failed = outcomes.iter().filter(|v| v.is_err()).count();
        info!("Enriched {} of {total} katas", total - failed);
        outcomes
    }

    #[instrument(skip_all, fields(kata = %kata.name))]
    async fn enrich(&self, mut kata: Kata) -> EnrichmentOutcome {
        let deadline = self.config.task_timeout;
        let error = match tokio::time::timeout(deadline, self.measure(&kata)).await {
            Ok(Ok(lines)) => {
                debug!("{} has {lines} lines", kata.name);
                kata.lines = lines;
                return Ok(kata);
            }
            Ok(Err(error)) => error,
            Err(_) => EnrichmentError::Timeout(deadline),
        };
        warn!("Failed to enrich {}: {error}", kata.name);
        Err(FailedEnrichment { kata, error })
    }

    async fn measure(&self, kata: &Kata) -> Result<usize, EnrichmentError> {
        // Removed when dropped, whichever way this function exits.
        let workspace = self.workspace().map_err(EnrichmentError::Workspace)?;
        self.cloner
            .clone_into(&kata.clone_url, workspace.path())
            .await?;
        self.counter.count(workspace.path()).await
    }

    fn workspace(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("kata");
        match &self.config.workspace_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

/// Splits outcomes into enriched katas and failures, keeping order within each.
pub fn partition(outcomes: Vec<EnrichmentOutcome>) -> (Vec<Kata>, Vec<FailedEnrichment>) {
    let mut enriched = Vec::with_capacity(outcomes.len());
    let mut failed = vec![];
    for outcome in outcomes {
        match outcome {
            Ok(kata) => enriched.push(kata),
            Err(failure) => failed.push(failure),
        }
    }
    (enriched, failed)
}
