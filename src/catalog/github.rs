use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::KataError;

use super::{CatalogClient, Kata};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lists the repositories of a GitHub organisation.
pub struct GithubCatalog {
    url: String,
    http_client: reqwest::Client,
}

impl GithubCatalog {
    pub fn new(organisation: &str) -> Self {
        Self::with_url(format!(
            "https://api.github.com/orgs/{organisation}/repos?per_page=100"
        ))
    }

    pub fn with_url(url: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { url, http_client }
    }

    fn error(&self, reason: impl ToString) -> KataError {
        KataError::Catalog {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl CatalogClient for GithubCatalog {
    async fn fetch(&self) -> Result<Vec<Kata>, KataError> {
        debug!(url = %self.url, "Fetching catalog");

        let response = self
            .http_client
            .get(&self.url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| self.error(e))?;

        if !response.status().is_success() {
            return Err(self.error(format!("HTTP {}", response.status())));
        }

        let katas: Vec<Kata> = response.json().await.map_err(|e| self.error(e))?;
        info!("Fetched {} repositories", katas.len());
        Ok(katas)
    }
}
