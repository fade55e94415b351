//! Katas as they come from the remote catalog, plus the filter that hides repositories which
//! aren't exercises.

pub mod github;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::KataError;

/// Repositories in the organisation that exist for administration, not practice.
const HIDDEN: [&str; 2] = [".github", "gokatas"];

/// One exercise repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Kata {
    pub name: String,
    #[serde(default)]
    pub ssh_url: String,
    #[serde(default)]
    pub html_url: String,
    pub clone_url: String,
    #[serde(rename = "stargazers_count", default)]
    pub stars: u32,
    /// Libraries or subjects the kata exercises.
    #[serde(default, deserialize_with = "null_as_default::deserialize")]
    pub topics: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default::deserialize")]
    pub description: String,
    /// Lines of source in the cloned tree. Zero until enriched.
    #[serde(skip)]
    pub lines: usize,
    /// Projection of the ledger, filled in by [crate::ledger::Ledger::merge].
    #[serde(skip)]
    pub completions: Vec<DateTime<Utc>>,
}

impl Kata {
    pub fn new(name: impl Into<String>, clone_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ssh_url: String::new(),
            html_url: String::new(),
            clone_url: clone_url.into(),
            stars: 0,
            topics: vec![],
            description: String::new(),
            lines: 0,
            completions: vec![],
        }
    }

    #[cfg(test)]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }

    #[cfg(test)]
    pub fn with_lines(self, lines: usize) -> Self {
        Self { lines, ..self }
    }

    #[cfg(test)]
    pub fn with_completions(self, completions: Vec<DateTime<Utc>>) -> Self {
        Self {
            completions,
            ..self
        }
    }
}

mod null_as_default {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }
}

/// Source of kata descriptors.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Kata>, KataError>;
}

pub fn is_visible(kata: &Kata) -> bool {
    !HIDDEN.contains(&kata.name.as_str())
}

/// Drops repositories that aren't exercises, keeping catalog order.
pub fn visible(katas: Vec<Kata>) -> Vec<Kata> {
    katas.into_iter().filter(is_visible).collect()
}
