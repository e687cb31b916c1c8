use crate::domain::models::repository::RepositoryInfo;
use anyhow::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Repository record as returned by the remote API. Every field may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepositoryRecord {
    pub stargazers_count: Option<u64>,
    pub language: Option<String>,
    pub topics: Option<Vec<String>>,
    pub description: Option<String>,
}

impl From<RepositoryRecord> for RepositoryInfo {
    fn from(record: RepositoryRecord) -> Self {
        Self {
            stars: record.stargazers_count.unwrap_or_default(),
            language: record.language.unwrap_or_default(),
            topics: record.topics.unwrap_or_default(),
            description: record.description.unwrap_or_default(),
        }
    }
}

/// Outcome of a single repository lookup.
#[derive(Debug)]
pub enum RepositoryLookup {
    Found(RepositoryRecord),
    /// Renamed, deleted or private.
    NotFound,
    /// The request was rejected by the rate limiter and may be retried.
    RateLimited { reset_at: Option<DateTime<Utc>> },
    Failed(Error),
}

#[async_trait]
pub trait GitHubApi {
    async fn get_repository(&self, owner: &str, name: &str) -> RepositoryLookup;
}
