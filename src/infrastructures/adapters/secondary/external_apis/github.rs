use crate::domain::external_apis::github::{GitHubApi, RepositoryLookup, RepositoryRecord};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "repo-growth-rust-app";

pub struct GitHubApiAdapter {
    client: Client,
    base_url: String,
    github_token: String,
}

impl GitHubApiAdapter {
    pub fn new(base_url: String, github_token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            github_token,
        }
    }
}

/// GitHub signals an exhausted primary limit with 403 and a zero remaining count,
/// and secondary limits with 403 or 429 plus `retry-after`.
fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    exhausted || headers.contains_key(RETRY_AFTER)
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let reset = headers.get("x-ratelimit-reset")?.to_str().ok()?.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(reset, 0)
}

#[async_trait]
impl GitHubApi for GitHubApiAdapter {
    #[tracing::instrument(name = "GitHubApiAdapter::get_repository", skip(self))]
    async fn get_repository(&self, owner: &str, name: &str) -> RepositoryLookup {
        let url = format!("{}/repos/{}/{}", self.base_url, owner, name);

        let response = match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.github_token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .with_context(|| format!("Failed to send request for {owner}/{name}"))
        {
            Ok(response) => response,
            Err(e) => return RepositoryLookup::Failed(e),
        };

        let status = response.status();
        if status.is_success() {
            // A null body means the repository is not visible to us.
            return match response
                .json::<Option<RepositoryRecord>>()
                .await
                .with_context(|| format!("Failed to deserialize repository {owner}/{name}"))
            {
                Ok(Some(record)) => RepositoryLookup::Found(record),
                Ok(None) => RepositoryLookup::NotFound,
                Err(e) => RepositoryLookup::Failed(e),
            };
        }

        if is_rate_limited(status, response.headers()) {
            return RepositoryLookup::RateLimited {
                reset_at: rate_limit_reset(response.headers()),
            };
        }

        match status {
            StatusCode::NOT_FOUND | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
                RepositoryLookup::NotFound
            }
            _ => RepositoryLookup::Failed(anyhow!(
                "GitHub API returned {status} for {owner}/{name}"
            )),
        }
    }
}
