use crate::domain::external_apis::github::{GitHubApi, RepositoryLookup};
use crate::domain::models::repository::{RepositoryIdentifier, RepositoryInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Wait after a rate-limited request before trying it again (seconds)
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 60;

/// Attempts per repository before a rate-limited lookup is given up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// How rate-limited lookups are retried.
///
/// The cooldown is flat: the limiting window is fixed-size, so waiting out one
/// window is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub cooldown: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECONDS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// How a single lookup ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Found, not found, or failed. Not-found and failures carry the sentinel.
    Complete(RepositoryInfo),
    /// Still rate limited after the last allowed attempt.
    Exhausted,
    /// The cancellation token fired before the lookup finished.
    Cancelled,
}

impl FetchOutcome {
    pub fn into_info(self) -> RepositoryInfo {
        match self {
            Self::Complete(info) => info,
            Self::Exhausted | Self::Cancelled => RepositoryInfo::sentinel(),
        }
    }
}

/// Looks up metadata for one repository at a time.
///
/// A lookup never fails from the caller's point of view: anything other than a
/// found repository turns into [`RepositoryInfo::sentinel`].
pub struct RepositoryInfoFetcher<G: GitHubApi + Send + Sync + 'static> {
    github_api: Arc<G>,
    retry_policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<G: GitHubApi + Send + Sync + 'static> RepositoryInfoFetcher<G> {
    pub fn new(github_api: Arc<G>, retry_policy: RetryPolicy) -> Self {
        Self {
            github_api,
            retry_policy,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn fetch(&self, id: &RepositoryIdentifier) -> RepositoryInfo {
        self.fetch_outcome(id).await.into_info()
    }

    #[tracing::instrument(
        name = "RepositoryInfoFetcher::fetch",
        skip(self, id),
        fields(repository = %id)
    )]
    pub async fn fetch_outcome(&self, id: &RepositoryIdentifier) -> FetchOutcome {
        let max_attempts = self.retry_policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let lookup = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::warn!("Lookup cancelled");
                    return FetchOutcome::Cancelled;
                }
                lookup = self.github_api.get_repository(id.owner(), id.name()) => lookup,
            };

            match lookup {
                RepositoryLookup::Found(record) => {
                    tracing::debug!(attempt, "Fetched repository");
                    return FetchOutcome::Complete(record.into());
                }
                RepositoryLookup::NotFound => {
                    tracing::info!("Repository not found");
                    return FetchOutcome::Complete(RepositoryInfo::sentinel());
                }
                RepositoryLookup::Failed(e) => {
                    tracing::warn!(
                        error = %format!("{e:#}"),
                        "Lookup failed, recording empty metadata"
                    );
                    return FetchOutcome::Complete(RepositoryInfo::sentinel());
                }
                RepositoryLookup::RateLimited { reset_at } => {
                    if attempt == max_attempts {
                        break;
                    }
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        reset_at = ?reset_at,
                        "Hit rate limit, sleeping {:?}",
                        self.retry_policy.cooldown
                    );
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => {
                            tracing::warn!("Lookup cancelled during rate limit cooldown");
                            return FetchOutcome::Cancelled;
                        }
                        () = tokio::time::sleep(self.retry_policy.cooldown) => {}
                    }
                }
            }
        }

        tracing::error!(max_attempts, "Still rate limited, giving up on repository");
        FetchOutcome::Exhausted
    }
}
