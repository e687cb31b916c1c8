use crate::domain::models::growth::GrowthTable;
use crate::domain::models::repository::RepositoryIdentifier;
use anyhow::Error;
use async_trait::async_trait;

/// Source of repository star history, usually exported from an analytics warehouse.
#[async_trait]
pub trait StarEventSource {
    /// Repositories that received at least `min_stars` stars over the last year.
    async fn select_repositories(&self, min_stars: u64) -> Result<Vec<RepositoryIdentifier>, Error>;

    /// Growth metrics for the given repositories. Repositories without usable
    /// history for a window keep a zero growth for it.
    async fn growths(&self, repositories: &[RepositoryIdentifier]) -> Result<GrowthTable, Error>;
}
