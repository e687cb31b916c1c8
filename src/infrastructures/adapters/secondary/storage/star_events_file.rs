use crate::domain::models::growth::{GROWTH_PERIODS, GrowthMetrics, GrowthTable, StarWindow};
use crate::domain::models::repository::RepositoryIdentifier;
use crate::domain::repositories::star_events::StarEventSource;
use anyhow::{Context, Error};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

pub const DEFAULT_STAR_EVENTS_PATH: &str = "data/star-events.json";

/// Warehouse export of `WatchEvent` aggregates.
#[derive(Debug, Default, Deserialize)]
struct StarEventsExport {
    #[serde(default)]
    stars_last_year: BTreeMap<String, u64>,
    #[serde(default)]
    windows: Vec<StarWindow>,
}

/// Star history read from a JSON export of the analytics warehouse.
pub struct JsonStarEventSource {
    path: PathBuf,
}

impl JsonStarEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<StarEventsExport, Error> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }
}

fn parse_logged(repo_name: &str) -> Option<RepositoryIdentifier> {
    match repo_name.parse() {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping star events row");
            None
        }
    }
}

#[async_trait]
impl StarEventSource for JsonStarEventSource {
    #[tracing::instrument(name = "JsonStarEventSource::select_repositories", skip(self))]
    async fn select_repositories(
        &self,
        min_stars: u64,
    ) -> Result<Vec<RepositoryIdentifier>, Error> {
        let export = self.read().await?;
        let selected: Vec<_> = export
            .stars_last_year
            .iter()
            .filter(|&(_, &stars)| stars >= min_stars)
            .filter_map(|(name, _)| parse_logged(name))
            .collect();
        tracing::info!("Selected {} repositories", selected.len());
        Ok(selected)
    }

    #[tracing::instrument(
        name = "JsonStarEventSource::growths",
        skip(self, repositories),
        fields(repositories = repositories.len())
    )]
    async fn growths(&self, repositories: &[RepositoryIdentifier]) -> Result<GrowthTable, Error> {
        let export = self.read().await?;
        let wanted: HashSet<&RepositoryIdentifier> = repositories.iter().collect();

        let mut table: GrowthTable = repositories
            .iter()
            .map(|id| (id.clone(), GrowthMetrics::default()))
            .collect();

        for window in &export.windows {
            if !GROWTH_PERIODS.contains(&window.period_days) {
                continue;
            }
            let Some(id) = parse_logged(&window.repo_name) else {
                continue;
            };
            if !wanted.contains(&id) {
                continue;
            }
            let Some(growth) = window.growth() else {
                tracing::debug!(
                    repository = %id,
                    period_days = window.period_days,
                    "No stars before window"
                );
                continue;
            };
            table.entry(id).or_default().set(window.period_days, growth);
        }

        Ok(table)
    }
}
