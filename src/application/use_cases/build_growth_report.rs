use crate::application::use_cases::collect_repository_info::{
    CollectRepositoryInfoUseCase, CollectRepositoryInfoUseCaseInput,
};
use crate::domain::models::growth::{GrowthTable, ReportRow};
use crate::domain::models::repository::{RepositoryIdentifier, ResultMap};
use crate::domain::repositories::star_events::StarEventSource;
use anyhow::{Context, Error};
use async_trait::async_trait;
use std::sync::Arc;

/// Minimum stars over the last year for a repository to be reported
pub const DEFAULT_MIN_STARS_LAST_YEAR: u64 = 1000;

#[derive(Debug, Clone)]
pub struct BuildGrowthReportUseCaseInput {
    pub min_stars_last_year: u64,
    /// Restricts the report to these repositories instead of selecting them by stars.
    pub repositories: Option<Vec<RepositoryIdentifier>>,
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct BuildGrowthReportUseCaseOutput {
    pub rows: Vec<ReportRow>,
}

#[async_trait]
pub trait BuildGrowthReportUseCase {
    async fn execute(
        &self,
        input: BuildGrowthReportUseCaseInput,
    ) -> Result<BuildGrowthReportUseCaseOutput, Error>;
}

pub struct BuildGrowthReportInteractor<S, C>
where
    S: StarEventSource + Send + Sync + 'static,
    C: CollectRepositoryInfoUseCase + Send + Sync + 'static,
{
    star_events: Arc<S>,
    collect: Arc<C>,
}

impl<S, C> BuildGrowthReportInteractor<S, C>
where
    S: StarEventSource + Send + Sync + 'static,
    C: CollectRepositoryInfoUseCase + Send + Sync + 'static,
{
    pub fn new(star_events: Arc<S>, collect: Arc<C>) -> Self {
        Self { star_events, collect }
    }
}

#[async_trait]
impl<S, C> BuildGrowthReportUseCase for BuildGrowthReportInteractor<S, C>
where
    S: StarEventSource + Send + Sync + 'static,
    C: CollectRepositoryInfoUseCase + Send + Sync + 'static,
{
    #[tracing::instrument(name = "BuildGrowthReportInteractor::execute", skip(self, input))]
    async fn execute(
        &self,
        input: BuildGrowthReportUseCaseInput,
    ) -> Result<BuildGrowthReportUseCaseOutput, Error> {
        let explicit = input.repositories.is_some();
        let repositories = match input.repositories {
            Some(repositories) => repositories,
            None => self
                .star_events
                .select_repositories(input.min_stars_last_year)
                .await
                .context("Failed to select repositories")?,
        };
        tracing::info!("Reporting on {} repositories", repositories.len());

        // Explicitly named repositories are still reported without star history.
        let growths = match self.star_events.growths(&repositories).await {
            Ok(growths) => growths,
            Err(e) if explicit => {
                tracing::warn!(error = %format!("{e:#}"), "No growth metrics available");
                GrowthTable::new()
            }
            Err(e) => return Err(e.context("Failed to compute growth metrics")),
        };

        let collected = self
            .collect
            .execute(CollectRepositoryInfoUseCaseInput {
                repositories: repositories.clone(),
                concurrency: input.concurrency,
            })
            .await
            .context("Failed to collect repository metadata")?;
        tracing::info!(
            fetched = collected.fetched,
            cached = collected.cached,
            "Repository metadata ready"
        );

        Ok(BuildGrowthReportUseCaseOutput {
            rows: build_rows(&repositories, &growths, &collected.results),
        })
    }
}

/// One row per distinct repository, ordered by name.
pub fn build_rows(
    repositories: &[RepositoryIdentifier],
    growths: &GrowthTable,
    infos: &ResultMap,
) -> Vec<ReportRow> {
    let mut repositories: Vec<_> = repositories.iter().collect();
    repositories.sort();
    repositories.dedup();

    repositories
        .into_iter()
        .map(|id| ReportRow::new(id, growths.get(id).copied().unwrap_or_default(), infos.get(id)))
        .collect()
}
