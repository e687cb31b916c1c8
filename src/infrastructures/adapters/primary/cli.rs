use crate::application::use_cases::build_growth_report::{
    BuildGrowthReportInteractor, BuildGrowthReportUseCase, BuildGrowthReportUseCaseInput,
};
use crate::application::use_cases::collect_repository_info::CollectRepositoryInfoInteractor;
use crate::application::use_cases::fetch_repository_info::RepositoryInfoFetcher;
use crate::infrastructures::adapters::secondary::external_apis::github::GitHubApiAdapter;
use crate::infrastructures::adapters::secondary::storage::json_result_cache::JsonFileResultCache;
use crate::infrastructures::adapters::secondary::storage::report_file::JsonReportWriter;
use crate::infrastructures::adapters::secondary::storage::star_events_file::JsonStarEventSource;
use crate::infrastructures::config::AppConfig;
use anyhow::{Context, Error};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builds the report described by `config` and writes it to the output file.
///
/// Cancelling `cancel` stops in-flight lookups; the report is then not written.
#[tracing::instrument(name = "run", skip_all)]
pub async fn run(config: AppConfig, cancel: CancellationToken) -> Result<(), Error> {
    let github_api = Arc::new(GitHubApiAdapter::new(config.github_api_url, config.github_token));
    let fetcher = Arc::new(
        RepositoryInfoFetcher::new(github_api, config.retry_policy).with_cancellation(cancel),
    );

    let mut collect = CollectRepositoryInfoInteractor::new(fetcher);
    if let Some(cache_path) = config.cache_path {
        tracing::info!(path = %cache_path.display(), "Using result cache");
        collect = collect.with_cache(Arc::new(JsonFileResultCache::new(cache_path)));
    }

    let report = BuildGrowthReportInteractor::new(
        Arc::new(JsonStarEventSource::new(config.star_events_path)),
        Arc::new(collect),
    );
    let output = report
        .execute(BuildGrowthReportUseCaseInput {
            min_stars_last_year: config.min_stars_last_year,
            repositories: config.repositories,
            concurrency: config.concurrency,
        })
        .await
        .context("Failed to build growth report")?;

    JsonReportWriter::new(config.output_path)
        .write(&output.rows)
        .await
        .context("Failed to write growth report")?;

    tracing::info!("Wrote {} report rows", output.rows.len());
    Ok(())
}
