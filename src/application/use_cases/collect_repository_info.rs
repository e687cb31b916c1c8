use crate::application::use_cases::fetch_repository_info::{FetchOutcome, RepositoryInfoFetcher};
use crate::domain::external_apis::github::GitHubApi;
use crate::domain::models::repository::{RepositoryIdentifier, RepositoryInfo, ResultMap};
use crate::domain::repositories::result_cache::ResultCache;
use anyhow::{Error, bail, ensure};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

type JobReceiver = Arc<Mutex<mpsc::Receiver<RepositoryIdentifier>>>;
type ResultSender = mpsc::Sender<(RepositoryIdentifier, FetchOutcome)>;

/// Worker loop: takes repositories off the shared job queue until it is closed
/// and drained, and reports one result per repository.
///
/// A cancelled lookup is not reported; the worker stops instead.
pub async fn run_worker<G: GitHubApi + Send + Sync + 'static>(
    worker_id: usize,
    fetcher: Arc<RepositoryInfoFetcher<G>>,
    jobs: JobReceiver,
    results: ResultSender,
) {
    tracing::trace!(worker_id, "Worker starting");
    let cancel = fetcher.cancellation_token().clone();
    let mut processed = 0_usize;

    loop {
        let job = {
            let mut jobs = jobs.lock().await;
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(worker_id, processed, "Worker cancelled");
                    break;
                }
                job = jobs.recv() => job,
            }
        };

        let Some(id) = job else {
            break;
        };

        let outcome = fetcher.fetch_outcome(&id).await;
        if outcome == FetchOutcome::Cancelled {
            tracing::debug!(worker_id, processed, repository = %id, "Worker cancelled mid-lookup");
            break;
        }
        if results.send((id, outcome)).await.is_err() {
            tracing::debug!(worker_id, "Collector went away");
            break;
        }
        processed += 1;
    }

    tracing::trace!(worker_id, processed, "Worker finished");
}

/// Results of a completed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    /// One entry per distinct repository.
    pub results: ResultMap,
    /// Repositories that stayed rate limited; their entries are sentinels.
    pub exhausted: HashSet<RepositoryIdentifier>,
}

/// Fetches metadata for every repository using `concurrency` workers.
///
/// Duplicate identifiers are collapsed, so each repository is looked up once and
/// the returned map holds exactly one entry per distinct input. The map is only
/// written by the calling task.
pub async fn fetch_all<G: GitHubApi + Send + Sync + 'static>(
    fetcher: Arc<RepositoryInfoFetcher<G>>,
    identifiers: Vec<RepositoryIdentifier>,
    concurrency: usize,
) -> Result<ResultMap, Error> {
    Ok(collect_all(fetcher, identifiers, concurrency).await?.results)
}

/// Same as [`fetch_all`], additionally reporting which repositories gave up on
/// the rate limit. Fails if the batch is cancelled before every repository
/// has a result.
#[tracing::instrument(
    name = "collect_all",
    skip(fetcher, identifiers),
    fields(repositories = identifiers.len())
)]
pub async fn collect_all<G: GitHubApi + Send + Sync + 'static>(
    fetcher: Arc<RepositoryInfoFetcher<G>>,
    identifiers: Vec<RepositoryIdentifier>,
    concurrency: usize,
) -> Result<Collection, Error> {
    ensure!(concurrency > 0, "concurrency must be at least 1");

    let mut seen = HashSet::with_capacity(identifiers.len());
    let identifiers: Vec<_> = identifiers
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();
    let total = identifiers.len();
    if total == 0 {
        return Ok(Collection::default());
    }

    let (job_tx, job_rx) = mpsc::channel(total);
    let (result_tx, mut result_rx) = mpsc::channel(total);
    let job_rx = Arc::new(Mutex::new(job_rx));

    let mut workers = JoinSet::new();
    for worker_id in 0..concurrency {
        workers.spawn(run_worker(
            worker_id,
            Arc::clone(&fetcher),
            Arc::clone(&job_rx),
            result_tx.clone(),
        ));
    }
    // Only workers hold senders, so the channel reports closure if they all stop early.
    drop(result_tx);

    for id in identifiers {
        if job_tx.send(id).await.is_err() {
            bail!("job queue closed before all repositories were queued");
        }
    }
    drop(job_tx);
    tracing::info!(total, concurrency, "Queued repositories");

    let mut collection = Collection {
        results: ResultMap::with_capacity(total),
        exhausted: HashSet::new(),
    };
    while collection.results.len() < total {
        let Some((id, outcome)) = result_rx.recv().await else {
            if fetcher.cancellation_token().is_cancelled() {
                bail!(
                    "cancelled after collecting {} of {} repositories",
                    collection.results.len(),
                    total
                );
            }
            bail!(
                "workers stopped after {} of {} repositories",
                collection.results.len(),
                total
            );
        };
        if outcome == FetchOutcome::Exhausted {
            collection.exhausted.insert(id.clone());
        }
        if collection.results.insert(id.clone(), outcome.into_info()).is_some() {
            tracing::error!(repository = %id, "Repository was fetched twice");
        }
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Worker task failed");
        }
    }

    tracing::info!(
        collected = collection.results.len(),
        exhausted = collection.exhausted.len(),
        "Collected repository metadata"
    );
    Ok(collection)
}

#[derive(Debug, Clone, Default)]
pub struct CollectRepositoryInfoUseCaseInput {
    pub repositories: Vec<RepositoryIdentifier>,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CollectRepositoryInfoUseCaseOutput {
    /// Cached and freshly fetched metadata together.
    pub results: ResultMap,
    pub fetched: usize,
    pub cached: usize,
}

#[async_trait]
pub trait CollectRepositoryInfoUseCase {
    async fn execute(
        &self,
        input: CollectRepositoryInfoUseCaseInput,
    ) -> Result<CollectRepositoryInfoUseCaseOutput, Error>;
}

pub struct CollectRepositoryInfoInteractor<G: GitHubApi + Send + Sync + 'static> {
    fetcher: Arc<RepositoryInfoFetcher<G>>,
    cache: Option<Arc<dyn ResultCache + Send + Sync>>,
}

impl<G: GitHubApi + Send + Sync + 'static> CollectRepositoryInfoInteractor<G> {
    pub fn new(fetcher: Arc<RepositoryInfoFetcher<G>>) -> Self {
        Self {
            fetcher,
            cache: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ResultCache + Send + Sync>) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[async_trait]
impl<G: GitHubApi + Send + Sync + 'static> CollectRepositoryInfoUseCase
    for CollectRepositoryInfoInteractor<G>
{
    async fn execute(
        &self,
        input: CollectRepositoryInfoUseCaseInput,
    ) -> Result<CollectRepositoryInfoUseCaseOutput, Error> {
        let Some(cache) = &self.cache else {
            let results =
                fetch_all(Arc::clone(&self.fetcher), input.repositories, input.concurrency)
                    .await?;
            return Ok(CollectRepositoryInfoUseCaseOutput {
                fetched: results.len(),
                cached: 0,
                results,
            });
        };

        let mut known = cache.load().await;
        tracing::info!(entries = known.len(), "Loaded result cache");

        let (cached, pending): (Vec<_>, Vec<_>) = input
            .repositories
            .into_iter()
            .partition(|id| known.contains_key(id));
        for id in &cached {
            tracing::debug!(repository = %id, "Skipping cached repository");
        }

        let fresh =
            collect_all(Arc::clone(&self.fetcher), pending, input.concurrency).await?;
        let fetched = fresh.results.len();

        // Rate-limited repositories are retried on the next run.
        let mut storable = known.clone();
        storable.extend(
            fresh
                .results
                .iter()
                .filter(|(id, _)| !fresh.exhausted.contains(*id))
                .map(|(id, info)| (id.clone(), info.clone())),
        );
        cache.store(&storable).await;
        known.extend(fresh.results);

        let cached = cached.into_iter().collect::<HashSet<_>>().len();
        Ok(CollectRepositoryInfoUseCaseOutput {
            results: known,
            fetched,
            cached,
        })
    }
}
