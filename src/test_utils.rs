#![cfg(test)]

use crate::domain::external_apis::github::{GitHubApi, RepositoryLookup, RepositoryRecord};
use crate::domain::models::repository::RepositoryIdentifier;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
pub enum Scripted {
    Found(RepositoryRecord),
    NotFound,
    RateLimited,
    Failed(&'static str),
}

/// Deterministic in-memory GitHub API.
///
/// Each repository replays its script in order; the last entry repeats forever.
/// Repositories without a script are reported as not found.
#[derive(Debug, Default)]
pub struct ScriptedGitHubApi {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGitHubApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, full_name: &str, outcomes: Vec<Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(full_name.to_string(), outcomes.into());
        self
    }

    pub fn calls(&self, full_name: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(full_name)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, full_name: &str) -> Option<Scripted> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(full_name.to_string())
            .or_default() += 1;

        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        let script = scripts.get_mut(full_name)?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

#[async_trait]
impl GitHubApi for ScriptedGitHubApi {
    async fn get_repository(&self, owner: &str, name: &str) -> RepositoryLookup {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let outcome = self.next_outcome(&format!("{owner}/{name}"));
        // Give other workers a chance to overlap with this request.
        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match outcome {
            Some(Scripted::Found(record)) => RepositoryLookup::Found(record),
            Some(Scripted::NotFound) | None => RepositoryLookup::NotFound,
            Some(Scripted::RateLimited) => RepositoryLookup::RateLimited { reset_at: None },
            Some(Scripted::Failed(message)) => RepositoryLookup::Failed(anyhow::anyhow!(message)),
        }
    }
}

pub fn record(stars: u64, language: &str) -> RepositoryRecord {
    RepositoryRecord {
        stargazers_count: Some(stars),
        language: Some(language.to_string()),
        topics: None,
        description: None,
    }
}

pub fn ids(names: &[&str]) -> Vec<RepositoryIdentifier> {
    names
        .iter()
        .filter_map(|name| name.parse().ok())
        .collect()
}
