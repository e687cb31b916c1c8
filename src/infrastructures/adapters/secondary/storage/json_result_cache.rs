use crate::domain::models::repository::{RepositoryIdentifier, RepositoryInfo, ResultMap};
use crate::domain::repositories::result_cache::ResultCache;
use anyhow::{Context, Error};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_CACHE_PATH: &str = "data/repo-info.json";

/// Result cache kept as one JSON object keyed by `owner/name`.
pub struct JsonFileResultCache {
    path: PathBuf,
}

impl JsonFileResultCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<ResultMap, Error> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let raw: HashMap<String, RepositoryInfo> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;

        Ok(raw
            .into_iter()
            .filter_map(|(key, info)| match key.parse::<RepositoryIdentifier>() {
                Ok(id) => Some((id, info)),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping cache entry");
                    None
                }
            })
            .collect())
    }

    async fn write(&self, results: &ResultMap) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let bytes = serde_json::to_vec(results).context("Failed to serialize result cache")?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl ResultCache for JsonFileResultCache {
    #[tracing::instrument(
        name = "JsonFileResultCache::load",
        skip(self),
        fields(path = %self.path.display())
    )]
    async fn load(&self) -> ResultMap {
        match self.read().await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "Starting with an empty result cache");
                ResultMap::new()
            }
        }
    }

    #[tracing::instrument(
        name = "JsonFileResultCache::store",
        skip(self, results),
        fields(path = %self.path.display(), entries = results.len())
    )]
    async fn store(&self, results: &ResultMap) {
        if let Err(e) = self.write(results).await {
            tracing::error!(error = %format!("{e:#}"), "Failed to store result cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> anyhow::Result<ResultMap> {
        Ok([
            (
                "a/b".parse::<RepositoryIdentifier>()?,
                RepositoryInfo {
                    stars: 10,
                    language: "Go".to_string(),
                    topics: vec!["cli".to_string()],
                    description: "tool".to_string(),
                },
            ),
            ("c/d".parse::<RepositoryIdentifier>()?, RepositoryInfo::sentinel()),
        ]
        .into_iter()
        .collect())
    }

    #[tokio::test]
    async fn test_store_then_load() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = JsonFileResultCache::new(dir.path().join("nested/repo-info.json"));

        cache.store(&sample()?).await;
        let loaded = cache.load().await;

        assert_eq!(loaded, sample()?);
        assert!(!dir.path().join("nested/repo-info.json.tmp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = JsonFileResultCache::new(dir.path().join("absent.json"));

        assert!(cache.load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("repo-info.json");
        std::fs::write(&path, "{not json")?;

        assert!(JsonFileResultCache::new(&path).load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_keys_are_dropped() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("repo-info.json");
        std::fs::write(
            &path,
            concat!(
                r#"{"a/b":{"Stars":3,"Language":"C","Topics":null,"Description":""},"#,
                r#""broken":{"Stars":1,"Language":"","Topics":[],"Description":""}}"#,
            ),
        )?;

        let loaded = JsonFileResultCache::new(&path).load().await;

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(&"a/b".parse::<RepositoryIdentifier>()?).map(|i| i.stars), Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn test_unwritable_location_does_not_fail() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "")?;
        let cache = JsonFileResultCache::new(blocker.join("repo-info.json"));

        cache.store(&sample()?).await;

        assert!(cache.load().await.is_empty());
        Ok(())
    }
}
