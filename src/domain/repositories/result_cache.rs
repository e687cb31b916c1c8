use crate::domain::models::repository::ResultMap;
use async_trait::async_trait;

/// Persistent store of previously fetched repository metadata.
///
/// Both operations are best effort: failures are logged by the implementation
/// and never reach the caller.
#[async_trait]
pub trait ResultCache {
    async fn load(&self) -> ResultMap;
    async fn store(&self, results: &ResultMap);
}
