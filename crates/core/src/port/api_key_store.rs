// API Key Store Port (Interface)

use crate::domain::{ApiKey, NewApiKey};
use crate::error::Result;
use async_trait::async_trait;

/// Store interface for api keys. Lookup is by the opaque token itself; keys
/// are never listed or deleted through the coordinator.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn insert(&self, new: NewApiKey) -> Result<ApiKey>;

    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKey>>;
}
