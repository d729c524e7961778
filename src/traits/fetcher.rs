use async_trait::async_trait;

use crate::errors::FetchError;
use crate::models::{EntityKey, RawBundle};

/// Core trait for fetching the raw state of one entity
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    /// Perform one complete refresh for `key`.
    ///
    /// Either every endpoint of the entity succeeded and the whole bundle is
    /// returned, or the fetch fails as a unit.
    async fn fetch(&self, key: &EntityKey) -> Result<RawBundle, FetchError>;
}
