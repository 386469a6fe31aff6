//! Object storage port for uploaded media.

use async_trait::async_trait;

use super::ProviderError;

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
}

#[async_trait]
pub trait ObjectStoragePort: Send + Sync {
    /// Short provider name recorded on each media row (`local`, `remote`).
    fn provider(&self) -> &str;

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, ProviderError>;

    /// Remove an object. Removing a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), ProviderError>;
}
