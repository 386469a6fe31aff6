use std::sync::Arc;

use async_trait::async_trait;
use mercato_core::{ObjectStoragePort, ProviderError, StoredObject};
use tracing::debug;

use super::check_key;
use crate::error::ProviderHttpError;
use crate::http::{HttpBackend, HttpRequest, Method, endpoint};

/// HTTP object store: `PUT {base}/{key}` with the raw bytes, `DELETE` to
/// remove. Objects are publicly readable at the same URL.
pub struct RemoteStorage {
    backend: Arc<dyn HttpBackend>,
    base_url: String,
    token: Option<String>,
}

impl RemoteStorage {
    pub fn new(backend: Arc<dyn HttpBackend>, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            backend,
            base_url: base_url.into(),
            token,
        }
    }
}

#[async_trait]
impl ObjectStoragePort for RemoteStorage {
    fn provider(&self) -> &str {
        "remote"
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, ProviderError> {
        check_key(key)?;
        let url = endpoint(&self.base_url, key)?;
        let request = HttpRequest::new(Method::Put, url.clone())
            .bearer(self.token.as_deref())
            .bytes(bytes, content_type);
        self.backend.send(&request).await?;
        debug!(url = %url, size = bytes.len(), "Uploaded object");
        Ok(StoredObject {
            url: url.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), ProviderError> {
        check_key(key)?;
        let url = endpoint(&self.base_url, key)?;
        let request = HttpRequest::new(Method::Delete, url).bearer(self.token.as_deref());
        match self.backend.send(&request).await {
            Ok(_) => Ok(()),
            Err(ProviderHttpError::Status { status: 404, .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
