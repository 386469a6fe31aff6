//! Uploaded media: validation, storage and bookkeeping.

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::domain::{Media, NewMedia, UploadedFile, User};
use crate::ports::{
    BusinessRepository, CoreError, MediaRepository, ObjectStoragePort, SettingsRepository,
};

/// Accepted content types and the extension stored objects get.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("application/pdf", "pdf"),
];

/// Storage extension for an accepted content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

pub struct MediaService {
    media: Arc<dyn MediaRepository>,
    businesses: Arc<dyn BusinessRepository>,
    settings: Arc<dyn SettingsRepository>,
    storage: Arc<dyn ObjectStoragePort>,
}

impl MediaService {
    pub fn new(
        media: Arc<dyn MediaRepository>,
        businesses: Arc<dyn BusinessRepository>,
        settings: Arc<dyn SettingsRepository>,
        storage: Arc<dyn ObjectStoragePort>,
    ) -> Self {
        Self {
            media,
            businesses,
            settings,
            storage,
        }
    }

    /// Store an upload and record it against the caller's listing, if any.
    pub async fn upload(&self, user: &User, file: UploadedFile) -> Result<Media, CoreError> {
        let Some(ext) = extension_for(&file.content_type) else {
            return Err(CoreError::invalid(
                "file",
                "must be a JPEG, PNG, WebP or GIF image or a PDF",
            ));
        };
        if file.bytes.is_empty() {
            return Err(CoreError::invalid("file", "is empty"));
        }
        let settings = self.settings.load().await?;
        let size = u64::try_from(file.bytes.len()).unwrap_or(u64::MAX);
        if size > settings.max_upload_bytes {
            return Err(CoreError::invalid(
                "file",
                format!("exceeds the {} byte upload limit", settings.max_upload_bytes),
            ));
        }

        let key = storage_key(user.id, Utc::now().timestamp_millis(), &file.bytes, ext);
        let content_type = file
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let stored = self.storage.put(&key, &file.bytes, &content_type).await?;
        let business_id = self.businesses.find_by_owner(user.id).await?.map(|b| b.id);

        let recorded = self
            .media
            .insert(&NewMedia {
                owner_id: user.id,
                business_id,
                provider: self.storage.provider().to_string(),
                storage_key: key.clone(),
                url: stored.url,
                content_type,
                size_bytes: i64::try_from(size).unwrap_or(i64::MAX),
            })
            .await;

        match recorded {
            Ok(media) => {
                info!(media_id = media.id, key = %media.storage_key, size_bytes = media.size_bytes, "Media stored");
                Ok(media)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove orphaned object");
                }
                Err(e.into())
            }
        }
    }

    pub async fn list(&self, user: &User) -> Result<Vec<Media>, CoreError> {
        self.media
            .list_for_owner(user.id)
            .await
            .map_err(CoreError::from)
    }

    /// Remove an object and its row. Owner (or admin) only.
    pub async fn delete(&self, user: &User, id: i64) -> Result<(), CoreError> {
        let media = self.media.get_by_id(id).await?;
        if media.owner_id != user.id && !user.is_admin() {
            return Err(CoreError::Forbidden(
                "media belongs to another user".to_string(),
            ));
        }
        self.storage.delete(&media.storage_key).await?;
        self.media.delete(id).await?;
        info!(media_id = id, "Media deleted");
        Ok(())
    }
}

/// `{owner}/{millis}-{sha256 prefix}.{ext}`
fn storage_key(owner_id: i64, millis: i64, bytes: &[u8], ext: &str) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    format!("{owner_id}/{millis}-{}.{ext}", &digest[..12])
}
