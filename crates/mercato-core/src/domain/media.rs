//! Uploaded media.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub owner_id: i64,
    pub business_id: Option<i64>,
    /// Storage backend that holds the object (`local`, `remote`).
    pub provider: String,
    pub storage_key: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// Data for inserting a media row after the object was stored.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub owner_id: i64,
    pub business_id: Option<i64>,
    pub provider: String,
    pub storage_key: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
}

/// A file received from a client, not yet validated.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
