//! Media repository trait definition.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{Media, NewMedia};

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn insert(&self, media: &NewMedia) -> Result<Media, RepositoryError>;

    async fn get_by_id(&self, id: i64) -> Result<Media, RepositoryError>;

    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Media>, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}
