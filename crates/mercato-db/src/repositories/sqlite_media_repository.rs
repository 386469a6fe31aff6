//! `SQLite` implementation of the `MediaRepository` trait.

use async_trait::async_trait;
use sqlx::SqlitePool;

use mercato_core::{Media, MediaRepository, NewMedia, RepositoryError};

use super::row_mappers::{MEDIA_SELECT_COLUMNS, now, row_to_media, storage, write_error};

pub struct SqliteMediaRepository {
    pool: SqlitePool,
}

impl SqliteMediaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaRepository for SqliteMediaRepository {
    async fn insert(&self, media: &NewMedia) -> Result<Media, RepositoryError> {
        let result = sqlx::query(
            r"INSERT INTO media
              (owner_id, business_id, provider, storage_key, url, content_type, size_bytes, created_at)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(media.owner_id)
        .bind(media.business_id)
        .bind(&media.provider)
        .bind(&media.storage_key)
        .bind(&media.url)
        .bind(&media.content_type)
        .bind(media.size_bytes)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "media"))?;

        self.get_by_id(result.last_insert_rowid()).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Media, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {MEDIA_SELECT_COLUMNS} FROM media WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or_else(|| RepositoryError::NotFound(format!("media {id}")))?;

        row_to_media(&row)
    }

    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Media>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MEDIA_SELECT_COLUMNS} FROM media WHERE owner_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter().map(row_to_media).collect()
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("media {id}")));
        }
        Ok(())
    }
}
