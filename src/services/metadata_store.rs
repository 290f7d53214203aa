//! src/services/metadata_store.rs
//!
//! SqliteMetadataStore — the host's per-comment key/value store, backed by
//! the `commentmeta` table. Values are written as JSON text.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use crate::{
    host::{HostResult, MetadataStore},
    models::metadata::{CommentMeta, CommentMetaRow, decode_meta_value},
};

#[derive(Clone)]
pub struct SqliteMetadataStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteMetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    /// Ordered by `meta_key`, then `meta_id` so duplicate keys keep
    /// insertion order.
    async fn list_for_comment(&self, comment_id: i64) -> HostResult<Vec<CommentMeta>> {
        let rows = sqlx::query_as::<_, CommentMetaRow>(
            "SELECT meta_id, comment_id, meta_key, meta_value
             FROM commentmeta WHERE comment_id = ?
             ORDER BY meta_key ASC, meta_id ASC",
        )
        .bind(comment_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows.into_iter().map(CommentMeta::from).collect())
    }

    async fn get_by_id(&self, meta_id: i64) -> HostResult<Option<CommentMeta>> {
        let row = sqlx::query_as::<_, CommentMetaRow>(
            "SELECT meta_id, comment_id, meta_key, meta_value
             FROM commentmeta WHERE meta_id = ?",
        )
        .bind(meta_id)
        .fetch_optional(&*self.db)
        .await?;

        Ok(row.map(CommentMeta::from))
    }

    async fn get_single(&self, comment_id: i64, key: &str) -> HostResult<Option<Value>> {
        let raw = sqlx::query_scalar::<_, String>(
            "SELECT meta_value FROM commentmeta
             WHERE comment_id = ? AND meta_key = ?
             ORDER BY meta_id ASC LIMIT 1",
        )
        .bind(comment_id)
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;

        Ok(raw.map(decode_meta_value))
    }

    async fn add(&self, comment_id: i64, key: &str, value: &Value) -> HostResult<i64> {
        let encoded = serde_json::to_string(value)?;
        let result = sqlx::query(
            "INSERT INTO commentmeta (comment_id, meta_key, meta_value) VALUES (?, ?, ?)",
        )
        .bind(comment_id)
        .bind(key)
        .bind(&encoded)
        .execute(&*self.db)
        .await?;

        let meta_id = result.last_insert_rowid();
        debug!("added meta {} `{}` to comment {}", meta_id, key, comment_id);
        Ok(meta_id)
    }

    async fn update_by_id(&self, meta_id: i64, value: &Value) -> HostResult<bool> {
        let encoded = serde_json::to_string(value)?;
        let result = sqlx::query("UPDATE commentmeta SET meta_value = ? WHERE meta_id = ?")
            .bind(&encoded)
            .bind(meta_id)
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, meta_id: i64) -> HostResult<bool> {
        let result = sqlx::query("DELETE FROM commentmeta WHERE meta_id = ?")
            .bind(meta_id)
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
