//! Interfaces the host platform provides to extensions.
//!
//! Extensions never touch storage or the permission system directly; they
//! receive these collaborators at registration time.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::{metadata::CommentMeta, principal::Principal};

/// Failures raised by the host's own storage layer. Extensions propagate
/// these unchanged.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("metadata value could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type HostResult<T> = Result<T, HostError>;

/// Per-comment key/value metadata store.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Every entry of a comment, ordered by key, then by entry id.
    async fn list_for_comment(&self, comment_id: i64) -> HostResult<Vec<CommentMeta>>;

    async fn get_by_id(&self, meta_id: i64) -> HostResult<Option<CommentMeta>>;

    /// Value of the oldest entry stored under `key`.
    async fn get_single(&self, comment_id: i64, key: &str) -> HostResult<Option<Value>>;

    /// Insert a new entry and return its id.
    async fn add(&self, comment_id: i64, key: &str, value: &Value) -> HostResult<i64>;

    /// Overwrite the value of an entry. Returns false if it does not exist.
    async fn update_by_id(&self, meta_id: i64, value: &Value) -> HostResult<bool>;

    /// Remove an entry. Returns false if it does not exist.
    async fn delete_by_id(&self, meta_id: i64) -> HostResult<bool>;
}

/// The host's permission system.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn can_edit_comment(&self, principal: &Principal, comment_id: i64) -> HostResult<bool>;
}
