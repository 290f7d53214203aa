//! Comments and the RPC request/response shapes built around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::custom_field::{CustomField, CustomFieldDescriptor, deserialize_loose_fields};

/// A comment as the host stores it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Comment {
    pub id: i64,

    /// Post the comment belongs to.
    pub post_id: i64,

    /// Registered author, if the comment was not left anonymously.
    pub user_id: Option<i64>,

    /// Display name of the author.
    pub author: String,

    pub author_email: String,

    pub content: String,

    pub created_at: DateTime<Utc>,
}

/// Content structure accepted by the create and edit RPC calls.
///
/// Every field is optional so an edit only touches what the caller sent.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CommentContent {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub author_email: Option<String>,

    /// Metadata changes to apply once the comment has been written.
    /// Malformed entries are dropped instead of failing the call.
    #[serde(default, deserialize_with = "deserialize_loose_fields")]
    pub custom_fields: Option<Vec<CustomFieldDescriptor>>,
}

/// Typed arguments of the "new comment" RPC call.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewCommentRequest {
    pub post_id: i64,
    pub content: CommentContent,
}

/// Typed arguments of the "edit comment" RPC call.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EditCommentRequest {
    pub comment_id: i64,
    pub content: CommentContent,
}

/// A comment being serialized for an external caller. Filters registered on
/// the prepare-comment slot may augment it before it leaves the host.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PreparedComment {
    pub comment_id: i64,
    pub post_id: i64,
    pub user_id: Option<i64>,
    pub author: String,
    pub author_email: String,
    pub content: String,
    pub date_created: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Vec<CustomField>>,
}

impl From<&Comment> for PreparedComment {
    fn from(comment: &Comment) -> Self {
        Self {
            comment_id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            author: comment.author.clone(),
            author_email: comment.author_email.clone(),
            content: comment.content.clone(),
            date_created: comment.created_at,
            custom_fields: None,
        }
    }
}
