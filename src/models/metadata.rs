//! Key-value metadata attached to comments.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// A single metadata row attached to a comment.
///
/// Keys are not unique: a comment may carry several entries under the same
/// key, told apart by `meta_id`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CommentMeta {
    /// Host-assigned identifier, unique across all comments.
    pub meta_id: i64,

    /// Owning comment.
    pub comment_id: i64,

    /// Metadata key (e.g. "google_plus_comment_avatar").
    pub meta_key: String,

    /// Stored value, either a plain string or a structured JSON value.
    pub meta_value: Value,
}

/// Raw `commentmeta` row as SQLite returns it. Values are persisted as
/// JSON text.
#[derive(FromRow, Debug)]
pub struct CommentMetaRow {
    pub meta_id: i64,
    pub comment_id: i64,
    pub meta_key: String,
    pub meta_value: String,
}

impl From<CommentMetaRow> for CommentMeta {
    fn from(row: CommentMetaRow) -> Self {
        Self {
            meta_id: row.meta_id,
            comment_id: row.comment_id,
            meta_key: row.meta_key,
            meta_value: decode_meta_value(row.meta_value),
        }
    }
}

/// Decode a stored value. Text that is not valid JSON (rows written by
/// something other than this service) is returned as a plain string.
pub fn decode_meta_value(raw: String) -> Value {
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => value,
        Err(_) => Value::String(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_text_decodes_to_structured_value() {
        assert_eq!(
            decode_meta_value(r#"{"a":[1,2]}"#.to_string()),
            json!({"a": [1, 2]})
        );
        assert_eq!(decode_meta_value(r#""plain""#.to_string()), json!("plain"));
    }

    #[test]
    fn legacy_text_is_kept_as_string() {
        assert_eq!(
            decode_meta_value("https://lh3.googleusercontent.com/a.png".to_string()),
            json!("https://lh3.googleusercontent.com/a.png")
        );
    }
}
