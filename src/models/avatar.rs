//! Avatar render requests.

use serde::{Deserialize, Serialize};

/// Whose avatar is being rendered.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AvatarSubject {
    Comment { comment_id: i64 },
    User { user_id: i64 },
    Email { email: String },
}

impl AvatarSubject {
    /// Comment id, when the subject is comment-shaped.
    pub fn comment_id(&self) -> Option<i64> {
        match self {
            Self::Comment { comment_id } => Some(*comment_id),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AvatarRequest {
    pub subject: AvatarSubject,

    /// Requested edge length in pixels.
    pub size: u32,

    /// Identifier of the fallback avatar (e.g. "mystery").
    pub default: String,

    /// Alternate text for the image.
    pub alt: String,
}
