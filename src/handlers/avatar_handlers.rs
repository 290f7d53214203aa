//! Avatar render endpoints. They return HTML markup, not images.

use crate::{
    errors::AppError,
    models::avatar::{AvatarRequest, AvatarSubject},
    services::comment_service::CommentService,
};
use axum::{
    extract::{Path, Query, State},
    response::Html,
};
use serde::Deserialize;

const DEFAULT_SIZE: u32 = 96;
const MAX_SIZE: u32 = 512;

#[derive(Debug, Deserialize)]
pub struct AvatarQuery {
    pub size: Option<u32>,
    pub default: Option<String>,
    pub alt: Option<String>,
}

impl AvatarQuery {
    fn into_request(self, subject: AvatarSubject) -> AvatarRequest {
        AvatarRequest {
            subject,
            size: self.size.unwrap_or(DEFAULT_SIZE).clamp(1, MAX_SIZE),
            default: self.default.unwrap_or_else(|| "mystery".into()),
            alt: self.alt.unwrap_or_default(),
        }
    }
}

/// `GET /comments/{id}/avatar`
pub async fn comment_avatar(
    State(service): State<CommentService>,
    Path(comment_id): Path<i64>,
    Query(q): Query<AvatarQuery>,
) -> Result<Html<String>, AppError> {
    let request = q.into_request(AvatarSubject::Comment { comment_id });
    Ok(Html(service.render_avatar(&request).await?))
}

/// `GET /users/{id}/avatar`
pub async fn user_avatar(
    State(service): State<CommentService>,
    Path(user_id): Path<i64>,
    Query(q): Query<AvatarQuery>,
) -> Result<Html<String>, AppError> {
    let request = q.into_request(AvatarSubject::User { user_id });
    Ok(Html(service.render_avatar(&request).await?))
}
