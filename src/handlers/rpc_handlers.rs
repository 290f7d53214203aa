//! HTTP handlers for the comment RPC calls.
//! Each handler resolves the acting principal and delegates to
//! `CommentService`, which runs the registered hooks.

use crate::{
    errors::AppError,
    models::{
        comment::{CommentContent, EditCommentRequest, NewCommentRequest, PreparedComment},
        custom_field::CustomFieldTriple,
        principal::Principal,
    },
    services::comment_service::CommentService,
};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;

/// Header carrying the id of the signed-in caller.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Serialize)]
pub struct NewCommentResponse {
    pub comment_id: i64,
}

#[derive(Debug, Serialize)]
pub struct EditCommentResponse {
    pub ok: bool,
}

/// Resolve the caller from [`USER_ID_HEADER`]. A missing header is an
/// anonymous caller.
pub async fn principal_from_headers(
    service: &CommentService,
    headers: &HeaderMap,
) -> Result<Principal, AppError> {
    let user_id = match headers.get(USER_ID_HEADER) {
        None => None,
        Some(raw) => {
            let id = raw
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .ok_or_else(|| AppError::bad_request("invalid x-user-id header"))?;
            Some(id)
        }
    };
    Ok(service.resolve_principal(user_id).await?)
}

/// `POST /rpc/comments` — create a comment.
pub async fn new_comment(
    State(service): State<CommentService>,
    headers: HeaderMap,
    Json(request): Json<NewCommentRequest>,
) -> Result<Json<NewCommentResponse>, AppError> {
    let principal = principal_from_headers(&service, &headers).await?;
    let comment_id = service.new_comment(&principal, request).await?;
    Ok(Json(NewCommentResponse { comment_id }))
}

/// `PUT /rpc/comments/{id}` — edit a comment.
pub async fn edit_comment(
    State(service): State<CommentService>,
    Path(comment_id): Path<i64>,
    headers: HeaderMap,
    Json(content): Json<CommentContent>,
) -> Result<Json<EditCommentResponse>, AppError> {
    let principal = principal_from_headers(&service, &headers).await?;
    service
        .edit_comment(
            &principal,
            EditCommentRequest {
                comment_id,
                content,
            },
        )
        .await?;
    Ok(Json(EditCommentResponse { ok: true }))
}

/// `GET /rpc/comments/{id}` — a comment with its custom fields.
pub async fn get_comment(
    State(service): State<CommentService>,
    Path(comment_id): Path<i64>,
) -> Result<Json<PreparedComment>, AppError> {
    Ok(Json(service.get_comment(comment_id).await?))
}

/// `GET /rpc/comments/{id}/custom_fields` — `{id, key, value}` entries, empty
/// unless the caller may edit the comment.
pub async fn get_custom_fields(
    State(service): State<CommentService>,
    Path(comment_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Vec<CustomFieldTriple>>, AppError> {
    let principal = principal_from_headers(&service, &headers).await?;
    Ok(Json(service.custom_fields(&principal, comment_id).await?))
}
