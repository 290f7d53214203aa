//! Defines routes for the comment RPC calls and avatar rendering.
//!
//! ## Structure
//! - **Comment RPC endpoints**
//!   - `POST   /rpc/comments` — new comment
//!   - `GET    /rpc/comments/{id}` — comment with custom fields
//!   - `PUT    /rpc/comments/{id}` — edit comment
//!   - `GET    /rpc/comments/{id}/custom_fields` — custom fields, editors only
//!
//! - **Avatar endpoints** (HTML markup)
//!   - `GET    /comments/{id}/avatar`
//!   - `GET    /users/{id}/avatar`
//!
//! The caller is identified by the `x-user-id` header; without it requests
//! run as an anonymous caller.

use crate::{
    handlers::{
        avatar_handlers::{comment_avatar, user_avatar},
        health_handlers::{healthz, readyz},
        rpc_handlers::{edit_comment, get_comment, get_custom_fields, new_comment},
    },
    services::comment_service::CommentService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all endpoints.
///
/// The router carries shared state (`CommentService`) to all handlers.
pub fn routes() -> Router<CommentService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Comment RPC
        .route("/rpc/comments", post(new_comment))
        .route("/rpc/comments/{id}", get(get_comment).put(edit_comment))
        .route("/rpc/comments/{id}/custom_fields", get(get_custom_fields))
        // Avatars
        .route("/comments/{id}/avatar", get(comment_avatar))
        .route("/users/{id}/avatar", get(user_avatar))
}
