//! Core data models for the comment extras service.
//!
//! Stored entities map to SQLite rows via `sqlx::FromRow`; wire-level
//! structures serialize as JSON via `serde`.

pub mod avatar;
pub mod comment;
pub mod custom_field;
pub mod metadata;
pub mod principal;
