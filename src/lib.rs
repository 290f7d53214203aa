//! Comment extras: hosted avatars and RPC custom fields for comments.
//!
//! The [`extension`] module is the extension proper and only talks to the
//! host through the traits in [`host`] and the slots in [`hooks`]. The
//! remaining modules form a small SQLite-backed reference host that serves
//! the comment RPC calls over HTTP.

pub mod config;
pub mod errors;
pub mod extension;
pub mod handlers;
pub mod hooks;
pub mod host;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
