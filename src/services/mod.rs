pub mod authorization;
pub mod comment_service;
pub mod metadata_store;
