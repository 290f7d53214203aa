//! The comment extension: hosted avatars and RPC custom fields.
//!
//! [`register`] wires both components into the host's [`HookRegistry`] and
//! hands back the registered instances so the host can also reach the
//! operations that are not bound to an event.

pub mod avatar;
pub mod custom_fields;
pub mod unescape;

use std::sync::Arc;

use crate::{
    hooks::HookRegistry,
    host::{Authorizer, MetadataStore},
};
use avatar::AvatarResolver;
use custom_fields::CommentMetadataBridge;

/// Runs ahead of other avatar filters.
pub const AVATAR_PRIORITY: i32 = 1;
pub const CUSTOM_FIELDS_PRIORITY: i32 = 10;

#[derive(Debug, Clone)]
pub struct AvatarSettings {
    /// Metadata key the profile picture URL is stored under.
    pub meta_key: String,

    /// Only URLs on a subdomain of this domain are used.
    pub trusted_domain: String,
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            meta_key: "google_plus_comment_avatar".into(),
            trusted_domain: "googleusercontent.com".into(),
        }
    }
}

pub struct Extension {
    pub avatar: Arc<AvatarResolver>,
    pub custom_fields: Arc<CommentMetadataBridge>,
}

pub fn register(
    registry: &mut HookRegistry,
    store: Arc<dyn MetadataStore>,
    authorizer: Arc<dyn Authorizer>,
    settings: &AvatarSettings,
) -> Result<Extension, regex::Error> {
    let avatar = Arc::new(AvatarResolver::new(
        store.clone(),
        settings.meta_key.clone(),
        &settings.trusted_domain,
    )?);
    let custom_fields = Arc::new(CommentMetadataBridge::new(store, authorizer));

    registry.add_avatar_filter(AVATAR_PRIORITY, avatar.clone());
    registry.add_prepare_comment_filter(CUSTOM_FIELDS_PRIORITY, custom_fields.clone());
    registry.on_comment_created(CUSTOM_FIELDS_PRIORITY, custom_fields.clone());
    registry.on_comment_edited(CUSTOM_FIELDS_PRIORITY, custom_fields.clone());

    tracing::debug!("comment extension registered: {:?}", registry);

    Ok(Extension {
        avatar,
        custom_fields,
    })
}
