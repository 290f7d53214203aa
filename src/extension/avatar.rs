//! Avatar substitution for comments that carry a hosted profile picture.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    hooks::AvatarFilter,
    host::{HostResult, MetadataStore},
    models::avatar::AvatarRequest,
};

/// Replaces the rendered avatar of a comment with the image stored in its
/// metadata, provided the stored URL points at the trusted image host.
pub struct AvatarResolver {
    store: Arc<dyn MetadataStore>,
    meta_key: String,
    pattern: Regex,
}

impl AvatarResolver {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        meta_key: impl Into<String>,
        trusted_domain: &str,
    ) -> Result<Self, regex::Error> {
        // Unanchored; `.` stops at line breaks, so the match ends with the line.
        let pattern = Regex::new(&format!(
            r"(https://.*\.{}.*)",
            regex::escape(trusted_domain)
        ))?;

        Ok(Self {
            store,
            meta_key: meta_key.into(),
            pattern,
        })
    }

    /// Final markup for `request`. Anything other than a comment with a
    /// matching stored URL gets `markup` back unchanged.
    pub async fn resolve(&self, markup: String, request: &AvatarRequest) -> String {
        let Some(comment_id) = request.subject.comment_id() else {
            return markup;
        };

        let candidate = match self.store.get_single(comment_id, &self.meta_key).await {
            Ok(Some(Value::String(candidate))) => candidate,
            Ok(_) => return markup,
            Err(err) => {
                warn!(
                    "avatar lookup for comment {} failed, keeping default: {}",
                    comment_id, err
                );
                return markup;
            }
        };

        match self.matched_url(&candidate) {
            Some(url) => render_avatar(url, request),
            None => {
                debug!(
                    "stored avatar of comment {} is not a trusted URL",
                    comment_id
                );
                markup
            }
        }
    }

    fn matched_url<'a>(&self, candidate: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(candidate)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

#[async_trait]
impl AvatarFilter for AvatarResolver {
    async fn filter_avatar(&self, markup: String, request: &AvatarRequest) -> HostResult<String> {
        Ok(self.resolve(markup, request).await)
    }
}

fn render_avatar(url: &str, request: &AvatarRequest) -> String {
    format!(
        "<img alt='{alt}' src='{url}' class='avatar avatar-{size} photo' height='{size}' width='{size}' />",
        alt = escape_attr(&request.alt),
        url = escape_attr(url),
        size = request.size,
    )
}

/// Escape a value for use inside a quoted HTML attribute.
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::avatar::AvatarSubject, schema::memory_pool,
        services::metadata_store::SqliteMetadataStore,
    };
    use serde_json::json;

    const DEFAULT: &str = "<img src='default.png' />";
    const KEY: &str = "google_plus_comment_avatar";

    async fn resolver_with(value: Option<Value>) -> AvatarResolver {
        let store = SqliteMetadataStore::new(memory_pool().await);
        if let Some(value) = value {
            store.add(1, KEY, &value).await.unwrap();
        }
        AvatarResolver::new(Arc::new(store), KEY, "googleusercontent.com").unwrap()
    }

    fn comment_request(size: u32, alt: &str) -> AvatarRequest {
        AvatarRequest {
            subject: AvatarSubject::Comment { comment_id: 1 },
            size,
            default: "mystery".into(),
            alt: alt.into(),
        }
    }

    #[tokio::test]
    async fn trusted_url_replaces_markup() {
        let url = "https://lh3.googleusercontent.com/-abc/photo.jpg?sz=50";
        let resolver = resolver_with(Some(json!(url))).await;

        let markup = resolver
            .resolve(DEFAULT.into(), &comment_request(48, "Jane"))
            .await;
        assert_eq!(
            markup,
            format!(
                "<img alt='Jane' src='{url}' class='avatar avatar-48 photo' height='48' width='48' />"
            )
        );
    }

    #[tokio::test]
    async fn alt_text_is_escaped() {
        let resolver =
            resolver_with(Some(json!("https://lh3.googleusercontent.com/a.png"))).await;
        let markup = resolver
            .resolve(DEFAULT.into(), &comment_request(32, "O'Neil <b>"))
            .await;
        assert!(markup.starts_with("<img alt='O&#039;Neil &lt;b&gt;' "));
    }

    #[tokio::test]
    async fn untrusted_or_missing_candidates_pass_through() {
        for candidate in [
            json!("http://lh3.googleusercontent.com/a.png"),
            json!("https://example.com/a.png"),
            json!("https://googleusercontent.com/a.png"),
            json!({"url": "https://lh3.googleusercontent.com/a.png"}),
        ] {
            let resolver = resolver_with(Some(candidate)).await;
            let markup = resolver
                .resolve(DEFAULT.into(), &comment_request(32, ""))
                .await;
            assert_eq!(markup, DEFAULT);
        }

        let resolver = resolver_with(None).await;
        assert_eq!(
            resolver
                .resolve(DEFAULT.into(), &comment_request(32, ""))
                .await,
            DEFAULT
        );
    }

    #[tokio::test]
    async fn match_may_start_mid_text_and_keeps_the_rest_of_the_line() {
        let resolver = resolver_with(Some(json!(
            "see https://lh3.googleusercontent.com/a b.png\nsecond line"
        )))
        .await;
        let markup = resolver
            .resolve(DEFAULT.into(), &comment_request(16, ""))
            .await;
        assert!(markup.contains("src='https://lh3.googleusercontent.com/a b.png' class="));
    }

    #[tokio::test]
    async fn matched_url_is_escaped_inside_the_attribute() {
        let resolver = resolver_with(Some(json!(
            "https://lh3.googleusercontent.com/a.png' onerror='alert(1)"
        )))
        .await;
        let markup = resolver
            .resolve(DEFAULT.into(), &comment_request(16, ""))
            .await;
        assert!(markup.contains(
            "src='https://lh3.googleusercontent.com/a.png&#039; onerror=&#039;alert(1)' class="
        ));
        assert!(!markup.contains("' onerror"));
    }

    #[tokio::test]
    async fn non_comment_subjects_pass_through() {
        let resolver =
            resolver_with(Some(json!("https://lh3.googleusercontent.com/a.png"))).await;
        for subject in [
            AvatarSubject::User { user_id: 1 },
            AvatarSubject::Email {
                email: "jane@example.com".into(),
            },
        ] {
            let request = AvatarRequest {
                subject,
                size: 96,
                default: "mystery".into(),
                alt: String::new(),
            };
            assert_eq!(resolver.resolve(DEFAULT.into(), &request).await, DEFAULT);
        }
    }
}
