//! src/services/comment_service.rs
//!
//! CommentService — the host side of the comment RPC calls. It owns comment
//! rows in SQLite and runs the registered hooks around each call:
//! - new comment: insert, then notify `comment_created`
//! - edit comment: permission check, update, then notify `comment_edited`
//! - get comment: load, then run the `prepare_comment` filters
//! - avatar: build the default markup, then run the `avatar` filters

use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::{
    extension::{avatar::escape_attr, custom_fields::CommentMetadataBridge},
    hooks::HookRegistry,
    host::{Authorizer, HostError},
    models::{
        avatar::AvatarRequest,
        comment::{Comment, EditCommentRequest, NewCommentRequest, PreparedComment},
        custom_field::CustomFieldTriple,
        principal::Principal,
    },
    services::authorization::SqliteAuthorizer,
};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment {0} not found")]
    NotFound(i64),
    #[error("anonymous comments are not allowed")]
    AnonymousNotAllowed,
    #[error("not allowed to edit comment {0}")]
    Forbidden(i64),
    #[error("unknown user {0}")]
    UnknownUser(i64),
    #[error("comment content is required")]
    EmptyContent,
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CommentResult<T> = Result<T, CommentError>;

#[derive(Clone)]
pub struct CommentService {
    /// Shared SQLite connection pool used for comment rows.
    pub db: Arc<SqlitePool>,

    pub hooks: Arc<HookRegistry>,

    pub authorizer: Arc<SqliteAuthorizer>,

    /// Standalone custom-field reader of the extension.
    pub custom_fields: Arc<CommentMetadataBridge>,

    pub allow_anonymous: bool,
}

impl CommentService {
    pub fn new(
        db: Arc<SqlitePool>,
        hooks: Arc<HookRegistry>,
        authorizer: Arc<SqliteAuthorizer>,
        custom_fields: Arc<CommentMetadataBridge>,
        allow_anonymous: bool,
    ) -> Self {
        Self {
            db,
            hooks,
            authorizer,
            custom_fields,
            allow_anonymous,
        }
    }

    /// Map an optional caller id to a principal. No id means anonymous.
    pub async fn resolve_principal(&self, user_id: Option<i64>) -> CommentResult<Principal> {
        match user_id {
            None => Ok(Principal::Anonymous),
            Some(id) => self
                .authorizer
                .principal_for(id)
                .await?
                .ok_or(CommentError::UnknownUser(id)),
        }
    }

    async fn fetch_comment(&self, comment_id: i64) -> CommentResult<Comment> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, user_id, author, author_email, content, created_at
             FROM comments WHERE id = ?",
        )
        .bind(comment_id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(CommentError::NotFound(comment_id))
    }

    /// Insert a comment and notify `comment_created` handlers.
    pub async fn new_comment(
        &self,
        principal: &Principal,
        request: NewCommentRequest,
    ) -> CommentResult<i64> {
        if *principal == Principal::Anonymous && !self.allow_anonymous {
            return Err(CommentError::AnonymousNotAllowed);
        }
        let content = request
            .content
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(CommentError::EmptyContent)?;

        let result = sqlx::query(
            "INSERT INTO comments (post_id, user_id, author, author_email, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(request.post_id)
        .bind(principal.user_id())
        .bind(request.content.author.as_deref().unwrap_or_default())
        .bind(request.content.author_email.as_deref().unwrap_or_default())
        .bind(content)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;

        let comment_id = result.last_insert_rowid();
        info!("created comment {} on post {}", comment_id, request.post_id);

        self.hooks
            .dispatch_comment_created(principal, comment_id, &request)
            .await?;
        Ok(comment_id)
    }

    /// Update the fields the caller sent and notify `comment_edited`
    /// handlers.
    pub async fn edit_comment(
        &self,
        principal: &Principal,
        request: EditCommentRequest,
    ) -> CommentResult<()> {
        let comment = self.fetch_comment(request.comment_id).await?;
        if !self.authorizer.can_edit_comment(principal, comment.id).await? {
            return Err(CommentError::Forbidden(comment.id));
        }

        let content = request.content.content.clone().unwrap_or(comment.content);
        if content.trim().is_empty() {
            return Err(CommentError::EmptyContent);
        }
        let author = request.content.author.clone().unwrap_or(comment.author);
        let author_email = request
            .content
            .author_email
            .clone()
            .unwrap_or(comment.author_email);

        sqlx::query("UPDATE comments SET author = ?, author_email = ?, content = ? WHERE id = ?")
            .bind(&author)
            .bind(&author_email)
            .bind(&content)
            .bind(comment.id)
            .execute(&*self.db)
            .await?;
        info!("edited comment {}", comment.id);

        self.hooks
            .dispatch_comment_edited(principal, comment.id, &request)
            .await?;
        Ok(())
    }

    /// Comment as returned to RPC callers, after the prepare filters ran.
    pub async fn get_comment(&self, comment_id: i64) -> CommentResult<PreparedComment> {
        let comment = self.fetch_comment(comment_id).await?;
        let prepared = self
            .hooks
            .apply_prepare_comment_filters(PreparedComment::from(&comment), &comment)
            .await?;
        Ok(prepared)
    }

    pub async fn custom_fields(
        &self,
        principal: &Principal,
        comment_id: i64,
    ) -> CommentResult<Vec<CustomFieldTriple>> {
        Ok(self
            .custom_fields
            .get_custom_fields(principal, comment_id)
            .await?)
    }

    /// Avatar markup after the avatar filters ran over the default markup.
    pub async fn render_avatar(&self, request: &AvatarRequest) -> CommentResult<String> {
        let markup = self
            .hooks
            .apply_avatar_filters(default_avatar_markup(request), request)
            .await?;
        Ok(markup)
    }

    /// Lightweight connectivity probe used by readiness checks.
    pub async fn ping(&self) -> CommentResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?)
    }
}

/// Placeholder avatar rendered when no filter substitutes an image.
pub fn default_avatar_markup(request: &AvatarRequest) -> String {
    format!(
        "<img alt='{alt}' src='https://secure.gravatar.com/avatar/?s={size}&amp;d={default}' class='avatar avatar-{size} photo avatar-default' height='{size}' width='{size}' />",
        alt = escape_attr(&request.alt),
        default = escape_attr(&request.default),
        size = request.size,
    )
}

/// Service over an in-memory database with the extension registered and
/// two users: 1 (administrator) and 2 (subscriber).
#[cfg(test)]
pub(crate) async fn test_service(allow_anonymous: bool) -> CommentService {
    use crate::{
        extension::{self, AvatarSettings},
        schema::memory_pool,
        services::metadata_store::SqliteMetadataStore,
    };

    let db = memory_pool().await;
    sqlx::query(
        "INSERT INTO users (id, login, role) VALUES
            (1, 'admin', 'administrator'),
            (2, 'alice', 'subscriber')",
    )
    .execute(&*db)
    .await
    .unwrap();

    let store = Arc::new(SqliteMetadataStore::new(db.clone()));
    let authorizer = Arc::new(SqliteAuthorizer::new(db.clone()));
    let mut hooks = HookRegistry::new();
    let ext = extension::register(
        &mut hooks,
        store,
        authorizer.clone(),
        &AvatarSettings::default(),
    )
    .unwrap();

    CommentService::new(
        db,
        Arc::new(hooks),
        authorizer,
        ext.custom_fields,
        allow_anonymous,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        avatar::AvatarSubject, comment::CommentContent, custom_field::CustomFieldDescriptor,
    };
    use serde_json::json;

    fn new_request(fields: Option<Vec<CustomFieldDescriptor>>) -> NewCommentRequest {
        NewCommentRequest {
            post_id: 7,
            content: CommentContent {
                content: Some("Nice post".into()),
                author: Some("Jane".into()),
                author_email: Some("jane@example.com".into()),
                custom_fields: fields,
            },
        }
    }

    #[tokio::test]
    async fn created_comment_gets_custom_fields_of_author() {
        let svc = test_service(true).await;
        let alice = svc.resolve_principal(Some(2)).await.unwrap();

        let id = svc
            .new_comment(
                &alice,
                new_request(Some(vec![CustomFieldDescriptor::create(
                    "google_plus_comment_avatar",
                    json!("https://lh3.googleusercontent.com/jane.png"),
                )])),
            )
            .await
            .unwrap();

        let prepared = svc.get_comment(id).await.unwrap();
        assert_eq!(prepared.user_id, Some(2));
        let fields = prepared.custom_fields.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].meta_key, "google_plus_comment_avatar");
        assert_eq!(fields[0].comment_id, id);

        let markup = svc
            .render_avatar(&AvatarRequest {
                subject: AvatarSubject::Comment { comment_id: id },
                size: 40,
                default: "mystery".into(),
                alt: "Jane".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            markup,
            "<img alt='Jane' src='https://lh3.googleusercontent.com/jane.png' class='avatar avatar-40 photo' height='40' width='40' />"
        );
    }

    #[tokio::test]
    async fn anonymous_comment_keeps_default_avatar_and_no_fields() {
        let svc = test_service(true).await;
        let id = svc
            .new_comment(
                &Principal::Anonymous,
                new_request(Some(vec![CustomFieldDescriptor::create("k", json!("v"))])),
            )
            .await
            .unwrap();

        // Anonymous callers may not edit the comment, so the field is skipped.
        assert_eq!(svc.get_comment(id).await.unwrap().custom_fields, Some(vec![]));

        let request = AvatarRequest {
            subject: AvatarSubject::Comment { comment_id: id },
            size: 32,
            default: "mystery".into(),
            alt: String::new(),
        };
        assert_eq!(
            svc.render_avatar(&request).await.unwrap(),
            default_avatar_markup(&request)
        );
    }

    #[tokio::test]
    async fn anonymous_comments_can_be_disabled() {
        let svc = test_service(false).await;
        let err = svc
            .new_comment(&Principal::Anonymous, new_request(None))
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::AnonymousNotAllowed));
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let svc = test_service(true).await;
        let mut request = new_request(None);
        request.content.content = Some("   ".into());
        let err = svc
            .new_comment(&Principal::Anonymous, request)
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::EmptyContent));
    }

    #[tokio::test]
    async fn edit_updates_content_and_applies_fields() {
        let svc = test_service(true).await;
        let admin = svc.resolve_principal(Some(1)).await.unwrap();
        let id = svc
            .new_comment(&Principal::Anonymous, new_request(None))
            .await
            .unwrap();

        svc.edit_comment(
            &admin,
            EditCommentRequest {
                comment_id: id,
                content: CommentContent {
                    content: Some("Edited".into()),
                    custom_fields: Some(vec![CustomFieldDescriptor::create("k", json!("v"))]),
                    ..CommentContent::default()
                },
            },
        )
        .await
        .unwrap();

        let prepared = svc.get_comment(id).await.unwrap();
        assert_eq!(prepared.content, "Edited");
        assert_eq!(prepared.author, "Jane");

        let triples = svc.custom_fields(&admin, id).await.unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].key, "k");
        assert!(svc.custom_fields(&Principal::Anonymous, id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_requires_permission() {
        let svc = test_service(true).await;
        let alice = svc.resolve_principal(Some(2)).await.unwrap();
        let id = svc
            .new_comment(&Principal::Anonymous, new_request(None))
            .await
            .unwrap();

        let err = svc
            .edit_comment(
                &alice,
                EditCommentRequest {
                    comment_id: id,
                    content: CommentContent::default(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::Forbidden(c) if c == id));

        let err = svc
            .edit_comment(
                &alice,
                EditCommentRequest {
                    comment_id: 404,
                    content: CommentContent::default(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::NotFound(404)));
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let svc = test_service(true).await;
        assert!(matches!(
            svc.resolve_principal(Some(99)).await,
            Err(CommentError::UnknownUser(99))
        ));
        assert_eq!(
            svc.resolve_principal(None).await.unwrap(),
            Principal::Anonymous
        );
    }
}
