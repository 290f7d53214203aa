//! Typed event subscription surface of the host.
//!
//! Each slot holds handlers for one host event. Handlers run in ascending
//! priority; handlers sharing a priority run in registration order.
//!
//! - `avatar`: filter the markup of an avatar being rendered
//! - `prepare_comment`: filter a comment being serialized for an RPC caller
//! - `comment_created`: notified after an RPC call created a comment
//! - `comment_edited`: notified after an RPC call edited a comment

use async_trait::async_trait;
use std::{fmt, sync::Arc};

use crate::{
    host::HostResult,
    models::{
        avatar::AvatarRequest,
        comment::{Comment, EditCommentRequest, NewCommentRequest, PreparedComment},
        principal::Principal,
    },
};

#[async_trait]
pub trait AvatarFilter: Send + Sync {
    async fn filter_avatar(&self, markup: String, request: &AvatarRequest) -> HostResult<String>;
}

#[async_trait]
pub trait PrepareCommentFilter: Send + Sync {
    async fn prepare_comment(
        &self,
        output: PreparedComment,
        source: &Comment,
    ) -> HostResult<PreparedComment>;
}

#[async_trait]
pub trait CommentCreatedAction: Send + Sync {
    async fn comment_created(
        &self,
        principal: &Principal,
        comment_id: i64,
        request: &NewCommentRequest,
    ) -> HostResult<()>;
}

#[async_trait]
pub trait CommentEditedAction: Send + Sync {
    async fn comment_edited(
        &self,
        principal: &Principal,
        comment_id: i64,
        request: &EditCommentRequest,
    ) -> HostResult<()>;
}

struct Slot<T: ?Sized> {
    entries: Vec<(i32, Arc<T>)>,
}

impl<T: ?Sized> Default for Slot<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized> Slot<T> {
    fn insert(&mut self, priority: i32, handler: Arc<T>) {
        let pos = self.entries.partition_point(|(p, _)| *p <= priority);
        self.entries.insert(pos, (priority, handler));
    }

    fn handlers(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter().map(|(_, handler)| handler)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Registry built once at start-up and shared read-only afterwards.
#[derive(Default)]
pub struct HookRegistry {
    avatar: Slot<dyn AvatarFilter>,
    prepare_comment: Slot<dyn PrepareCommentFilter>,
    comment_created: Slot<dyn CommentCreatedAction>,
    comment_edited: Slot<dyn CommentEditedAction>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_avatar_filter(&mut self, priority: i32, handler: Arc<dyn AvatarFilter>) {
        self.avatar.insert(priority, handler);
    }

    pub fn add_prepare_comment_filter(
        &mut self,
        priority: i32,
        handler: Arc<dyn PrepareCommentFilter>,
    ) {
        self.prepare_comment.insert(priority, handler);
    }

    pub fn on_comment_created(&mut self, priority: i32, handler: Arc<dyn CommentCreatedAction>) {
        self.comment_created.insert(priority, handler);
    }

    pub fn on_comment_edited(&mut self, priority: i32, handler: Arc<dyn CommentEditedAction>) {
        self.comment_edited.insert(priority, handler);
    }

    pub async fn apply_avatar_filters(
        &self,
        mut markup: String,
        request: &AvatarRequest,
    ) -> HostResult<String> {
        for handler in self.avatar.handlers() {
            markup = handler.filter_avatar(markup, request).await?;
        }
        Ok(markup)
    }

    pub async fn apply_prepare_comment_filters(
        &self,
        mut output: PreparedComment,
        source: &Comment,
    ) -> HostResult<PreparedComment> {
        for handler in self.prepare_comment.handlers() {
            output = handler.prepare_comment(output, source).await?;
        }
        Ok(output)
    }

    pub async fn dispatch_comment_created(
        &self,
        principal: &Principal,
        comment_id: i64,
        request: &NewCommentRequest,
    ) -> HostResult<()> {
        for handler in self.comment_created.handlers() {
            handler.comment_created(principal, comment_id, request).await?;
        }
        Ok(())
    }

    pub async fn dispatch_comment_edited(
        &self,
        principal: &Principal,
        comment_id: i64,
        request: &EditCommentRequest,
    ) -> HostResult<()> {
        for handler in self.comment_edited.handlers() {
            handler.comment_edited(principal, comment_id, request).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("avatar", &self.avatar.len())
            .field("prepare_comment", &self.prepare_comment.len())
            .field("comment_created", &self.comment_created.len())
            .field("comment_edited", &self.comment_edited.len())
            .finish()
    }
}
