//! Custom-field support for the comment RPC calls.
//!
//! Prepared comments carry their metadata as `custom_fields`; create and
//! edit calls may send a `custom_fields` list that is applied entry by entry.
//! Every mutation is checked against the caller's right to edit the comment.
//! Entries that fail a check are skipped silently and never abort the rest
//! of the list.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    extension::unescape::{strip_slashes, strip_slashes_deep},
    hooks::{CommentCreatedAction, CommentEditedAction, PrepareCommentFilter},
    host::{Authorizer, HostResult, MetadataStore},
    models::{
        comment::{
            Comment, CommentContent, EditCommentRequest, NewCommentRequest, PreparedComment,
        },
        custom_field::{
            CustomField, CustomFieldDescriptor, CustomFieldTriple, FieldOutcome, SkipReason,
        },
        principal::Principal,
    },
};

pub struct CommentMetadataBridge {
    store: Arc<dyn MetadataStore>,
    authorizer: Arc<dyn Authorizer>,
}

impl CommentMetadataBridge {
    pub fn new(store: Arc<dyn MetadataStore>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { store, authorizer }
    }

    /// Attach every metadata entry of `source` to `output`, ordered by key
    /// then entry id. Reading is not permission-checked.
    pub async fn attach_custom_fields(
        &self,
        mut output: PreparedComment,
        source: &Comment,
    ) -> HostResult<PreparedComment> {
        let fields = self
            .store
            .list_for_comment(source.id)
            .await?
            .into_iter()
            .map(CustomField::from)
            .collect();
        output.custom_fields = Some(fields);
        Ok(output)
    }

    /// Apply the `custom_fields` of a create/edit payload, if any.
    pub async fn sync_content(
        &self,
        principal: &Principal,
        comment_id: i64,
        content: &CommentContent,
    ) -> HostResult<Vec<FieldOutcome>> {
        match &content.custom_fields {
            Some(fields) => self.set_custom_fields(principal, comment_id, fields).await,
            None => Ok(Vec::new()),
        }
    }

    /// Apply each descriptor in order. Nothing spans the whole list: entries
    /// applied before a skipped one stay applied.
    pub async fn set_custom_fields(
        &self,
        principal: &Principal,
        comment_id: i64,
        fields: &[CustomFieldDescriptor],
    ) -> HostResult<Vec<FieldOutcome>> {
        let mut outcomes = Vec::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            let outcome = self.apply_field(principal, comment_id, field).await?;
            match outcome {
                FieldOutcome::Skipped { reason } => debug!(
                    "custom field #{} of comment {} skipped: {:?}",
                    index, comment_id, reason
                ),
                applied => info!(
                    "custom field #{} of comment {} applied: {:?}",
                    index, comment_id, applied
                ),
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Decide and perform the action a single descriptor asks for.
    pub async fn apply_field(
        &self,
        principal: &Principal,
        comment_id: i64,
        field: &CustomFieldDescriptor,
    ) -> HostResult<FieldOutcome> {
        let Some(meta_id) = field.id else {
            return self.create_field(principal, comment_id, field).await;
        };

        let Some(existing) = self.store.get_by_id(meta_id).await? else {
            return Ok(FieldOutcome::skipped(SkipReason::NotFound));
        };
        if existing.comment_id != comment_id {
            return Ok(FieldOutcome::skipped(SkipReason::ForeignRecord));
        }

        match &field.key {
            Some(key) => {
                if strip_slashes(key) != existing.meta_key {
                    return Ok(FieldOutcome::skipped(SkipReason::KeyMismatch));
                }
                let value = strip_slashes_deep(field_value(field));
                if !self.can_edit(principal, comment_id).await? {
                    return Ok(FieldOutcome::skipped(SkipReason::Unauthorized));
                }
                if self.store.update_by_id(meta_id, &value).await? {
                    Ok(FieldOutcome::Updated { meta_id })
                } else {
                    Ok(FieldOutcome::skipped(SkipReason::NotFound))
                }
            }
            None => {
                if !self.can_edit(principal, comment_id).await? {
                    return Ok(FieldOutcome::skipped(SkipReason::Unauthorized));
                }
                if self.store.delete_by_id(meta_id).await? {
                    Ok(FieldOutcome::Deleted { meta_id })
                } else {
                    Ok(FieldOutcome::skipped(SkipReason::NotFound))
                }
            }
        }
    }

    async fn create_field(
        &self,
        principal: &Principal,
        comment_id: i64,
        field: &CustomFieldDescriptor,
    ) -> HostResult<FieldOutcome> {
        if !self.can_edit(principal, comment_id).await? {
            return Ok(FieldOutcome::skipped(SkipReason::Unauthorized));
        }
        let Some(key) = field.key.as_deref().filter(|k| !k.is_empty()) else {
            return Ok(FieldOutcome::skipped(SkipReason::MissingKey));
        };
        let meta_id = self.store.add(comment_id, key, &field_value(field)).await?;
        Ok(FieldOutcome::Created { meta_id })
    }

    /// Every entry of the comment as `{id, key, value}`, or an empty list
    /// when the caller may not edit the comment.
    pub async fn get_custom_fields(
        &self,
        principal: &Principal,
        comment_id: i64,
    ) -> HostResult<Vec<CustomFieldTriple>> {
        if !self.can_edit(principal, comment_id).await? {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .list_for_comment(comment_id)
            .await?
            .into_iter()
            .map(CustomFieldTriple::from)
            .collect())
    }

    async fn can_edit(&self, principal: &Principal, comment_id: i64) -> HostResult<bool> {
        self.authorizer.can_edit_comment(principal, comment_id).await
    }
}

fn field_value(field: &CustomFieldDescriptor) -> Value {
    field
        .value
        .clone()
        .unwrap_or_else(|| Value::String(String::new()))
}

#[async_trait]
impl PrepareCommentFilter for CommentMetadataBridge {
    async fn prepare_comment(
        &self,
        output: PreparedComment,
        source: &Comment,
    ) -> HostResult<PreparedComment> {
        self.attach_custom_fields(output, source).await
    }
}

#[async_trait]
impl CommentCreatedAction for CommentMetadataBridge {
    async fn comment_created(
        &self,
        principal: &Principal,
        comment_id: i64,
        request: &NewCommentRequest,
    ) -> HostResult<()> {
        self.sync_content(principal, comment_id, &request.content)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl CommentEditedAction for CommentMetadataBridge {
    async fn comment_edited(
        &self,
        principal: &Principal,
        comment_id: i64,
        request: &EditCommentRequest,
    ) -> HostResult<()> {
        self.sync_content(principal, comment_id, &request.content)
            .await
            .map(|_| ())
    }
}
