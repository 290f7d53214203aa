//! SqliteAuthorizer — the host's "can edit this comment" check and the
//! lookup of the acting principal.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    host::{Authorizer, HostResult},
    models::principal::{Principal, Role},
};

#[derive(Clone)]
pub struct SqliteAuthorizer {
    pub db: Arc<SqlitePool>,
}

impl SqliteAuthorizer {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Resolve a user id to a principal. Returns `None` for unknown users.
    pub async fn principal_for(&self, user_id: i64) -> HostResult<Option<Principal>> {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&*self.db)
            .await?;

        Ok(role.map(|role| Principal::User { id: user_id, role }))
    }
}

#[async_trait]
impl Authorizer for SqliteAuthorizer {
    /// Moderators may edit any existing comment, other users only their own.
    /// Anonymous callers and unknown comments never pass.
    async fn can_edit_comment(
        &self,
        principal: &Principal,
        comment_id: i64,
    ) -> HostResult<bool> {
        let Principal::User { id, role } = *principal else {
            return Ok(false);
        };

        let owner =
            sqlx::query_scalar::<_, Option<i64>>("SELECT user_id FROM comments WHERE id = ?")
                .bind(comment_id)
                .fetch_optional(&*self.db)
                .await?;

        Ok(match owner {
            None => false,
            Some(_) if role.can_moderate() => true,
            Some(owner) => owner == Some(id),
        })
    }
}
