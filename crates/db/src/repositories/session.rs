//! Server-side records of issued session tokens.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Select, Set,
};
use sha2::{Digest, Sha256};

use quill_shared::types::{SessionId, UserId};

use crate::entities::sessions;

/// Tracks which tokens are still honoured. Only a digest of each token is kept.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

/// Sessions that are neither revoked nor past `expires_at`.
fn live() -> Select<sessions::Entity> {
    sessions::Entity::find()
        .filter(sessions::Column::RevokedAt.is_null())
        .filter(sessions::Column::ExpiresAt.gt(Utc::now()))
}

impl SessionRepository {
    /// Wraps a pooled connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lowercase hex SHA-256 of `token`.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        format!("{digest:x}")
    }

    /// Records a token issued at sign-in.
    ///
    /// # Errors
    ///
    /// Propagates `DbErr`; an unknown user fails the foreign key.
    pub async fn create(
        &self,
        id: &SessionId,
        user_id: &UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<sessions::Model, DbErr> {
        sessions::ActiveModel {
            id: Set(id.as_str().to_owned()),
            user_id: Set(user_id.as_str().to_owned()),
            token_hash: Set(Self::hash_token(token)),
            expires_at: Set(expires_at),
            revoked_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
    }

    /// The live session `id`, provided `token` is the one issued for it.
    ///
    /// # Errors
    ///
    /// Propagates `DbErr`.
    pub async fn find_active(
        &self,
        id: &SessionId,
        token: &str,
    ) -> Result<Option<sessions::Model>, DbErr> {
        live()
            .filter(sessions::Column::Id.eq(id.as_str()))
            .filter(sessions::Column::TokenHash.eq(Self::hash_token(token)))
            .one(&self.db)
            .await
    }

    /// Marks every unrevoked session of `user_id` as revoked now and returns
    /// how many were affected. Sign-out is global.
    ///
    /// # Errors
    ///
    /// Propagates `DbErr`.
    pub async fn revoke_all_user_sessions(&self, user_id: &UserId) -> Result<u64, DbErr> {
        sessions::Entity::update_many()
            .col_expr(sessions::Column::RevokedAt, Expr::value(Utc::now()))
            .filter(sessions::Column::UserId.eq(user_id.as_str()))
            .filter(sessions::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await
            .map(|res| res.rows_affected)
    }

    /// Number of live sessions held by `user_id`.
    ///
    /// # Errors
    ///
    /// Propagates `DbErr`.
    pub async fn count_active(&self, user_id: &UserId) -> Result<u64, DbErr> {
        live()
            .filter(sessions::Column::UserId.eq(user_id.as_str()))
            .count(&self.db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_digest_is_hex_sha256() {
        let digest = SessionRepository::hash_token("token");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, SessionRepository::hash_token("token"));
        assert_ne!(digest, SessionRepository::hash_token("other"));
    }
}
