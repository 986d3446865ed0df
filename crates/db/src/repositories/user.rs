//! Accounts of the self-hosted provider.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};

use quill_shared::types::UserId;

use crate::entities::users;

/// Reads and writes rows of `users`. Emails are expected lowercased by the caller.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Wraps a pooled connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn by_email(email: &str) -> sea_orm::Select<users::Entity> {
        users::Entity::find().filter(users::Column::Email.eq(email))
    }

    /// Account registered under `email`, used at sign-in.
    ///
    /// # Errors
    ///
    /// Propagates `DbErr`.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        Self::by_email(email).one(&self.db).await
    }

    /// Account behind a validated session.
    ///
    /// # Errors
    ///
    /// Propagates `DbErr`.
    pub async fn find_by_id(&self, id: &UserId) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id.as_str()).one(&self.db).await
    }

    /// Inserts an account with a fresh ID. A duplicate email surfaces as a
    /// unique-constraint `DbErr`.
    ///
    /// # Errors
    ///
    /// Propagates `DbErr`.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<users::Model, DbErr> {
        let registered_at = Utc::now();
        users::ActiveModel {
            id: Set(UserId::unique().into_inner()),
            email: Set(email.to_owned()),
            password_hash: Set(password_hash.to_owned()),
            name: Set(name.to_owned()),
            created_at: Set(registered_at),
            updated_at: Set(registered_at),
        }
        .insert(&self.db)
        .await
    }

    /// Whether `email` is taken.
    ///
    /// # Errors
    ///
    /// Propagates `DbErr`.
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        Ok(Self::by_email(email).count(&self.db).await? > 0)
    }
}
