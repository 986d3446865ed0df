//! Profile repository for database operations.

use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};

use quill_core::blog::Profile;
use quill_shared::types::UserId;

use crate::entities::profiles;

/// Profile repository.
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    db: DatabaseConnection,
}

impl ProfileRepository {
    /// Creates a new profile repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds the profile of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, user_id: &UserId) -> Result<Option<profiles::Model>, DbErr> {
        profiles::Entity::find_by_id(user_id.as_str())
            .one(&self.db)
            .await
    }

    /// Inserts a profile. A second profile for the same user is a
    /// primary-key violation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, profile: &Profile) -> Result<profiles::Model, DbErr> {
        profiles::ActiveModel {
            user_id: Set(profile.user_id.as_str().to_string()),
            name: Set(profile.name.clone()),
            email: Set(profile.email.clone()),
            bio: Set(profile.bio.clone()),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&self.db)
        .await
    }
}
