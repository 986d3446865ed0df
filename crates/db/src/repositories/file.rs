//! File repository: metadata of images written to object storage.

use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};

use quill_shared::types::FileId;

use crate::entities::files;

/// Input for recording a stored file.
#[derive(Debug, Clone)]
pub struct CreateFileInput {
    /// File ID.
    pub id: FileId,
    /// Logical bucket.
    pub bucket: String,
    /// Object storage key.
    pub storage_key: String,
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
}

/// File repository.
#[derive(Debug, Clone)]
pub struct FileRepository {
    db: DatabaseConnection,
}

impl FileRepository {
    /// Creates a new file repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a stored file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, input: CreateFileInput) -> Result<files::Model, DbErr> {
        files::ActiveModel {
            id: Set(input.id.into_inner()),
            bucket: Set(input.bucket),
            storage_key: Set(input.storage_key),
            filename: Set(input.filename),
            content_type: Set(input.content_type),
            size: Set(i64::try_from(input.size).unwrap_or(i64::MAX)),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&self.db)
        .await
    }

    /// Finds a file by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, id: &FileId) -> Result<Option<files::Model>, DbErr> {
        files::Entity::find_by_id(id.as_str()).one(&self.db).await
    }
}
