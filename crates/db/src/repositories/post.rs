//! Post repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use quill_core::blog::{ImageRef, NewPost, PostPatch, PostQuery};
use quill_shared::types::PostId;

use crate::entities::posts;

/// Post repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct PostRepository {
    db: DatabaseConnection,
}

/// Splits an image reference into the `(image_id, image_url)` columns.
fn image_columns(image: Option<&ImageRef>) -> (Option<String>, Option<String>) {
    match image {
        Some(ImageRef::File(id)) => (Some(id.as_str().to_string()), None),
        Some(ImageRef::Url(url)) => (None, Some(url.clone())),
        None => (None, None),
    }
}

impl PostRepository {
    /// Creates a new post repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists posts newest first.
    ///
    /// Ties on `created_at` are broken by ID, which is time-ordered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, query: &PostQuery) -> Result<Vec<posts::Model>, DbErr> {
        let mut select = posts::Entity::find();
        if let Some(author_id) = &query.author_id {
            select = select.filter(posts::Column::AuthorId.eq(author_id.as_str()));
        }

        select
            .order_by_desc(posts::Column::CreatedAt)
            .order_by_desc(posts::Column::Id)
            .limit(u64::from(query.limit))
            .all(&self.db)
            .await
    }

    /// Finds a post by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, id: &PostId) -> Result<Option<posts::Model>, DbErr> {
        posts::Entity::find_by_id(id.as_str()).one(&self.db).await
    }

    /// Inserts a post with a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, post: &NewPost) -> Result<posts::Model, DbErr> {
        let now = chrono::Utc::now();
        let (image_id, image_url) = image_columns(post.image.as_ref());

        posts::ActiveModel {
            id: Set(PostId::unique().into_inner()),
            title: Set(post.title.clone()),
            content: Set(post.content.clone()),
            image_id: Set(image_id),
            image_url: Set(image_url),
            author_id: Set(post.author_id.as_str().to_string()),
            author_name: Set(post.author_name.clone()),
            published: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
    }

    /// Applies a partial update. Returns `None` when the post does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn update(
        &self,
        id: &PostId,
        patch: &PostPatch,
    ) -> Result<Option<posts::Model>, DbErr> {
        let Some(existing) = self.find(id).await? else {
            return Ok(None);
        };

        let mut active = existing.into_active_model();
        if let Some(title) = &patch.title {
            active.title = Set(title.clone());
        }
        if let Some(content) = &patch.content {
            active.content = Set(content.clone());
        }
        if let Some(image) = &patch.image {
            let (image_id, image_url) = image_columns(Some(image));
            active.image_id = Set(image_id);
            active.image_url = Set(image_url);
        }
        if let Some(published) = patch.published {
            active.published = Set(published);
        }
        active.updated_at = Set(chrono::Utc::now());

        active.update(&self.db).await.map(Some)
    }

    /// Deletes a post. Returns `false` when nothing was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete(&self, id: &PostId) -> Result<bool, DbErr> {
        let result = posts::Entity::delete_by_id(id.as_str())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
