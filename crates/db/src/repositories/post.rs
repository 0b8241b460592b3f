//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, post};
use friendful_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post. Comments, reactions, shares and saves cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get the global timeline (paginated, newest first).
    pub async fn find_timeline(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find().order_by_desc(post::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(post::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get posts by an author (paginated, newest first).
    pub async fn find_by_author(
        &self,
        author_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut query = Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .order_by_desc(post::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(post::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    pub fn create_test_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            content: Some("Hello".to_string()),
            images: json!([]),
            like_count: 0,
            love_count: 0,
            care_count: 0,
            haha_count: 0,
            wow_count: 0,
            sad_count: 0,
            angry_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_find_timeline() {
        let p1 = create_test_post("post2", "user1");
        let p2 = create_test_post("post1", "user2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p1, p2]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.find_timeline(10, Some("post3")).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "post2");
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        assert!(repo.delete("post1").await.is_ok());
    }
}
