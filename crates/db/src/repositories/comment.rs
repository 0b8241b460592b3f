//! Comment repository.

use std::collections::HashMap;
use std::sync::Arc;

use super::GroupCount;
use crate::entities::{Comment, comment};
use friendful_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::CommentNotFound(id.to_string()))
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get comments on a post (paginated, newest first).
    ///
    /// `parent_id = None` lists top-level comments, otherwise the direct
    /// replies to that comment.
    pub async fn find_by_post(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::Id);

        query = match parent_id {
            Some(parent) => query.filter(comment::Column::ParentId.eq(parent)),
            None => query.filter(comment::Column::ParentId.is_null()),
        };

        if let Some(id) = until_id {
            query = query.filter(comment::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all comments (including replies) per post.
    pub async fn count_by_posts(&self, post_ids: &[String]) -> AppResult<HashMap<String, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Comment::find()
            .select_only()
            .column_as(comment::Column::PostId, "key")
            .column_as(Expr::col(comment::Column::Id).count(), "count")
            .filter(comment::Column::PostId.is_in(post_ids.to_vec()))
            .group_by(comment::Column::PostId)
            .into_model::<GroupCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| (r.key, r.count)).collect())
    }

    /// Count direct replies per comment.
    pub async fn count_children(&self, comment_ids: &[String]) -> AppResult<HashMap<String, i64>> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Comment::find()
            .select_only()
            .column_as(comment::Column::ParentId, "key")
            .column_as(Expr::col(comment::Column::Id).count(), "count")
            .filter(comment::Column::ParentId.is_in(comment_ids.to_vec()))
            .group_by(comment::Column::ParentId)
            .into_model::<GroupCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| (r.key, r.count)).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use serde_json::json;

    fn create_test_comment(id: &str, post_id: &str, parent_id: Option<&str>) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            post_id: post_id.to_string(),
            author_id: "user1".to_string(),
            parent_id: parent_id.map(str::to_string),
            content: Some("Nice".to_string()),
            images: json!([]),
            like_count: 0,
            love_count: 0,
            care_count: 0,
            haha_count: 0,
            wow_count: 0,
            sad_count: 0,
            angry_count: 0,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_replies() {
        let c1 = create_test_comment("c3", "post1", Some("c1"));
        let c2 = create_test_comment("c2", "post1", Some("c1"));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c1, c2]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo
            .find_by_post("post1", Some("c1"), 10, None)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|c| c.parent_id.as_deref() == Some("c1")));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::CommentNotFound(_))));
    }

    #[tokio::test]
    async fn test_count_by_posts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    btreemap! { "key" => Value::from("post1"), "count" => Value::from(3_i64) },
                    btreemap! { "key" => Value::from("post2"), "count" => Value::from(1_i64) },
                ]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let counts = repo
            .count_by_posts(&["post1".to_string(), "post2".to_string()])
            .await
            .unwrap();

        assert_eq!(counts.get("post1"), Some(&3));
        assert_eq!(counts.get("post2"), Some(&1));
    }
}
