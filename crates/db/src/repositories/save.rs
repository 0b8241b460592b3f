//! Save (bookmark) repository.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{GroupCount, is_unique_violation};
use crate::entities::{Save, save};
use friendful_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};

/// Save repository for database operations.
#[derive(Clone)]
pub struct SaveRepository {
    db: Arc<DatabaseConnection>,
}

impl SaveRepository {
    /// Create a new save repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's save of a post.
    pub async fn find_by_user_and_post(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> AppResult<Option<save::Model>> {
        Save::find()
            .filter(save::Column::UserId.eq(user_id))
            .filter(save::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a save. A concurrent duplicate surfaces as `Conflict`.
    pub async fn create(&self, model: save::ActiveModel) -> AppResult<save::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Post already saved".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a save by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Save::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get saves of a post (paginated, newest first).
    pub async fn find_by_post(
        &self,
        post_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<save::Model>> {
        let mut query = Save::find()
            .filter(save::Column::PostId.eq(post_id))
            .order_by_desc(save::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(save::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count saves per post.
    pub async fn count_by_posts(&self, post_ids: &[String]) -> AppResult<HashMap<String, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Save::find()
            .select_only()
            .column_as(save::Column::PostId, "key")
            .column_as(Expr::col(save::Column::Id).count(), "count")
            .filter(save::Column::PostId.is_in(post_ids.to_vec()))
            .group_by(save::Column::PostId)
            .into_model::<GroupCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| (r.key, r.count)).collect())
    }

    /// Which of the given posts the user has saved.
    pub async fn find_post_ids_by_user(
        &self,
        user_id: &str,
        post_ids: &[String],
    ) -> AppResult<HashSet<String>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let saves = Save::find()
            .filter(save::Column::UserId.eq(user_id))
            .filter(save::Column::PostId.is_in(post_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(saves.into_iter().map(|s| s.post_id).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_save(id: &str, user_id: &str, post_id: &str) -> save::Model {
        save::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_post() {
        let s1 = create_test_save("s2", "user2", "post1");
        let s2 = create_test_save("s1", "user1", "post1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[s1, s2]])
                .into_connection(),
        );

        let repo = SaveRepository::new(db);
        let result = repo.find_by_post("post1", 10, None).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].user_id, "user2");
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

        let repo = SaveRepository::new(db);
        assert!(repo.delete("s1").await.is_ok());
    }
}
