//! Share repository.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{GroupCount, is_unique_violation};
use crate::entities::{Share, share};
use friendful_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};

/// Share repository for database operations.
#[derive(Clone)]
pub struct ShareRepository {
    db: Arc<DatabaseConnection>,
}

impl ShareRepository {
    /// Create a new share repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's share of a post.
    pub async fn find_by_user_and_post(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> AppResult<Option<share::Model>> {
        Share::find()
            .filter(share::Column::UserId.eq(user_id))
            .filter(share::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a share. A concurrent duplicate surfaces as `Conflict`.
    pub async fn create(&self, model: share::ActiveModel) -> AppResult<share::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Post already shared".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Get shares of a post (paginated, newest first).
    pub async fn find_by_post(
        &self,
        post_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<share::Model>> {
        let mut query = Share::find()
            .filter(share::Column::PostId.eq(post_id))
            .order_by_desc(share::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(share::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count shares per post.
    pub async fn count_by_posts(&self, post_ids: &[String]) -> AppResult<HashMap<String, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Share::find()
            .select_only()
            .column_as(share::Column::PostId, "key")
            .column_as(Expr::col(share::Column::Id).count(), "count")
            .filter(share::Column::PostId.is_in(post_ids.to_vec()))
            .group_by(share::Column::PostId)
            .into_model::<GroupCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| (r.key, r.count)).collect())
    }

    /// Which of the given posts the user has shared.
    pub async fn find_post_ids_by_user(
        &self,
        user_id: &str,
        post_ids: &[String],
    ) -> AppResult<HashSet<String>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let shares = Share::find()
            .filter(share::Column::UserId.eq(user_id))
            .filter(share::Column::PostId.is_in(post_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(shares.into_iter().map(|s| s.post_id).collect())
    }
}
