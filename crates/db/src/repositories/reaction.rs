//! Reaction repository.
//!
//! Posts and comments share one reaction protocol. Everything that differs
//! between them (tables and the foreign-key column) is described by
//! [`ReactionTarget`], so the transactional write path exists once.

use std::collections::HashMap;
use std::sync::Arc;

use super::is_unique_violation;
use crate::entities::{
    CommentReaction, PostReaction, ReactionType, comment_reaction, post_reaction,
};
use async_trait::async_trait;
use friendful_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QueryResult, QuerySelect, TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::{Alias, Expr, LockType, Query},
};
use serde::{Deserialize, Serialize};

/// Kind of entity a reaction points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionTarget {
    Post,
    Comment,
}

impl ReactionTarget {
    /// Table holding the reactable entity and its counters.
    #[must_use]
    pub const fn entity_table(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }

    /// Table holding the per-user reaction rows.
    #[must_use]
    pub const fn reaction_table(self) -> &'static str {
        match self {
            Self::Post => "post_reaction",
            Self::Comment => "comment_reaction",
        }
    }

    /// Column in the reaction table referencing the entity.
    #[must_use]
    pub const fn target_column(self) -> &'static str {
        match self {
            Self::Post => "post_id",
            Self::Comment => "comment_id",
        }
    }
}

/// Per-type reaction counters of one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub like: i32,
    pub love: i32,
    pub care: i32,
    pub haha: i32,
    pub wow: i32,
    pub sad: i32,
    pub angry: i32,
}

impl ReactionCounts {
    /// Counter for one reaction type.
    #[must_use]
    pub const fn get(&self, reaction_type: ReactionType) -> i32 {
        match reaction_type {
            ReactionType::Like => self.like,
            ReactionType::Love => self.love,
            ReactionType::Care => self.care,
            ReactionType::Haha => self.haha,
            ReactionType::Wow => self.wow,
            ReactionType::Sad => self.sad,
            ReactionType::Angry => self.angry,
        }
    }

    /// Mutable counter for one reaction type.
    pub fn get_mut(&mut self, reaction_type: ReactionType) -> &mut i32 {
        match reaction_type {
            ReactionType::Like => &mut self.like,
            ReactionType::Love => &mut self.love,
            ReactionType::Care => &mut self.care,
            ReactionType::Haha => &mut self.haha,
            ReactionType::Wow => &mut self.wow,
            ReactionType::Sad => &mut self.sad,
            ReactionType::Angry => &mut self.angry,
        }
    }

    /// Sum over all reaction types.
    #[must_use]
    pub fn total(&self) -> i64 {
        ReactionType::ALL
            .iter()
            .map(|t| i64::from(self.get(*t)))
            .sum()
    }

    /// Apply a transition's counter deltas, saturating at zero.
    pub fn apply(&mut self, transition: ReactionTransition) {
        for (reaction_type, delta) in transition.counter_deltas() {
            let counter = self.get_mut(reaction_type);
            *counter = (*counter + delta).max(0);
        }
    }

    fn from_row(row: &QueryResult) -> Result<Self, DbErr> {
        let mut counts = Self::default();
        for reaction_type in ReactionType::ALL {
            *counts.get_mut(reaction_type) = row.try_get("", reaction_type.counter_column())?;
        }
        Ok(counts)
    }
}

impl From<&crate::entities::post::Model> for ReactionCounts {
    fn from(post: &crate::entities::post::Model) -> Self {
        Self {
            like: post.like_count,
            love: post.love_count,
            care: post.care_count,
            haha: post.haha_count,
            wow: post.wow_count,
            sad: post.sad_count,
            angry: post.angry_count,
        }
    }
}

impl From<&crate::entities::comment::Model> for ReactionCounts {
    fn from(comment: &crate::entities::comment::Model) -> Self {
        Self {
            like: comment.like_count,
            love: comment.love_count,
            care: comment.care_count,
            haha: comment.haha_count,
            wow: comment.wow_count,
            sad: comment.sad_count,
            angry: comment.angry_count,
        }
    }
}

/// A planned change to one user's reaction on one entity.
///
/// Each variant names the reaction it expects to find, which makes the
/// write a compare-and-swap over the current reaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTransition {
    /// No reaction exists; create one.
    Create(ReactionType),
    /// A reaction of this type exists; delete it.
    Remove(ReactionType),
    /// A reaction of type `from` exists; change it to `to`.
    Switch { from: ReactionType, to: ReactionType },
}

impl ReactionTransition {
    /// Reaction the transition expects to find.
    #[must_use]
    pub const fn expected(self) -> Option<ReactionType> {
        match self {
            Self::Create(_) => None,
            Self::Remove(t) => Some(t),
            Self::Switch { from, .. } => Some(from),
        }
    }

    /// Reaction left behind once the transition is applied.
    #[must_use]
    pub const fn resulting(self) -> Option<ReactionType> {
        match self {
            Self::Create(t) => Some(t),
            Self::Remove(_) => None,
            Self::Switch { to, .. } => Some(to),
        }
    }

    /// Counter changes implied by the transition.
    #[must_use]
    pub fn counter_deltas(self) -> Vec<(ReactionType, i32)> {
        match self {
            Self::Create(t) => vec![(t, 1)],
            Self::Remove(t) => vec![(t, -1)],
            Self::Switch { from, to } => vec![(from, -1), (to, 1)],
        }
    }
}

/// State of an entity after a committed reaction write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionSnapshot {
    pub counts: ReactionCounts,
    pub viewer_reaction: Option<ReactionType>,
}

/// Result of [`ReactionStore::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The transition was applied atomically.
    Committed(ReactionSnapshot),
    /// The entity no longer exists. Nothing was written.
    EntityMissing,
    /// The current reaction no longer matches the transition's expectation.
    /// Nothing was written.
    Conflict,
}

/// One reaction row, independent of the entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRecord {
    pub id: String,
    pub user_id: String,
    pub entity_id: String,
    pub reaction_type: ReactionType,
    pub created_at: DateTimeWithTimeZone,
}

impl From<post_reaction::Model> for ReactionRecord {
    fn from(r: post_reaction::Model) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            entity_id: r.post_id,
            reaction_type: r.reaction_type,
            created_at: r.created_at,
        }
    }
}

impl From<comment_reaction::Model> for ReactionRecord {
    fn from(r: comment_reaction::Model) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            entity_id: r.comment_id,
            reaction_type: r.reaction_type,
            created_at: r.created_at,
        }
    }
}

/// Storage contract for the reaction engine.
#[async_trait]
pub trait ReactionStore: Send + Sync {
    /// The user's current reaction on the entity, if any.
    async fn current_reaction(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ReactionType>>;

    /// Apply a transition and its counter updates as one atomic unit.
    async fn apply(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        user_id: &str,
        transition: ReactionTransition,
    ) -> AppResult<CommitOutcome>;

    /// Reactions on an entity, newest first, optionally of a single type.
    async fn list(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        filter: Option<ReactionType>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<ReactionRecord>>;

    /// The user's reactions on a batch of entities, keyed by entity ID.
    async fn viewer_reactions(
        &self,
        target: ReactionTarget,
        user_id: &str,
        entity_ids: &[String],
    ) -> AppResult<HashMap<String, ReactionType>>;
}

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

fn db_err(e: DbErr) -> AppError {
    AppError::Database(e.to_string())
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Lock the entity row; `false` if it does not exist.
    async fn lock_entity(
        txn: &DatabaseTransaction,
        target: ReactionTarget,
        entity_id: &str,
    ) -> Result<bool, DbErr> {
        let stmt = Query::select()
            .column(Alias::new("id"))
            .from(Alias::new(target.entity_table()))
            .and_where(Expr::col(Alias::new("id")).eq(entity_id))
            .lock(LockType::Update)
            .to_owned();
        let backend = txn.get_database_backend();
        Ok(txn.query_one(backend.build(&stmt)).await?.is_some())
    }

    /// Write the reaction row change; `false` if the expected state was not found.
    async fn swap_reaction(
        &self,
        txn: &DatabaseTransaction,
        target: ReactionTarget,
        entity_id: &str,
        user_id: &str,
        transition: ReactionTransition,
    ) -> Result<bool, DbErr> {
        let backend = txn.get_database_backend();
        let table = Alias::new(target.reaction_table());
        let target_col = Alias::new(target.target_column());

        let stmt = match transition {
            ReactionTransition::Create(reaction_type) => {
                let insert = Query::insert()
                    .into_table(table)
                    .columns([
                        Alias::new("id"),
                        Alias::new("user_id"),
                        target_col,
                        Alias::new("reaction_type"),
                    ])
                    .values([
                        self.id_gen.generate().into(),
                        user_id.into(),
                        entity_id.into(),
                        reaction_type.as_str().into(),
                    ])
                    .map_err(|e| DbErr::Custom(e.to_string()))?
                    .to_owned();
                backend.build(&insert)
            }
            ReactionTransition::Remove(reaction_type) => {
                let delete = Query::delete()
                    .from_table(table)
                    .and_where(Expr::col(Alias::new("user_id")).eq(user_id))
                    .and_where(Expr::col(target_col).eq(entity_id))
                    .and_where(Expr::col(Alias::new("reaction_type")).eq(reaction_type.as_str()))
                    .to_owned();
                backend.build(&delete)
            }
            ReactionTransition::Switch { from, to } => {
                let update = Query::update()
                    .table(table)
                    .value(Alias::new("reaction_type"), to.as_str())
                    .and_where(Expr::col(Alias::new("user_id")).eq(user_id))
                    .and_where(Expr::col(target_col).eq(entity_id))
                    .and_where(Expr::col(Alias::new("reaction_type")).eq(from.as_str()))
                    .to_owned();
                backend.build(&update)
            }
        };

        match txn.execute(stmt).await {
            Ok(result) => Ok(result.rows_affected() == 1),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Apply counter deltas in the database, never going below zero.
    async fn update_counters(
        txn: &DatabaseTransaction,
        target: ReactionTarget,
        entity_id: &str,
        transition: ReactionTransition,
    ) -> Result<ReactionCounts, DbErr> {
        let backend = txn.get_database_backend();
        let table = Alias::new(target.entity_table());

        let mut update = Query::update();
        update.table(table.clone());
        for (reaction_type, delta) in transition.counter_deltas() {
            let column = reaction_type.counter_column();
            if delta > 0 {
                update.value(Alias::new(column), Expr::col(Alias::new(column)).add(delta));
            } else {
                update.value(
                    Alias::new(column),
                    Expr::cust(format!("GREATEST({column} - 1, 0)")),
                );
            }
        }
        update.and_where(Expr::col(Alias::new("id")).eq(entity_id));
        txn.execute(backend.build(&update)).await?;

        let select = Query::select()
            .columns(ReactionType::ALL.map(|t| Alias::new(t.counter_column())))
            .from(table)
            .and_where(Expr::col(Alias::new("id")).eq(entity_id))
            .to_owned();
        let row = txn
            .query_one(backend.build(&select))
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(entity_id.to_string()))?;
        ReactionCounts::from_row(&row)
    }

    async fn apply_in_txn(
        &self,
        txn: &DatabaseTransaction,
        target: ReactionTarget,
        entity_id: &str,
        user_id: &str,
        transition: ReactionTransition,
    ) -> Result<CommitOutcome, DbErr> {
        if !Self::lock_entity(txn, target, entity_id).await? {
            return Ok(CommitOutcome::EntityMissing);
        }

        if !self
            .swap_reaction(txn, target, entity_id, user_id, transition)
            .await?
        {
            return Ok(CommitOutcome::Conflict);
        }

        let counts = Self::update_counters(txn, target, entity_id, transition).await?;
        Ok(CommitOutcome::Committed(ReactionSnapshot {
            counts,
            viewer_reaction: transition.resulting(),
        }))
    }
}

#[async_trait]
impl ReactionStore for ReactionRepository {
    async fn current_reaction(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ReactionType>> {
        let current = match target {
            ReactionTarget::Post => PostReaction::find()
                .filter(post_reaction::Column::UserId.eq(user_id))
                .filter(post_reaction::Column::PostId.eq(entity_id))
                .one(self.db.as_ref())
                .await
                .map_err(db_err)?
                .map(|r| r.reaction_type),
            ReactionTarget::Comment => CommentReaction::find()
                .filter(comment_reaction::Column::UserId.eq(user_id))
                .filter(comment_reaction::Column::CommentId.eq(entity_id))
                .one(self.db.as_ref())
                .await
                .map_err(db_err)?
                .map(|r| r.reaction_type),
        };
        Ok(current)
    }

    async fn apply(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        user_id: &str,
        transition: ReactionTransition,
    ) -> AppResult<CommitOutcome> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let outcome = match self
            .apply_in_txn(&txn, target, entity_id, user_id, transition)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        "Failed to roll back reaction transaction"
                    );
                }
                return Err(db_err(e));
            }
        };

        if matches!(outcome, CommitOutcome::Committed(_)) {
            txn.commit().await.map_err(db_err)?;
        } else {
            txn.rollback().await.map_err(db_err)?;
        }

        Ok(outcome)
    }

    async fn list(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        filter: Option<ReactionType>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<ReactionRecord>> {
        match target {
            ReactionTarget::Post => {
                let mut query = PostReaction::find()
                    .filter(post_reaction::Column::PostId.eq(entity_id))
                    .order_by_desc(post_reaction::Column::Id);
                if let Some(t) = filter {
                    query = query.filter(post_reaction::Column::ReactionType.eq(t));
                }
                if let Some(id) = until_id {
                    query = query.filter(post_reaction::Column::Id.lt(id));
                }
                let rows = query
                    .limit(limit)
                    .all(self.db.as_ref())
                    .await
                    .map_err(db_err)?;
                Ok(rows.into_iter().map(Into::into).collect())
            }
            ReactionTarget::Comment => {
                let mut query = CommentReaction::find()
                    .filter(comment_reaction::Column::CommentId.eq(entity_id))
                    .order_by_desc(comment_reaction::Column::Id);
                if let Some(t) = filter {
                    query = query.filter(comment_reaction::Column::ReactionType.eq(t));
                }
                if let Some(id) = until_id {
                    query = query.filter(comment_reaction::Column::Id.lt(id));
                }
                let rows = query
                    .limit(limit)
                    .all(self.db.as_ref())
                    .await
                    .map_err(db_err)?;
                Ok(rows.into_iter().map(Into::into).collect())
            }
        }
    }

    async fn viewer_reactions(
        &self,
        target: ReactionTarget,
        user_id: &str,
        entity_ids: &[String],
    ) -> AppResult<HashMap<String, ReactionType>> {
        if entity_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let reactions = match target {
            ReactionTarget::Post => PostReaction::find()
                .filter(post_reaction::Column::UserId.eq(user_id))
                .filter(post_reaction::Column::PostId.is_in(entity_ids.to_vec()))
                .all(self.db.as_ref())
                .await
                .map_err(db_err)?
                .into_iter()
                .map(|r| (r.post_id, r.reaction_type))
                .collect(),
            ReactionTarget::Comment => CommentReaction::find()
                .filter(comment_reaction::Column::UserId.eq(user_id))
                .filter(comment_reaction::Column::CommentId.is_in(entity_ids.to_vec()))
                .all(self.db.as_ref())
                .await
                .map_err(db_err)?
                .into_iter()
                .map(|r| (r.comment_id, r.reaction_type))
                .collect(),
        };
        Ok(reactions)
    }
}
