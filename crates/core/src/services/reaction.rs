//! Reaction engine.
//!
//! Enforces one reaction per user per post or comment and keeps the
//! per-type counters in step with the reaction rows. A toggle reads the
//! user's current reaction, plans a transition, and hands it to the store,
//! which applies it as a compare-and-swap. When another request changed the
//! reaction in between, the engine re-reads and re-plans once.

use crate::services::cache::{CacheInvalidatorService, invalidate_tags};
use crate::services::pagination::Page;
use friendful_common::{AppError, AppResult, tags};
use friendful_db::{
    entities::ReactionType,
    repositories::{
        CommitOutcome, ReactionCounts, ReactionRecord, ReactionStore, ReactionTarget,
        ReactionTransition,
    },
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Attempts per toggle: the first try plus one re-plan after a conflict.
const MAX_ATTEMPTS: u32 = 2;

/// Result of a mutation that targets an entity which may have been deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome<T> {
    /// The mutation committed; carries the refreshed view.
    Updated(T),
    /// The entity no longer exists. Nothing was written.
    Deleted,
}

impl<T> ToggleOutcome<T> {
    /// Transform the updated view.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ToggleOutcome<U> {
        match self {
            Self::Updated(view) => ToggleOutcome::Updated(f(view)),
            Self::Deleted => ToggleOutcome::Deleted,
        }
    }
}

/// Counters and the acting user's reaction right after a toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub entity_id: String,
    pub counts: ReactionCounts,
    pub viewer_reaction: Option<ReactionType>,
}

/// Parse a reaction type name.
pub fn parse_reaction_type(value: &str) -> AppResult<ReactionType> {
    value
        .parse()
        .map_err(|e: friendful_db::entities::UnknownReactionType| {
            AppError::Validation(e.to_string())
        })
}

/// Parse a listing filter: `all` (or nothing) or one reaction type.
pub fn parse_reaction_filter(value: Option<&str>) -> AppResult<Option<ReactionType>> {
    match value {
        None | Some("all") => Ok(None),
        Some(name) => parse_reaction_type(name).map(Some),
    }
}

/// Decide what a toggle does given the user's current reaction.
///
/// - No reaction: create the requested one.
/// - The primary action, or re-selecting the current type: remove it.
/// - Selecting a different type: switch to it.
#[must_use]
pub fn plan_transition(
    current: Option<ReactionType>,
    requested: ReactionType,
    is_primary_action: bool,
) -> ReactionTransition {
    match current {
        None => ReactionTransition::Create(requested),
        Some(existing) if is_primary_action || existing == requested => {
            ReactionTransition::Remove(existing)
        }
        Some(existing) => ReactionTransition::Switch {
            from: existing,
            to: requested,
        },
    }
}

/// Tags whose cached views depend on an entity's reactions.
#[must_use]
pub fn affected_tags(target: ReactionTarget, entity_id: &str) -> Vec<String> {
    let (listing, reactions) = match target {
        ReactionTarget::Post => (tags::POSTS, tags::REACTIONS),
        ReactionTarget::Comment => (tags::COMMENTS, tags::COMMENT_REACTIONS),
    };
    vec![
        listing.to_string(),
        reactions.to_string(),
        tags::reactions_of(entity_id),
    ]
}

/// Reaction engine shared by posts and comments.
#[derive(Clone)]
pub struct ReactionEngine {
    store: Arc<dyn ReactionStore>,
    cache: CacheInvalidatorService,
}

impl ReactionEngine {
    /// Create a new reaction engine.
    #[must_use]
    pub fn new(store: Arc<dyn ReactionStore>, cache: CacheInvalidatorService) -> Self {
        Self { store, cache }
    }

    /// Toggle or switch `user_id`'s reaction on an entity.
    ///
    /// Returns [`ToggleOutcome::Deleted`] when the entity does not exist.
    pub async fn toggle_reaction(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        user_id: &str,
        requested_type: &str,
        is_primary_action: bool,
    ) -> AppResult<ToggleOutcome<ReactionSummary>> {
        if entity_id.trim().is_empty() {
            return Err(AppError::Validation("Entity ID is required".to_string()));
        }
        if user_id.trim().is_empty() {
            return Err(AppError::Validation("User ID is required".to_string()));
        }
        let requested = parse_reaction_type(requested_type)?;

        for attempt in 1..=MAX_ATTEMPTS {
            let current = self
                .store
                .current_reaction(target, entity_id, user_id)
                .await?;
            let transition = plan_transition(current, requested, is_primary_action);

            match self
                .store
                .apply(target, entity_id, user_id, transition)
                .await?
            {
                CommitOutcome::Committed(snapshot) => {
                    info!(
                        kind = ?target,
                        entity_id = %entity_id,
                        user_id = %user_id,
                        transition = ?transition,
                        "Reaction updated"
                    );
                    invalidate_tags(self.cache.as_ref(), &affected_tags(target, entity_id))
                        .await;
                    return Ok(ToggleOutcome::Updated(ReactionSummary {
                        entity_id: entity_id.to_string(),
                        counts: snapshot.counts,
                        viewer_reaction: snapshot.viewer_reaction,
                    }));
                }
                CommitOutcome::EntityMissing => {
                    debug!(kind = ?target, entity_id = %entity_id, "Reaction target is gone");
                    return Ok(ToggleOutcome::Deleted);
                }
                CommitOutcome::Conflict => {
                    debug!(
                        kind = ?target,
                        entity_id = %entity_id,
                        user_id = %user_id,
                        attempt,
                        "Reaction changed concurrently"
                    );
                }
            }
        }

        Err(AppError::Conflict(
            "Reaction changed concurrently, try again".to_string(),
        ))
    }

    /// Reactions on an entity, newest first.
    pub async fn reactions(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        filter: Option<ReactionType>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Page<ReactionRecord>> {
        let records = self
            .store
            .list(target, entity_id, filter, limit, until_id)
            .await?;
        Ok(Page::new(records, limit))
    }
}
