//! Tag-based invalidation of cached read views.
//!
//! Readers that cache list or detail views key their entries with the
//! current generation of the tags they depend on. A mutation bumps the
//! generation of every affected tag and announces it on a pub/sub channel,
//! so stale entries stop being addressed and in-process caches can drop them.
//!
//! Invalidation is best-effort: it runs after the database commit and a
//! failure only widens the staleness window for other readers.

use fred::clients::Client as RedisClient;
use fred::interfaces::{KeysInterface, PubsubInterface};
use std::sync::Arc;
use tracing::debug;

use crate::{AppError, AppResult};

/// Well-known cache tags.
pub mod tags {
    /// Post listings and post detail views.
    pub const POSTS: &str = "posts";
    /// Comment listings.
    pub const COMMENTS: &str = "comments";
    /// Post reaction listings.
    pub const REACTIONS: &str = "reactions";
    /// Comment reaction listings.
    pub const COMMENT_REACTIONS: &str = "comment-reactions";
    /// Share listings.
    pub const SHARES: &str = "shares";
    /// Save listings.
    pub const SAVES: &str = "saves";

    /// Tag covering the reactions of one entity.
    #[must_use]
    pub fn reactions_of(entity_id: &str) -> String {
        format!("reactions:{entity_id}")
    }
}

/// Redis-backed tag generation store.
#[derive(Clone)]
pub struct RedisTagCache {
    redis: Arc<RedisClient>,
    prefix: String,
}

impl RedisTagCache {
    /// Create a new tag cache using the given key prefix.
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn generation_key(&self, tag: &str) -> String {
        format!("{}:cache-tag:{tag}", self.prefix)
    }

    fn channel(&self) -> String {
        format!("{}:cache-invalidate", self.prefix)
    }

    /// Current generation of a tag (0 if never invalidated).
    pub async fn generation(&self, tag: &str) -> AppResult<i64> {
        let value: Option<i64> = self
            .redis
            .get(self.generation_key(tag))
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        Ok(value.unwrap_or(0))
    }

    /// Bump a tag's generation and announce it.
    pub async fn invalidate(&self, tag: &str) -> AppResult<i64> {
        let generation: i64 = self
            .redis
            .incr(self.generation_key(tag))
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        let _: i64 = self
            .redis
            .publish(self.channel(), tag)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        debug!(tag = %tag, generation, "Invalidated cache tag");
        Ok(generation)
    }
}
