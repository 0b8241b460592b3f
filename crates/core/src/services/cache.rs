//! Cache invalidation collaborator.
//!
//! Mutating services announce which cached read views went stale. The Redis
//! implementation lives in the common crate; this trait keeps the services
//! independent of it.

use async_trait::async_trait;
use friendful_common::{AppResult, RedisTagCache};
use std::sync::Arc;

/// Trait for invalidating cache tags after a committed write.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Mark every cached view carrying `tag` as stale.
    async fn invalidate(&self, tag: &str) -> AppResult<()>;
}

/// A no-op implementation for tests or when no cache is configured.
#[derive(Clone, Default)]
pub struct NoOpCacheInvalidator;

#[async_trait]
impl CacheInvalidator for NoOpCacheInvalidator {
    async fn invalidate(&self, _tag: &str) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CacheInvalidator for RedisTagCache {
    async fn invalidate(&self, tag: &str) -> AppResult<()> {
        Self::invalidate(self, tag).await.map(|_| ())
    }
}

/// Wrapper for boxed `CacheInvalidator` trait object.
pub type CacheInvalidatorService = Arc<dyn CacheInvalidator>;

/// Invalidate a set of tags, logging failures instead of returning them.
///
/// Runs after the write has committed, so a failure cannot be rolled back
/// and must not fail the request.
pub async fn invalidate_tags<S: AsRef<str> + Sync>(cache: &dyn CacheInvalidator, tags: &[S]) {
    for tag in tags {
        let tag = tag.as_ref();
        if let Err(e) = cache.invalidate(tag).await {
            tracing::warn!(error = %e, tag = %tag, "Failed to invalidate cache tag");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingCacheInvalidator;
    use super::*;
    use friendful_common::AppError;

    struct FailingCacheInvalidator;

    #[async_trait]
    impl CacheInvalidator for FailingCacheInvalidator {
        async fn invalidate(&self, _tag: &str) -> AppResult<()> {
            Err(AppError::Redis("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_invalidate_tags_in_order() {
        let cache = RecordingCacheInvalidator::default();
        invalidate_tags(&cache, &["posts", "reactions"]).await;
        assert_eq!(cache.tags(), vec!["posts", "reactions"]);
    }

    #[tokio::test]
    async fn test_invalidate_tags_swallows_failures() {
        invalidate_tags(&FailingCacheInvalidator, &["posts".to_string()]).await;
    }
}
