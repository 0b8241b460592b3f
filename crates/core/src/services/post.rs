//! Post service.

use std::sync::Arc;

use crate::services::cache::{CacheInvalidatorService, invalidate_tags};
use crate::services::pagination::Page;
use crate::services::reaction::{ReactionEngine, ToggleOutcome};
use crate::services::views::{
    Image, PostView, ReactionView, UserEntryView, UserSummary, index_users, with_users,
};
use chrono::Utc;
use friendful_common::{AppError, AppResult, IdGenerator, tags};
use friendful_db::{
    entities::{ReactionType, post, save, share},
    repositories::{
        CommentRepository, PostRepository, ReactionStore, ReactionTarget, SaveRepository,
        ShareRepository, UserRepository,
    },
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::{debug, info};
use validator::Validate;

/// Input for creating a new post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(max = 5000))]
    pub text: Option<String>,

    #[validate(length(max = 10))]
    #[validate(nested)]
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Trim the text and require it when nothing else is attached.
pub(crate) fn normalize_content(
    text: Option<String>,
    images: &[Image],
) -> AppResult<Option<String>> {
    let text = text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if text.is_none() && images.is_empty() {
        return Err(AppError::Validation(
            "Text is required when no images are attached".to_string(),
        ));
    }
    Ok(text)
}

pub(crate) fn images_json(images: &[Image]) -> AppResult<serde_json::Value> {
    serde_json::to_value(images).map_err(|e| AppError::Internal(e.to_string()))
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    share_repo: ShareRepository,
    save_repo: SaveRepository,
    user_repo: UserRepository,
    reactions: Arc<dyn ReactionStore>,
    engine: ReactionEngine,
    cache: CacheInvalidatorService,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        share_repo: ShareRepository,
        save_repo: SaveRepository,
        user_repo: UserRepository,
        reactions: Arc<dyn ReactionStore>,
        cache: CacheInvalidatorService,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            share_repo,
            save_repo,
            user_repo,
            engine: ReactionEngine::new(reactions.clone(), cache.clone()),
            reactions,
            cache,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new post.
    pub async fn create(&self, author_id: &str, input: CreatePostInput) -> AppResult<PostView> {
        input.validate()?;
        let content = normalize_content(input.text, &input.images)?;
        let author = self.user_repo.get_by_id(author_id).await?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author_id.to_string()),
            content: Set(content),
            images: Set(images_json(&input.images)?),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let post = self.post_repo.create(model).await?;
        info!(post_id = %post.id, author_id = %author_id, "Post created");

        invalidate_tags(self.cache.as_ref(), &[tags::POSTS]).await;
        Ok(PostView::new(post, UserSummary::from(&author)))
    }

    /// Get a post as seen by `viewer_id`.
    pub async fn show(&self, post_id: &str, viewer_id: Option<&str>) -> AppResult<PostView> {
        let post = self.post_repo.get_by_id(post_id).await?;
        self.build_views(vec![post], viewer_id)
            .await?
            .pop()
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))
    }

    /// Get the global timeline.
    pub async fn timeline(
        &self,
        viewer_id: Option<&str>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Page<PostView>> {
        let page = Page::new(self.post_repo.find_timeline(limit, until_id).await?, limit);
        Ok(Page {
            items: self.build_views(page.items, viewer_id).await?,
            has_more: page.has_more,
        })
    }

    /// Delete a post. Only its author may do so.
    pub async fn delete(&self, post_id: &str, user_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.author_id != user_id {
            return Err(AppError::Forbidden(
                "Cannot delete another user's post".to_string(),
            ));
        }

        self.post_repo.delete(post_id).await?;
        info!(post_id = %post_id, "Post deleted");

        invalidate_tags(
            self.cache.as_ref(),
            &[
                tags::POSTS.to_string(),
                tags::COMMENTS.to_string(),
                tags::reactions_of(post_id),
            ],
        )
        .await;
        Ok(())
    }

    /// Toggle or switch the user's reaction on a post.
    pub async fn toggle_reaction(
        &self,
        post_id: &str,
        user_id: &str,
        requested_type: &str,
        is_primary_action: bool,
    ) -> AppResult<ToggleOutcome<PostView>> {
        let summary = match self
            .engine
            .toggle_reaction(
                ReactionTarget::Post,
                post_id,
                user_id,
                requested_type,
                is_primary_action,
            )
            .await?
        {
            ToggleOutcome::Updated(summary) => summary,
            ToggleOutcome::Deleted => return Ok(ToggleOutcome::Deleted),
        };

        Ok(self.view_after_write(post_id, user_id).await?.map(|mut view| {
            view.reactions = summary.counts;
            view.total_reactions = summary.counts.total();
            view.viewer_reaction = summary.viewer_reaction;
            view
        }))
    }

    /// Reactions on a post, newest first.
    pub async fn reactions(
        &self,
        post_id: &str,
        filter: Option<ReactionType>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Page<ReactionView>> {
        let page = self
            .engine
            .reactions(ReactionTarget::Post, post_id, filter, limit, until_id)
            .await?;
        with_users(&self.user_repo, page, |r| r.user_id.as_str(), ReactionView::new).await
    }

    /// Share a post. Sharing an already shared post changes nothing.
    pub async fn share(&self, post_id: &str, user_id: &str) -> AppResult<ToggleOutcome<PostView>> {
        if self.post_repo.find_by_id(post_id).await?.is_none() {
            return Ok(ToggleOutcome::Deleted);
        }

        if self
            .share_repo
            .find_by_user_and_post(user_id, post_id)
            .await?
            .is_none()
        {
            let model = share::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user_id.to_string()),
                post_id: Set(post_id.to_string()),
                created_at: Set(Utc::now().into()),
            };

            match self.share_repo.create(model).await {
                Ok(_) => {
                    info!(post_id = %post_id, user_id = %user_id, "Post shared");
                    invalidate_tags(self.cache.as_ref(), &[tags::POSTS, tags::SHARES]).await;
                }
                // A racing request inserted the same share first.
                Err(e) => {
                    if self
                        .share_repo
                        .find_by_user_and_post(user_id, post_id)
                        .await?
                        .is_none()
                    {
                        return self.deleted_or(post_id, e).await;
                    }
                    debug!(post_id = %post_id, user_id = %user_id, "Post already shared");
                }
            }
        }

        self.view_after_write(post_id, user_id).await
    }

    /// Save a post, or remove the save if it exists.
    pub async fn toggle_save(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<ToggleOutcome<PostView>> {
        if self.post_repo.find_by_id(post_id).await?.is_none() {
            return Ok(ToggleOutcome::Deleted);
        }

        if let Some(existing) = self.save_repo.find_by_user_and_post(user_id, post_id).await? {
            self.save_repo.delete(&existing.id).await?;
            info!(post_id = %post_id, user_id = %user_id, "Post unsaved");
        } else {
            let model = save::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user_id.to_string()),
                post_id: Set(post_id.to_string()),
                created_at: Set(Utc::now().into()),
            };

            match self.save_repo.create(model).await {
                Ok(_) => info!(post_id = %post_id, user_id = %user_id, "Post saved"),
                Err(AppError::Conflict(_)) => {
                    debug!(post_id = %post_id, user_id = %user_id, "Post already saved");
                    return self.view_after_write(post_id, user_id).await;
                }
                Err(e) => return self.deleted_or(post_id, e).await,
            }
        }

        invalidate_tags(self.cache.as_ref(), &[tags::POSTS, tags::SAVES]).await;
        self.view_after_write(post_id, user_id).await
    }

    /// Users who shared a post, newest first.
    pub async fn shares(
        &self,
        post_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Page<UserEntryView>> {
        let shares = self.share_repo.find_by_post(post_id, limit, until_id).await?;
        with_users(
            &self.user_repo,
            Page::new(shares, limit),
            |s| s.user_id.as_str(),
            |s, user| UserEntryView {
                id: s.id,
                created_at: s.created_at,
                user,
            },
        )
        .await
    }

    /// Users who saved a post, newest first.
    pub async fn saves(
        &self,
        post_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Page<UserEntryView>> {
        let saves = self.save_repo.find_by_post(post_id, limit, until_id).await?;
        with_users(
            &self.user_repo,
            Page::new(saves, limit),
            |s| s.user_id.as_str(),
            |s, user| UserEntryView {
                id: s.id,
                created_at: s.created_at,
                user,
            },
        )
        .await
    }

    /// Reload the post for the acting user; `Deleted` if it vanished.
    async fn view_after_write(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<ToggleOutcome<PostView>> {
        match self.show(post_id, Some(user_id)).await {
            Ok(view) => Ok(ToggleOutcome::Updated(view)),
            Err(AppError::PostNotFound(_)) => Ok(ToggleOutcome::Deleted),
            Err(e) => Err(e),
        }
    }

    /// A failed write against a post that was deleted meanwhile is not an error.
    async fn deleted_or(
        &self,
        post_id: &str,
        error: AppError,
    ) -> AppResult<ToggleOutcome<PostView>> {
        if self.post_repo.find_by_id(post_id).await?.is_none() {
            return Ok(ToggleOutcome::Deleted);
        }
        Err(error)
    }

    async fn build_views(
        &self,
        posts: Vec<post::Model>,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<PostView>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let mut author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let (authors, comment_counts, share_counts, save_counts) = tokio::try_join!(
            self.user_repo.find_by_ids(&author_ids),
            self.comment_repo.count_by_posts(&ids),
            self.share_repo.count_by_posts(&ids),
            self.save_repo.count_by_posts(&ids),
        )?;

        let (viewer_reactions, shared, saved) = match viewer_id {
            Some(viewer) => tokio::try_join!(
                self.reactions
                    .viewer_reactions(ReactionTarget::Post, viewer, &ids),
                self.share_repo.find_post_ids_by_user(viewer, &ids),
                self.save_repo.find_post_ids_by_user(viewer, &ids),
            )?,
            None => Default::default(),
        };

        let authors = index_users(authors);

        Ok(posts
            .into_iter()
            .filter_map(|post| {
                let author = authors.get(&post.author_id)?.clone();
                let id = post.id.clone();
                let mut view = PostView::new(post, author);
                view.comment_count = comment_counts.get(&id).copied().unwrap_or(0);
                view.share_count = share_counts.get(&id).copied().unwrap_or(0);
                view.save_count = save_counts.get(&id).copied().unwrap_or(0);
                view.viewer_reaction = viewer_reactions.get(&id).copied();
                view.shared = shared.contains(&id);
                view.saved = saved.contains(&id);
                Some(view)
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::cache::testing::RecordingCacheInvalidator;
    use friendful_db::entities::user;
    use friendful_db::test_utils::MemoryReactionStore;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, MockExecResult, Value};
    use serde_json::json;
    use std::collections::BTreeMap;

    type Row = BTreeMap<&'static str, Value>;

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: format!("User {id}"),
            email: format!("{id}@example.com"),
            password: "hash".to_string(),
            token: None,
            image: None,
            avatar_background_color: "#3498db".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            content: Some("Hello".to_string()),
            images: json!([]),
            like_count: 2,
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

    fn count_row(key: &str, count: i64) -> Row {
        btreemap! { "key" => Value::from(key), "count" => Value::from(count) }
    }

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    struct Dbs {
        post: Arc<DatabaseConnection>,
        comment: Arc<DatabaseConnection>,
        share: Arc<DatabaseConnection>,
        save: Arc<DatabaseConnection>,
        user: Arc<DatabaseConnection>,
    }

    impl Default for Dbs {
        fn default() -> Self {
            Self {
                post: empty_db(),
                comment: empty_db(),
                share: empty_db(),
                save: empty_db(),
                user: empty_db(),
            }
        }
    }

    fn create_test_service(
        dbs: Dbs,
        store: Arc<MemoryReactionStore>,
        cache: Arc<RecordingCacheInvalidator>,
    ) -> PostService {
        PostService::new(
            PostRepository::new(dbs.post),
            CommentRepository::new(dbs.comment),
            ShareRepository::new(dbs.share),
            SaveRepository::new(dbs.save),
            UserRepository::new(dbs.user),
            store,
            cache,
        )
    }

    fn default_service() -> PostService {
        create_test_service(
            Dbs::default(),
            Arc::new(MemoryReactionStore::new()),
            Arc::new(RecordingCacheInvalidator::default()),
        )
    }

    #[tokio::test]
    async fn test_create_post_requires_text_or_images() {
        let service = default_service();

        let input = CreatePostInput {
            text: Some("   ".to_string()),
            images: vec![],
        };

        match service.create("user1", input).await {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Text is required")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_post_rejects_long_text_and_many_images() {
        let service = default_service();

        let long_text = CreatePostInput {
            text: Some("a".repeat(5001)),
            images: vec![],
        };
        assert!(matches!(
            service.create("user1", long_text).await,
            Err(AppError::Validation(_))
        ));

        let image = Image {
            src: "https://cdn.example.com/a.png".to_string(),
            width: 100,
            height: 100,
        };
        let many_images = CreatePostInput {
            text: None,
            images: vec![image; 11],
        };
        assert!(matches!(
            service.create("user1", many_images).await,
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_normalize_content_allows_image_only_posts() {
        let images = vec![Image {
            src: "https://cdn.example.com/a.png".to_string(),
            width: 1,
            height: 1,
        }];
        assert_eq!(normalize_content(None, &images).unwrap(), None);
        assert_eq!(
            normalize_content(Some("  hi ".to_string()), &[]).unwrap(),
            Some("hi".to_string())
        );
    }

    #[tokio::test]
    async fn test_show_not_found() {
        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<post::Model>::new()])
                    .into_connection(),
            ),
            ..Dbs::default()
        };
        let service = create_test_service(
            dbs,
            Arc::new(MemoryReactionStore::new()),
            Arc::new(RecordingCacheInvalidator::default()),
        );

        let result = service.show("missing", None).await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_wrong_author_forbidden() {
        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_post("post1", "user1")]])
                    .into_connection(),
            ),
            ..Dbs::default()
        };
        let cache = Arc::new(RecordingCacheInvalidator::default());
        let service =
            create_test_service(dbs, Arc::new(MemoryReactionStore::new()), cache.clone());

        let result = service.delete("post1", "user2").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(cache.tags().is_empty());
    }

    #[tokio::test]
    async fn test_timeline_builds_views() {
        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[
                        create_test_post("post2", "user1"),
                        create_test_post("post1", "ghost"),
                    ]])
                    .into_connection(),
            ),
            user: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_user("user1")]])
                    .into_connection(),
            ),
            comment: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![count_row("post2", 3)]])
                    .into_connection(),
            ),
            share: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .into_connection(),
            ),
            save: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![count_row("post2", 1)]])
                    .into_connection(),
            ),
        };
        let service = create_test_service(
            dbs,
            Arc::new(MemoryReactionStore::new()),
            Arc::new(RecordingCacheInvalidator::default()),
        );

        let page = service.timeline(None, 2, None).await.unwrap();

        assert!(page.has_more);
        assert_eq!(page.items.len(), 1);
        let view = &page.items[0];
        assert_eq!(view.id, "post2");
        assert_eq!(view.author.id, "user1");
        assert_eq!(view.comment_count, 3);
        assert_eq!(view.share_count, 0);
        assert_eq!(view.save_count, 1);
        assert_eq!(view.total_reactions, 2);
        assert_eq!(view.viewer_reaction, None);
    }

    #[tokio::test]
    async fn test_toggle_reaction_on_deleted_post() {
        let service = default_service();

        let outcome = service
            .toggle_reaction("gone", "user1", "like", false)
            .await
            .unwrap();

        assert_eq!(outcome, ToggleOutcome::Deleted);
    }

    #[tokio::test]
    async fn test_toggle_reaction_returns_refreshed_view() {
        let store = Arc::new(MemoryReactionStore::new());
        store.insert_entity(ReactionTarget::Post, "post1").await;

        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_post("post1", "user1")]])
                    .into_connection(),
            ),
            user: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_user("user1")]])
                    .into_connection(),
            ),
            comment: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .into_connection(),
            ),
            share: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .append_query_results([Vec::<share::Model>::new()])
                    .into_connection(),
            ),
            save: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .append_query_results([Vec::<save::Model>::new()])
                    .into_connection(),
            ),
        };
        let cache = Arc::new(RecordingCacheInvalidator::default());
        let service = create_test_service(dbs, store.clone(), cache.clone());

        let outcome = service
            .toggle_reaction("post1", "user1", "love", false)
            .await
            .unwrap();

        match outcome {
            ToggleOutcome::Updated(view) => {
                assert_eq!(view.reactions.love, 1);
                assert_eq!(view.reactions.like, 0);
                assert_eq!(view.total_reactions, 1);
                assert_eq!(view.viewer_reaction, Some(ReactionType::Love));
            }
            ToggleOutcome::Deleted => panic!("Expected Updated"),
        }
        assert_eq!(cache.tags(), vec!["posts", "reactions", "reactions:post1"]);
    }

    #[tokio::test]
    async fn test_share_deleted_post() {
        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<post::Model>::new()])
                    .into_connection(),
            ),
            ..Dbs::default()
        };
        let service = create_test_service(
            dbs,
            Arc::new(MemoryReactionStore::new()),
            Arc::new(RecordingCacheInvalidator::default()),
        );

        let outcome = service.share("gone", "user1").await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Deleted);
    }

    #[tokio::test]
    async fn test_share_twice_is_noop() {
        let post = create_test_post("post1", "user1");
        let existing = share::Model {
            id: "share1".to_string(),
            user_id: "user2".to_string(),
            post_id: "post1".to_string(),
            created_at: Utc::now().into(),
        };

        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[post.clone()], [post]])
                    .into_connection(),
            ),
            user: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_user("user1")]])
                    .into_connection(),
            ),
            comment: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .into_connection(),
            ),
            share: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[existing.clone()]])
                    .append_query_results([vec![count_row("post1", 1)]])
                    .append_query_results([[existing]])
                    .into_connection(),
            ),
            save: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .append_query_results([Vec::<save::Model>::new()])
                    .into_connection(),
            ),
        };
        let cache = Arc::new(RecordingCacheInvalidator::default());
        let service =
            create_test_service(dbs, Arc::new(MemoryReactionStore::new()), cache.clone());

        let outcome = service.share("post1", "user2").await.unwrap();

        match outcome {
            ToggleOutcome::Updated(view) => {
                assert!(view.shared);
                assert_eq!(view.share_count, 1);
            }
            ToggleOutcome::Deleted => panic!("Expected Updated"),
        }
        assert!(cache.tags().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_save_removes_existing() {
        let post = create_test_post("post1", "user1");
        let existing = save::Model {
            id: "save1".to_string(),
            user_id: "user1".to_string(),
            post_id: "post1".to_string(),
            created_at: Utc::now().into(),
        };

        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[post.clone()], [post]])
                    .into_connection(),
            ),
            user: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_user("user1")]])
                    .into_connection(),
            ),
            comment: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .into_connection(),
            ),
            share: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .append_query_results([Vec::<share::Model>::new()])
                    .into_connection(),
            ),
            save: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[existing]])
                    .append_exec_results([MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    }])
                    .append_query_results([Vec::<Row>::new()])
                    .append_query_results([Vec::<save::Model>::new()])
                    .into_connection(),
            ),
        };
        let cache = Arc::new(RecordingCacheInvalidator::default());
        let service =
            create_test_service(dbs, Arc::new(MemoryReactionStore::new()), cache.clone());

        let outcome = service.toggle_save("post1", "user1").await.unwrap();

        match outcome {
            ToggleOutcome::Updated(view) => {
                assert!(!view.saved);
                assert_eq!(view.save_count, 0);
            }
            ToggleOutcome::Deleted => panic!("Expected Updated"),
        }
        assert_eq!(cache.tags(), vec!["posts", "saves"]);
    }

    fn create_test_share(id: &str, user_id: &str, post_id: &str) -> share::Model {
        share::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    /// Post, author, comment and save lookups for one `view_after_write` of post1.
    fn refreshed_view_dbs(share: Arc<DatabaseConnection>) -> Dbs {
        let post = create_test_post("post1", "user1");
        Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[post.clone()], [post]])
                    .into_connection(),
            ),
            user: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_user("user1")]])
                    .into_connection(),
            ),
            comment: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .into_connection(),
            ),
            share,
            save: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .append_query_results([Vec::<save::Model>::new()])
                    .into_connection(),
            ),
        }
    }

    #[tokio::test]
    async fn test_share_creates_and_invalidates() {
        let created = create_test_share("share1", "user2", "post1");
        let share_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<share::Model>::new()])
                .append_query_results([[created.clone()]])
                .append_query_results([vec![count_row("post1", 1)]])
                .append_query_results([[created]])
                .into_connection(),
        );
        let cache = Arc::new(RecordingCacheInvalidator::default());
        let service = create_test_service(
            refreshed_view_dbs(share_db),
            Arc::new(MemoryReactionStore::new()),
            cache.clone(),
        );

        let outcome = service.share("post1", "user2").await.unwrap();

        match outcome {
            ToggleOutcome::Updated(view) => {
                assert!(view.shared);
                assert_eq!(view.share_count, 1);
            }
            ToggleOutcome::Deleted => panic!("Expected Updated"),
        }
        assert_eq!(cache.tags(), vec!["posts", "shares"]);
    }

    #[tokio::test]
    async fn test_share_lost_insert_race_counts_as_shared() {
        let existing = create_test_share("share1", "user2", "post1");
        let share_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<share::Model>::new()])
                .append_query_errors([DbErr::Custom(
                    "duplicate key value violates unique constraint".to_string(),
                )])
                .append_query_results([[existing.clone()]])
                .append_query_results([vec![count_row("post1", 1)]])
                .append_query_results([[existing]])
                .into_connection(),
        );
        let cache = Arc::new(RecordingCacheInvalidator::default());
        let service = create_test_service(
            refreshed_view_dbs(share_db),
            Arc::new(MemoryReactionStore::new()),
            cache.clone(),
        );

        let outcome = service.share("post1", "user2").await.unwrap();

        match outcome {
            ToggleOutcome::Updated(view) => {
                assert!(view.shared);
                assert_eq!(view.share_count, 1);
            }
            ToggleOutcome::Deleted => panic!("Expected Updated"),
        }
        assert!(cache.tags().is_empty());
    }

    #[tokio::test]
    async fn test_share_insert_failure_is_reported() {
        let post = create_test_post("post1", "user1");
        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[post.clone()], [post]])
                    .into_connection(),
            ),
            share: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<share::Model>::new()])
                    .append_query_errors([DbErr::Custom("connection reset".to_string())])
                    .append_query_results([Vec::<share::Model>::new()])
                    .into_connection(),
            ),
            ..Dbs::default()
        };
        let cache = Arc::new(RecordingCacheInvalidator::default());
        let service =
            create_test_service(dbs, Arc::new(MemoryReactionStore::new()), cache.clone());

        let result = service.share("post1", "user2").await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(cache.tags().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_save_creates() {
        let created = save::Model {
            id: "save1".to_string(),
            user_id: "user2".to_string(),
            post_id: "post1".to_string(),
            created_at: Utc::now().into(),
        };
        let post = create_test_post("post1", "user1");

        let dbs = Dbs {
            post: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[post.clone()], [post]])
                    .into_connection(),
            ),
            user: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([[create_test_user("user1")]])
                    .into_connection(),
            ),
            comment: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .into_connection(),
            ),
            share: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<Row>::new()])
                    .append_query_results([Vec::<share::Model>::new()])
                    .into_connection(),
            ),
            save: Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([Vec::<save::Model>::new()])
                    .append_query_results([[created.clone()]])
                    .append_query_results([vec![count_row("post1", 1)]])
                    .append_query_results([[created]])
                    .into_connection(),
            ),
        };
        let cache = Arc::new(RecordingCacheInvalidator::default());
        let service =
            create_test_service(dbs, Arc::new(MemoryReactionStore::new()), cache.clone());

        let outcome = service.toggle_save("post1", "user2").await.unwrap();

        match outcome {
            ToggleOutcome::Updated(view) => {
                assert!(view.saved);
                assert_eq!(view.save_count, 1);
            }
            ToggleOutcome::Deleted => panic!("Expected Updated"),
        }
        assert_eq!(cache.tags(), vec!["posts", "saves"]);
    }
}
