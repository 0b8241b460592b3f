//! Comment service.

use std::sync::Arc;

use crate::services::cache::{CacheInvalidatorService, invalidate_tags};
use crate::services::pagination::Page;
use crate::services::post::{images_json, normalize_content};
use crate::services::reaction::{ReactionEngine, ToggleOutcome};
use crate::services::views::{
    CommentView, Image, ReactionView, UserSummary, index_users, with_users,
};
use chrono::Utc;
use friendful_common::{AppError, AppResult, IdGenerator, tags};
use friendful_db::{
    entities::{ReactionType, comment},
    repositories::{
        CommentRepository, PostRepository, ReactionStore, ReactionTarget, UserRepository,
    },
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// Input for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    #[validate(length(max = 5000))]
    pub text: Option<String>,

    #[validate(length(max = 10))]
    #[validate(nested)]
    #[serde(default)]
    pub images: Vec<Image>,

    /// Comment being replied to, if any.
    pub parent_id: Option<String>,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    reactions: Arc<dyn ReactionStore>,
    engine: ReactionEngine,
    cache: CacheInvalidatorService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        reactions: Arc<dyn ReactionStore>,
        cache: CacheInvalidatorService,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            engine: ReactionEngine::new(reactions.clone(), cache.clone()),
            reactions,
            cache,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on a post, or reply to a comment on the same post.
    pub async fn create(
        &self,
        author_id: &str,
        post_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentView> {
        input.validate()?;
        let content = normalize_content(input.text, &input.images)?;

        self.post_repo.get_by_id(post_id).await?;

        if let Some(ref parent_id) = input.parent_id {
            let parent = self.comment_repo.get_by_id(parent_id).await?;
            if parent.post_id != post_id {
                return Err(AppError::BadRequest(
                    "Parent comment belongs to another post".to_string(),
                ));
            }
        }

        let author = self.user_repo.get_by_id(author_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            author_id: Set(author_id.to_string()),
            parent_id: Set(input.parent_id),
            content: Set(content),
            images: Set(images_json(&input.images)?),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let comment = self.comment_repo.create(model).await?;
        info!(
            comment_id = %comment.id,
            post_id = %post_id,
            author_id = %author_id,
            "Comment created"
        );

        invalidate_tags(self.cache.as_ref(), &[tags::COMMENTS, tags::POSTS]).await;
        Ok(CommentView::new(comment, UserSummary::from(&author)))
    }

    /// Comments on a post: top-level ones, or the replies to `parent_id`.
    pub async fn list(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        viewer_id: Option<&str>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Page<CommentView>> {
        let comments = self
            .comment_repo
            .find_by_post(post_id, parent_id, limit, until_id)
            .await?;
        let page = Page::new(comments, limit);
        Ok(Page {
            items: self.build_views(page.items, viewer_id).await?,
            has_more: page.has_more,
        })
    }

    /// Toggle or switch the user's reaction on a comment.
    pub async fn toggle_reaction(
        &self,
        comment_id: &str,
        user_id: &str,
        requested_type: &str,
        is_primary_action: bool,
    ) -> AppResult<ToggleOutcome<CommentView>> {
        let summary = match self
            .engine
            .toggle_reaction(
                ReactionTarget::Comment,
                comment_id,
                user_id,
                requested_type,
                is_primary_action,
            )
            .await?
        {
            ToggleOutcome::Updated(summary) => summary,
            ToggleOutcome::Deleted => return Ok(ToggleOutcome::Deleted),
        };

        let Some(comment) = self.comment_repo.find_by_id(comment_id).await? else {
            return Ok(ToggleOutcome::Deleted);
        };

        Ok(self
            .build_views(vec![comment], Some(user_id))
            .await?
            .pop()
            .map_or(ToggleOutcome::Deleted, |mut view| {
                view.reactions = summary.counts;
                view.total_reactions = summary.counts.total();
                view.viewer_reaction = summary.viewer_reaction;
                ToggleOutcome::Updated(view)
            }))
    }

    /// Reactions on a comment, newest first.
    pub async fn reactions(
        &self,
        comment_id: &str,
        filter: Option<ReactionType>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Page<ReactionView>> {
        let page = self
            .engine
            .reactions(ReactionTarget::Comment, comment_id, filter, limit, until_id)
            .await?;
        with_users(&self.user_repo, page, |r| r.user_id.as_str(), ReactionView::new).await
    }

    async fn build_views(
        &self,
        comments: Vec<comment::Model>,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<CommentView>> {
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let (authors, children_counts) = tokio::try_join!(
            self.user_repo.find_by_ids(&author_ids),
            self.comment_repo.count_children(&ids),
        )?;

        let viewer_reactions = match viewer_id {
            Some(viewer) => {
                self.reactions
                    .viewer_reactions(ReactionTarget::Comment, viewer, &ids)
                    .await?
            }
            None => Default::default(),
        };

        let authors = index_users(authors);

        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                let author = authors.get(&comment.author_id)?.clone();
                let id = comment.id.clone();
                let mut view = CommentView::new(comment, author);
                view.children_count = children_counts.get(&id).copied().unwrap_or(0);
                view.viewer_reaction = viewer_reactions.get(&id).copied();
                Some(view)
            })
            .collect())
    }
}
