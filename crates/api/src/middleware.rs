//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use friendful_common::config::PaginationConfig;
use friendful_core::{CacheInvalidatorService, CommentService, PostService, UserService};
use friendful_db::repositories::{
    CommentRepository, PostRepository, ReactionRepository, ReactionStore, SaveRepository,
    ShareRepository, UserRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub pagination: PaginationConfig,
}

impl AppState {
    /// Wire every service onto one connection pool.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        cache: CacheInvalidatorService,
        pagination: PaginationConfig,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let post_repo = PostRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let reactions: Arc<dyn ReactionStore> =
            Arc::new(ReactionRepository::new(Arc::clone(&db)));

        Self {
            user_service: UserService::new(user_repo.clone()),
            post_service: PostService::new(
                post_repo.clone(),
                comment_repo.clone(),
                ShareRepository::new(Arc::clone(&db)),
                SaveRepository::new(Arc::clone(&db)),
                user_repo.clone(),
                Arc::clone(&reactions),
                Arc::clone(&cache),
            ),
            comment_service: CommentService::new(
                comment_repo,
                post_repo,
                user_repo,
                reactions,
                cache,
            ),
            pagination,
        }
    }
}

/// Authentication middleware.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.user_service.authenticate_by_token(token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Rejected bearer token"),
        }
    }

    next.run(req).await
}
