//! Comment endpoints.

use axum::{Json, Router, extract::State, routing::post};
use friendful_common::AppResult;
use friendful_core::{
    CommentView, CreateCommentInput, Image, Page, ReactionView, parse_reaction_filter,
};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, ToggleBody},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub parent_id: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentView>> {
    let view = state
        .comment_service
        .create(
            &user.id,
            &req.post_id,
            CreateCommentInput {
                text: req.text,
                images: req.images,
                parent_id: req.parent_id,
            },
        )
        .await?;
    Ok(ApiResponse::ok(view))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsRequest {
    pub post_id: String,
    pub parent_id: Option<String>,
    pub limit: Option<u64>,
    pub until_id: Option<String>,
}

/// Top-level comments of a post, or the replies to `parentId`.
async fn list(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListCommentsRequest>,
) -> AppResult<ApiResponse<Page<CommentView>>> {
    let limit = state.pagination.clamp(req.limit);
    let page = state
        .comment_service
        .list(
            &req.post_id,
            req.parent_id.as_deref(),
            viewer.id(),
            limit,
            req.until_id.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactRequest {
    pub comment_id: String,
    #[serde(rename = "type")]
    pub reaction_type: String,
    #[serde(default)]
    pub is_primary_action: bool,
}

async fn react(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ReactRequest>,
) -> AppResult<ApiResponse<ToggleBody<CommentView>>> {
    let outcome = state
        .comment_service
        .toggle_reaction(
            &req.comment_id,
            &user.id,
            &req.reaction_type,
            req.is_primary_action,
        )
        .await?;
    Ok(ApiResponse::ok(outcome.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionsRequest {
    pub comment_id: String,
    #[serde(rename = "type")]
    pub reaction_type: Option<String>,
    pub limit: Option<u64>,
    pub until_id: Option<String>,
}

async fn reactions(
    State(state): State<AppState>,
    Json(req): Json<ReactionsRequest>,
) -> AppResult<ApiResponse<Page<ReactionView>>> {
    let filter = parse_reaction_filter(req.reaction_type.as_deref())?;
    let limit = state.pagination.clamp(req.limit);
    let page = state
        .comment_service
        .reactions(&req.comment_id, filter, limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(page))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/list", post(list))
        .route("/react", post(react))
        .route("/reactions", post(reactions))
}
