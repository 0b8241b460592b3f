//! Post endpoints.

use axum::{Json, Router, extract::State, routing::post};
use friendful_common::AppResult;
use friendful_core::{
    CreatePostInput, Image, Page, PostView, ReactionView, UserEntryView, parse_reaction_filter,
};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, OkBody, ToggleBody},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub text: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<ApiResponse<PostView>> {
    let view = state
        .post_service
        .create(
            &user.id,
            CreatePostInput {
                text: req.text,
                images: req.images,
            },
        )
        .await?;
    Ok(ApiResponse::ok(view))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdRequest {
    pub post_id: String,
}

async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<PostIdRequest>,
) -> AppResult<ApiResponse<PostView>> {
    let view = state.post_service.show(&req.post_id, viewer.id()).await?;
    Ok(ApiResponse::ok(view))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PostIdRequest>,
) -> AppResult<ApiResponse<OkBody>> {
    state.post_service.delete(&req.post_id, &user.id).await?;
    Ok(ApiResponse::ok(OkBody { ok: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRequest {
    pub limit: Option<u64>,
    pub until_id: Option<String>,
}

async fn timeline(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<TimelineRequest>,
) -> AppResult<ApiResponse<Page<PostView>>> {
    let limit = state.pagination.clamp(req.limit);
    let page = state
        .post_service
        .timeline(viewer.id(), limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(page))
}

/// Reaction toggle request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactRequest {
    pub post_id: String,
    #[serde(rename = "type")]
    pub reaction_type: String,
    #[serde(default)]
    pub is_primary_action: bool,
}

/// Toggle, switch or remove the caller's reaction.
async fn react(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ReactRequest>,
) -> AppResult<ApiResponse<ToggleBody<PostView>>> {
    let outcome = state
        .post_service
        .toggle_reaction(
            &req.post_id,
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
    pub post_id: String,
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
        .post_service
        .reactions(&req.post_id, filter, limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn share(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PostIdRequest>,
) -> AppResult<ApiResponse<ToggleBody<PostView>>> {
    let outcome = state.post_service.share(&req.post_id, &user.id).await?;
    Ok(ApiResponse::ok(outcome.into()))
}

async fn save(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PostIdRequest>,
) -> AppResult<ApiResponse<ToggleBody<PostView>>> {
    let outcome = state.post_service.toggle_save(&req.post_id, &user.id).await?;
    Ok(ApiResponse::ok(outcome.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEntriesRequest {
    pub post_id: String,
    pub limit: Option<u64>,
    pub until_id: Option<String>,
}

async fn shares(
    State(state): State<AppState>,
    Json(req): Json<PostEntriesRequest>,
) -> AppResult<ApiResponse<Page<UserEntryView>>> {
    let limit = state.pagination.clamp(req.limit);
    let page = state
        .post_service
        .shares(&req.post_id, limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn saves(
    State(state): State<AppState>,
    Json(req): Json<PostEntriesRequest>,
) -> AppResult<ApiResponse<Page<UserEntryView>>> {
    let limit = state.pagination.clamp(req.limit);
    let page = state
        .post_service
        .saves(&req.post_id, limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(page))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/timeline", post(timeline))
        .route("/delete", post(delete))
        .route("/react", post(react))
        .route("/reactions", post(reactions))
        .route("/share", post(share))
        .route("/shares", post(shares))
        .route("/save", post(save))
        .route("/saves", post(saves))
}
