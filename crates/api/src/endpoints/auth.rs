//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use friendful_common::AppResult;
use friendful_core::{AuthSession, SignInInput, SignUpInput};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, OkBody},
};

/// Signup request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Create a new user account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<ApiResponse<AuthSession>> {
    let session = state
        .user_service
        .sign_up(SignUpInput {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(ApiResponse::ok(session))
}

/// Signin request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> AppResult<ApiResponse<AuthSession>> {
    let session = state
        .user_service
        .sign_in(SignInInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(ApiResponse::ok(session))
}

/// Sign out, invalidating the current token.
async fn signout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<OkBody>> {
    state.user_service.sign_out(&user.id).await?;
    Ok(ApiResponse::ok(OkBody { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
}
