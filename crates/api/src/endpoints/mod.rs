//! API endpoints.

#![allow(missing_docs)]

mod auth;
mod comments;
mod posts;

use axum::{Router, routing::get};

use crate::{middleware::AppState, response::OkBody};

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .route("/health", get(health))
        .nest("/posts", posts::router())
        .nest("/comments", comments::router())
}

async fn health() -> axum::Json<OkBody> {
    axum::Json(OkBody { ok: true })
}
