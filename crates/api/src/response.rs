//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use friendful_core::ToggleOutcome;
use serde::Serialize;

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Body for a mutation whose target was deleted meanwhile.
#[derive(Debug, Serialize)]
pub struct DeletedMarker {
    pub deleted: bool,
}

/// Either the refreshed view or `{ "deleted": true }`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ToggleBody<T: Serialize> {
    Updated(T),
    Deleted(DeletedMarker),
}

impl<T: Serialize> From<ToggleOutcome<T>> for ToggleBody<T> {
    fn from(outcome: ToggleOutcome<T>) -> Self {
        match outcome {
            ToggleOutcome::Updated(view) => Self::Updated(view),
            ToggleOutcome::Deleted => Self::Deleted(DeletedMarker { deleted: true }),
        }
    }
}

/// Success without a payload.
#[derive(Debug, Serialize)]
pub struct OkBody {
    pub ok: bool,
}
