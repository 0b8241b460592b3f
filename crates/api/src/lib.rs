//! HTTP API layer for friendful.
//!
//! - **Endpoints**: auth, posts, comments, reactions, shares and saves
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: token resolution and shared application state
//!
//! Every endpoint takes a JSON body via POST and answers with `{"data": ...}`
//! or `{"error": {"code", "message"}}`.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
