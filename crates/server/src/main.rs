//! Friendful server entry point.

use std::sync::Arc;

use axum::{Router, middleware};
use fred::{error::Error as RedisError, interfaces::ClientLike};
use friendful_api::{AppState, auth_middleware, router as api_router};
use friendful_common::{Config, RedisTagCache};
use friendful_core::{CacheInvalidatorService, NoOpCacheInvalidator};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Connect the tag cache, or fall back to no invalidation when Redis is not configured.
async fn cache_invalidator(config: &Config) -> Result<CacheInvalidatorService, RedisError> {
    let Some(redis) = &config.redis else {
        warn!("Redis not configured, cache invalidation disabled");
        return Ok(Arc::new(NoOpCacheInvalidator));
    };

    let fred_config = fred::types::config::Config::from_url(&redis.url)?;
    let client = fred::clients::Client::new(fred_config, None, None, None);
    client.connect();
    client.wait_for_connect().await?;
    info!("Connected to Redis for cache invalidation");

    Ok(Arc::new(RedisTagCache::new(
        Arc::new(client),
        redis.prefix.clone(),
    )))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "friendful=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting friendful server...");

    let config = Config::load()?;

    let db = friendful_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    friendful_db::migrate(&db).await?;
    info!("Migrations completed");

    let cache = cache_invalidator(&config).await?;
    let state = AppState::new(Arc::new(db), cache, config.pagination);

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}
