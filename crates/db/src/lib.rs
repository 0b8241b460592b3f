//! `PostgreSQL` persistence for friendful.
//!
//! The schema holds users, posts, comments (with nested replies), one
//! reaction table per reactable kind (`post_reaction`, `comment_reaction`),
//! and the share and save tables. Posts and comments carry one counter
//! column per reaction type, kept in step with the reaction rows by
//! [`repositories::ReactionRepository`].

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use friendful_common::{AppError, AppResult, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, log::LevelFilter};

/// Pool options derived from the database section of the config.
#[must_use]
pub fn connect_options(config: &Config) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);
    opt
}

/// Open the connection pool.
pub async fn init(config: &Config) -> AppResult<DatabaseConnection> {
    let db = Database::connect(connect_options(config))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!(
        max_connections = config.database.max_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Bring the schema up to date.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use friendful_common::config::{DatabaseConfig, PaginationConfig, ServerConfig};

    #[test]
    fn test_connect_options_follow_config() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/friendful".to_string(),
                max_connections: 12,
                min_connections: 3,
            },
            redis: None,
            pagination: PaginationConfig::default(),
        };

        let opt = connect_options(&config);

        assert_eq!(opt.get_url(), "postgres://localhost/friendful");
        assert_eq!(opt.get_max_connections(), Some(12));
        assert_eq!(opt.get_min_connections(), Some(3));
        assert_eq!(opt.get_acquire_timeout(), Some(Duration::from_secs(10)));
    }
}
