//! Test utilities for database operations.
//!
//! Provides helpers for setting up and tearing down test databases, and an
//! in-memory [`ReactionStore`] with the same atomicity guarantees as the
//! PostgreSQL implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use friendful_common::AppResult;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use tokio::sync::Mutex;
use tracing::info;

use crate::entities::ReactionType;
use crate::repositories::{
    CommitOutcome, ReactionCounts, ReactionRecord, ReactionSnapshot, ReactionStore,
    ReactionTarget, ReactionTransition,
};

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER")
                .unwrap_or_else(|_| "friendful_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "friendful_test".to_string()),
            database: std::env::var("TEST_DB_NAME")
                .unwrap_or_else(|_| "friendful_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// Get URL for connecting to the maintenance database.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/postgres",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A freshly created, migrated test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Create a uniquely named database and run all migrations on it.
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let unique_suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("friendful_test_{}", &unique_suffix[..8]);

        let postgres_conn = Database::connect(&config.postgres_url()).await?;
        postgres_conn
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{}\"", config.database),
            ))
            .await?;
        postgres_conn.close().await?;

        let conn = Database::connect(&config.database_url()).await?;
        {
            use sea_orm_migration::MigratorTrait;
            crate::migrations::Migrator::up(&conn, None).await?;
        }

        info!(database = %config.database, "Created test database");
        Ok(Self { conn, config })
    }

    /// Get the database connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Drop the test database. Consumes self to close the connection first.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        self.conn.close().await?;

        let postgres_conn = Database::connect(&self.config.postgres_url()).await?;
        postgres_conn
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.config.database),
            ))
            .await?;
        postgres_conn.close().await?;

        info!(database = %self.config.database, "Dropped test database");
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryReaction {
    id: String,
    reaction_type: ReactionType,
    created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    counts: HashMap<(ReactionTarget, String), ReactionCounts>,
    // (target, entity_id) -> user_id -> reaction
    reactions: HashMap<(ReactionTarget, String), BTreeMap<String, MemoryReaction>>,
}

/// In-memory reaction store.
///
/// Every `apply` runs under one lock, mirroring the row lock and
/// compare-and-swap of the database store.
#[derive(Debug, Default)]
pub struct MemoryReactionStore {
    state: Mutex<MemoryState>,
    seq: AtomicU64,
    injected_conflicts: AtomicU32,
    apply_calls: AtomicU32,
}

impl MemoryReactionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reactable entity with zeroed counters.
    pub async fn insert_entity(&self, target: ReactionTarget, entity_id: &str) {
        let mut state = self.state.lock().await;
        state
            .counts
            .insert((target, entity_id.to_string()), ReactionCounts::default());
        state
            .reactions
            .insert((target, entity_id.to_string()), BTreeMap::new());
    }

    /// Delete an entity together with its reactions.
    pub async fn remove_entity(&self, target: ReactionTarget, entity_id: &str) {
        let mut state = self.state.lock().await;
        let key = (target, entity_id.to_string());
        state.counts.remove(&key);
        state.reactions.remove(&key);
    }

    /// Stored counters of an entity.
    pub async fn counts(&self, target: ReactionTarget, entity_id: &str) -> Option<ReactionCounts> {
        let state = self.state.lock().await;
        state.counts.get(&(target, entity_id.to_string())).copied()
    }

    /// Reaction rows of an entity, keyed by user.
    pub async fn reactions(
        &self,
        target: ReactionTarget,
        entity_id: &str,
    ) -> BTreeMap<String, ReactionType> {
        let state = self.state.lock().await;
        state
            .reactions
            .get(&(target, entity_id.to_string()))
            .map(|rows| {
                rows.iter()
                    .map(|(user, r)| (user.clone(), r.reaction_type))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Make the next `n` calls to `apply` report a conflict without writing.
    pub fn inject_conflicts(&self, n: u32) {
        self.injected_conflicts.store(n, Ordering::SeqCst);
    }

    /// Number of `apply` calls made so far.
    pub fn apply_calls(&self) -> u32 {
        self.apply_calls.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> String {
        format!("{:020}", self.seq.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl ReactionStore for MemoryReactionStore {
    async fn current_reaction(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ReactionType>> {
        let state = self.state.lock().await;
        Ok(state
            .reactions
            .get(&(target, entity_id.to_string()))
            .and_then(|rows| rows.get(user_id))
            .map(|r| r.reaction_type))
    }

    async fn apply(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        user_id: &str,
        transition: ReactionTransition,
    ) -> AppResult<CommitOutcome> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        let key = (target, entity_id.to_string());

        if !state.counts.contains_key(&key) {
            return Ok(CommitOutcome::EntityMissing);
        }

        if self
            .injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Ok(CommitOutcome::Conflict);
        }

        let rows = state.reactions.entry(key.clone()).or_default();
        let current = rows.get(user_id).map(|r| r.reaction_type);
        if current != transition.expected() {
            return Ok(CommitOutcome::Conflict);
        }

        match transition.resulting() {
            Some(reaction_type) => match rows.get_mut(user_id) {
                Some(row) => row.reaction_type = reaction_type,
                None => {
                    rows.insert(
                        user_id.to_string(),
                        MemoryReaction {
                            id: self.next_id(),
                            reaction_type,
                            created_at: Utc::now(),
                        },
                    );
                }
            },
            None => {
                rows.remove(user_id);
            }
        }

        let counts = state.counts.entry(key).or_default();
        counts.apply(transition);

        Ok(CommitOutcome::Committed(ReactionSnapshot {
            counts: *counts,
            viewer_reaction: transition.resulting(),
        }))
    }

    async fn list(
        &self,
        target: ReactionTarget,
        entity_id: &str,
        filter: Option<ReactionType>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<ReactionRecord>> {
        let state = self.state.lock().await;
        let Some(rows) = state.reactions.get(&(target, entity_id.to_string())) else {
            return Ok(Vec::new());
        };

        let mut records: Vec<ReactionRecord> = rows
            .iter()
            .filter(|(_, r)| filter.is_none_or(|t| r.reaction_type == t))
            .filter(|(_, r)| until_id.is_none_or(|until| r.id.as_str() < until))
            .map(|(user_id, r)| ReactionRecord {
                id: r.id.clone(),
                user_id: user_id.clone(),
                entity_id: entity_id.to_string(),
                reaction_type: r.reaction_type,
                created_at: r.created_at.into(),
            })
            .collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(records)
    }

    async fn viewer_reactions(
        &self,
        target: ReactionTarget,
        user_id: &str,
        entity_ids: &[String],
    ) -> AppResult<HashMap<String, ReactionType>> {
        let state = self.state.lock().await;
        Ok(entity_ids
            .iter()
            .filter_map(|id| {
                state
                    .reactions
                    .get(&(target, id.clone()))
                    .and_then(|rows| rows.get(user_id))
                    .map(|r| (id.clone(), r.reaction_type))
            })
            .collect())
    }
}
