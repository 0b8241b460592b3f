//! Common utilities and shared types for friendful.
//!
//! This crate provides foundational components used across all friendful crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Cache tags**: Redis-backed read-view invalidation via [`RedisTagCache`]
//!
//! # Example
//!
//! ```no_run
//! use friendful_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod id;

pub use cache::{RedisTagCache, tags};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
