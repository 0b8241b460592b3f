//! Repositories.
//!
//! One repository per aggregate, each wrapping a shared connection pool.

pub mod comment;
pub mod post;
pub mod reaction;
pub mod save;
pub mod share;
pub mod user;

use sea_orm::{DbErr, FromQueryResult, SqlErr};

pub use comment::CommentRepository;
pub use post::PostRepository;
pub use reaction::{
    CommitOutcome, ReactionCounts, ReactionRecord, ReactionRepository, ReactionSnapshot,
    ReactionStore, ReactionTarget, ReactionTransition,
};
pub use save::SaveRepository;
pub use share::ShareRepository;
pub use user::UserRepository;

/// Whether a database error is a unique-constraint violation.
pub(crate) fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Row of a `GROUP BY key` count query.
#[derive(Debug, FromQueryResult)]
pub(crate) struct GroupCount {
    pub key: String,
    pub count: i64,
}
