//! Business logic services.

#![allow(missing_docs)]

pub mod cache;
pub mod comment;
pub mod pagination;
pub mod post;
pub mod reaction;
pub mod user;
pub mod views;

pub use cache::{CacheInvalidator, CacheInvalidatorService, NoOpCacheInvalidator};
pub use comment::{CommentService, CreateCommentInput};
pub use pagination::Page;
pub use post::{CreatePostInput, PostService};
pub use reaction::{
    ReactionEngine, ReactionSummary, ToggleOutcome, parse_reaction_filter, parse_reaction_type,
    plan_transition,
};
pub use user::{AuthSession, SignInInput, SignUpInput, UserService};
pub use views::{
    CommentView, Image, PostView, ReactionView, UserEntryView, UserSummary,
};
