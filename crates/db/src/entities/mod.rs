//! Database entities.

pub mod comment;
pub mod comment_reaction;
pub mod post;
pub mod post_reaction;
pub mod reaction_type;
pub mod save;
pub mod share;
pub mod user;

pub use comment::Entity as Comment;
pub use comment_reaction::Entity as CommentReaction;
pub use post::Entity as Post;
pub use post_reaction::Entity as PostReaction;
pub use reaction_type::{ReactionType, UnknownReactionType};
pub use save::Entity as Save;
pub use share::Entity as Share;
pub use user::Entity as User;
