//! Read models returned by the services.

use std::collections::HashMap;

use crate::services::pagination::Page;
use chrono::{DateTime, FixedOffset};
use friendful_common::AppResult;
use friendful_db::{
    entities::{ReactionType, comment, post, user},
    repositories::{ReactionCounts, ReactionRecord, UserRepository},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An image attached to a post or comment. Uploading happens elsewhere;
/// only the resulting reference is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Image {
    #[validate(length(min = 1, max = 2048))]
    pub src: String,
    pub width: u32,
    pub height: u32,
}

/// Public part of a user, embedded in other views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub avatar_background_color: String,
}

impl From<&user::Model> for UserSummary {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            image: u.image.clone(),
            avatar_background_color: u.avatar_background_color.clone(),
        }
    }
}

/// Users keyed by ID, for joining onto rows that carry a user ID.
pub(crate) fn index_users(users: Vec<user::Model>) -> HashMap<String, UserSummary> {
    users
        .iter()
        .map(|u| (u.id.clone(), UserSummary::from(u)))
        .collect()
}

/// Join users onto a page of rows. Rows whose user no longer exists are
/// dropped; `has_more` is kept from the underlying page.
pub(crate) async fn with_users<T, V>(
    user_repo: &UserRepository,
    page: Page<T>,
    user_of: impl Fn(&T) -> &str,
    build: impl Fn(T, UserSummary) -> V,
) -> AppResult<Page<V>> {
    let mut user_ids: Vec<String> = page.items.iter().map(|t| user_of(t).to_string()).collect();
    user_ids.sort_unstable();
    user_ids.dedup();
    let users = index_users(user_repo.find_by_ids(&user_ids).await?);

    let items = page
        .items
        .into_iter()
        .filter_map(|item| {
            let user = users.get(user_of(&item))?.clone();
            Some(build(item, user))
        })
        .collect();
    Ok(Page {
        items,
        has_more: page.has_more,
    })
}

/// A post as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author: UserSummary,
    pub content: Option<String>,
    pub images: serde_json::Value,
    pub reactions: ReactionCounts,
    pub total_reactions: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub save_count: i64,
    pub viewer_reaction: Option<ReactionType>,
    pub shared: bool,
    pub saved: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl PostView {
    pub(crate) fn new(post: post::Model, author: UserSummary) -> Self {
        let reactions = ReactionCounts::from(&post);
        Self {
            id: post.id,
            author,
            content: post.content,
            images: post.images,
            total_reactions: reactions.total(),
            reactions,
            comment_count: 0,
            share_count: 0,
            save_count: 0,
            viewer_reaction: None,
            shared: false,
            saved: false,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// A comment as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub author: UserSummary,
    pub content: Option<String>,
    pub images: serde_json::Value,
    pub reactions: ReactionCounts,
    pub total_reactions: i64,
    pub children_count: i64,
    pub viewer_reaction: Option<ReactionType>,
    pub created_at: DateTime<FixedOffset>,
}

impl CommentView {
    pub(crate) fn new(comment: comment::Model, author: UserSummary) -> Self {
        let reactions = ReactionCounts::from(&comment);
        Self {
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author,
            content: comment.content,
            images: comment.images,
            total_reactions: reactions.total(),
            reactions,
            children_count: 0,
            viewer_reaction: None,
            created_at: comment.created_at,
        }
    }
}

/// One entry of a reaction listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionView {
    pub id: String,
    #[serde(rename = "type")]
    pub reaction_type: ReactionType,
    pub created_at: DateTime<FixedOffset>,
    pub user: UserSummary,
}

impl ReactionView {
    pub(crate) fn new(record: ReactionRecord, user: UserSummary) -> Self {
        Self {
            id: record.id,
            reaction_type: record.reaction_type,
            created_at: record.created_at,
            user,
        }
    }
}

/// One entry of a share or save listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntryView {
    pub id: String,
    pub created_at: DateTime<FixedOffset>,
    pub user: UserSummary,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_reaction_view_serializes_type_field() {
        let view = ReactionView {
            id: "r1".to_string(),
            reaction_type: ReactionType::Care,
            created_at: Utc::now().into(),
            user: UserSummary {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                image: None,
                avatar_background_color: "#3498db".to_string(),
            },
        };

        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["type"], "care");
        assert_eq!(value["user"]["avatarBackgroundColor"], "#3498db");
    }

    #[test]
    fn test_image_validation() {
        let image: Image = serde_json::from_value(json!({
            "src": "",
            "width": 10,
            "height": 10
        }))
        .unwrap();
        assert!(image.validate().is_err());
    }
}
