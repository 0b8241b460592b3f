//! Comment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Post this comment belongs to
    #[sea_orm(indexed)]
    pub post_id: String,

    /// Author user ID
    #[sea_orm(indexed)]
    pub author_id: String,

    /// Parent comment ID (NULL for top-level comments)
    #[sea_orm(nullable, indexed)]
    pub parent_id: Option<String>,

    /// Comment text
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    /// Attached images (`[{src, width, height}]`)
    #[sea_orm(column_type = "JsonBinary")]
    pub images: Json,

    #[sea_orm(default_value = 0)]
    pub like_count: i32,
    #[sea_orm(default_value = 0)]
    pub love_count: i32,
    #[sea_orm(default_value = 0)]
    pub care_count: i32,
    #[sea_orm(default_value = 0)]
    pub haha_count: i32,
    #[sea_orm(default_value = 0)]
    pub wow_count: i32,
    #[sea_orm(default_value = 0)]
    pub sad_count: i32,
    #[sea_orm(default_value = 0)]
    pub angry_count: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Cascade"
    )]
    Parent,

    #[sea_orm(has_many = "super::comment_reaction::Entity")]
    Reactions,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::comment_reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
