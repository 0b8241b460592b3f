//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Author user ID
    #[sea_orm(indexed)]
    pub author_id: String,

    /// Post text
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    /// Attached images (`[{src, width, height}]`)
    #[sea_orm(column_type = "JsonBinary")]
    pub images: Json,

    /// Reaction counters (denormalized, one per reaction type)
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

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::post_reaction::Entity")]
    Reactions,

    #[sea_orm(has_many = "super::share::Entity")]
    Shares,

    #[sea_orm(has_many = "super::save::Entity")]
    Saves,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::post_reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl Related<super::share::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl Related<super::save::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Saves.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
