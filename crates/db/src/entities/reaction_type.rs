//! Reaction types shared by post and comment reactions.

use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The seven mutually exclusive reaction types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "love")]
    Love,
    #[sea_orm(string_value = "care")]
    Care,
    #[sea_orm(string_value = "haha")]
    Haha,
    #[sea_orm(string_value = "wow")]
    Wow,
    #[sea_orm(string_value = "sad")]
    Sad,
    #[sea_orm(string_value = "angry")]
    Angry,
}

impl ReactionType {
    /// All reaction types, in display order.
    pub const ALL: [Self; 7] = [
        Self::Like,
        Self::Love,
        Self::Care,
        Self::Haha,
        Self::Wow,
        Self::Sad,
        Self::Angry,
    ];

    /// Wire and storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Love => "love",
            Self::Care => "care",
            Self::Haha => "haha",
            Self::Wow => "wow",
            Self::Sad => "sad",
            Self::Angry => "angry",
        }
    }

    /// Name of the denormalized counter column on reactable tables.
    #[must_use]
    pub const fn counter_column(self) -> &'static str {
        match self {
            Self::Like => "like_count",
            Self::Love => "love_count",
            Self::Care => "care_count",
            Self::Haha => "haha_count",
            Self::Wow => "wow_count",
            Self::Sad => "sad_count",
            Self::Angry => "angry_count",
        }
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown reaction type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reaction type: {0}")]
pub struct UnknownReactionType(pub String);

impl FromStr for ReactionType {
    type Err = UnknownReactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownReactionType(s.to_string()))
    }
}
