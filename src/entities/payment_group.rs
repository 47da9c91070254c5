//! Payment group entity - Several guests paying through one shared link.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment group database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_groups")]
pub struct Model {
    /// Unique identifier for the group
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning proposal
    pub proposal_id: i64,
    /// Display name (e.g. "The Smiths")
    pub name: String,
    /// Token embedded in the shared payment link
    #[sea_orm(unique)]
    pub access_token: String,
    /// When the group was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between a group and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One group has many members
    #[sea_orm(has_many = "super::payment_group_member::Entity")]
    Members,
}

impl Related<super::payment_group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
