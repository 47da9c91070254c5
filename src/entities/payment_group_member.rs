//! Payment group member entity - Links a guest to the group that pays for them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group membership database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_group_members")]
pub struct Model {
    /// Unique identifier for the membership
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group
    pub group_id: i64,
    /// Member guest, at most one group per guest
    #[sea_orm(unique)]
    pub guest_id: i64,
}

/// Defines relationships between a membership and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each membership belongs to one group
    #[sea_orm(
        belongs_to = "super::payment_group::Entity",
        from = "Column::GroupId",
        to = "super::payment_group::Column::Id"
    )]
    Group,
}

impl Related<super::payment_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
