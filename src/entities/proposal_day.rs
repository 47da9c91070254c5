//! Proposal day entity - One day of a multi-day itinerary, ordered by `day_number`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Itinerary day database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proposal_days")]
pub struct Model {
    /// Unique identifier for the day
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning proposal
    pub proposal_id: i64,
    /// 1-based position within the trip
    pub day_number: i32,
    /// Calendar date, if fixed
    pub date: Option<Date>,
    /// Optional heading (e.g. "Sonoma loop")
    pub title: Option<String>,
}

/// Defines relationships between a day and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each day belongs to one proposal
    #[sea_orm(
        belongs_to = "super::trip_proposal::Entity",
        from = "Column::ProposalId",
        to = "super::trip_proposal::Column::Id"
    )]
    Proposal,
    /// One day has many stops
    #[sea_orm(has_many = "super::proposal_stop::Entity")]
    Stops,
}

impl Related<super::trip_proposal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proposal.def()
    }
}

impl Related<super::proposal_stop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stops.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
