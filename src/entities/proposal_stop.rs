//! Proposal stop entity - A scheduled visit within an itinerary day.
//!
//! A stop references exactly one of a winery, restaurant, hotel or a custom name.
//! `per_person_cost` and `flat_cost` feed pricing; the quote fields do not.

use super::enums::{QuoteStatus, StopType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Itinerary stop database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proposal_stops")]
pub struct Model {
    /// Unique identifier for the stop
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning day
    pub day_id: i64,
    /// Owning proposal, denormalized for pricing queries
    pub proposal_id: i64,
    /// Position within the day
    pub stop_order: i32,
    /// Kind of stop
    pub stop_type: StopType,
    /// Referenced winery
    pub winery_id: Option<i64>,
    /// Referenced restaurant
    pub restaurant_id: Option<i64>,
    /// Referenced hotel
    pub hotel_id: Option<i64>,
    /// Free-text location name
    pub custom_name: Option<String>,
    /// Cost per traveller
    pub per_person_cost: f64,
    /// Cost for the whole party
    pub flat_cost: f64,
    /// Vendor quote progress
    pub quote_status: QuoteStatus,
    /// Amount the vendor quoted
    pub quoted_amount: Option<f64>,
    /// Operator notes
    pub notes: Option<String>,
}

/// Defines relationships between a stop and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each stop belongs to one day
    #[sea_orm(
        belongs_to = "super::proposal_day::Entity",
        from = "Column::DayId",
        to = "super::proposal_day::Column::Id"
    )]
    Day,
}

impl Related<super::proposal_day::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Day.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
