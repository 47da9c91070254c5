//! Proposal inclusion entity - A priced line item independent of itinerary stops.

use super::enums::PricingType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inclusion database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proposal_inclusions")]
pub struct Model {
    /// Unique identifier for the inclusion
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning proposal
    pub proposal_id: i64,
    /// What is included (e.g. "Tasting fees")
    pub description: String,
    /// How the unit price scales
    pub pricing_type: PricingType,
    /// Number of units
    pub quantity: f64,
    /// Price per unit
    pub unit_price: f64,
    /// Manual line total, wins over quantity × unit price
    pub total_price: Option<f64>,
    /// Whether tax applies to this line
    pub is_taxable: bool,
    /// Line amount already contains tax
    pub tax_included_in_price: bool,
    /// Display order
    pub sort_order: i32,
}

/// Defines relationships between an inclusion and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each inclusion belongs to one proposal
    #[sea_orm(
        belongs_to = "super::trip_proposal::Entity",
        from = "Column::ProposalId",
        to = "super::trip_proposal::Column::Id"
    )]
    Proposal,
}

impl Related<super::trip_proposal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proposal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
