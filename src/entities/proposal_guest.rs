//! Proposal guest entity - A traveller on a proposal and their share of the bill.
//!
//! `amount_owed` is derived by the billing allocator; `amount_owed_override`
//! wins over it when set. `amount_paid` only moves through recorded payments.

use super::enums::PaymentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guest database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proposal_guests")]
pub struct Model {
    /// Unique identifier for the guest
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning proposal
    pub proposal_id: i64,
    /// Guest name
    pub name: String,
    /// Guest email
    pub email: Option<String>,
    /// Guest phone
    pub phone: Option<String>,
    /// Primary contact, one per proposal
    pub is_primary: bool,
    /// Someone else covers this guest's share
    pub is_sponsored: bool,
    /// Derived share of the total
    pub amount_owed: f64,
    /// Manual share, wins over the derived one
    pub amount_owed_override: Option<f64>,
    /// Sum of payments minus refunds
    pub amount_paid: f64,
    /// Payment progress
    pub payment_status: PaymentStatus,
    /// When the guest was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between a guest and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each guest belongs to one proposal
    #[sea_orm(
        belongs_to = "super::trip_proposal::Entity",
        from = "Column::ProposalId",
        to = "super::trip_proposal::Column::Id"
    )]
    Proposal,
    /// One guest has many payment ledger rows
    #[sea_orm(has_many = "super::guest_payment::Entity")]
    Payments,
}

impl Related<super::trip_proposal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proposal.def()
    }
}

impl Related<super::guest_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
