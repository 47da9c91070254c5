//! Guest payment entity - Ledger of every payment and refund applied to a guest.
use super::enums::PaymentKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guest payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guest_payments")]
pub struct Model {
    /// Unique identifier for the ledger row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning proposal
    pub proposal_id: i64,
    /// Guest the money was applied to
    pub guest_id: i64,
    /// Set when the payment came through a shared group link
    pub payment_group_id: Option<i64>,
    /// Always positive; direction is given by `kind`
    pub amount: f64,
    /// Payment or refund
    pub kind: PaymentKind,
    /// Free-text note (check number, processor reference)
    pub note: Option<String>,
    /// When the money moved
    pub recorded_at: DateTimeUtc,
}

/// Defines relationships between a ledger row and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row belongs to one guest
    #[sea_orm(
        belongs_to = "super::proposal_guest::Entity",
        from = "Column::GuestId",
        to = "super::proposal_guest::Column::Id"
    )]
    Guest,
}

impl Related<super::proposal_guest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
