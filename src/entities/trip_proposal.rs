//! Trip proposal entity - The priced offer sent to a customer.
//!
//! Holds customer contact details, the party size and date range, every pricing
//! input (discount, rates, planning fee, deposit policy) and the derived totals
//! written back by the pricing recalculator.

use super::enums::{PlanningFeeMode, ProposalStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Trip proposal database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trip_proposals")]
pub struct Model {
    /// Unique identifier for the proposal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short headline shown on the dashboard
    pub title: String,
    /// Lifecycle label
    pub status: ProposalStatus,
    /// Customer full name
    pub customer_name: String,
    /// Customer email
    pub customer_email: Option<String>,
    /// Customer phone
    pub customer_phone: Option<String>,
    /// Number of travellers, drives per-person costs
    pub party_size: i32,
    /// First day of the trip
    pub start_date: Option<Date>,
    /// Last day of the trip
    pub end_date: Option<Date>,
    /// Derived: stops + inclusions + planning fee + gratuity
    pub subtotal: f64,
    /// Manual discount taken off the subtotal
    pub discount_amount: f64,
    /// Why the discount was given
    pub discount_reason: Option<String>,
    /// Tax rate in percent
    pub tax_rate: f64,
    /// Derived: tax on taxable, non-tax-included inclusions
    pub taxes: f64,
    /// Gratuity in percent of the service subtotal
    pub gratuity_percentage: f64,
    /// Derived gratuity amount
    pub gratuity_amount: f64,
    /// Flat or percentage planning fee
    pub planning_fee_mode: PlanningFeeMode,
    /// Planning fee in dollars (entered in flat mode, derived in percentage mode)
    pub planning_fee_amount: f64,
    /// Planning fee percentage used in percentage mode
    pub planning_fee_percentage: f64,
    /// Derived: subtotal - discount + taxes
    pub total: f64,
    /// Deposit percentage of the total
    pub deposit_percentage: f64,
    /// Derived deposit amount
    pub deposit_amount: f64,
    /// Acceptance grants access without a deposit
    pub skip_deposit_on_accept: bool,
    /// Split the total across guests
    pub individual_billing_enabled: bool,
    /// Date the balance is due, anchors the reminder schedule
    pub payment_deadline: Option<Date>,
    /// Suppresses dispatch of every pending reminder
    pub reminders_paused: bool,
    /// When the proposal was created
    pub created_at: DateTimeUtc,
    /// When the proposal was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between a proposal and its children
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One proposal has many itinerary days
    #[sea_orm(has_many = "super::proposal_day::Entity")]
    Days,
    /// One proposal has many inclusions
    #[sea_orm(has_many = "super::proposal_inclusion::Entity")]
    Inclusions,
    /// One proposal has many guests
    #[sea_orm(has_many = "super::proposal_guest::Entity")]
    Guests,
    /// One proposal has many reminders
    #[sea_orm(has_many = "super::payment_reminder::Entity")]
    Reminders,
}

impl Related<super::proposal_day::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Days.def()
    }
}

impl Related<super::proposal_inclusion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inclusions.def()
    }
}

impl Related<super::proposal_guest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guests.def()
    }
}

impl Related<super::payment_reminder::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reminders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
