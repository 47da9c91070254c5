//! Closed enumerations stored as text columns.
//!
//! Every status or mode that used to be a free-text column is a `DeriveActiveEnum`
//! here, so invalid values are rejected at deserialization time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle label of a proposal. Freely settable; not a managed state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Being prepared
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Sent to the customer
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Opened by the customer
    #[sea_orm(string_value = "viewed")]
    Viewed,
    /// Accepted by the customer
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Declined by the customer
    #[sea_orm(string_value = "declined")]
    Declined,
    /// Past its validity window
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Turned into a booking
    #[sea_orm(string_value = "converted")]
    Converted,
}

/// Kind of itinerary stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum StopType {
    /// Guest pickup
    #[sea_orm(string_value = "pickup")]
    Pickup,
    /// Guest dropoff
    #[sea_orm(string_value = "dropoff")]
    Dropoff,
    /// Winery visit, references a winery
    #[sea_orm(string_value = "winery")]
    Winery,
    /// Meal, references a restaurant
    #[sea_orm(string_value = "restaurant")]
    Restaurant,
    /// Overnight, references a hotel
    #[sea_orm(string_value = "hotel")]
    Hotel,
    /// Named activity
    #[sea_orm(string_value = "activity")]
    Activity,
    /// Anything else
    #[sea_orm(string_value = "custom")]
    Custom,
}

/// Vendor quote tracking for a stop. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// No quote asked for
    #[sea_orm(string_value = "not_requested")]
    NotRequested,
    /// Waiting on the vendor
    #[sea_orm(string_value = "requested")]
    Requested,
    /// Vendor replied with an amount
    #[sea_orm(string_value = "quoted")]
    Quoted,
    /// Quote accepted
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Quote declined
    #[sea_orm(string_value = "declined")]
    Declined,
}

/// How an inclusion's unit price scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
    /// quantity × unit price
    #[sea_orm(string_value = "flat")]
    Flat,
    /// quantity × unit price × party size
    #[sea_orm(string_value = "per_person")]
    PerPerson,
    /// quantity × unit price × day count
    #[sea_orm(string_value = "per_day")]
    PerDay,
}

/// Whether the planning fee is entered by hand or derived from services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PlanningFeeMode {
    /// Manual amount
    #[sea_orm(string_value = "flat")]
    Flat,
    /// Percentage of the service subtotal
    #[sea_orm(string_value = "percentage")]
    Percentage,
}

/// Payment progress of a single guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing paid
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    /// Some paid, balance outstanding
    #[sea_orm(string_value = "partial")]
    Partial,
    /// Fully paid
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Payments returned in full
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

/// Direction of a guest payment ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Money received
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Money returned
    #[sea_orm(string_value = "refund")]
    Refund,
}

/// Escalation tier of a payment reminder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ReminderUrgency {
    /// Gentle heads-up
    #[sea_orm(string_value = "friendly")]
    Friendly,
    /// Deadline approaching
    #[sea_orm(string_value = "firm")]
    Firm,
    /// Deadline imminent
    #[sea_orm(string_value = "urgent")]
    Urgent,
    /// Deadline day
    #[sea_orm(string_value = "final")]
    Final,
}

/// Delivery state of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// Waiting for its date
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Delivered by the send job
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Passed over by the send job
    #[sea_orm(string_value = "skipped")]
    Skipped,
    /// Withdrawn by an admin
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ReminderStatus {
    /// Only `pending` can move, and only to a terminal state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Sent | Self::Skipped | Self::Cancelled)
        )
    }

    /// `true` for sent, skipped and cancelled.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

impl fmt::Display for ReminderUrgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}
