//! Payment reminder entity - One scheduled nudge about the payment deadline.
//!
//! Generated reminders carry a tier `urgency` and `is_custom = false`; reminders
//! added by hand set `is_custom` and may carry a free-text message. `paused` is
//! an overlay on `pending` and never changes `status`.

use super::enums::{ReminderStatus, ReminderUrgency};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reminder database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_reminders")]
pub struct Model {
    /// Unique identifier for the reminder
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning proposal
    pub proposal_id: i64,
    /// Target guest, `None` for the whole proposal
    pub guest_id: Option<i64>,
    /// Day the reminder should go out
    pub scheduled_date: Date,
    /// Escalation tier
    pub urgency: ReminderUrgency,
    /// Delivery state
    pub status: ReminderStatus,
    /// Held back from dispatch
    pub paused: bool,
    /// Added by hand rather than generated from the tier table
    pub is_custom: bool,
    /// Free-text message entered with a hand-added reminder
    pub custom_message: Option<String>,
    /// When the send job delivered it
    pub sent_at: Option<DateTimeUtc>,
    /// When the reminder was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between a reminder and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each reminder belongs to one proposal
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
