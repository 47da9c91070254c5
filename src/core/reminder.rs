//! Reminder business logic - The payment-deadline reminder schedule.
//!
//! Generated reminders come from the tier table in [`ReminderPolicy`]; each
//! tier produces at most one pending generated reminder per proposal, so
//! regenerating after a deadline change moves the existing reminders instead
//! of piling up new ones. Status only moves out of `pending`; pausing is an
//! overlay that the send job honours through [`due_reminders`].

use crate::{
    config::ReminderPolicy,
    core::{guest, proposal},
    entities::{
        PaymentReminder, TripProposal,
        enums::{ReminderStatus, ReminderUrgency},
        payment_reminder, trip_proposal,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, TimeDelta, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;
use std::collections::HashMap;

/// Fields accepted when adding a reminder by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReminder {
    /// Day to send
    pub scheduled_date: NaiveDate,
    /// Escalation level
    pub urgency: ReminderUrgency,
    /// Free-text message for the send job
    #[serde(default)]
    pub message: Option<String>,
    /// Single recipient, the whole proposal when absent
    #[serde(default)]
    pub guest_id: Option<i64>,
}

async fn find_reminder<C>(
    db: &C,
    proposal_id: i64,
    reminder_id: i64,
) -> Result<payment_reminder::Model>
where
    C: ConnectionTrait,
{
    PaymentReminder::find_by_id(reminder_id)
        .one(db)
        .await?
        .filter(|reminder| reminder.proposal_id == proposal_id)
        .ok_or(Error::NotFound {
            entity: "reminder",
            id: reminder_id,
        })
}

fn tier_date(deadline: NaiveDate, days_before: i64) -> Result<NaiveDate> {
    deadline
        .checked_sub_signed(TimeDelta::days(days_before))
        .ok_or_else(|| Error::validation(format!("{days_before} days before {deadline} is out of range")))
}

/// Builds (or moves) the tier reminders for a proposal's payment deadline.
///
/// Tiers that would fall before `today` are not created, and an existing
/// pending reminder for such a tier is cancelled. Returns the pending
/// generated reminders, earliest first.
pub async fn generate_schedule(
    db: &DatabaseConnection,
    policy: &ReminderPolicy,
    proposal_id: i64,
    today: NaiveDate,
) -> Result<Vec<payment_reminder::Model>> {
    let txn = db.begin().await?;
    let proposal = proposal::get_proposal(&txn, proposal_id).await?;
    let deadline = proposal
        .payment_deadline
        .ok_or(Error::MissingPaymentDeadline { proposal_id })?;

    let mut existing: HashMap<ReminderUrgency, payment_reminder::Model> =
        generated_pending(&txn, proposal_id)
            .await?
            .into_iter()
            .map(|reminder| (reminder.urgency, reminder))
            .collect();

    for tier in &policy.tiers {
        let date = tier_date(deadline, tier.days_before)?;
        let current = existing.remove(&tier.urgency);

        match current {
            Some(reminder) if date < today => {
                let mut active: payment_reminder::ActiveModel = reminder.into();
                active.status = Set(ReminderStatus::Cancelled);
                active.update(&txn).await?;
            }
            Some(reminder) if reminder.scheduled_date != date => {
                let mut active: payment_reminder::ActiveModel = reminder.into();
                active.scheduled_date = Set(date);
                active.update(&txn).await?;
            }
            Some(_) => {}
            None if date < today => {}
            None => {
                payment_reminder::ActiveModel {
                    proposal_id: Set(proposal_id),
                    guest_id: Set(None),
                    scheduled_date: Set(date),
                    urgency: Set(tier.urgency),
                    status: Set(ReminderStatus::Pending),
                    paused: Set(false),
                    is_custom: Set(false),
                    custom_message: Set(None),
                    sent_at: Set(None),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
    }

    let schedule = generated_pending(&txn, proposal_id).await?;
    txn.commit().await?;
    tracing::info!(
        proposal_id,
        %deadline,
        reminders = schedule.len(),
        "Generated reminder schedule"
    );
    Ok(schedule)
}

async fn generated_pending<C>(db: &C, proposal_id: i64) -> Result<Vec<payment_reminder::Model>>
where
    C: ConnectionTrait,
{
    PaymentReminder::find()
        .filter(payment_reminder::Column::ProposalId.eq(proposal_id))
        .filter(payment_reminder::Column::IsCustom.eq(false))
        .filter(payment_reminder::Column::GuestId.is_null())
        .filter(payment_reminder::Column::Status.eq(ReminderStatus::Pending))
        .order_by_asc(payment_reminder::Column::ScheduledDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Cancels a proposal's pending generated reminders, leaving custom ones.
/// Used when the deadline they count back from goes away.
pub(crate) async fn cancel_generated_in<C>(db: &C, proposal_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = PaymentReminder::update_many()
        .col_expr(
            payment_reminder::Column::Status,
            Expr::value(ReminderStatus::Cancelled),
        )
        .filter(payment_reminder::Column::ProposalId.eq(proposal_id))
        .filter(payment_reminder::Column::IsCustom.eq(false))
        .filter(payment_reminder::Column::Status.eq(ReminderStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn set_proposal_paused(
    db: &DatabaseConnection,
    proposal_id: i64,
    paused: bool,
) -> Result<trip_proposal::Model> {
    let found = proposal::get_proposal(db, proposal_id).await?;
    let mut active: trip_proposal::ActiveModel = found.into();
    active.reminders_paused = Set(paused);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    tracing::info!(proposal_id, paused, "Changed proposal reminder pause");
    Ok(updated)
}

/// Holds back every pending reminder on a proposal. Statuses are untouched.
pub async fn pause_proposal(
    db: &DatabaseConnection,
    proposal_id: i64,
) -> Result<trip_proposal::Model> {
    set_proposal_paused(db, proposal_id, true).await
}

/// Lets a paused proposal's pending reminders go out again.
pub async fn resume_proposal(
    db: &DatabaseConnection,
    proposal_id: i64,
) -> Result<trip_proposal::Model> {
    set_proposal_paused(db, proposal_id, false).await
}

async fn set_reminder_paused(
    db: &DatabaseConnection,
    proposal_id: i64,
    reminder_id: i64,
    paused: bool,
) -> Result<payment_reminder::Model> {
    let reminder = find_reminder(db, proposal_id, reminder_id).await?;
    if reminder.status.is_terminal() {
        return Err(Error::InvalidTransition {
            from: reminder.status.to_string(),
            to: if paused { "paused" } else { "resumed" }.to_string(),
        });
    }
    let mut active: payment_reminder::ActiveModel = reminder.into();
    active.paused = Set(paused);
    active.update(db).await.map_err(Into::into)
}

/// Holds back a single pending reminder.
pub async fn pause_reminder(
    db: &DatabaseConnection,
    proposal_id: i64,
    reminder_id: i64,
) -> Result<payment_reminder::Model> {
    set_reminder_paused(db, proposal_id, reminder_id, true).await
}

/// Releases a single paused reminder.
pub async fn resume_reminder(
    db: &DatabaseConnection,
    proposal_id: i64,
    reminder_id: i64,
) -> Result<payment_reminder::Model> {
    set_reminder_paused(db, proposal_id, reminder_id, false).await
}

async fn transition(
    db: &DatabaseConnection,
    proposal_id: i64,
    reminder_id: i64,
    next: ReminderStatus,
) -> Result<payment_reminder::Model> {
    let reminder = find_reminder(db, proposal_id, reminder_id).await?;
    if !reminder.status.can_transition_to(next) {
        return Err(Error::InvalidTransition {
            from: reminder.status.to_string(),
            to: next.to_string(),
        });
    }

    let mut active: payment_reminder::ActiveModel = reminder.into();
    active.status = Set(next);
    if next == ReminderStatus::Sent {
        active.sent_at = Set(Some(Utc::now()));
    }
    let updated = active.update(db).await?;
    tracing::info!(proposal_id, reminder_id, status = %next, "Reminder status changed");
    Ok(updated)
}

/// Withdraws a pending reminder.
pub async fn cancel_reminder(
    db: &DatabaseConnection,
    proposal_id: i64,
    reminder_id: i64,
) -> Result<payment_reminder::Model> {
    transition(db, proposal_id, reminder_id, ReminderStatus::Cancelled).await
}

/// Records delivery by the send job.
pub async fn mark_sent(
    db: &DatabaseConnection,
    proposal_id: i64,
    reminder_id: i64,
) -> Result<payment_reminder::Model> {
    transition(db, proposal_id, reminder_id, ReminderStatus::Sent).await
}

/// Records that the send job passed the reminder over.
pub async fn mark_skipped(
    db: &DatabaseConnection,
    proposal_id: i64,
    reminder_id: i64,
) -> Result<payment_reminder::Model> {
    transition(db, proposal_id, reminder_id, ReminderStatus::Skipped).await
}

/// Adds a reminder outside the tier table.
pub async fn add_custom_reminder(
    db: &DatabaseConnection,
    proposal_id: i64,
    new: NewReminder,
) -> Result<payment_reminder::Model> {
    proposal::get_proposal(db, proposal_id).await?;
    if let Some(guest_id) = new.guest_id {
        guest::find_guest(db, proposal_id, guest_id).await?;
    }
    let message = new
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let reminder = payment_reminder::ActiveModel {
        proposal_id: Set(proposal_id),
        guest_id: Set(new.guest_id),
        scheduled_date: Set(new.scheduled_date),
        urgency: Set(new.urgency),
        status: Set(ReminderStatus::Pending),
        paused: Set(false),
        is_custom: Set(true),
        custom_message: Set(message),
        sent_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(
        proposal_id,
        reminder_id = reminder.id,
        date = %reminder.scheduled_date,
        "Added custom reminder"
    );
    Ok(reminder)
}

/// Full reminder history of a proposal, by scheduled date.
pub async fn list_reminders(
    db: &DatabaseConnection,
    proposal_id: i64,
) -> Result<Vec<payment_reminder::Model>> {
    proposal::get_proposal(db, proposal_id).await?;
    PaymentReminder::find()
        .filter(payment_reminder::Column::ProposalId.eq(proposal_id))
        .order_by_asc(payment_reminder::Column::ScheduledDate)
        .order_by_asc(payment_reminder::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pending, unpaused reminders due on or before `on_date`, skipping paused
/// proposals.
pub async fn due_reminders(
    db: &DatabaseConnection,
    on_date: NaiveDate,
) -> Result<Vec<payment_reminder::Model>> {
    let paused: Vec<i64> = TripProposal::find()
        .select_only()
        .column(trip_proposal::Column::Id)
        .filter(trip_proposal::Column::RemindersPaused.eq(true))
        .into_tuple()
        .all(db)
        .await?;

    PaymentReminder::find()
        .filter(payment_reminder::Column::Status.eq(ReminderStatus::Pending))
        .filter(payment_reminder::Column::Paused.eq(false))
        .filter(payment_reminder::Column::ScheduledDate.lte(on_date))
        .filter(payment_reminder::Column::ProposalId.is_not_in(paused))
        .order_by_asc(payment_reminder::Column::ScheduledDate)
        .order_by_asc(payment_reminder::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
