//! Reminder routes. All schedule changes go through one action endpoint.

use crate::{
    api::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AppState},
    core::reminder::{self, NewReminder},
    entities::{payment_reminder, trip_proposal},
};
use axum::{Router, extract::State, routing::get};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /trip-proposals/{id}/reminders`, tagged by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReminderAction {
    /// Build the tier schedule; `today` defaults to the server date
    GenerateSchedule {
        /// Reference date for skipping past tiers
        #[serde(default)]
        today: Option<NaiveDate>,
    },
    /// Pause every reminder on the proposal
    PauseProposal,
    /// Resume every reminder on the proposal
    ResumeProposal,
    /// Cancel one pending reminder
    Cancel {
        /// Target reminder
        reminder_id: i64,
    },
    /// Add a reminder by hand
    AddManual(NewReminder),
    /// Pause one reminder
    Pause {
        /// Target reminder
        reminder_id: i64,
    },
    /// Resume one reminder
    Resume {
        /// Target reminder
        reminder_id: i64,
    },
    /// Record delivery
    MarkSent {
        /// Target reminder
        reminder_id: i64,
    },
    /// Record a skipped delivery
    MarkSkipped {
        /// Target reminder
        reminder_id: i64,
    },
}

/// What an action returns.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReminderOutcome {
    /// Generated schedule
    Schedule(Vec<payment_reminder::Model>),
    /// Single reminder after the change
    Reminder(payment_reminder::Model),
    /// Proposal after a pause or resume
    Proposal(trip_proposal::Model),
}

#[derive(Debug, Deserialize)]
struct DueQuery {
    date: Option<NaiveDate>,
}

async fn list_reminders(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
) -> ApiResult<Vec<payment_reminder::Model>> {
    let history = reminder::list_reminders(&state.db, proposal_id).await?;
    Ok(ApiResponse::ok(history))
}

async fn apply_action(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
    ApiJson(action): ApiJson<ReminderAction>,
) -> ApiResult<ReminderOutcome> {
    let db = &state.db;
    let outcome = match action {
        ReminderAction::GenerateSchedule { today } => {
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            let schedule =
                reminder::generate_schedule(db, &state.config.reminders, proposal_id, today)
                    .await?;
            ReminderOutcome::Schedule(schedule)
        }
        ReminderAction::PauseProposal => {
            ReminderOutcome::Proposal(reminder::pause_proposal(db, proposal_id).await?)
        }
        ReminderAction::ResumeProposal => {
            ReminderOutcome::Proposal(reminder::resume_proposal(db, proposal_id).await?)
        }
        ReminderAction::Cancel { reminder_id } => {
            ReminderOutcome::Reminder(reminder::cancel_reminder(db, proposal_id, reminder_id).await?)
        }
        ReminderAction::AddManual(new) => {
            ReminderOutcome::Reminder(reminder::add_custom_reminder(db, proposal_id, new).await?)
        }
        ReminderAction::Pause { reminder_id } => {
            ReminderOutcome::Reminder(reminder::pause_reminder(db, proposal_id, reminder_id).await?)
        }
        ReminderAction::Resume { reminder_id } => ReminderOutcome::Reminder(
            reminder::resume_reminder(db, proposal_id, reminder_id).await?,
        ),
        ReminderAction::MarkSent { reminder_id } => {
            ReminderOutcome::Reminder(reminder::mark_sent(db, proposal_id, reminder_id).await?)
        }
        ReminderAction::MarkSkipped { reminder_id } => {
            ReminderOutcome::Reminder(reminder::mark_skipped(db, proposal_id, reminder_id).await?)
        }
    };
    Ok(ApiResponse::ok(outcome))
}

async fn due_reminders(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DueQuery>,
) -> ApiResult<Vec<payment_reminder::Model>> {
    let on_date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let due = reminder::due_reminders(&state.db, on_date).await?;
    Ok(ApiResponse::ok(due))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/trip-proposals/{id}/reminders",
            get(list_reminders).post(apply_action),
        )
        .route("/reminders/due", get(due_reminders))
}
