//! Guest business logic - Travellers on a proposal.
//!
//! Exactly one guest per proposal is primary: the first guest added becomes
//! primary, promoting another guest demotes the previous one, and removing the
//! primary promotes the earliest remaining guest.

use crate::{
    core::{money, proposal},
    entities::{
        GuestPayment, PaymentGroupMember, PaymentReminder, ProposalGuest,
        enums::{PaymentStatus, ReminderStatus},
        guest_payment, payment_group_member, payment_reminder, proposal_guest,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;

/// Fields accepted when adding a guest.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGuest {
    /// Guest name
    pub name: String,
    /// Guest email
    #[serde(default)]
    pub email: Option<String>,
    /// Guest phone
    #[serde(default)]
    pub phone: Option<String>,
    /// Make this guest the primary contact
    #[serde(default)]
    pub is_primary: bool,
    /// Exclude from the cost split
    #[serde(default)]
    pub is_sponsored: bool,
    /// Manual share
    #[serde(default)]
    pub amount_owed_override: Option<f64>,
}

/// Fields accepted when updating a guest. `amount_owed_override: null` removes
/// the override.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuestPatch {
    /// Guest name
    pub name: Option<String>,
    /// Guest email
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub email: Option<Option<String>>,
    /// Guest phone
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub phone: Option<Option<String>>,
    /// Promote to primary; `false` is rejected for the current primary
    pub is_primary: Option<bool>,
    /// Exclude from the cost split
    pub is_sponsored: Option<bool>,
    /// Manual share
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub amount_owed_override: Option<Option<f64>>,
}

/// Finds a guest that belongs to `proposal_id`.
pub async fn find_guest<C>(db: &C, proposal_id: i64, guest_id: i64) -> Result<proposal_guest::Model>
where
    C: ConnectionTrait,
{
    ProposalGuest::find_by_id(guest_id)
        .one(db)
        .await?
        .filter(|guest| guest.proposal_id == proposal_id)
        .ok_or(Error::NotFound {
            entity: "guest",
            id: guest_id,
        })
}

/// Lists guests, primary first then in the order they were added.
pub async fn list_guests<C>(db: &C, proposal_id: i64) -> Result<Vec<proposal_guest::Model>>
where
    C: ConnectionTrait,
{
    ProposalGuest::find()
        .filter(proposal_guest::Column::ProposalId.eq(proposal_id))
        .order_by_desc(proposal_guest::Column::IsPrimary)
        .order_by_asc(proposal_guest::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn clear_primary<C>(db: &C, proposal_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    ProposalGuest::update_many()
        .col_expr(proposal_guest::Column::IsPrimary, Expr::value(false))
        .filter(proposal_guest::Column::ProposalId.eq(proposal_id))
        .exec(db)
        .await?;
    Ok(())
}

fn validate_override(value: Option<f64>) -> Result<()> {
    if let Some(amount) = value {
        money::require_non_negative(amount, "amount_owed_override")?;
    }
    Ok(())
}

/// Adds a guest. The first guest on a proposal is always primary.
pub async fn add_guest(
    db: &DatabaseConnection,
    proposal_id: i64,
    new: NewGuest,
) -> Result<proposal_guest::Model> {
    if new.name.trim().is_empty() {
        return Err(Error::validation("guest name cannot be empty"));
    }
    validate_override(new.amount_owed_override)?;

    let txn = db.begin().await?;
    proposal::get_proposal(&txn, proposal_id).await?;

    let existing = ProposalGuest::find()
        .filter(proposal_guest::Column::ProposalId.eq(proposal_id))
        .count(&txn)
        .await?;
    let is_primary = new.is_primary || existing == 0;
    if is_primary {
        clear_primary(&txn, proposal_id).await?;
    }

    let guest = proposal_guest::ActiveModel {
        proposal_id: Set(proposal_id),
        name: Set(new.name.trim().to_string()),
        email: Set(new.email),
        phone: Set(new.phone),
        is_primary: Set(is_primary),
        is_sponsored: Set(new.is_sponsored),
        amount_owed: Set(0.0),
        amount_owed_override: Set(new.amount_owed_override),
        amount_paid: Set(0.0),
        payment_status: Set(PaymentStatus::Unpaid),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    tracing::info!(proposal_id, guest_id = guest.id, "Added guest");
    Ok(guest)
}

/// Updates a guest's contact details, billing flags or override.
///
/// Amounts owed are not touched; run the billing recalculation to apply a new
/// override or sponsorship.
pub async fn update_guest(
    db: &DatabaseConnection,
    proposal_id: i64,
    guest_id: i64,
    patch: GuestPatch,
) -> Result<proposal_guest::Model> {
    let txn = db.begin().await?;
    let guest = find_guest(&txn, proposal_id, guest_id).await?;
    let was_primary = guest.is_primary;
    let mut active: proposal_guest::ActiveModel = guest.into();

    if let Some(name) = patch.name {
        if name.trim().is_empty() {
            return Err(Error::validation("guest name cannot be empty"));
        }
        active.name = Set(name.trim().to_string());
    }
    if let Some(email) = patch.email {
        active.email = Set(email);
    }
    if let Some(phone) = patch.phone {
        active.phone = Set(phone);
    }
    match patch.is_primary {
        Some(true) if !was_primary => {
            clear_primary(&txn, proposal_id).await?;
            active.is_primary = Set(true);
        }
        Some(false) if was_primary => {
            return Err(Error::validation(
                "promote another guest to primary instead of demoting the current one",
            ));
        }
        _ => {}
    }
    if let Some(is_sponsored) = patch.is_sponsored {
        active.is_sponsored = Set(is_sponsored);
    }
    if let Some(amount_owed_override) = patch.amount_owed_override {
        validate_override(amount_owed_override)?;
        active.amount_owed_override = Set(amount_owed_override);
    }

    let updated = active.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Removes a guest whose payments net to zero.
///
/// Their ledger rows and group membership go with them, and any pending
/// reminders addressed to them are cancelled.
pub async fn remove_guest(db: &DatabaseConnection, proposal_id: i64, guest_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let guest = find_guest(&txn, proposal_id, guest_id).await?;
    if guest.amount_paid > 0.0 {
        return Err(Error::validation(format!(
            "guest {guest_id} has payments on record; refund them before removing the guest"
        )));
    }
    let was_primary = guest.is_primary;

    PaymentGroupMember::delete_many()
        .filter(payment_group_member::Column::GuestId.eq(guest_id))
        .exec(&txn)
        .await?;
    GuestPayment::delete_many()
        .filter(guest_payment::Column::GuestId.eq(guest_id))
        .exec(&txn)
        .await?;
    PaymentReminder::update_many()
        .col_expr(
            payment_reminder::Column::Status,
            Expr::value(ReminderStatus::Cancelled),
        )
        .filter(payment_reminder::Column::GuestId.eq(guest_id))
        .filter(payment_reminder::Column::Status.eq(ReminderStatus::Pending))
        .exec(&txn)
        .await?;
    guest.delete(&txn).await?;

    if was_primary {
        let next = ProposalGuest::find()
            .filter(proposal_guest::Column::ProposalId.eq(proposal_id))
            .order_by_asc(proposal_guest::Column::Id)
            .one(&txn)
            .await?;
        if let Some(next) = next {
            let mut active: proposal_guest::ActiveModel = next.into();
            active.is_primary = Set(true);
            active.update(&txn).await?;
        }
    }

    txn.commit().await?;
    Ok(())
}
