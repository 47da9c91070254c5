//! Billing business logic - Splitting a proposal total across its guests.
//!
//! Shares are computed in `Decimal` and stored rounded to cents. Sponsored
//! guests owe nothing and are left out of the denominator; an override always
//! wins over the equal share and is never cleared by a recalculation.

use crate::{
    core::{guest, money, proposal},
    entities::{
        GuestPayment,
        enums::{PaymentKind, PaymentStatus},
        guest_payment, proposal_guest, trip_proposal,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// Result of the "Verify Billing" check. Reports only; never corrects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingVerification {
    /// Proposal total
    pub proposal_total: f64,
    /// Sum of every guest's amount owed
    pub allocated_total: f64,
    /// `proposal_total - allocated_total`
    pub difference: f64,
    /// `|difference|` within tolerance
    pub is_balanced: bool,
    /// Number of guests
    pub guest_count: usize,
    /// Number of sponsored guests
    pub sponsored_count: usize,
    /// Number of guests with a manual share
    pub override_count: usize,
}

/// One guest's line in the billing summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestBalance {
    /// Guest id
    pub guest_id: i64,
    /// Guest name
    pub name: String,
    /// Primary contact
    pub is_primary: bool,
    /// Excluded from the split
    pub is_sponsored: bool,
    /// Share of the total
    pub amount_owed: f64,
    /// Net amount received
    pub amount_paid: f64,
    /// `max(amount_owed - amount_paid, 0)`
    pub outstanding: f64,
    /// Payment progress
    pub payment_status: PaymentStatus,
}

/// Per-guest balances plus proposal-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingSummary {
    /// Proposal id
    pub proposal_id: i64,
    /// Whether the total is split across guests
    pub individual_billing_enabled: bool,
    /// Proposal total
    pub proposal_total: f64,
    /// Sum of amounts owed
    pub total_owed: f64,
    /// Sum of amounts paid
    pub total_paid: f64,
    /// Sum of outstanding balances
    pub total_outstanding: f64,
    /// Guests, primary first
    pub guests: Vec<GuestBalance>,
}

/// Computes each guest's amount owed, in the order given.
///
/// `guests` must already be ordered primary first then by id; leftover cents
/// of the equal split go to the earliest non-sponsored guests.
#[must_use]
pub fn allocate(total: f64, guests: &[proposal_guest::Model]) -> Vec<(i64, f64)> {
    let payers = guests.iter().filter(|g| !g.is_sponsored).count();
    let mut shares = money::split_evenly(money::to_decimal(total), payers).into_iter();

    guests
        .iter()
        .map(|guest| {
            if guest.is_sponsored {
                return (guest.id, 0.0);
            }
            let share = shares.next().unwrap_or_default();
            let owed = guest
                .amount_owed_override
                .map_or(share, money::to_decimal);
            (guest.id, money::to_f64(owed))
        })
        .collect()
}

/// Derives a guest's payment status from what they owe and have paid.
#[must_use]
pub fn derive_status(amount_owed: f64, amount_paid: f64, tolerance: f64) -> PaymentStatus {
    let owed = money::to_decimal(amount_owed);
    let paid = money::to_decimal(amount_paid);
    if paid <= Decimal::ZERO {
        PaymentStatus::Unpaid
    } else if paid >= owed - money::to_decimal(tolerance) {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Partial
    }
}

pub(crate) fn outstanding_of(guest: &proposal_guest::Model) -> Decimal {
    let outstanding = money::to_decimal(guest.amount_owed) - money::to_decimal(guest.amount_paid);
    outstanding.max(Decimal::ZERO)
}

pub(crate) fn require_individual_billing(proposal: &trip_proposal::Model) -> Result<()> {
    if proposal.individual_billing_enabled {
        Ok(())
    } else {
        Err(Error::BillingDisabled {
            proposal_id: proposal.id,
        })
    }
}

/// Rewrites every guest's amount owed ("Recalculate All").
///
/// Payments and payment statuses are left as they are.
pub async fn calculate_allocations(
    db: &DatabaseConnection,
    proposal_id: i64,
) -> Result<Vec<proposal_guest::Model>> {
    let txn = db.begin().await?;
    let proposal = proposal::get_proposal(&txn, proposal_id).await?;
    require_individual_billing(&proposal)?;

    let guests = guest::list_guests(&txn, proposal_id).await?;
    let allocations = allocate(proposal.total, &guests);

    let mut updated = Vec::with_capacity(guests.len());
    for (guest, (_, owed)) in guests.into_iter().zip(allocations) {
        let mut active: proposal_guest::ActiveModel = guest.into();
        active.amount_owed = Set(owed);
        updated.push(active.update(&txn).await?);
    }

    txn.commit().await?;
    tracing::info!(
        proposal_id,
        guests = updated.len(),
        total = proposal.total,
        "Recalculated guest allocations"
    );
    Ok(updated)
}

/// Compares the proposal total with the sum of amounts owed.
pub async fn verify(
    db: &DatabaseConnection,
    proposal_id: i64,
    tolerance: f64,
) -> Result<BillingVerification> {
    let proposal = proposal::get_proposal(db, proposal_id).await?;
    let guests = guest::list_guests(db, proposal_id).await?;

    let allocated: Decimal = guests
        .iter()
        .map(|g| money::to_decimal(g.amount_owed))
        .sum();
    let difference = money::to_decimal(proposal.total) - allocated;
    let is_balanced = difference.abs() <= money::to_decimal(tolerance);

    if !is_balanced {
        tracing::warn!(
            proposal_id,
            total = proposal.total,
            allocated = money::to_f64(allocated),
            "Guest allocations do not add up to the proposal total"
        );
    }

    Ok(BillingVerification {
        proposal_total: proposal.total,
        allocated_total: money::to_f64(allocated),
        difference: money::to_f64(difference),
        is_balanced,
        guest_count: guests.len(),
        sponsored_count: guests.iter().filter(|g| g.is_sponsored).count(),
        override_count: guests
            .iter()
            .filter(|g| g.amount_owed_override.is_some())
            .count(),
    })
}

/// Builds the per-guest balance sheet.
pub async fn summary(db: &DatabaseConnection, proposal_id: i64) -> Result<BillingSummary> {
    let proposal = proposal::get_proposal(db, proposal_id).await?;
    let guests = guest::list_guests(db, proposal_id).await?;

    let mut total_owed = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;
    let mut total_outstanding = Decimal::ZERO;
    let balances = guests
        .into_iter()
        .map(|g| {
            let outstanding = outstanding_of(&g);
            total_owed += money::to_decimal(g.amount_owed);
            total_paid += money::to_decimal(g.amount_paid);
            total_outstanding += outstanding;
            GuestBalance {
                guest_id: g.id,
                name: g.name,
                is_primary: g.is_primary,
                is_sponsored: g.is_sponsored,
                amount_owed: g.amount_owed,
                amount_paid: g.amount_paid,
                outstanding: money::to_f64(outstanding),
                payment_status: g.payment_status,
            }
        })
        .collect();

    Ok(BillingSummary {
        proposal_id,
        individual_billing_enabled: proposal.individual_billing_enabled,
        proposal_total: proposal.total,
        total_owed: money::to_f64(total_owed),
        total_paid: money::to_f64(total_paid),
        total_outstanding: money::to_f64(total_outstanding),
        guests: balances,
    })
}

/// Applies one payment to a guest inside an open transaction.
///
/// Callers validate the amount against the outstanding balance first.
pub(crate) async fn apply_payment_in<C>(
    db: &C,
    guest: proposal_guest::Model,
    amount: Decimal,
    note: Option<String>,
    payment_group_id: Option<i64>,
    tolerance: f64,
) -> Result<proposal_guest::Model>
where
    C: ConnectionTrait,
{
    let paid = money::to_f64(money::to_decimal(guest.amount_paid) + amount);

    guest_payment::ActiveModel {
        proposal_id: Set(guest.proposal_id),
        guest_id: Set(guest.id),
        payment_group_id: Set(payment_group_id),
        amount: Set(money::to_f64(amount)),
        kind: Set(PaymentKind::Payment),
        note: Set(note),
        recorded_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let status = derive_status(guest.amount_owed, paid, tolerance);
    let mut active: proposal_guest::ActiveModel = guest.into();
    active.amount_paid = Set(paid);
    active.payment_status = Set(status);
    active.update(db).await.map_err(Into::into)
}

/// Records a payment from one guest.
pub async fn record_payment(
    db: &DatabaseConnection,
    proposal_id: i64,
    guest_id: i64,
    amount: f64,
    note: Option<String>,
    tolerance: f64,
) -> Result<proposal_guest::Model> {
    money::require_payment_amount(amount)?;

    let txn = db.begin().await?;
    let proposal = proposal::get_proposal(&txn, proposal_id).await?;
    require_individual_billing(&proposal)?;
    let guest = guest::find_guest(&txn, proposal_id, guest_id).await?;

    let payment = money::to_decimal(amount);
    let outstanding = outstanding_of(&guest);
    if payment > outstanding + money::to_decimal(tolerance) {
        return Err(Error::Overpayment {
            amount,
            outstanding: money::to_f64(outstanding),
        });
    }

    let updated = apply_payment_in(&txn, guest, payment, note, None, tolerance).await?;
    txn.commit().await?;

    tracing::info!(
        proposal_id,
        guest_id,
        amount,
        status = ?updated.payment_status,
        "Recorded guest payment"
    );
    Ok(updated)
}

/// Returns money to a guest. A full refund leaves the guest `refunded`.
pub async fn refund_payment(
    db: &DatabaseConnection,
    proposal_id: i64,
    guest_id: i64,
    amount: f64,
    note: Option<String>,
) -> Result<proposal_guest::Model> {
    money::require_payment_amount(amount)?;

    let txn = db.begin().await?;
    let guest = guest::find_guest(&txn, proposal_id, guest_id).await?;

    let refund = money::to_decimal(amount);
    let paid = money::to_decimal(guest.amount_paid);
    if refund > paid {
        return Err(Error::validation(format!(
            "refund of {amount:.2} exceeds amount paid {:.2}",
            guest.amount_paid
        )));
    }

    guest_payment::ActiveModel {
        proposal_id: Set(proposal_id),
        guest_id: Set(guest_id),
        payment_group_id: Set(None),
        amount: Set(money::to_f64(refund)),
        kind: Set(PaymentKind::Refund),
        note: Set(note),
        recorded_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let remaining = paid - refund;
    let status = if remaining.is_zero() {
        PaymentStatus::Refunded
    } else {
        PaymentStatus::Partial
    };
    let mut active: proposal_guest::ActiveModel = guest.into();
    active.amount_paid = Set(money::to_f64(remaining));
    active.payment_status = Set(status);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(proposal_id, guest_id, amount, "Refunded guest payment");
    Ok(updated)
}

/// Lists a guest's payments and refunds, oldest first.
pub async fn payment_history(
    db: &DatabaseConnection,
    proposal_id: i64,
    guest_id: i64,
) -> Result<Vec<guest_payment::Model>> {
    guest::find_guest(db, proposal_id, guest_id).await?;
    GuestPayment::find()
        .filter(guest_payment::Column::GuestId.eq(guest_id))
        .order_by_asc(guest_payment::Column::RecordedAt)
        .order_by_asc(guest_payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::guest::{GuestPatch, NewGuest};
    use crate::test_utils::*;

    const TOLERANCE: f64 = 0.01;

    /// Proposal priced at $990 with individual billing on.
    async fn billed_proposal(db: &DatabaseConnection) -> Result<i64> {
        let created = create_test_proposal(db, "Billing").await?;
        proposal::update_proposal(
            db,
            created.id,
            proposal::ProposalPatch {
                discount_amount: Some(100.0),
                tax_rate: Some(10.0),
                individual_billing_enabled: Some(true),
                ..Default::default()
            },
        )
        .await?;
        create_test_inclusion(db, created.id, 1000.0, true).await?;
        assert_eq!(proposal::get_proposal(db, created.id).await?.total, 990.0);
        Ok(created.id)
    }

    #[tokio::test]
    async fn test_sponsored_guest_split() -> Result<()> {
        let db = setup_test_db().await?;
        let proposal_id = billed_proposal(&db).await?;

        for name in ["Ana", "Ben", "Cal"] {
            create_test_guest(&db, proposal_id, name).await?;
        }
        guest::add_guest(
            &db,
            proposal_id,
            NewGuest {
                name: "Dee".to_string(),
                email: None,
                phone: None,
                is_primary: false,
                is_sponsored: true,
                amount_owed_override: None,
            },
        )
        .await?;

        let guests = calculate_allocations(&db, proposal_id).await?;
        let owed: Vec<f64> = guests.iter().map(|g| g.amount_owed).collect();
        assert_eq!(owed, vec![330.0, 330.0, 330.0, 0.0]);

        let verification = verify(&db, proposal_id, TOLERANCE).await?;
        assert!(verification.is_balanced);
        assert_eq!(verification.sponsored_count, 1);

        let paid = record_payment(&db, proposal_id, guests[0].id, 330.0, None, TOLERANCE).await?;
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let summary = summary(&db, proposal_id).await?;
        assert_eq!(summary.total_paid, 330.0);
        assert_eq!(summary.total_outstanding, 660.0);
        for balance in &summary.guests[1..] {
            assert_eq!(balance.payment_status, PaymentStatus::Unpaid);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_leftover_cents_go_to_primary() -> Result<()> {
        let db = setup_test_db().await?;
        let proposal_id = billed_proposal(&db).await?;
        proposal::update_proposal(
            &db,
            proposal_id,
            proposal::ProposalPatch {
                discount_amount: Some(0.0),
                tax_rate: Some(0.0),
                ..Default::default()
            },
        )
        .await?;
        for name in ["Ana", "Ben", "Cal"] {
            create_test_guest(&db, proposal_id, name).await?;
        }
        // 1000 / 3
        let guests = calculate_allocations(&db, proposal_id).await?;
        let owed: Vec<f64> = guests.iter().map(|g| g.amount_owed).collect();
        assert_eq!(owed, vec![333.34, 333.33, 333.33]);
        assert!(verify(&db, proposal_id, TOLERANCE).await?.is_balanced);
        Ok(())
    }

    #[tokio::test]
    async fn test_override_preserved_on_recalculation() -> Result<()> {
        let db = setup_test_db().await?;
        let proposal_id = billed_proposal(&db).await?;
        let ana = create_test_guest(&db, proposal_id, "Ana").await?;
        let ben = create_test_guest(&db, proposal_id, "Ben").await?;
        let cal = create_test_guest(&db, proposal_id, "Cal").await?;

        calculate_allocations(&db, proposal_id).await?;
        guest::update_guest(
            &db,
            proposal_id,
            ben.id,
            GuestPatch {
                amount_owed_override: Some(Some(500.0)),
                ..Default::default()
            },
        )
        .await?;
        calculate_allocations(&db, proposal_id).await?;
        calculate_allocations(&db, proposal_id).await?;

        let ana = guest::find_guest(&db, proposal_id, ana.id).await?;
        let ben = guest::find_guest(&db, proposal_id, ben.id).await?;
        let cal = guest::find_guest(&db, proposal_id, cal.id).await?;
        assert_eq!(ana.amount_owed, 330.0);
        assert_eq!(ben.amount_owed, 500.0);
        assert_eq!(ben.amount_owed_override, Some(500.0));
        assert_eq!(cal.amount_owed, 330.0);

        let verification = verify(&db, proposal_id, TOLERANCE).await?;
        assert!(!verification.is_balanced);
        assert_eq!(verification.difference, -170.0);
        assert_eq!(verification.override_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_recalculation_keeps_payments() -> Result<()> {
        let db = setup_test_db().await?;
        let proposal_id = billed_proposal(&db).await?;
        let ana = create_test_guest(&db, proposal_id, "Ana").await?;
        create_test_guest(&db, proposal_id, "Ben").await?;

        calculate_allocations(&db, proposal_id).await?;
        record_payment(&db, proposal_id, ana.id, 100.0, Some("deposit".into()), TOLERANCE).await?;
        let guests = calculate_allocations(&db, proposal_id).await?;

        assert_eq!(guests[0].amount_paid, 100.0);
        assert_eq!(guests[0].payment_status, PaymentStatus::Partial);
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let proposal_id = billed_proposal(&db).await?;
        let ana = create_test_guest(&db, proposal_id, "Ana").await?;
        calculate_allocations(&db, proposal_id).await?;

        for amount in [0.0, -5.0, f64::NAN] {
            let result = record_payment(&db, proposal_id, ana.id, amount, None, TOLERANCE).await;
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }

        // beyond the Decimal range, must not turn into a $0 ledger row
        let result = record_payment(&db, proposal_id, ana.id, 1e29, None, TOLERANCE).await;
        assert!(matches!(result, Err(Error::AmountTooLarge { .. })));
        assert!(payment_history(&db, proposal_id, ana.id).await?.is_empty());

        let result = record_payment(&db, proposal_id, ana.id, 990.02, None, TOLERANCE).await;
        assert!(matches!(result, Err(Error::Overpayment { .. })));

        let within = record_payment(&db, proposal_id, ana.id, 990.01, None, TOLERANCE).await?;
        assert_eq!(within.payment_status, PaymentStatus::Paid);
        assert_eq!(payment_history(&db, proposal_id, ana.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_billing_disabled() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Whole").await?;
        let ana = create_test_guest(&db, created.id, "Ana").await?;

        let result = calculate_allocations(&db, created.id).await;
        assert!(matches!(result, Err(Error::BillingDisabled { .. })));
        let result = record_payment(&db, created.id, ana.id, 10.0, None, TOLERANCE).await;
        assert!(matches!(result, Err(Error::BillingDisabled { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_flow() -> Result<()> {
        let db = setup_test_db().await?;
        let proposal_id = billed_proposal(&db).await?;
        let ana = create_test_guest(&db, proposal_id, "Ana").await?;
        calculate_allocations(&db, proposal_id).await?;
        record_payment(&db, proposal_id, ana.id, 200.0, None, TOLERANCE).await?;

        let result = refund_payment(&db, proposal_id, ana.id, 250.0, None).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let partial = refund_payment(&db, proposal_id, ana.id, 50.0, None).await?;
        assert_eq!(partial.amount_paid, 150.0);
        assert_eq!(partial.payment_status, PaymentStatus::Partial);

        let full = refund_payment(&db, proposal_id, ana.id, 150.0, Some("cancelled".into())).await?;
        assert_eq!(full.amount_paid, 0.0);
        assert_eq!(full.payment_status, PaymentStatus::Refunded);

        let history = payment_history(&db, proposal_id, ana.id).await?;
        let kinds: Vec<PaymentKind> = history.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![PaymentKind::Payment, PaymentKind::Refund, PaymentKind::Refund]
        );
        Ok(())
    }

    #[test]
    fn test_derive_status() {
        assert_eq!(derive_status(100.0, 0.0, TOLERANCE), PaymentStatus::Unpaid);
        assert_eq!(derive_status(100.0, 40.0, TOLERANCE), PaymentStatus::Partial);
        assert_eq!(derive_status(100.0, 99.99, TOLERANCE), PaymentStatus::Paid);
        assert_eq!(derive_status(100.0, 100.0, TOLERANCE), PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_everyone_sponsored_owes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let proposal_id = billed_proposal(&db).await?;
        let ana = create_test_guest(&db, proposal_id, "Ana").await?;
        guest::update_guest(
            &db,
            proposal_id,
            ana.id,
            GuestPatch {
                is_sponsored: Some(true),
                ..Default::default()
            },
        )
        .await?;

        let guests = calculate_allocations(&db, proposal_id).await?;
        assert_eq!(guests[0].amount_owed, 0.0);
        assert!(!verify(&db, proposal_id, TOLERANCE).await?.is_balanced);
        Ok(())
    }
}
