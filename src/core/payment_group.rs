//! Payment group business logic - Several guests settling through one link.
//!
//! A guest belongs to at most one group, and only guests of the group's own
//! proposal can join it. Group payments are spread over members in guest-id
//! order, filling each outstanding balance before moving to the next.

use crate::{
    core::{billing, money, proposal},
    entities::{
        PaymentGroup, PaymentGroupMember, ProposalGuest, payment_group, payment_group_member,
        proposal_guest,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Fields accepted when creating a group.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaymentGroup {
    /// Display name
    pub name: String,
    /// Guests paying together
    pub guest_ids: Vec<i64>,
}

/// A group with its members and combined balances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentGroupView {
    /// Stored group
    #[serde(flatten)]
    pub group: payment_group::Model,
    /// Member guest ids, ascending
    pub guest_ids: Vec<i64>,
    /// Combined amount owed
    pub amount_owed: f64,
    /// Combined amount paid
    pub amount_paid: f64,
    /// Combined outstanding balance
    pub outstanding: f64,
}

async fn members_of<C>(db: &C, group_id: i64) -> Result<Vec<proposal_guest::Model>>
where
    C: ConnectionTrait,
{
    let guest_ids: Vec<i64> = PaymentGroupMember::find()
        .filter(payment_group_member::Column::GroupId.eq(group_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.guest_id)
        .collect();

    ProposalGuest::find()
        .filter(proposal_guest::Column::Id.is_in(guest_ids))
        .order_by_asc(proposal_guest::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn build_view<C>(db: &C, group: payment_group::Model) -> Result<PaymentGroupView>
where
    C: ConnectionTrait,
{
    let members = members_of(db, group.id).await?;
    let owed: Decimal = members.iter().map(|g| money::to_decimal(g.amount_owed)).sum();
    let paid: Decimal = members.iter().map(|g| money::to_decimal(g.amount_paid)).sum();
    let outstanding: Decimal = members.iter().map(billing::outstanding_of).sum();

    Ok(PaymentGroupView {
        group,
        guest_ids: members.iter().map(|g| g.id).collect(),
        amount_owed: money::to_f64(owed),
        amount_paid: money::to_f64(paid),
        outstanding: money::to_f64(outstanding),
    })
}

async fn find_group<C>(db: &C, proposal_id: i64, group_id: i64) -> Result<payment_group::Model>
where
    C: ConnectionTrait,
{
    PaymentGroup::find_by_id(group_id)
        .one(db)
        .await?
        .filter(|group| group.proposal_id == proposal_id)
        .ok_or(Error::NotFound {
            entity: "payment group",
            id: group_id,
        })
}

/// Creates a group and its shared-link token.
pub async fn create_group(
    db: &DatabaseConnection,
    proposal_id: i64,
    new: NewPaymentGroup,
) -> Result<PaymentGroupView> {
    if new.name.trim().is_empty() {
        return Err(Error::validation("group name cannot be empty"));
    }
    if new.guest_ids.is_empty() {
        return Err(Error::validation("a payment group needs at least one guest"));
    }
    let unique: HashSet<i64> = new.guest_ids.iter().copied().collect();
    if unique.len() != new.guest_ids.len() {
        return Err(Error::validation("guest ids must not repeat"));
    }

    let txn = db.begin().await?;
    proposal::get_proposal(&txn, proposal_id).await?;

    let owned = ProposalGuest::find()
        .filter(proposal_guest::Column::Id.is_in(new.guest_ids.clone()))
        .filter(proposal_guest::Column::ProposalId.eq(proposal_id))
        .count(&txn)
        .await?;
    if owned != new.guest_ids.len() as u64 {
        return Err(Error::validation(format!(
            "every guest must belong to proposal {proposal_id}"
        )));
    }

    let grouped = PaymentGroupMember::find()
        .filter(payment_group_member::Column::GuestId.is_in(new.guest_ids.clone()))
        .one(&txn)
        .await?;
    if let Some(member) = grouped {
        return Err(Error::validation(format!(
            "guest {} is already in a payment group",
            member.guest_id
        )));
    }

    let group = payment_group::ActiveModel {
        proposal_id: Set(proposal_id),
        name: Set(new.name.trim().to_string()),
        access_token: Set(Uuid::new_v4().simple().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for guest_id in &new.guest_ids {
        payment_group_member::ActiveModel {
            group_id: Set(group.id),
            guest_id: Set(*guest_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let view = build_view(&txn, group).await?;
    txn.commit().await?;
    tracing::info!(
        proposal_id,
        group_id = view.group.id,
        members = view.guest_ids.len(),
        "Created payment group"
    );
    Ok(view)
}

/// Lists a proposal's groups with combined balances.
pub async fn list_groups(db: &DatabaseConnection, proposal_id: i64) -> Result<Vec<PaymentGroupView>> {
    proposal::get_proposal(db, proposal_id).await?;
    let groups = PaymentGroup::find()
        .filter(payment_group::Column::ProposalId.eq(proposal_id))
        .order_by_asc(payment_group::Column::Id)
        .all(db)
        .await?;

    let mut views = Vec::with_capacity(groups.len());
    for group in groups {
        views.push(build_view(db, group).await?);
    }
    Ok(views)
}

/// Looks a group up by its shared-link token.
pub async fn find_by_token(db: &DatabaseConnection, token: &str) -> Result<PaymentGroupView> {
    let group = PaymentGroup::find()
        .filter(payment_group::Column::AccessToken.eq(token))
        .one(db)
        .await?
        .ok_or(Error::UnknownPaymentLink)?;
    build_view(db, group).await
}

/// Deletes a group. Members keep their balances and payment history.
pub async fn delete_group(db: &DatabaseConnection, proposal_id: i64, group_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let group = find_group(&txn, proposal_id, group_id).await?;
    PaymentGroupMember::delete_many()
        .filter(payment_group_member::Column::GroupId.eq(group.id))
        .exec(&txn)
        .await?;
    group.delete(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Records one payment on behalf of the whole group.
pub async fn record_group_payment(
    db: &DatabaseConnection,
    proposal_id: i64,
    group_id: i64,
    amount: f64,
    note: Option<String>,
    tolerance: f64,
) -> Result<PaymentGroupView> {
    money::require_payment_amount(amount)?;

    let txn = db.begin().await?;
    let proposal = proposal::get_proposal(&txn, proposal_id).await?;
    billing::require_individual_billing(&proposal)?;
    let group = find_group(&txn, proposal_id, group_id).await?;
    let members = members_of(&txn, group.id).await?;

    let payment = money::to_decimal(amount);
    let outstanding: Decimal = members.iter().map(billing::outstanding_of).sum();
    if payment > outstanding + money::to_decimal(tolerance) {
        return Err(Error::Overpayment {
            amount,
            outstanding: money::to_f64(outstanding),
        });
    }

    let mut remaining = payment;
    let last = members.len().saturating_sub(1);
    for (index, guest) in members.into_iter().enumerate() {
        // The last member absorbs whatever the tolerance let through.
        let portion = if index == last {
            remaining
        } else {
            remaining.min(billing::outstanding_of(&guest))
        };
        if portion <= Decimal::ZERO {
            continue;
        }
        billing::apply_payment_in(&txn, guest, portion, note.clone(), Some(group.id), tolerance)
            .await?;
        remaining -= portion;
    }

    let view = build_view(&txn, group).await?;
    txn.commit().await?;
    tracing::info!(proposal_id, group_id, amount, "Recorded group payment");
    Ok(view)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::billing::calculate_allocations;
    use crate::entities::enums::PaymentStatus;
    use crate::test_utils::*;

    const TOLERANCE: f64 = 0.01;

    /// $900 proposal split across three guests.
    async fn three_guests(db: &DatabaseConnection) -> Result<(i64, Vec<i64>)> {
        let created = create_test_proposal(db, "Groups").await?;
        proposal::update_proposal(
            db,
            created.id,
            proposal::ProposalPatch {
                individual_billing_enabled: Some(true),
                ..Default::default()
            },
        )
        .await?;
        create_test_inclusion(db, created.id, 900.0, false).await?;

        let mut ids = Vec::new();
        for name in ["Ana", "Ben", "Cal"] {
            ids.push(create_test_guest(db, created.id, name).await?.id);
        }
        calculate_allocations(db, created.id).await?;
        Ok((created.id, ids))
    }

    fn group(name: &str, guest_ids: Vec<i64>) -> NewPaymentGroup {
        NewPaymentGroup {
            name: name.to_string(),
            guest_ids,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_group() -> Result<()> {
        let db = setup_test_db().await?;
        let (proposal_id, ids) = three_guests(&db).await?;

        let view = create_group(&db, proposal_id, group("The Smiths", ids[..2].to_vec())).await?;
        assert_eq!(view.guest_ids, ids[..2].to_vec());
        assert_eq!(view.amount_owed, 600.0);
        assert_eq!(view.outstanding, 600.0);
        assert_eq!(view.group.access_token.len(), 32);

        let listed = list_groups(&db, proposal_id).await?;
        assert_eq!(listed, vec![view.clone()]);
        let by_token = find_by_token(&db, &view.group.access_token).await?;
        assert_eq!(by_token.group.id, view.group.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_membership_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let (proposal_id, ids) = three_guests(&db).await?;
        let other = create_test_proposal(&db, "Other").await?;
        let stranger = create_test_guest(&db, other.id, "Zed").await?;

        let foreign = create_group(&db, proposal_id, group("Mixed", vec![ids[0], stranger.id])).await;
        assert!(matches!(foreign, Err(Error::Validation { .. })));

        let repeated = create_group(&db, proposal_id, group("Twice", vec![ids[0], ids[0]])).await;
        assert!(matches!(repeated, Err(Error::Validation { .. })));

        let empty = create_group(&db, proposal_id, group("Nobody", vec![])).await;
        assert!(matches!(empty, Err(Error::Validation { .. })));

        create_group(&db, proposal_id, group("First", vec![ids[0]])).await?;
        let regrouped = create_group(&db, proposal_id, group("Second", vec![ids[0], ids[1]])).await;
        assert!(matches!(regrouped, Err(Error::Validation { .. })));
        assert_eq!(list_groups(&db, proposal_id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_group_payment_fills_in_order() -> Result<()> {
        let db = setup_test_db().await?;
        let (proposal_id, ids) = three_guests(&db).await?;
        let view = create_group(&db, proposal_id, group("All", ids.clone())).await?;

        let after = record_group_payment(&db, proposal_id, view.group.id, 450.0, None, TOLERANCE)
            .await?;
        assert_eq!(after.amount_paid, 450.0);
        assert_eq!(after.outstanding, 450.0);

        let guests = crate::core::guest::list_guests(&db, proposal_id).await?;
        assert_eq!(guests[0].amount_paid, 300.0);
        assert_eq!(guests[0].payment_status, PaymentStatus::Paid);
        assert_eq!(guests[1].amount_paid, 150.0);
        assert_eq!(guests[1].payment_status, PaymentStatus::Partial);
        assert_eq!(guests[2].payment_status, PaymentStatus::Unpaid);

        let history = billing::payment_history(&db, proposal_id, ids[1]).await?;
        assert_eq!(history[0].payment_group_id, Some(view.group.id));

        let over = record_group_payment(&db, proposal_id, view.group.id, 500.0, None, TOLERANCE)
            .await;
        assert!(matches!(over, Err(Error::Overpayment { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_group_frees_members() -> Result<()> {
        let db = setup_test_db().await?;
        let (proposal_id, ids) = three_guests(&db).await?;
        let view = create_group(&db, proposal_id, group("Pair", ids[..2].to_vec())).await?;

        delete_group(&db, proposal_id, view.group.id).await?;
        assert!(list_groups(&db, proposal_id).await?.is_empty());
        create_group(&db, proposal_id, group("Again", ids[..2].to_vec())).await?;

        let missing = delete_group(&db, proposal_id, view.group.id).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }
}
