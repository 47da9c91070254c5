//! Proposal business logic - Creating, reading and patching trip proposals.
//!
//! Derived money columns are never written here directly. Every patch is applied
//! and followed by a pricing recalculation inside the same transaction, so a
//! patch that would produce invalid totals (e.g. a discount above the subtotal)
//! is rejected as a whole.

use crate::{
    core::{money, pricing, reminder},
    entities::{
        ProposalDay, ProposalGuest, ProposalInclusion, ProposalStop, TripProposal,
        enums::{PlanningFeeMode, ProposalStatus},
        proposal_day, proposal_guest, proposal_inclusion, proposal_stop, trip_proposal,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

/// Fields accepted when creating a proposal.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProposal {
    /// Headline
    pub title: String,
    /// Customer full name
    pub customer_name: String,
    /// Customer email
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Customer phone
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Number of travellers
    pub party_size: i32,
    /// First day
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Tax percent
    #[serde(default)]
    pub tax_rate: Option<f64>,
    /// Gratuity percent
    #[serde(default)]
    pub gratuity_percentage: Option<f64>,
    /// Deposit percent
    #[serde(default)]
    pub deposit_percentage: Option<f64>,
    /// Planning fee mode, flat when absent
    #[serde(default)]
    pub planning_fee_mode: Option<PlanningFeeMode>,
    /// Planning fee amount for flat mode
    #[serde(default)]
    pub planning_fee_amount: Option<f64>,
    /// Planning fee percent for percentage mode
    #[serde(default)]
    pub planning_fee_percentage: Option<f64>,
    /// Split the bill per guest
    #[serde(default)]
    pub individual_billing_enabled: bool,
    /// Balance due date
    #[serde(default)]
    pub payment_deadline: Option<NaiveDate>,
}

/// Fields accepted by PATCH. Absent fields are left alone; for nullable
/// columns an explicit `null` clears the value. Derived totals and unknown
/// keys are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposalPatch {
    /// Headline
    pub title: Option<String>,
    /// Lifecycle label
    pub status: Option<ProposalStatus>,
    /// Customer full name
    pub customer_name: Option<String>,
    /// Customer email
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub customer_email: Option<Option<String>>,
    /// Customer phone
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub customer_phone: Option<Option<String>>,
    /// Number of travellers
    pub party_size: Option<i32>,
    /// First day
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub start_date: Option<Option<NaiveDate>>,
    /// Last day
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub end_date: Option<Option<NaiveDate>>,
    /// Dollar discount
    pub discount_amount: Option<f64>,
    /// Why the discount was given
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub discount_reason: Option<Option<String>>,
    /// Tax percent
    pub tax_rate: Option<f64>,
    /// Gratuity percent
    pub gratuity_percentage: Option<f64>,
    /// Planning fee mode
    pub planning_fee_mode: Option<PlanningFeeMode>,
    /// Planning fee amount (ignored in percentage mode)
    pub planning_fee_amount: Option<f64>,
    /// Planning fee percent
    pub planning_fee_percentage: Option<f64>,
    /// Deposit percent
    pub deposit_percentage: Option<f64>,
    /// Skip deposit on acceptance
    pub skip_deposit_on_accept: Option<bool>,
    /// Split the bill per guest
    pub individual_billing_enabled: Option<bool>,
    /// Balance due date
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub payment_deadline: Option<Option<NaiveDate>>,
}

/// A day with its stops in order.
#[derive(Debug, Clone, Serialize)]
pub struct DayWithStops {
    /// The day row
    #[serde(flatten)]
    pub day: proposal_day::Model,
    /// Stops ordered by `stop_order`
    pub stops: Vec<proposal_stop::Model>,
}

/// Everything the proposal detail page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalDetail {
    /// The proposal row
    #[serde(flatten)]
    pub proposal: trip_proposal::Model,
    /// Itinerary ordered by `day_number`
    pub days: Vec<DayWithStops>,
    /// Line items ordered by `sort_order`
    pub inclusions: Vec<proposal_inclusion::Model>,
    /// Guests, primary first
    pub guests: Vec<proposal_guest::Model>,
}

fn require_text(value: &str, field_name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field_name} cannot be empty")));
    }
    Ok(())
}

fn require_party_size(party_size: i32) -> Result<()> {
    if party_size < 1 {
        return Err(Error::validation(format!(
            "party_size must be at least 1, got {party_size}"
        )));
    }
    Ok(())
}

fn require_date_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(Error::validation(format!(
                "end_date {end} is before start_date {start}"
            )));
        }
    }
    Ok(())
}

/// Finds a proposal by id, failing with [`Error::ProposalNotFound`].
pub async fn get_proposal<C>(db: &C, proposal_id: i64) -> Result<trip_proposal::Model>
where
    C: ConnectionTrait,
{
    TripProposal::find_by_id(proposal_id)
        .one(db)
        .await?
        .ok_or(Error::ProposalNotFound { id: proposal_id })
}

/// Lists proposals, newest first, optionally narrowed to one status.
pub async fn list_proposals(
    db: &DatabaseConnection,
    status: Option<ProposalStatus>,
) -> Result<Vec<trip_proposal::Model>> {
    let mut query = TripProposal::find().order_by_desc(trip_proposal::Column::Id);
    if let Some(status) = status {
        query = query.filter(trip_proposal::Column::Status.eq(status));
    }
    query.all(db).await.map_err(Into::into)
}

/// Creates a draft proposal with zeroed totals.
pub async fn create_proposal(
    db: &DatabaseConnection,
    new: NewProposal,
) -> Result<trip_proposal::Model> {
    require_text(&new.title, "title")?;
    require_text(&new.customer_name, "customer_name")?;
    require_party_size(new.party_size)?;
    require_date_order(new.start_date, new.end_date)?;

    let tax_rate = new.tax_rate.unwrap_or_default();
    let gratuity_percentage = new.gratuity_percentage.unwrap_or_default();
    let deposit_percentage = new.deposit_percentage.unwrap_or_default();
    let planning_fee_amount = new.planning_fee_amount.unwrap_or_default();
    let planning_fee_percentage = new.planning_fee_percentage.unwrap_or_default();
    money::require_percentage(tax_rate, "tax_rate")?;
    money::require_percentage(gratuity_percentage, "gratuity_percentage")?;
    money::require_percentage(deposit_percentage, "deposit_percentage")?;
    money::require_percentage(planning_fee_percentage, "planning_fee_percentage")?;
    money::require_non_negative(planning_fee_amount, "planning_fee_amount")?;

    let now = Utc::now();
    let proposal = trip_proposal::ActiveModel {
        title: Set(new.title.trim().to_string()),
        status: Set(ProposalStatus::Draft),
        customer_name: Set(new.customer_name.trim().to_string()),
        customer_email: Set(new.customer_email),
        customer_phone: Set(new.customer_phone),
        party_size: Set(new.party_size),
        start_date: Set(new.start_date),
        end_date: Set(new.end_date),
        subtotal: Set(0.0),
        discount_amount: Set(0.0),
        discount_reason: Set(None),
        tax_rate: Set(tax_rate),
        taxes: Set(0.0),
        gratuity_percentage: Set(gratuity_percentage),
        gratuity_amount: Set(0.0),
        planning_fee_mode: Set(new.planning_fee_mode.unwrap_or(PlanningFeeMode::Flat)),
        planning_fee_amount: Set(planning_fee_amount),
        planning_fee_percentage: Set(planning_fee_percentage),
        total: Set(0.0),
        deposit_percentage: Set(deposit_percentage),
        deposit_amount: Set(0.0),
        skip_deposit_on_accept: Set(false),
        individual_billing_enabled: Set(new.individual_billing_enabled),
        payment_deadline: Set(new.payment_deadline),
        reminders_paused: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let txn = db.begin().await?;
    let created = proposal.insert(&txn).await?;
    // A flat planning fee is already a priced line
    let priced = pricing::recalculate_in(&txn, created.id).await?;
    txn.commit().await?;

    tracing::info!(proposal_id = priced.proposal.id, "Created trip proposal");
    Ok(priced.proposal)
}

/// Applies a patch and recalculates pricing, all or nothing.
pub async fn update_proposal(
    db: &DatabaseConnection,
    proposal_id: i64,
    patch: ProposalPatch,
) -> Result<trip_proposal::Model> {
    let clears_deadline = matches!(patch.payment_deadline, Some(None));
    let txn = db.begin().await?;
    let existing = get_proposal(&txn, proposal_id).await?;

    let start_date = patch.start_date.unwrap_or(existing.start_date);
    let end_date = patch.end_date.unwrap_or(existing.end_date);
    require_date_order(start_date, end_date)?;

    let mut active: trip_proposal::ActiveModel = existing.into();

    if let Some(title) = patch.title {
        require_text(&title, "title")?;
        active.title = Set(title.trim().to_string());
    }
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    if let Some(customer_name) = patch.customer_name {
        require_text(&customer_name, "customer_name")?;
        active.customer_name = Set(customer_name.trim().to_string());
    }
    if let Some(customer_email) = patch.customer_email {
        active.customer_email = Set(customer_email);
    }
    if let Some(customer_phone) = patch.customer_phone {
        active.customer_phone = Set(customer_phone);
    }
    if let Some(party_size) = patch.party_size {
        require_party_size(party_size)?;
        active.party_size = Set(party_size);
    }
    active.start_date = Set(start_date);
    active.end_date = Set(end_date);
    if let Some(discount_amount) = patch.discount_amount {
        money::require_non_negative(discount_amount, "discount_amount")?;
        active.discount_amount = Set(discount_amount);
    }
    if let Some(discount_reason) = patch.discount_reason {
        active.discount_reason = Set(discount_reason);
    }
    if let Some(tax_rate) = patch.tax_rate {
        money::require_percentage(tax_rate, "tax_rate")?;
        active.tax_rate = Set(tax_rate);
    }
    if let Some(gratuity_percentage) = patch.gratuity_percentage {
        money::require_percentage(gratuity_percentage, "gratuity_percentage")?;
        active.gratuity_percentage = Set(gratuity_percentage);
    }
    if let Some(planning_fee_mode) = patch.planning_fee_mode {
        active.planning_fee_mode = Set(planning_fee_mode);
    }
    if let Some(planning_fee_amount) = patch.planning_fee_amount {
        money::require_non_negative(planning_fee_amount, "planning_fee_amount")?;
        active.planning_fee_amount = Set(planning_fee_amount);
    }
    if let Some(planning_fee_percentage) = patch.planning_fee_percentage {
        money::require_percentage(planning_fee_percentage, "planning_fee_percentage")?;
        active.planning_fee_percentage = Set(planning_fee_percentage);
    }
    if let Some(deposit_percentage) = patch.deposit_percentage {
        money::require_percentage(deposit_percentage, "deposit_percentage")?;
        active.deposit_percentage = Set(deposit_percentage);
    }
    if let Some(skip) = patch.skip_deposit_on_accept {
        active.skip_deposit_on_accept = Set(skip);
    }
    if let Some(enabled) = patch.individual_billing_enabled {
        active.individual_billing_enabled = Set(enabled);
    }
    if let Some(payment_deadline) = patch.payment_deadline {
        active.payment_deadline = Set(payment_deadline);
    }
    active.updated_at = Set(Utc::now());

    active.update(&txn).await?;
    if clears_deadline {
        let cancelled = reminder::cancel_generated_in(&txn, proposal_id).await?;
        tracing::info!(proposal_id, cancelled, "Payment deadline cleared, cancelled tier reminders");
    }
    let priced = pricing::recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;

    tracing::info!(proposal_id, total = priced.proposal.total, "Updated trip proposal");
    Ok(priced.proposal)
}

/// Loads a proposal with its itinerary, inclusions and guests.
pub async fn get_proposal_detail(
    db: &DatabaseConnection,
    proposal_id: i64,
) -> Result<ProposalDetail> {
    let proposal = get_proposal(db, proposal_id).await?;

    let days = ProposalDay::find()
        .filter(proposal_day::Column::ProposalId.eq(proposal_id))
        .order_by_asc(proposal_day::Column::DayNumber)
        .all(db)
        .await?;
    let mut stops = ProposalStop::find()
        .filter(proposal_stop::Column::ProposalId.eq(proposal_id))
        .order_by_asc(proposal_stop::Column::StopOrder)
        .order_by_asc(proposal_stop::Column::Id)
        .all(db)
        .await?;
    let days = days
        .into_iter()
        .map(|day| {
            let (mine, rest): (Vec<_>, Vec<_>) = stops.drain(..).partition(|s| s.day_id == day.id);
            stops = rest;
            DayWithStops { day, stops: mine }
        })
        .collect();

    let inclusions = ProposalInclusion::find()
        .filter(proposal_inclusion::Column::ProposalId.eq(proposal_id))
        .order_by_asc(proposal_inclusion::Column::SortOrder)
        .order_by_asc(proposal_inclusion::Column::Id)
        .all(db)
        .await?;
    let guests = ProposalGuest::find()
        .filter(proposal_guest::Column::ProposalId.eq(proposal_id))
        .order_by_desc(proposal_guest::Column::IsPrimary)
        .order_by_asc(proposal_guest::Column::Id)
        .all(db)
        .await?;

    Ok(ProposalDetail {
        proposal,
        days,
        inclusions,
        guests,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_proposal_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut new = new_test_proposal("   ");
        let result = create_proposal(&db, new.clone()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        new.title = "Valid".to_string();
        new.party_size = 0;
        let result = create_proposal(&db, new.clone()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        new.party_size = 2;
        new.tax_rate = Some(140.0);
        let result = create_proposal(&db, new).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_get_proposal() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "  Harvest Tour ").await?;

        assert_eq!(created.title, "Harvest Tour");
        assert_eq!(created.status, ProposalStatus::Draft);
        assert_eq!(created.total, 0.0);
        assert!(!created.reminders_paused);

        let fetched = get_proposal(&db, created.id).await?;
        assert_eq!(fetched, created);

        let missing = get_proposal(&db, 999).await;
        assert!(matches!(missing, Err(Error::ProposalNotFound { id: 999 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_proposals_by_status() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_proposal(&db, "First").await?;
        let second = create_test_proposal(&db, "Second").await?;
        update_proposal(
            &db,
            second.id,
            ProposalPatch {
                status: Some(ProposalStatus::Sent),
                ..Default::default()
            },
        )
        .await?;

        let all = list_proposals(&db, None).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);

        let drafts = list_proposals(&db, Some(ProposalStatus::Draft)).await?;
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, first.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_clears_nullable_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Clearable").await?;

        let patch: ProposalPatch = serde_json::from_str(
            r#"{"customer_email": null, "payment_deadline": "2026-12-01", "party_size": 6}"#,
        )
        .unwrap();
        assert_eq!(patch.customer_email, Some(None));
        assert_eq!(patch.customer_phone, None);

        let updated = update_proposal(&db, created.id, patch).await?;
        assert_eq!(updated.customer_email, None);
        assert_eq!(updated.customer_phone, created.customer_phone);
        assert_eq!(updated.party_size, 6);
        assert_eq!(
            updated.payment_deadline,
            NaiveDate::from_ymd_opt(2026, 12, 1)
        );
        Ok(())
    }

    #[test]
    fn test_patch_rejects_derived_fields() {
        for body in [r#"{"total": 5}"#, r#"{"subtotal": 1, "title": "x"}"#, r#"{"deposit_amount": 0}"#] {
            assert!(serde_json::from_str::<ProposalPatch>(body).is_err(), "{body}");
        }
        assert!(serde_json::from_str::<ProposalPatch>(r#"{"discount_amount": 5}"#).is_ok());
    }

    #[tokio::test]
    async fn test_patch_party_size_reprices() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Per Person").await?;
        let day = crate::core::itinerary::add_day(
            &db,
            created.id,
            crate::core::itinerary::NewDay {
                day_number: 1,
                date: None,
                title: None,
            },
        )
        .await?;
        crate::core::itinerary::add_stop(&db, created.id, day.id, winery_stop(20.0, 0.0))
            .await?;
        assert_eq!(get_proposal(&db, created.id).await?.total, 80.0);

        let updated = update_proposal(
            &db,
            created.id,
            ProposalPatch {
                party_size: Some(10),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.subtotal, 200.0);
        assert_eq!(updated.total, 200.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_rejects_inverted_dates() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Dates").await?;
        let result = update_proposal(
            &db,
            created.id,
            ProposalPatch {
                start_date: Some(NaiveDate::from_ymd_opt(2026, 6, 10)),
                end_date: Some(NaiveDate::from_ymd_opt(2026, 6, 1)),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_detail_groups_stops_by_day() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Detail").await?;
        let day1 = crate::core::itinerary::add_day(
            &db,
            created.id,
            crate::core::itinerary::NewDay {
                day_number: 1,
                date: None,
                title: Some("Napa".to_string()),
            },
        )
        .await?;
        let day2 = crate::core::itinerary::add_day(
            &db,
            created.id,
            crate::core::itinerary::NewDay {
                day_number: 2,
                date: None,
                title: None,
            },
        )
        .await?;
        crate::core::itinerary::add_stop(&db, created.id, day2.id, winery_stop(0.0, 10.0)).await?;
        crate::core::itinerary::add_stop(&db, created.id, day1.id, winery_stop(0.0, 20.0)).await?;
        crate::core::itinerary::add_stop(&db, created.id, day1.id, winery_stop(0.0, 30.0)).await?;
        create_test_guest(&db, created.id, "Ana").await?;

        let detail = get_proposal_detail(&db, created.id).await?;
        assert_eq!(detail.days.len(), 2);
        assert_eq!(detail.days[0].day.id, day1.id);
        assert_eq!(detail.days[0].stops.len(), 2);
        assert_eq!(detail.days[1].stops.len(), 1);
        assert_eq!(detail.guests.len(), 1);
        assert!(detail.guests[0].is_primary);
        assert_eq!(detail.proposal.total, 60.0);
        Ok(())
    }
}
