//! Itinerary business logic - Days and the stops within them.
//!
//! Stop costs feed the proposal subtotal, so every write here recalculates
//! pricing in the same transaction.

use crate::{
    core::{money, pricing, proposal},
    entities::{
        ProposalDay, ProposalStop,
        enums::{QuoteStatus, StopType},
        proposal_day, proposal_stop,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Deserialize;

/// Fields accepted when adding a day.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDay {
    /// 1-based position, unique per proposal
    pub day_number: i32,
    /// Calendar date
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Heading
    #[serde(default)]
    pub title: Option<String>,
}

/// Fields accepted when adding a stop.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStop {
    /// Kind of stop
    pub stop_type: StopType,
    /// Position within the day
    #[serde(default)]
    pub stop_order: i32,
    /// Referenced winery
    #[serde(default)]
    pub winery_id: Option<i64>,
    /// Referenced restaurant
    #[serde(default)]
    pub restaurant_id: Option<i64>,
    /// Referenced hotel
    #[serde(default)]
    pub hotel_id: Option<i64>,
    /// Free-text location
    #[serde(default)]
    pub custom_name: Option<String>,
    /// Cost per traveller
    #[serde(default)]
    pub per_person_cost: f64,
    /// Cost for the party
    #[serde(default)]
    pub flat_cost: f64,
    /// Operator notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Fields accepted when updating a stop. The location reference is fixed once
/// created; delete and re-add to move a stop elsewhere.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StopPatch {
    /// Position within the day
    pub stop_order: Option<i32>,
    /// Cost per traveller
    pub per_person_cost: Option<f64>,
    /// Cost for the party
    pub flat_cost: Option<f64>,
    /// Vendor quote progress
    pub quote_status: Option<QuoteStatus>,
    /// Vendor quoted amount, `null` clears it
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub quoted_amount: Option<Option<f64>>,
    /// Operator notes, `null` clears them
    #[serde(default, deserialize_with = "super::deserialize_some")]
    pub notes: Option<Option<String>>,
}

/// Checks that the stop references exactly one location and that it matches its type.
fn validate_reference(stop: &NewStop) -> Result<()> {
    let custom_name = stop
        .custom_name
        .as_deref()
        .filter(|name| !name.trim().is_empty());

    let set = [
        stop.winery_id.is_some(),
        stop.restaurant_id.is_some(),
        stop.hotel_id.is_some(),
        custom_name.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    if set != 1 {
        return Err(Error::validation(format!(
            "a stop must reference exactly one of winery_id, restaurant_id, hotel_id or custom_name, got {set}"
        )));
    }

    let matches_type = match stop.stop_type {
        StopType::Winery => stop.winery_id.is_some(),
        StopType::Restaurant => stop.restaurant_id.is_some(),
        StopType::Hotel => stop.hotel_id.is_some(),
        StopType::Pickup | StopType::Dropoff | StopType::Activity | StopType::Custom => {
            custom_name.is_some()
        }
    };
    if !matches_type {
        return Err(Error::validation(format!(
            "{:?} stop references the wrong kind of location",
            stop.stop_type
        )));
    }
    Ok(())
}

async fn find_day<C>(db: &C, proposal_id: i64, day_id: i64) -> Result<proposal_day::Model>
where
    C: ConnectionTrait,
{
    ProposalDay::find_by_id(day_id)
        .one(db)
        .await?
        .filter(|day| day.proposal_id == proposal_id)
        .ok_or(Error::NotFound {
            entity: "day",
            id: day_id,
        })
}

async fn find_stop<C>(db: &C, proposal_id: i64, stop_id: i64) -> Result<proposal_stop::Model>
where
    C: ConnectionTrait,
{
    ProposalStop::find_by_id(stop_id)
        .one(db)
        .await?
        .filter(|stop| stop.proposal_id == proposal_id)
        .ok_or(Error::NotFound {
            entity: "stop",
            id: stop_id,
        })
}

/// Adds a day to the itinerary. Day numbers are unique within a proposal.
pub async fn add_day(
    db: &DatabaseConnection,
    proposal_id: i64,
    new: NewDay,
) -> Result<proposal_day::Model> {
    if new.day_number < 1 {
        return Err(Error::validation(format!(
            "day_number must be at least 1, got {}",
            new.day_number
        )));
    }

    let txn = db.begin().await?;
    proposal::get_proposal(&txn, proposal_id).await?;

    let clash = ProposalDay::find()
        .filter(proposal_day::Column::ProposalId.eq(proposal_id))
        .filter(proposal_day::Column::DayNumber.eq(new.day_number))
        .one(&txn)
        .await?;
    if clash.is_some() {
        return Err(Error::validation(format!(
            "day {} already exists on this proposal",
            new.day_number
        )));
    }

    let day = proposal_day::ActiveModel {
        proposal_id: Set(proposal_id),
        day_number: Set(new.day_number),
        date: Set(new.date),
        title: Set(new.title),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    // Per-day inclusions depend on the day count
    pricing::recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;
    Ok(day)
}

/// Deletes a day and its stops.
pub async fn delete_day(db: &DatabaseConnection, proposal_id: i64, day_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let day = find_day(&txn, proposal_id, day_id).await?;

    ProposalStop::delete_many()
        .filter(proposal_stop::Column::DayId.eq(day.id))
        .exec(&txn)
        .await?;
    day.delete(&txn).await?;

    pricing::recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;
    Ok(())
}

/// Adds a stop to a day.
pub async fn add_stop(
    db: &DatabaseConnection,
    proposal_id: i64,
    day_id: i64,
    new: NewStop,
) -> Result<proposal_stop::Model> {
    validate_reference(&new)?;
    money::require_non_negative(new.per_person_cost, "per_person_cost")?;
    money::require_non_negative(new.flat_cost, "flat_cost")?;

    let txn = db.begin().await?;
    let day = find_day(&txn, proposal_id, day_id).await?;

    let stop = proposal_stop::ActiveModel {
        day_id: Set(day.id),
        proposal_id: Set(proposal_id),
        stop_order: Set(new.stop_order),
        stop_type: Set(new.stop_type),
        winery_id: Set(new.winery_id),
        restaurant_id: Set(new.restaurant_id),
        hotel_id: Set(new.hotel_id),
        custom_name: Set(new
            .custom_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())),
        per_person_cost: Set(new.per_person_cost),
        flat_cost: Set(new.flat_cost),
        quote_status: Set(QuoteStatus::NotRequested),
        quoted_amount: Set(None),
        notes: Set(new.notes),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    pricing::recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;
    Ok(stop)
}

/// Updates a stop's costs, order, quote tracking or notes.
pub async fn update_stop(
    db: &DatabaseConnection,
    proposal_id: i64,
    stop_id: i64,
    patch: StopPatch,
) -> Result<proposal_stop::Model> {
    let txn = db.begin().await?;
    let stop = find_stop(&txn, proposal_id, stop_id).await?;
    let mut active: proposal_stop::ActiveModel = stop.into();

    if let Some(stop_order) = patch.stop_order {
        active.stop_order = Set(stop_order);
    }
    if let Some(per_person_cost) = patch.per_person_cost {
        money::require_non_negative(per_person_cost, "per_person_cost")?;
        active.per_person_cost = Set(per_person_cost);
    }
    if let Some(flat_cost) = patch.flat_cost {
        money::require_non_negative(flat_cost, "flat_cost")?;
        active.flat_cost = Set(flat_cost);
    }
    if let Some(quote_status) = patch.quote_status {
        active.quote_status = Set(quote_status);
    }
    if let Some(quoted_amount) = patch.quoted_amount {
        if let Some(amount) = quoted_amount {
            money::require_non_negative(amount, "quoted_amount")?;
        }
        active.quoted_amount = Set(quoted_amount);
    }
    if let Some(notes) = patch.notes {
        active.notes = Set(notes);
    }

    let updated = active.update(&txn).await?;
    pricing::recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Removes a stop.
pub async fn delete_stop(db: &DatabaseConnection, proposal_id: i64, stop_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let stop = find_stop(&txn, proposal_id, stop_id).await?;
    stop.delete(&txn).await?;
    pricing::recalculate_in(&txn, proposal_id).await?;
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn day(day_number: i32) -> NewDay {
        NewDay {
            day_number,
            date: None,
            title: None,
        }
    }

    #[tokio::test]
    async fn test_stop_reference_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        // winery type without a winery
        let mut stop = winery_stop(10.0, 0.0);
        stop.winery_id = None;
        stop.custom_name = Some("Somewhere".to_string());
        let result = add_stop(&db, 1, 1, stop).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        // two references at once
        let mut stop = winery_stop(10.0, 0.0);
        stop.hotel_id = Some(3);
        assert!(add_stop(&db, 1, 1, stop).await.is_err());

        // blank custom name does not count
        let stop = NewStop {
            stop_type: StopType::Custom,
            custom_name: Some("  ".to_string()),
            ..winery_stop(0.0, 0.0)
        };
        let stop = NewStop {
            winery_id: None,
            ..stop
        };
        assert!(add_stop(&db, 1, 1, stop).await.is_err());

        // negative costs
        let stop = winery_stop(-1.0, 0.0);
        assert!(matches!(
            add_stop(&db, 1, 1, stop).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_day_number_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Days").await?;
        add_day(&db, created.id, day(1)).await?;
        let result = add_day(&db, created.id, day(1)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_on_foreign_day_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_proposal(&db, "First").await?;
        let second = create_test_proposal(&db, "Second").await?;
        let foreign = add_day(&db, second.id, day(1)).await?;

        let result = add_stop(&db, first.id, foreign.id, winery_stop(10.0, 0.0)).await;
        assert!(matches!(
            result,
            Err(Error::NotFound { entity: "day", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_stop_reprice() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Stops").await?;
        let d = add_day(&db, created.id, day(1)).await?;
        let stop = add_stop(&db, created.id, d.id, winery_stop(10.0, 5.0)).await?;
        assert_eq!(proposal::get_proposal(&db, created.id).await?.total, 45.0);

        let updated = update_stop(
            &db,
            created.id,
            stop.id,
            StopPatch {
                flat_cost: Some(25.0),
                quote_status: Some(QuoteStatus::Quoted),
                quoted_amount: Some(Some(999.0)),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.quote_status, QuoteStatus::Quoted);
        // quotes are informational only
        assert_eq!(proposal::get_proposal(&db, created.id).await?.total, 65.0);

        delete_stop(&db, created.id, stop.id).await?;
        assert_eq!(proposal::get_proposal(&db, created.id).await?.total, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_patch_clears_quote_and_notes() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Quotes").await?;
        let d = add_day(&db, created.id, day(1)).await?;
        let stop = add_stop(&db, created.id, d.id, winery_stop(10.0, 0.0)).await?;

        let patch: StopPatch =
            serde_json::from_str(r#"{"quoted_amount": 120.0, "notes": "Ask for the cellar tour"}"#)
                .unwrap();
        let quoted = update_stop(&db, created.id, stop.id, patch).await?;
        assert_eq!(quoted.quoted_amount, Some(120.0));
        assert_eq!(quoted.notes.as_deref(), Some("Ask for the cellar tour"));

        let patch: StopPatch = serde_json::from_str(r#"{"stop_order": 2}"#).unwrap();
        let reordered = update_stop(&db, created.id, stop.id, patch).await?;
        assert_eq!(reordered.quoted_amount, Some(120.0));

        let patch: StopPatch =
            serde_json::from_str(r#"{"quoted_amount": null, "notes": null}"#).unwrap();
        let cleared = update_stop(&db, created.id, stop.id, patch).await?;
        assert_eq!(cleared.quoted_amount, None);
        assert_eq!(cleared.notes, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_custom_name_stored_as_none() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Blank Name").await?;
        let d = add_day(&db, created.id, day(1)).await?;

        let stop = NewStop {
            custom_name: Some("   ".to_string()),
            ..winery_stop(10.0, 0.0)
        };
        let stored = add_stop(&db, created.id, d.id, stop).await?;
        assert_eq!(stored.winery_id, Some(1));
        assert_eq!(stored.custom_name, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_day_removes_stops() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_proposal(&db, "Cascade").await?;
        let d = add_day(&db, created.id, day(1)).await?;
        add_stop(&db, created.id, d.id, winery_stop(0.0, 40.0)).await?;

        delete_day(&db, created.id, d.id).await?;
        let remaining = ProposalStop::find()
            .filter(proposal_stop::Column::ProposalId.eq(created.id))
            .count(&db)
            .await?;
        assert_eq!(remaining, 0);
        assert_eq!(proposal::get_proposal(&db, created.id).await?.subtotal, 0.0);
        Ok(())
    }
}
