//! Shared test utilities for the proposal ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test proposals, guests and line items with sensible defaults.

use crate::{
    core::{guest, inclusion, itinerary::NewStop, proposal},
    entities::{
        self,
        enums::{PricingType, StopType},
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Builds a proposal request with sensible defaults.
///
/// # Defaults
/// * `customer_name`: "Test Customer"
/// * `party_size`: 4
/// * every rate: 0, planning fee flat 0, individual billing off
pub fn new_test_proposal(title: &str) -> proposal::NewProposal {
    proposal::NewProposal {
        title: title.to_string(),
        customer_name: "Test Customer".to_string(),
        customer_email: Some("customer@example.com".to_string()),
        customer_phone: Some("555-0100".to_string()),
        party_size: 4,
        start_date: None,
        end_date: None,
        tax_rate: None,
        gratuity_percentage: None,
        deposit_percentage: None,
        planning_fee_mode: None,
        planning_fee_amount: None,
        planning_fee_percentage: None,
        individual_billing_enabled: false,
        payment_deadline: None,
    }
}

/// Creates a test proposal with the defaults of [`new_test_proposal`].
pub async fn create_test_proposal(
    db: &DatabaseConnection,
    title: &str,
) -> Result<entities::trip_proposal::Model> {
    proposal::create_proposal(db, new_test_proposal(title)).await
}

/// Adds a flat, single-quantity inclusion worth `amount`.
pub async fn create_test_inclusion(
    db: &DatabaseConnection,
    proposal_id: i64,
    amount: f64,
    is_taxable: bool,
) -> Result<entities::proposal_inclusion::Model> {
    inclusion::add_inclusion(
        db,
        proposal_id,
        inclusion::NewInclusion {
            description: "Test inclusion".to_string(),
            pricing_type: PricingType::Flat,
            quantity: 1.0,
            unit_price: amount,
            total_price: None,
            is_taxable,
            tax_included_in_price: false,
            sort_order: 0,
        },
    )
    .await
}

/// Adds a guest with no contact details or billing flags.
/// The first guest on a proposal becomes primary.
pub async fn create_test_guest(
    db: &DatabaseConnection,
    proposal_id: i64,
    name: &str,
) -> Result<entities::proposal_guest::Model> {
    guest::add_guest(
        db,
        proposal_id,
        guest::NewGuest {
            name: name.to_string(),
            email: None,
            phone: None,
            is_primary: false,
            is_sponsored: false,
            amount_owed_override: None,
        },
    )
    .await
}

/// A winery stop referencing winery 1 with the given costs.
pub fn winery_stop(per_person_cost: f64, flat_cost: f64) -> NewStop {
    NewStop {
        stop_type: StopType::Winery,
        stop_order: 0,
        winery_id: Some(1),
        restaurant_id: None,
        hotel_id: None,
        custom_name: None,
        per_person_cost,
        flat_cost,
        notes: None,
    }
}
