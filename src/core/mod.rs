//! Core business logic - framework-agnostic pricing, billing and reminder
//! operations. The HTTP layer in [`crate::api`] only parses requests and calls
//! into these modules.

/// Per-guest allocation, payments and refunds
pub mod billing;
/// Guest management and the primary-guest rule
pub mod guest;
/// Priced line items
pub mod inclusion;
/// Days and stops
pub mod itinerary;
/// Decimal money helpers
pub mod money;
/// Shared payment links for several guests
pub mod payment_group;
/// Proposal totals and the recalculation pipeline
pub mod pricing;
/// Proposal CRUD
pub mod proposal;
/// Payment-deadline reminder schedule
pub mod reminder;

use serde::{Deserialize, Deserializer};

/// Lets PATCH bodies tell an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
pub(crate) fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
