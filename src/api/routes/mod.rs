//! Route modules, one per resource family.

pub mod guests;
pub mod itinerary;
pub mod payment_groups;
pub mod proposals;
pub mod reminders;
