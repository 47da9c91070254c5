/// Database configuration and connection management
pub mod database;

/// Reminder tier table
pub mod reminders;

/// Application configuration loading from config.toml
pub mod settings;

pub use reminders::{ReminderPolicy, ReminderTier};
pub use settings::{AppConfig, BillingConfig, load_default_config};
