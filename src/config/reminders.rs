//! Reminder tier table.
//!
//! Offsets are counted back from the payment deadline. The table lives in
//! config.toml under `[[reminders.tiers]]` so operators can tune it without a
//! rebuild.

use crate::entities::enums::ReminderUrgency;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;

/// One row of the reminder schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReminderTier {
    /// Escalation level of reminders generated for this row
    pub urgency: ReminderUrgency,
    /// Days before the payment deadline the reminder goes out
    pub days_before: i64,
}

/// Ordered tier table used by schedule generation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReminderPolicy {
    /// Tiers, earliest first
    pub tiers: Vec<ReminderTier>,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                ReminderTier {
                    urgency: ReminderUrgency::Friendly,
                    days_before: 14,
                },
                ReminderTier {
                    urgency: ReminderUrgency::Firm,
                    days_before: 7,
                },
                ReminderTier {
                    urgency: ReminderUrgency::Urgent,
                    days_before: 3,
                },
                ReminderTier {
                    urgency: ReminderUrgency::Final,
                    days_before: 0,
                },
            ],
        }
    }
}

impl ReminderPolicy {
    /// Rejects empty tables, duplicate urgencies and negative offsets.
    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() {
            return Err(Error::Config {
                message: "reminders.tiers must not be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for tier in &self.tiers {
            if tier.days_before < 0 {
                return Err(Error::Config {
                    message: format!(
                        "reminder tier {} has negative days_before {}",
                        tier.urgency, tier.days_before
                    ),
                });
            }
            if !seen.insert(tier.urgency) {
                return Err(Error::Config {
                    message: format!("reminder tier {} is listed twice", tier.urgency),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = ReminderPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.tiers[0].urgency, ReminderUrgency::Friendly);
        assert_eq!(policy.tiers[3].days_before, 0);
    }

    #[test]
    fn test_duplicate_tier_rejected() {
        let policy = ReminderPolicy {
            tiers: vec![
                ReminderTier {
                    urgency: ReminderUrgency::Firm,
                    days_before: 7,
                },
                ReminderTier {
                    urgency: ReminderUrgency::Firm,
                    days_before: 2,
                },
            ],
        };
        assert!(matches!(policy.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_negative_offset_rejected() {
        let policy = ReminderPolicy {
            tiers: vec![ReminderTier {
                urgency: ReminderUrgency::Final,
                days_before: -1,
            }],
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_empty_policy_rejected() {
        let policy = ReminderPolicy { tiers: Vec::new() };
        assert!(policy.validate().is_err());
    }
}
