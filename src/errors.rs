//! Unified error types for the proposal ledger.
//!
//! Core operations return [`Result`], and the HTTP layer maps each variant onto a
//! status code in [`crate::api::error`].

use thiserror::Error;

/// Every failure a core operation can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Database driver or query failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (config file, listener socket)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A request field is missing or malformed
    #[error("Validation error: {message}")]
    Validation {
        /// Which rule was broken
        message: String,
    },

    /// Monetary amount is negative, zero where not allowed, or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending amount
        amount: f64,
    },

    /// Amount, or a total computed from it, is larger than the ledger accepts
    #[error("{field} exceeds the maximum of {limit:.2}")]
    AmountTooLarge {
        /// Field or line that overflowed
        field: String,
        /// Largest accepted value
        limit: f64,
    },

    /// Discount exceeds the subtotal it applies to
    #[error("Discount {discount:.2} exceeds subtotal {subtotal:.2}")]
    DiscountExceedsSubtotal {
        /// Requested discount
        discount: f64,
        /// Subtotal before discount
        subtotal: f64,
    },

    /// Payment would push a guest past what they owe
    #[error("Payment of {amount:.2} exceeds outstanding balance {outstanding:.2}")]
    Overpayment {
        /// Attempted payment
        amount: f64,
        /// Remaining balance
        outstanding: f64,
    },

    /// Individual billing operations on a proposal that bills as a whole
    #[error("Individual billing is not enabled for proposal {proposal_id}")]
    BillingDisabled {
        /// Proposal id
        proposal_id: i64,
    },

    /// Schedule generation without a deadline
    #[error("Proposal {proposal_id} has no payment deadline")]
    MissingPaymentDeadline {
        /// Proposal id
        proposal_id: i64,
    },

    /// Proposal does not exist
    #[error("Trip proposal not found: {id}")]
    ProposalNotFound {
        /// Proposal id
        id: i64,
    },

    /// Child record does not exist or belongs to another proposal
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (e.g. `"guest"`)
        entity: &'static str,
        /// Record id
        id: i64,
    },

    /// Shared payment link token matches no group
    #[error("Unknown payment link")]
    UnknownPaymentLink,

    /// Reminder state machine refused the change
    #[error("Cannot move reminder from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
