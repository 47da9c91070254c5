//! HTTP error mapping.
//!
//! Core errors turn into `{ "success": false, "error": ... }` bodies with a
//! status code picked per variant. Server-side failures are logged in full and
//! reported to the client with a generic message.

use super::response::ApiResponse;
use crate::errors::Error;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    /// A core operation failed
    Core(Error),
    /// The request could not be decoded
    BadRequest(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Core(err)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Core(Error::Database(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Core(err) => match err {
                Error::Validation { .. }
                | Error::InvalidAmount { .. }
                | Error::AmountTooLarge { .. }
                | Error::DiscountExceedsSubtotal { .. }
                | Error::Overpayment { .. }
                | Error::BillingDisabled { .. }
                | Error::MissingPaymentDeadline { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
                Error::ProposalNotFound { .. } | Error::NotFound { .. } | Error::UnknownPaymentLink => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                Error::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
                Error::Config { .. } | Error::Database(_) | Error::Io(_) => {
                    tracing::error!("Request failed: {err}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, ApiResponse::<()>::error(message)).into_response()
    }
}
