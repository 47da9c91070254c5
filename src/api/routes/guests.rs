//! Guest, payment and billing routes.

use crate::{
    api::{ApiError, ApiJson, ApiPath, ApiResponse, ApiResult, AppState},
    core::{billing, guest},
    entities::{guest_payment, proposal_guest},
};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;

/// Body of the payment and refund endpoints.
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    /// Dollars, must be positive
    pub amount: f64,
    /// Free-text note
    #[serde(default)]
    pub note: Option<String>,
}

async fn list_guests(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
) -> ApiResult<Vec<proposal_guest::Model>> {
    crate::core::proposal::get_proposal(&state.db, proposal_id).await?;
    let guests = guest::list_guests(&state.db, proposal_id).await?;
    Ok(ApiResponse::ok(guests))
}

async fn add_guest(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
    ApiJson(new): ApiJson<guest::NewGuest>,
) -> Result<(StatusCode, ApiResponse<proposal_guest::Model>), ApiError> {
    let created = guest::add_guest(&state.db, proposal_id, new).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(created)))
}

async fn update_guest(
    State(state): State<AppState>,
    ApiPath((proposal_id, guest_id)): ApiPath<(i64, i64)>,
    ApiJson(patch): ApiJson<guest::GuestPatch>,
) -> ApiResult<proposal_guest::Model> {
    let updated = guest::update_guest(&state.db, proposal_id, guest_id, patch).await?;
    Ok(ApiResponse::ok(updated))
}

async fn remove_guest(
    State(state): State<AppState>,
    ApiPath((proposal_id, guest_id)): ApiPath<(i64, i64)>,
) -> ApiResult<()> {
    guest::remove_guest(&state.db, proposal_id, guest_id).await?;
    Ok(ApiResponse::ok(()))
}

async fn record_payment(
    State(state): State<AppState>,
    ApiPath((proposal_id, guest_id)): ApiPath<(i64, i64)>,
    ApiJson(body): ApiJson<PaymentRequest>,
) -> ApiResult<proposal_guest::Model> {
    let updated = billing::record_payment(
        &state.db,
        proposal_id,
        guest_id,
        body.amount,
        body.note,
        state.config.billing.tolerance,
    )
    .await?;
    Ok(ApiResponse::ok(updated))
}

async fn refund_payment(
    State(state): State<AppState>,
    ApiPath((proposal_id, guest_id)): ApiPath<(i64, i64)>,
    ApiJson(body): ApiJson<PaymentRequest>,
) -> ApiResult<proposal_guest::Model> {
    let updated =
        billing::refund_payment(&state.db, proposal_id, guest_id, body.amount, body.note).await?;
    Ok(ApiResponse::ok(updated))
}

async fn payment_history(
    State(state): State<AppState>,
    ApiPath((proposal_id, guest_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Vec<guest_payment::Model>> {
    let history = billing::payment_history(&state.db, proposal_id, guest_id).await?;
    Ok(ApiResponse::ok(history))
}

async fn billing_summary(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
) -> ApiResult<billing::BillingSummary> {
    let summary = billing::summary(&state.db, proposal_id).await?;
    Ok(ApiResponse::ok(summary))
}

async fn calculate_allocations(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
) -> ApiResult<Vec<proposal_guest::Model>> {
    let guests = billing::calculate_allocations(&state.db, proposal_id).await?;
    Ok(ApiResponse::ok(guests))
}

async fn verify_billing(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
) -> ApiResult<billing::BillingVerification> {
    let verification =
        billing::verify(&state.db, proposal_id, state.config.billing.tolerance).await?;
    Ok(ApiResponse::ok(verification))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/trip-proposals/{id}/guests",
            get(list_guests).post(add_guest),
        )
        .route(
            "/trip-proposals/{id}/guests/{guest_id}",
            patch(update_guest).delete(remove_guest),
        )
        .route(
            "/trip-proposals/{id}/guests/{guest_id}/record-payment",
            post(record_payment),
        )
        .route(
            "/trip-proposals/{id}/guests/{guest_id}/refund",
            post(refund_payment),
        )
        .route(
            "/trip-proposals/{id}/guests/{guest_id}/payments",
            get(payment_history),
        )
        .route("/trip-proposals/{id}/billing", get(billing_summary))
        .route(
            "/trip-proposals/{id}/billing/calculate",
            post(calculate_allocations),
        )
        .route("/trip-proposals/{id}/billing/verify", get(verify_billing))
}
