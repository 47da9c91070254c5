//! Payment group routes, including the shared payment link lookup.

use super::guests::PaymentRequest;
use crate::{
    api::{ApiError, ApiJson, ApiPath, ApiResponse, ApiResult, AppState},
    core::payment_group::{self, NewPaymentGroup, PaymentGroupView},
};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};

async fn list_groups(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
) -> ApiResult<Vec<PaymentGroupView>> {
    let groups = payment_group::list_groups(&state.db, proposal_id).await?;
    Ok(ApiResponse::ok(groups))
}

async fn create_group(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
    ApiJson(new): ApiJson<NewPaymentGroup>,
) -> Result<(StatusCode, ApiResponse<PaymentGroupView>), ApiError> {
    let group = payment_group::create_group(&state.db, proposal_id, new).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(group)))
}

async fn delete_group(
    State(state): State<AppState>,
    ApiPath((proposal_id, group_id)): ApiPath<(i64, i64)>,
) -> ApiResult<()> {
    payment_group::delete_group(&state.db, proposal_id, group_id).await?;
    Ok(ApiResponse::ok(()))
}

async fn record_group_payment(
    State(state): State<AppState>,
    ApiPath((proposal_id, group_id)): ApiPath<(i64, i64)>,
    ApiJson(body): ApiJson<PaymentRequest>,
) -> ApiResult<PaymentGroupView> {
    let group = payment_group::record_group_payment(
        &state.db,
        proposal_id,
        group_id,
        body.amount,
        body.note,
        state.config.billing.tolerance,
    )
    .await?;
    Ok(ApiResponse::ok(group))
}

async fn payment_link(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> ApiResult<PaymentGroupView> {
    let group = payment_group::find_by_token(&state.db, &token).await?;
    Ok(ApiResponse::ok(group))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/trip-proposals/{id}/payment-groups",
            get(list_groups).post(create_group),
        )
        .route(
            "/trip-proposals/{id}/payment-groups/{group_id}",
            delete(delete_group),
        )
        .route(
            "/trip-proposals/{id}/payment-groups/{group_id}/record-payment",
            post(record_group_payment),
        )
        .route("/payment-links/{token}", get(payment_link))
}
