//! Proposal and pricing routes.

use crate::{
    api::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AppState},
    core::{pricing, proposal},
    entities::{enums::ProposalStatus, trip_proposal},
};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<ProposalStatus>,
}

async fn list_proposals(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<trip_proposal::Model>> {
    let proposals = proposal::list_proposals(&state.db, query.status).await?;
    Ok(ApiResponse::ok(proposals))
}

async fn create_proposal(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<proposal::NewProposal>,
) -> Result<(StatusCode, ApiResponse<trip_proposal::Model>), ApiError> {
    let created = proposal::create_proposal(&state.db, new).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(created)))
}

async fn get_proposal(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
) -> ApiResult<proposal::ProposalDetail> {
    let detail = proposal::get_proposal_detail(&state.db, proposal_id).await?;
    Ok(ApiResponse::ok(detail))
}

async fn update_proposal(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
    ApiJson(patch): ApiJson<proposal::ProposalPatch>,
) -> ApiResult<trip_proposal::Model> {
    let updated = proposal::update_proposal(&state.db, proposal_id, patch).await?;
    Ok(ApiResponse::ok(updated))
}

async fn preview_pricing(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
) -> ApiResult<pricing::PricingBreakdown> {
    let breakdown = pricing::preview(&state.db, proposal_id).await?;
    Ok(ApiResponse::ok(breakdown))
}

async fn recalculate_pricing(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
) -> ApiResult<pricing::PricedProposal> {
    let priced = pricing::recalculate(&state.db, proposal_id).await?;
    Ok(ApiResponse::ok(priced))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trip-proposals", get(list_proposals).post(create_proposal))
        .route(
            "/trip-proposals/{id}",
            get(get_proposal).patch(update_proposal),
        )
        .route(
            "/trip-proposals/{id}/pricing",
            get(preview_pricing).post(recalculate_pricing),
        )
}
