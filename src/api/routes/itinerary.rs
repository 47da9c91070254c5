//! Day, stop and inclusion routes.

use crate::{
    api::{ApiError, ApiJson, ApiPath, ApiResponse, ApiResult, AppState},
    core::{inclusion, itinerary},
    entities::{proposal_day, proposal_inclusion, proposal_stop},
};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{patch, post},
};

async fn add_day(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
    ApiJson(new): ApiJson<itinerary::NewDay>,
) -> Result<(StatusCode, ApiResponse<proposal_day::Model>), ApiError> {
    let day = itinerary::add_day(&state.db, proposal_id, new).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(day)))
}

async fn delete_day(
    State(state): State<AppState>,
    ApiPath((proposal_id, day_id)): ApiPath<(i64, i64)>,
) -> ApiResult<()> {
    itinerary::delete_day(&state.db, proposal_id, day_id).await?;
    Ok(ApiResponse::ok(()))
}

async fn add_stop(
    State(state): State<AppState>,
    ApiPath((proposal_id, day_id)): ApiPath<(i64, i64)>,
    ApiJson(new): ApiJson<itinerary::NewStop>,
) -> Result<(StatusCode, ApiResponse<proposal_stop::Model>), ApiError> {
    let stop = itinerary::add_stop(&state.db, proposal_id, day_id, new).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(stop)))
}

async fn update_stop(
    State(state): State<AppState>,
    ApiPath((proposal_id, stop_id)): ApiPath<(i64, i64)>,
    ApiJson(patch): ApiJson<itinerary::StopPatch>,
) -> ApiResult<proposal_stop::Model> {
    let stop = itinerary::update_stop(&state.db, proposal_id, stop_id, patch).await?;
    Ok(ApiResponse::ok(stop))
}

async fn delete_stop(
    State(state): State<AppState>,
    ApiPath((proposal_id, stop_id)): ApiPath<(i64, i64)>,
) -> ApiResult<()> {
    itinerary::delete_stop(&state.db, proposal_id, stop_id).await?;
    Ok(ApiResponse::ok(()))
}

async fn add_inclusion(
    State(state): State<AppState>,
    ApiPath(proposal_id): ApiPath<i64>,
    ApiJson(new): ApiJson<inclusion::NewInclusion>,
) -> Result<(StatusCode, ApiResponse<proposal_inclusion::Model>), ApiError> {
    let line = inclusion::add_inclusion(&state.db, proposal_id, new).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(line)))
}

async fn update_inclusion(
    State(state): State<AppState>,
    ApiPath((proposal_id, inclusion_id)): ApiPath<(i64, i64)>,
    ApiJson(patch): ApiJson<inclusion::InclusionPatch>,
) -> ApiResult<proposal_inclusion::Model> {
    let line = inclusion::update_inclusion(&state.db, proposal_id, inclusion_id, patch).await?;
    Ok(ApiResponse::ok(line))
}

async fn delete_inclusion(
    State(state): State<AppState>,
    ApiPath((proposal_id, inclusion_id)): ApiPath<(i64, i64)>,
) -> ApiResult<()> {
    inclusion::delete_inclusion(&state.db, proposal_id, inclusion_id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trip-proposals/{id}/days", post(add_day))
        .route(
            "/trip-proposals/{id}/days/{day_id}",
            axum::routing::delete(delete_day),
        )
        .route("/trip-proposals/{id}/days/{day_id}/stops", post(add_stop))
        .route(
            "/trip-proposals/{id}/stops/{stop_id}",
            patch(update_stop).delete(delete_stop),
        )
        .route("/trip-proposals/{id}/inclusions", post(add_inclusion))
        .route(
            "/trip-proposals/{id}/inclusions/{inclusion_id}",
            patch(update_inclusion).delete(delete_inclusion),
        )
}
