use axum::extract::State;
use platewise_core::domain::{food_scan::ports::FoodScanService, quota::entities::QuotaSnapshot};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::http::server::{
    api_entities::{api_error::ApiError, response::Response},
    app_state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct GetQuotaResponse {
    pub data: Vec<QuotaSnapshot>,
}

#[utoipa::path(
    get,
    path = "/quota",
    tag = "food-scan",
    summary = "Get provider quota usage",
    description = "Current usage, limit and reset time for the vision and LLM quota windows.",
    responses(
        (status = 200, body = GetQuotaResponse)
    ),
)]
pub async fn get_quota(
    State(state): State<AppState>,
) -> Result<Response<GetQuotaResponse>, ApiError> {
    Ok(Response::OK(GetQuotaResponse {
        data: state.service.quota_status(),
    }))
}
