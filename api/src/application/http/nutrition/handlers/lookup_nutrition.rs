use axum::extract::State;
use platewise_core::domain::food_scan::{
    entities::NutritionRecord, ports::FoodScanService, value_objects::LookupNutritionInput,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::http::{
    nutrition::validators::LookupNutritionValidator,
    server::{
        api_entities::{
            api_error::{ApiError, ApiErrorResponse, ValidateJson},
            response::Response,
        },
        app_state::AppState,
    },
};

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct LookupNutritionResponse {
    pub data: NutritionRecord,
}

#[utoipa::path(
    post,
    path = "/lookup",
    tag = "nutrition",
    summary = "Look up nutrition by food name",
    description = "Queries the primary nutrition database, then the fallback, for a single food name.",
    request_body = LookupNutritionValidator,
    responses(
        (status = 200, body = LookupNutritionResponse),
        (status = 400, body = ApiErrorResponse),
        (status = 502, body = ApiErrorResponse),
    ),
)]
pub async fn lookup_nutrition(
    State(state): State<AppState>,
    ValidateJson(payload): ValidateJson<LookupNutritionValidator>,
) -> Result<Response<LookupNutritionResponse>, ApiError> {
    let record = state
        .service
        .lookup_nutrition(LookupNutritionInput {
            food_name: payload.food_name,
        })
        .await
        .map_err(ApiError::from)?;

    Ok(Response::OK(LookupNutritionResponse { data: record }))
}
