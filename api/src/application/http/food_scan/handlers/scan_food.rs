use axum::{
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use platewise_core::domain::food_scan::{
    entities::FoodScanResult,
    ports::FoodScanService,
    value_objects::{ImageFormat, ScanFoodInput},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::http::server::{
    api_entities::{
        api_error::{ApiError, ApiErrorResponse},
        response::Response,
    },
    app_state::AppState,
};

pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ScanFoodResponse {
    pub data: FoodScanResult,
}

/// Multipart form accepted by the scan endpoint.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ScanFoodForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

fn multipart_error(context: &str, e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge(format!(
            "Image too large. Max size is {} bytes",
            MAX_IMAGE_SIZE
        ));
    }
    ApiError::BadRequest(format!("{}: {}", context, e))
}

#[utoipa::path(
    post,
    path = "",
    tag = "food-scan",
    summary = "Scan a meal photo",
    description = "Identifies the dish in a photo, resolves its nutrition and returns an AI health analysis. Partial fallbacks are reported in `warnings`.",
    request_body(content = ScanFoodForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = ScanFoodResponse),
        (status = 400, body = ApiErrorResponse),
        (status = 413, body = ApiErrorResponse),
        (status = 415, body = ApiErrorResponse),
        (status = 429, body = ApiErrorResponse),
        (status = 502, body = ApiErrorResponse),
        (status = 503, body = ApiErrorResponse),
    ),
)]
pub async fn scan_food(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response<ScanFoodResponse>, ApiError> {
    let mut image_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart field", e))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read image", e))?;

        if data.len() > MAX_IMAGE_SIZE {
            return Err(ApiError::PayloadTooLarge(format!(
                "Image too large. Max size is {} bytes",
                MAX_IMAGE_SIZE
            )));
        }

        image_data = Some(data.to_vec());
    }

    let image_data =
        image_data.ok_or_else(|| ApiError::BadRequest("Missing image field".to_string()))?;

    if ImageFormat::sniff(&image_data).is_none() {
        return Err(ApiError::UnsupportedMediaType(
            "Image must be JPEG, PNG or WebP".to_string(),
        ));
    }

    let result = state
        .service
        .scan_food(ScanFoodInput { image_data })
        .await
        .map_err(ApiError::from)?;

    Ok(Response::OK(ScanFoodResponse { data: result }))
}
