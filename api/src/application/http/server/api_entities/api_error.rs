use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use platewise_core::domain::common::entities::app_errors::CoreError;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

/// Error body returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ApiErrorResponse {
    pub category: String,
    pub message: String,
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error(transparent)]
    Core(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        ApiError::Core(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Core(error) => match error {
                CoreError::Invalid(_) => StatusCode::BAD_REQUEST,
                CoreError::VisionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::VisionQuotaExhausted { .. }
                | CoreError::ProviderQuotaExhausted { .. }
                | CoreError::LlmRateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                CoreError::NoNutritionData => StatusCode::BAD_GATEWAY,
                CoreError::ProviderCreditsExhausted { .. } => StatusCode::PAYMENT_REQUIRED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_request",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::UnsupportedMediaType(_) => "unsupported_media_type",
            ApiError::Core(error) => match error {
                CoreError::Invalid(_) => "invalid_request",
                CoreError::VisionUnavailable(_) => "vision_unavailable",
                CoreError::VisionQuotaExhausted { .. } => "vision_quota_exhausted",
                CoreError::NoNutritionData => "no_nutrition_data",
                CoreError::ProviderAuth { .. } => "provider_auth",
                CoreError::ProviderCreditsExhausted { .. } => "provider_credits_exhausted",
                CoreError::ProviderQuotaExhausted { .. } => "provider_quota_exhausted",
                CoreError::LlmRateLimited { .. } => "llm_rate_limited",
                _ => "unknown",
            },
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Check the request body against the API documentation.",
            ApiError::PayloadTooLarge(_) => "Resize or compress the image below 10 MiB.",
            ApiError::UnsupportedMediaType(_) => "Upload a JPEG, PNG or WebP photo.",
            ApiError::Core(error) => match error {
                CoreError::Invalid(_) => "Check the request body against the API documentation.",
                CoreError::VisionUnavailable(_) => {
                    "The image recognition service is unreachable. Retry in a few minutes."
                }
                CoreError::VisionQuotaExhausted { .. } => {
                    "The monthly image recognition quota is used up. Scans resume at reset_at."
                }
                CoreError::NoNutritionData => {
                    "No nutrition database recognised this food. Try a clearer photo or look the food up by name."
                }
                CoreError::ProviderAuth { .. } => {
                    "A provider API key was rejected. Check the configured credentials."
                }
                CoreError::ProviderCreditsExhausted { .. } => {
                    "A provider account is out of credits. Top up billing for that provider."
                }
                CoreError::ProviderQuotaExhausted { .. } => {
                    "A provider rate limit was reached. Retry later."
                }
                CoreError::LlmRateLimited { .. } => {
                    "Too many scans this minute. Retry after reset_at."
                }
                _ => "Unexpected failure. Retry, and report it if it persists.",
            },
        }
    }

    fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ApiError::Core(CoreError::VisionQuotaExhausted { reset_at })
            | ApiError::Core(CoreError::LlmRateLimited { reset_at }) => Some(*reset_at),
            ApiError::Core(CoreError::ProviderQuotaExhausted { reset_at, .. }) => *reset_at,
            _ => None,
        }
    }

    pub fn body(&self) -> ApiErrorResponse {
        ApiErrorResponse {
            category: self.category().to_string(),
            message: self.to_string(),
            hint: self.hint().to_string(),
            reset_at: self.reset_at(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(category = self.category(), "Request failed: {}", self);
        } else {
            tracing::warn!(category = self.category(), "Request rejected: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}

/// JSON body extractor that runs `validator` rules before the handler.
pub struct ValidateJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidateJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value
            .validate()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(ValidateJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_categories_map_to_documented_statuses() {
        let cases = [
            (
                CoreError::VisionUnavailable("down".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
                "vision_unavailable",
            ),
            (CoreError::NoNutritionData, StatusCode::BAD_GATEWAY, "no_nutrition_data"),
            (
                CoreError::ProviderAuth {
                    provider: "Gemini".to_string(),
                    message: "bad key".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "provider_auth",
            ),
            (
                CoreError::ProviderCreditsExhausted {
                    provider: "Gemini".to_string(),
                    message: String::new(),
                },
                StatusCode::PAYMENT_REQUIRED,
                "provider_credits_exhausted",
            ),
            (
                CoreError::ProviderQuotaExhausted {
                    provider: "Gemini".to_string(),
                    reset_at: None,
                },
                StatusCode::TOO_MANY_REQUESTS,
                "provider_quota_exhausted",
            ),
            (
                CoreError::InternalServerError,
                StatusCode::INTERNAL_SERVER_ERROR,
                "unknown",
            ),
        ];

        for (error, status, category) in cases {
            let api_error = ApiError::from(error);
            assert_eq!(api_error.status(), status);
            assert_eq!(api_error.category(), category);
            assert!(!api_error.body().hint.is_empty());
        }
    }

    #[test]
    fn test_vision_quota_carries_reset_timestamp() {
        let reset_at = Utc::now();
        let body = ApiError::from(CoreError::VisionQuotaExhausted { reset_at }).body();

        assert_eq!(body.category, "vision_quota_exhausted");
        assert_eq!(body.reset_at, Some(reset_at));
    }

    #[test]
    fn test_reset_at_is_omitted_when_absent() {
        let body = ApiError::BadRequest("missing image".to_string()).body();
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["message"], "missing image");
        assert!(json.get("reset_at").is_none());
    }
}
