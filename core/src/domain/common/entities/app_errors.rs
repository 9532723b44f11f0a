use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    #[error("Vision provider unavailable: {0}")]
    VisionUnavailable(String),

    #[error("Vision provider quota exhausted until {reset_at}")]
    VisionQuotaExhausted { reset_at: DateTime<Utc> },

    #[error("No nutrition data could be resolved for this image")]
    NoNutritionData,

    #[error("{provider} rejected the configured credentials: {message}")]
    ProviderAuth { provider: String, message: String },

    #[error("{provider} account has no remaining credits: {message}")]
    ProviderCreditsExhausted { provider: String, message: String },

    #[error("{provider} quota exhausted")]
    ProviderQuotaExhausted {
        provider: String,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("LLM call skipped: per-minute quota reached until {reset_at}")]
    LlmRateLimited { reset_at: DateTime<Utc> },

    #[error("{provider} timed out after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    #[error("{provider} returned server error {status}: {message}")]
    ProviderServerError {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Model output did not match the expected shape: {0}")]
    InvalidModelOutput(String),

    #[error("Not found")]
    NotFound,

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl CoreError {
    /// Transient failures that a retry policy may attempt again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::ProviderTimeout { .. }
                | CoreError::ProviderServerError { .. }
                | CoreError::ExternalServiceError(_)
        )
    }

    /// Categories that must surface to the caller even from a fallback stage.
    pub fn is_fatal_provider_error(&self) -> bool {
        matches!(
            self,
            CoreError::ProviderAuth { .. }
                | CoreError::ProviderCreditsExhausted { .. }
                | CoreError::ProviderQuotaExhausted { .. }
        )
    }

    /// Maps a non-success HTTP status from a provider into the error taxonomy.
    pub fn from_provider_status(provider: &str, status: u16, body: &str) -> Self {
        let lowered = body.to_lowercase();
        match status {
            401 | 403 => CoreError::ProviderAuth {
                provider: provider.to_string(),
                message: truncate_body(body),
            },
            402 => CoreError::ProviderCreditsExhausted {
                provider: provider.to_string(),
                message: truncate_body(body),
            },
            429 => CoreError::ProviderQuotaExhausted {
                provider: provider.to_string(),
                reset_at: None,
            },
            400 if lowered.contains("api_key_invalid") || lowered.contains("api key not valid") => {
                CoreError::ProviderAuth {
                    provider: provider.to_string(),
                    message: truncate_body(body),
                }
            }
            _ if lowered.contains("billing") || lowered.contains("insufficient credits") => {
                CoreError::ProviderCreditsExhausted {
                    provider: provider.to_string(),
                    message: truncate_body(body),
                }
            }
            500..=599 => CoreError::ProviderServerError {
                provider: provider.to_string(),
                status,
                message: truncate_body(body),
            },
            _ => CoreError::ExternalServiceError(format!(
                "{} returned {}: {}",
                provider,
                status,
                truncate_body(body)
            )),
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX_BODY_CHARS: usize = 300;
    body.chars().take(MAX_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            CoreError::from_provider_status("Gemini", 401, "unauthorized"),
            CoreError::ProviderAuth { .. }
        ));
        assert!(matches!(
            CoreError::from_provider_status("Gemini", 402, ""),
            CoreError::ProviderCreditsExhausted { .. }
        ));
        assert!(matches!(
            CoreError::from_provider_status("Gemini", 429, ""),
            CoreError::ProviderQuotaExhausted { .. }
        ));
        assert!(matches!(
            CoreError::from_provider_status("Gemini", 400, "API_KEY_INVALID"),
            CoreError::ProviderAuth { .. }
        ));
        assert!(matches!(
            CoreError::from_provider_status("Gemini", 503, "overloaded"),
            CoreError::ProviderServerError { status: 503, .. }
        ));
    }

    #[test]
    fn test_fatal_errors_are_not_retryable() {
        let fatal = CoreError::ProviderAuth {
            provider: "Gemini".to_string(),
            message: String::new(),
        };
        assert!(fatal.is_fatal_provider_error());
        assert!(!fatal.is_retryable());

        let transient = CoreError::ProviderTimeout {
            provider: "Gemini".to_string(),
            timeout_ms: 15_000,
        };
        assert!(transient.is_retryable());
        assert!(!transient.is_fatal_provider_error());
    }
}
