use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{
    common::{
        LLMConfig,
        call_policy::{CallPolicy, call_with_policy},
        entities::app_errors::CoreError,
    },
    food_scan::{
        ports::LLMClient,
        value_objects::{GenerationOptions, ImageFormat},
    },
};

const PROVIDER: &str = "Gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const RETRY_BACKOFF_STEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct GeminiLLMClient {
    api_key: String,
    model_name: String,
    base_url: String,
    client: Client,
    policy: CallPolicy,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

impl From<GenerationOptions> for GenerationConfig {
    fn from(options: GenerationOptions) -> Self {
        Self {
            max_output_tokens: options.max_output_tokens,
            temperature: options.temperature,
            response_mime_type: options
                .response_schema
                .as_ref()
                .map(|_| "application/json".to_string()),
            response_schema: options.response_schema,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    #[serde(default)]
    text: String,
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, CoreError> {
        let text = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CoreError::ExternalServiceError(
                "No response from LLM".to_string(),
            ));
        }
        Ok(text)
    }
}

impl GeminiLLMClient {
    pub fn new(config: &LLMConfig) -> Result<Self, CoreError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            tracing::error!("Failed to build Gemini HTTP client: {}", e);
            CoreError::InternalServerError
        })?;

        Ok(Self {
            api_key: config.gemini_api_key.clone(),
            model_name: config.gemini_model.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
            policy: CallPolicy::with_retries(
                PROVIDER,
                config.max_retries,
                RETRY_BACKOFF_STEP,
                timeout,
            ),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call_gemini_api(&self, request: &GeminiRequest) -> Result<String, CoreError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model_name
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini API request failed: {}", e);
                if e.is_timeout() {
                    CoreError::ProviderTimeout {
                        provider: PROVIDER.to_string(),
                        timeout_ms: self.policy.timeout.as_millis() as u64,
                    }
                } else {
                    CoreError::ExternalServiceError(format!("LLM API error: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini API error: {} - {}", status, error_text);
            return Err(CoreError::from_provider_status(
                PROVIDER,
                status.as_u16(),
                &error_text,
            ));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            CoreError::ExternalServiceError(format!("Failed to parse LLM response: {}", e))
        })?;

        gemini_response.into_text()
    }

    async fn generate(&self, request: GeminiRequest) -> Result<String, CoreError> {
        call_with_policy(&self.policy, || self.call_gemini_api(&request)).await
    }
}

fn image_request(prompt: String, image_data: &[u8], options: GenerationOptions) -> GeminiRequest {
    let mime_type = ImageFormat::sniff(image_data)
        .unwrap_or(ImageFormat::Jpeg)
        .mime_type();

    GeminiRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text { text: prompt },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.to_string(),
                        data: general_purpose::STANDARD.encode(image_data),
                    },
                },
            ],
        }],
        generation_config: Some(options.into()),
    }
}

fn text_request(prompt: String, options: GenerationOptions) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            parts: vec![Part::Text { text: prompt }],
        }],
        generation_config: Some(options.into()),
    }
}

impl LLMClient for GeminiLLMClient {
    #[instrument(skip_all, fields(model = %self.model_name, image_bytes = image_data.len()))]
    async fn generate_with_image(
        &self,
        prompt: String,
        image_data: Vec<u8>,
        options: GenerationOptions,
    ) -> Result<String, CoreError> {
        self.generate(image_request(prompt, &image_data, options)).await
    }

    #[instrument(skip_all, fields(model = %self.model_name))]
    async fn generate_with_text(
        &self,
        prompt: String,
        options: GenerationOptions,
    ) -> Result<String, CoreError> {
        self.generate(text_request(prompt, options)).await
    }
}
