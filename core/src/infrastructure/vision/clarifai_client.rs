use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{
    common::{
        VisionConfig,
        call_policy::{CallPolicy, call_with_policy},
        entities::app_errors::CoreError,
    },
    food_scan::{entities::ConceptObservation, ports::VisionConceptClient},
};

const PROVIDER: &str = "Clarifai";
const STATUS_SUCCESS: u32 = 10000;

/// Client for the Clarifai food-item-recognition model.
#[derive(Debug, Clone)]
pub struct ClarifaiVisionClient {
    pat: String,
    model_url: String,
    client: Client,
    policy: CallPolicy,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    inputs: Vec<Input>,
}

#[derive(Debug, Serialize)]
struct Input {
    data: InputData,
}

#[derive(Debug, Serialize)]
struct InputData {
    image: ImagePayload,
}

#[derive(Debug, Serialize)]
struct ImagePayload {
    base64: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    status: Option<ApiStatus>,
    #[serde(default)]
    outputs: Vec<Output>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Output {
    data: Option<OutputData>,
}

#[derive(Debug, Deserialize)]
struct OutputData {
    #[serde(default)]
    concepts: Vec<Concept>,
}

#[derive(Debug, Deserialize)]
struct Concept {
    name: String,
    value: f64,
}

impl PredictResponse {
    fn into_concepts(self) -> Result<Vec<ConceptObservation>, CoreError> {
        if let Some(status) = &self.status
            && status.code != STATUS_SUCCESS
        {
            return Err(CoreError::ExternalServiceError(format!(
                "Clarifai status {}: {}",
                status.code, status.description
            )));
        }

        Ok(self
            .outputs
            .into_iter()
            .next()
            .and_then(|output| output.data)
            .map(|data| {
                data.concepts
                    .into_iter()
                    .map(|c| ConceptObservation::new(c.name, c.value))
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl ClarifaiVisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self, CoreError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            tracing::error!("Failed to build Clarifai HTTP client: {}", e);
            CoreError::InternalServerError
        })?;

        Ok(Self {
            pat: config.clarifai_pat.clone(),
            model_url: config.clarifai_model_url.clone(),
            client,
            policy: CallPolicy::single_shot(PROVIDER, timeout),
        })
    }

    async fn predict(&self, request: &PredictRequest) -> Result<Vec<ConceptObservation>, CoreError> {
        let response = self
            .client
            .post(&self.model_url)
            .header("Authorization", format!("Key {}", self.pat))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Clarifai request failed: {}", e);
                CoreError::ExternalServiceError(format!("Vision API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Clarifai API error: {} - {}", status, error_text);
            return Err(CoreError::from_provider_status(
                PROVIDER,
                status.as_u16(),
                &error_text,
            ));
        }

        let body: PredictResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Clarifai response: {}", e);
            CoreError::ExternalServiceError(format!("Failed to parse vision response: {}", e))
        })?;

        body.into_concepts()
    }
}

impl VisionConceptClient for ClarifaiVisionClient {
    #[instrument(skip_all, fields(image_bytes = image_data.len()))]
    async fn extract_concepts(
        &self,
        image_data: Vec<u8>,
    ) -> Result<Vec<ConceptObservation>, CoreError> {
        let request = PredictRequest {
            inputs: vec![Input {
                data: InputData {
                    image: ImagePayload {
                        base64: general_purpose::STANDARD.encode(&image_data),
                    },
                },
            }],
        };

        let concepts = call_with_policy(&self.policy, || self.predict(&request)).await?;
        tracing::debug!(count = concepts.len(), "Clarifai concepts received");
        Ok(concepts)
    }
}
