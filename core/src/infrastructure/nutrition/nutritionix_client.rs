use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{
    common::{
        NutritionConfig,
        call_policy::{CallPolicy, call_with_policy},
        entities::app_errors::CoreError,
    },
    food_scan::{
        entities::{NutritionRecord, NutritionSource, ServingInfo, nutrient_value},
        ports::NutritionDatabase,
    },
};
use crate::infrastructure::nutrition::cache::LookupCache;

const PROVIDER: &str = "Nutritionix";

/// Nutritionix natural-language nutrients client. Values are per serving.
#[derive(Debug, Clone)]
pub struct NutritionixClient {
    app_id: String,
    app_key: String,
    base_url: String,
    client: Client,
    policy: CallPolicy,
    cache: LookupCache,
}

#[derive(Debug, Serialize)]
struct NaturalQuery<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct NaturalResponse {
    #[serde(default)]
    foods: Vec<NaturalFood>,
}

#[derive(Debug, Deserialize)]
struct NaturalFood {
    food_name: String,
    brand_name: Option<String>,
    serving_qty: Option<f64>,
    serving_unit: Option<String>,
    serving_weight_grams: Option<f64>,
    nf_calories: Option<f64>,
    nf_total_fat: Option<f64>,
    nf_saturated_fat: Option<f64>,
    nf_cholesterol: Option<f64>,
    nf_sodium: Option<f64>,
    nf_total_carbohydrate: Option<f64>,
    nf_dietary_fiber: Option<f64>,
    nf_sugars: Option<f64>,
    nf_protein: Option<f64>,
    nf_potassium: Option<f64>,
    nf_p: Option<f64>,
}

impl From<NaturalFood> for NutritionRecord {
    fn from(food: NaturalFood) -> Self {
        let serving = ServingInfo {
            quantity: nutrient_value(food.serving_qty),
            unit: food
                .serving_unit
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| "serving".to_string()),
            weight_grams: nutrient_value(food.serving_weight_grams),
        };

        let mut record = NutritionRecord::empty(food.food_name, NutritionSource::Nutritionix, serving);
        record.brand = food.brand_name.filter(|b| !b.trim().is_empty());
        record.calories = nutrient_value(food.nf_calories);
        record.protein = nutrient_value(food.nf_protein);
        record.total_fat = nutrient_value(food.nf_total_fat);
        record.saturated_fat = nutrient_value(food.nf_saturated_fat);
        record.total_carbohydrate = nutrient_value(food.nf_total_carbohydrate);
        record.sugars = nutrient_value(food.nf_sugars);
        record.dietary_fiber = nutrient_value(food.nf_dietary_fiber);
        record.sodium = nutrient_value(food.nf_sodium);
        record.potassium = nutrient_value(food.nf_potassium);
        record.cholesterol = nutrient_value(food.nf_cholesterol);
        record.phosphorus = nutrient_value(food.nf_p);
        record
    }
}

impl NutritionixClient {
    pub fn new(config: &NutritionConfig) -> Result<Self, CoreError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            tracing::error!("Failed to build Nutritionix HTTP client: {}", e);
            CoreError::InternalServerError
        })?;

        Ok(Self {
            app_id: config.nutritionix_app_id.clone(),
            app_key: config.nutritionix_app_key.clone(),
            base_url: config.nutritionix_base_url.clone(),
            client,
            policy: CallPolicy::single_shot(PROVIDER, timeout),
            cache: LookupCache::new(Duration::from_secs(config.cache_ttl_secs)),
        })
    }

    async fn natural_nutrients(&self, food_name: &str) -> Result<Option<NutritionRecord>, CoreError> {
        let url = format!("{}/v2/natural/nutrients", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-app-id", &self.app_id)
            .header("x-app-key", &self.app_key)
            .json(&NaturalQuery { query: food_name })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Nutritionix request failed: {}", e);
                CoreError::ExternalServiceError(format!("Nutritionix API error: {}", e))
            })?;

        // an unmatched query comes back as 404
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Nutritionix API error: {} - {}", status, error_text);
            return Err(CoreError::from_provider_status(
                PROVIDER,
                status.as_u16(),
                &error_text,
            ));
        }

        let body: NaturalResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Nutritionix response: {}", e);
            CoreError::ExternalServiceError(format!("Failed to parse Nutritionix response: {}", e))
        })?;

        Ok(body.foods.into_iter().next().map(NutritionRecord::from))
    }
}

impl NutritionDatabase for NutritionixClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self))]
    async fn lookup(&self, food_name: String) -> Result<Option<NutritionRecord>, CoreError> {
        if let Some(cached) = self.cache.get(&food_name).await {
            tracing::debug!("Nutritionix cache hit");
            return Ok(cached);
        }

        let record = call_with_policy(&self.policy, || self.natural_nutrients(&food_name)).await?;
        self.cache.insert(&food_name, record.clone()).await;
        Ok(record)
    }
}
