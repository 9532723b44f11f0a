use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
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

const PROVIDER: &str = "USDA";
const PAGE_SIZE: &str = "5";

/// FoodData Central nutrient numbers. Search results report amounts per 100 g.
mod nutrient_id {
    pub const ENERGY_KCAL: u32 = 1008;
    pub const ENERGY_ATWATER_GENERAL: u32 = 2047;
    pub const ENERGY_ATWATER_SPECIFIC: u32 = 2048;
    pub const PROTEIN: u32 = 1003;
    pub const TOTAL_FAT: u32 = 1004;
    pub const SATURATED_FAT: u32 = 1258;
    pub const CARBOHYDRATE: u32 = 1005;
    pub const SUGARS: u32 = 2000;
    pub const FIBER: u32 = 1079;
    pub const SODIUM: u32 = 1093;
    pub const POTASSIUM: u32 = 1092;
    pub const CHOLESTEROL: u32 = 1253;
    pub const PHOSPHORUS: u32 = 1091;
}

/// USDA FoodData Central search client.
#[derive(Debug, Clone)]
pub struct UsdaNutritionClient {
    api_key: String,
    base_url: String,
    client: Client,
    policy: CallPolicy,
    cache: LookupCache,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    description: String,
    brand_owner: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<SearchNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNutrient {
    nutrient_id: Option<u32>,
    value: Option<f64>,
}

impl SearchFood {
    fn amount(&self, id: u32) -> Option<f64> {
        self.food_nutrients
            .iter()
            .find(|n| n.nutrient_id == Some(id))
            .and_then(|n| n.value)
    }

    fn energy(&self) -> Option<f64> {
        [
            nutrient_id::ENERGY_KCAL,
            nutrient_id::ENERGY_ATWATER_GENERAL,
            nutrient_id::ENERGY_ATWATER_SPECIFIC,
        ]
        .into_iter()
        .find_map(|id| self.amount(id).filter(|v| *v > 0.0))
    }

    fn into_record(self) -> NutritionRecord {
        let mut record =
            NutritionRecord::empty(&self.description, NutritionSource::Usda, ServingInfo::per_100g());
        record.brand = self.brand_owner.clone().filter(|b| !b.trim().is_empty());
        record.calories = nutrient_value(self.energy());
        record.protein = nutrient_value(self.amount(nutrient_id::PROTEIN));
        record.total_fat = nutrient_value(self.amount(nutrient_id::TOTAL_FAT));
        record.saturated_fat = nutrient_value(self.amount(nutrient_id::SATURATED_FAT));
        record.total_carbohydrate = nutrient_value(self.amount(nutrient_id::CARBOHYDRATE));
        record.sugars = nutrient_value(self.amount(nutrient_id::SUGARS));
        record.dietary_fiber = nutrient_value(self.amount(nutrient_id::FIBER));
        record.sodium = nutrient_value(self.amount(nutrient_id::SODIUM));
        record.potassium = nutrient_value(self.amount(nutrient_id::POTASSIUM));
        record.cholesterol = nutrient_value(self.amount(nutrient_id::CHOLESTEROL));
        record.phosphorus = nutrient_value(self.amount(nutrient_id::PHOSPHORUS));
        record
    }
}

impl SearchResponse {
    /// First hit that reports energy, else the first hit.
    fn best_record(self) -> Option<NutritionRecord> {
        let index = self
            .foods
            .iter()
            .position(|food| food.energy().is_some())
            .unwrap_or(0);
        self.foods.into_iter().nth(index).map(SearchFood::into_record)
    }
}

impl UsdaNutritionClient {
    pub fn new(config: &NutritionConfig) -> Result<Self, CoreError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            tracing::error!("Failed to build USDA HTTP client: {}", e);
            CoreError::InternalServerError
        })?;

        Ok(Self {
            api_key: config.usda_api_key.clone(),
            base_url: config.usda_base_url.clone(),
            client,
            policy: CallPolicy::single_shot(PROVIDER, timeout),
            cache: LookupCache::new(Duration::from_secs(config.cache_ttl_secs)),
        })
    }

    async fn search(&self, food_name: &str) -> Result<Option<NutritionRecord>, CoreError> {
        let url = format!("{}/foods/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", food_name),
                ("pageSize", PAGE_SIZE),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("USDA request failed: {}", e);
                CoreError::ExternalServiceError(format!("USDA API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("USDA API error: {} - {}", status, error_text);
            return Err(CoreError::from_provider_status(
                PROVIDER,
                status.as_u16(),
                &error_text,
            ));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse USDA response: {}", e);
            CoreError::ExternalServiceError(format!("Failed to parse USDA response: {}", e))
        })?;

        Ok(body.best_record())
    }
}

impl NutritionDatabase for UsdaNutritionClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self))]
    async fn lookup(&self, food_name: String) -> Result<Option<NutritionRecord>, CoreError> {
        if let Some(cached) = self.cache.get(&food_name).await {
            tracing::debug!("USDA cache hit");
            return Ok(cached);
        }

        let record = call_with_policy(&self.policy, || self.search(&food_name)).await?;
        self.cache.insert(&food_name, record.clone()).await;
        Ok(record)
    }
}
