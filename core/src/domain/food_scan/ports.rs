use std::future::Future;

use crate::domain::{
    common::entities::app_errors::CoreError,
    food_scan::{
        entities::{ConceptObservation, FoodScanResult, NutritionRecord},
        value_objects::{GenerationOptions, LookupNutritionInput, ScanFoodInput},
    },
    quota::entities::QuotaSnapshot,
};

/// Vision provider turning an image into ranked concept tags
#[cfg_attr(test, mockall::automock)]
pub trait VisionConceptClient: Send + Sync {
    fn extract_concepts(
        &self,
        image_data: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<ConceptObservation>, CoreError>> + Send;
}

/// Nutrition database keyed by free-text food name.
/// `Ok(None)` is a clean miss; `Err` is a provider failure.
#[cfg_attr(test, mockall::automock)]
pub trait NutritionDatabase: Send + Sync {
    fn provider_name(&self) -> &'static str;

    fn lookup(
        &self,
        food_name: String,
    ) -> impl Future<Output = Result<Option<NutritionRecord>, CoreError>> + Send;
}

/// LLM Client trait for calling AI models
#[cfg_attr(test, mockall::automock)]
pub trait LLMClient: Send + Sync {
    fn generate_with_image(
        &self,
        prompt: String,
        image_data: Vec<u8>,
        options: GenerationOptions,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;

    fn generate_with_text(
        &self,
        prompt: String,
        options: GenerationOptions,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;
}

/// Service trait for the food scan pipeline
pub trait FoodScanService: Send + Sync {
    fn scan_food(
        &self,
        input: ScanFoodInput,
    ) -> impl Future<Output = Result<FoodScanResult, CoreError>> + Send;

    fn lookup_nutrition(
        &self,
        input: LookupNutritionInput,
    ) -> impl Future<Output = Result<NutritionRecord, CoreError>> + Send;

    fn quota_status(&self) -> Vec<QuotaSnapshot>;
}
