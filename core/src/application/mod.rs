use tracing::info;

use crate::{
    domain::{
        common::{PlatewiseConfig, services::Service},
        food_scan::value_objects::ScanSettings,
        quota::services::QuotaTracker,
    },
    infrastructure::{
        llm::GeminiLLMClient, nutrition::NutritionixClient, nutrition::UsdaNutritionClient,
        vision::ClarifaiVisionClient,
    },
};

pub type PlatewiseService =
    Service<ClarifaiVisionClient, UsdaNutritionClient, NutritionixClient, GeminiLLMClient>;

pub async fn create_service(config: PlatewiseConfig) -> Result<PlatewiseService, anyhow::Error> {
    let vision_client = ClarifaiVisionClient::new(&config.vision)?;
    let usda_client = UsdaNutritionClient::new(&config.nutrition)?;
    let nutritionix_client = NutritionixClient::new(&config.nutrition)?;
    let llm_client = GeminiLLMClient::new(&config.llm)?;
    let quota_tracker = QuotaTracker::from_config(&config.quota);

    info!(
        model = %config.llm.gemini_model,
        vision_monthly_limit = config.quota.vision_monthly_limit,
        llm_per_minute_limit = config.quota.llm_per_minute_limit,
        "Food scan service configured"
    );

    Ok(Service::new(
        vision_client,
        usda_client,
        nutritionix_client,
        llm_client,
        quota_tracker,
        ScanSettings::default(),
    ))
}
