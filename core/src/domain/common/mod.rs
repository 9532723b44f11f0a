use chrono::{DateTime, Utc};
use uuid::{NoContext, Timestamp};

pub mod call_policy;
pub mod entities;
pub mod services;

#[derive(Clone, Debug)]
pub struct PlatewiseConfig {
    pub llm: LLMConfig,
    pub vision: VisionConfig,
    pub nutrition: NutritionConfig,
    pub quota: QuotaConfig,
}

#[derive(Clone, Debug)]
pub struct LLMConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct VisionConfig {
    pub clarifai_pat: String,
    pub clarifai_model_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NutritionConfig {
    pub usda_api_key: String,
    pub usda_base_url: String,
    pub nutritionix_app_id: String,
    pub nutritionix_app_key: String,
    pub nutritionix_base_url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct QuotaConfig {
    pub vision_monthly_limit: u32,
    pub llm_per_minute_limit: u32,
}

pub fn generate_timestamp() -> (DateTime<Utc>, Timestamp) {
    let now = Utc::now();
    let seconds = now.timestamp().try_into().unwrap_or(0);
    let timestamp = Timestamp::from_unix(NoContext, seconds, 0);

    (now, timestamp)
}
