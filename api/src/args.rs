use clap::Parser;
use platewise_core::domain::common::{
    LLMConfig, NutritionConfig, PlatewiseConfig, QuotaConfig, VisionConfig,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "platewise-api", version, about = "Platewise food scan API")]
pub struct Args {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub log: LogArgs,

    #[command(flatten)]
    pub llm: LlmArgs,

    #[command(flatten)]
    pub vision: VisionArgs,

    #[command(flatten)]
    pub nutrition: NutritionArgs,

    #[command(flatten)]
    pub quota: QuotaArgs,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServerArgs {
    #[arg(long = "server-host", env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long = "server-port", env = "SERVER_PORT", default_value_t = 3333)]
    pub port: u16,

    /// Prefix for every route, e.g. `/api`
    #[arg(long = "server-root-path", env = "SERVER_ROOT_PATH", default_value = "")]
    pub root_path: String,

    #[arg(
        long = "allowed-origins",
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:5173"
    )]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    #[arg(long = "log-filter", env = "LOG_FILTER", default_value = "info")]
    pub filter: String,

    #[arg(long = "log-json", env = "LOG_JSON", default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct LlmArgs {
    #[arg(long = "gemini-api-key", env = "GEMINI_API_KEY")]
    pub gemini_api_key: String,

    #[arg(long = "gemini-model", env = "GEMINI_MODEL", default_value = "gemini-2.0-flash")]
    pub gemini_model: String,

    #[arg(long = "llm-max-retries", env = "LLM_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long = "llm-timeout-secs", env = "LLM_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, clap::Args)]
pub struct VisionArgs {
    #[arg(long = "clarifai-pat", env = "CLARIFAI_PAT")]
    pub clarifai_pat: String,

    #[arg(
        long = "clarifai-model-url",
        env = "CLARIFAI_MODEL_URL",
        default_value = "https://api.clarifai.com/v2/users/clarifai/apps/main/models/food-item-recognition/outputs"
    )]
    pub clarifai_model_url: String,

    #[arg(long = "vision-timeout-secs", env = "VISION_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, clap::Args)]
pub struct NutritionArgs {
    #[arg(long = "usda-api-key", env = "USDA_API_KEY")]
    pub usda_api_key: String,

    #[arg(
        long = "usda-base-url",
        env = "USDA_BASE_URL",
        default_value = "https://api.nal.usda.gov/fdc/v1"
    )]
    pub usda_base_url: String,

    #[arg(long = "nutritionix-app-id", env = "NUTRITIONIX_APP_ID")]
    pub nutritionix_app_id: String,

    #[arg(long = "nutritionix-app-key", env = "NUTRITIONIX_APP_KEY")]
    pub nutritionix_app_key: String,

    #[arg(
        long = "nutritionix-base-url",
        env = "NUTRITIONIX_BASE_URL",
        default_value = "https://trackapi.nutritionix.com"
    )]
    pub nutritionix_base_url: String,

    #[arg(
        long = "nutrition-timeout-secs",
        env = "NUTRITION_TIMEOUT_SECS",
        default_value_t = 10
    )]
    pub timeout_secs: u64,

    /// Lookup cache lifetime; 0 disables the cache
    #[arg(
        long = "nutrition-cache-ttl-secs",
        env = "NUTRITION_CACHE_TTL_SECS",
        default_value_t = 86_400
    )]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, clap::Args)]
pub struct QuotaArgs {
    #[arg(
        long = "vision-monthly-quota",
        env = "VISION_MONTHLY_QUOTA",
        default_value_t = 1000
    )]
    pub vision_monthly_limit: u32,

    #[arg(
        long = "llm-per-minute-quota",
        env = "LLM_PER_MINUTE_QUOTA",
        default_value_t = 15
    )]
    pub llm_per_minute_limit: u32,
}

impl From<Args> for PlatewiseConfig {
    fn from(args: Args) -> Self {
        Self {
            llm: LLMConfig {
                gemini_api_key: args.llm.gemini_api_key,
                gemini_model: args.llm.gemini_model,
                max_retries: args.llm.max_retries,
                timeout_secs: args.llm.timeout_secs,
            },
            vision: VisionConfig {
                clarifai_pat: args.vision.clarifai_pat,
                clarifai_model_url: args.vision.clarifai_model_url,
                timeout_secs: args.vision.timeout_secs,
            },
            nutrition: NutritionConfig {
                usda_api_key: args.nutrition.usda_api_key,
                usda_base_url: args.nutrition.usda_base_url,
                nutritionix_app_id: args.nutrition.nutritionix_app_id,
                nutritionix_app_key: args.nutrition.nutritionix_app_key,
                nutritionix_base_url: args.nutrition.nutritionix_base_url,
                timeout_secs: args.nutrition.timeout_secs,
                cache_ttl_secs: args.nutrition.cache_ttl_secs,
            },
            quota: QuotaConfig {
                vision_monthly_limit: args.quota.vision_monthly_limit,
                llm_per_minute_limit: args.quota.llm_per_minute_limit,
            },
        }
    }
}

#[cfg(test)]
pub(crate) fn test_args() -> Args {
    Args::parse_from([
        "platewise-api",
        "--gemini-api-key",
        "test-gemini",
        "--clarifai-pat",
        "test-pat",
        "--usda-api-key",
        "test-usda",
        "--nutritionix-app-id",
        "test-id",
        "--nutritionix-app-key",
        "test-key",
    ])
}
