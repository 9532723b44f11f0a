pub mod cache;
pub mod nutritionix_client;
pub mod usda_client;

pub use nutritionix_client::NutritionixClient;
pub use usda_client::UsdaNutritionClient;
