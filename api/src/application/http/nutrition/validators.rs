use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct LookupNutritionValidator {
    #[validate(length(
        min = 1,
        max = 200,
        message = "food_name must be between 1 and 200 characters"
    ))]
    #[schema(example = "spaghetti bolognese")]
    pub food_name: String,
}
