use crate::application::http::{
    food_scan::router::FoodScanApiDoc, nutrition::router::NutritionApiDoc,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Platewise API",
        description = "Meal photo scanning with nutrition lookup and AI health analysis"
    ),
    nest(
        (path = "/food-scan", api = FoodScanApiDoc),
        (path = "/nutrition", api = NutritionApiDoc),
    )
)]
pub struct ApiDoc;
