use super::handlers::lookup_nutrition::{__path_lookup_nutrition, lookup_nutrition};
use crate::application::http::server::app_state::AppState;
use axum::{Router, routing::post};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(paths(lookup_nutrition))]
pub struct NutritionApiDoc;

pub fn nutrition_routes(state: AppState) -> Router<AppState> {
    Router::new().route(
        &format!("{}/nutrition/lookup", state.args.server.root_path),
        post(lookup_nutrition),
    )
}
