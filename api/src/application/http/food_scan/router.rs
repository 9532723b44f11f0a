use super::handlers::{
    get_quota::{__path_get_quota, get_quota},
    scan_food::{__path_scan_food, scan_food, MAX_IMAGE_SIZE},
};
use crate::application::http::server::app_state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use utoipa::OpenApi;

// room for multipart boundaries and headers around the image part
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(paths(scan_food, get_quota))]
pub struct FoodScanApiDoc;

pub fn food_scan_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            &format!("{}/food-scan", state.args.server.root_path),
            post(scan_food).layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + MULTIPART_OVERHEAD)),
        )
        .route(
            &format!("{}/food-scan/quota", state.args.server.root_path),
            get(get_quota),
        )
}
