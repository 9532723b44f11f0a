use std::sync::Arc;

use platewise_core::application::PlatewiseService;

use crate::args::Args;

#[derive(Clone)]
pub struct AppState {
    pub args: Arc<Args>,
    pub service: PlatewiseService,
}

impl AppState {
    pub fn new(args: Arc<Args>, service: PlatewiseService) -> Self {
        Self { args, service }
    }
}
