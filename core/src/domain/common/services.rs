use std::sync::Arc;

use crate::domain::{
    food_scan::{
        ports::{LLMClient, NutritionDatabase, VisionConceptClient},
        value_objects::ScanSettings,
    },
    quota::services::QuotaTracker,
};

/// Provider set the domain services run against.
///
/// `P` is the primary nutrition database and `F` the fallback one; lookups
/// always try `P` first.
pub struct Service<V, P, F, L>
where
    V: VisionConceptClient,
    P: NutritionDatabase,
    F: NutritionDatabase,
    L: LLMClient,
{
    pub(crate) vision_client: Arc<V>,
    pub(crate) primary_nutrition: Arc<P>,
    pub(crate) fallback_nutrition: Arc<F>,
    pub(crate) llm_client: Arc<L>,
    pub(crate) quota_tracker: Arc<QuotaTracker>,
    pub(crate) settings: ScanSettings,
}

impl<V, P, F, L> Service<V, P, F, L>
where
    V: VisionConceptClient,
    P: NutritionDatabase,
    F: NutritionDatabase,
    L: LLMClient,
{
    pub fn new(
        vision_client: V,
        primary_nutrition: P,
        fallback_nutrition: F,
        llm_client: L,
        quota_tracker: QuotaTracker,
        settings: ScanSettings,
    ) -> Self {
        Self {
            vision_client: Arc::new(vision_client),
            primary_nutrition: Arc::new(primary_nutrition),
            fallback_nutrition: Arc::new(fallback_nutrition),
            llm_client: Arc::new(llm_client),
            quota_tracker: Arc::new(quota_tracker),
            settings,
        }
    }
}

impl<V, P, F, L> Clone for Service<V, P, F, L>
where
    V: VisionConceptClient,
    P: NutritionDatabase,
    F: NutritionDatabase,
    L: LLMClient,
{
    fn clone(&self) -> Self {
        Self {
            vision_client: Arc::clone(&self.vision_client),
            primary_nutrition: Arc::clone(&self.primary_nutrition),
            fallback_nutrition: Arc::clone(&self.fallback_nutrition),
            llm_client: Arc::clone(&self.llm_client),
            quota_tracker: Arc::clone(&self.quota_tracker),
            settings: self.settings.clone(),
        }
    }
}
