use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::TimeDelta;

use crate::domain::{
    common::{entities::app_errors::CoreError, services::Service},
    food_scan::{
        entities::{ConceptObservation, NutritionRecord, NutritionSource, ServingInfo},
        ports::{LLMClient, NutritionDatabase, VisionConceptClient},
        value_objects::{GenerationOptions, ScanSettings},
    },
    quota::{
        entities::{QuotaLimit, QuotaWindow},
        services::QuotaTracker,
    },
};

pub struct FakeVision {
    pub response: Result<Vec<ConceptObservation>, CoreError>,
    pub calls: Mutex<u32>,
}

impl FakeVision {
    pub fn with_concepts(concepts: &[(&str, f64)]) -> Self {
        Self {
            response: Ok(concepts
                .iter()
                .map(|(name, confidence)| ConceptObservation::new(*name, *confidence))
                .collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn failing(error: CoreError) -> Self {
        Self {
            response: Err(error),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl VisionConceptClient for FakeVision {
    async fn extract_concepts(
        &self,
        _image_data: Vec<u8>,
    ) -> Result<Vec<ConceptObservation>, CoreError> {
        *self.calls.lock().unwrap() += 1;
        self.response.clone()
    }
}

/// Nutrition database backed by a name -> record map.
pub struct FakeNutrition {
    pub name: &'static str,
    pub records: HashMap<String, NutritionRecord>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeNutrition {
    pub fn new(name: &'static str, records: Vec<NutritionRecord>) -> Self {
        Self {
            name,
            records: records
                .into_iter()
                .map(|record| (record.food_name.to_lowercase(), record))
                .collect(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn empty(name: &'static str) -> Self {
        Self::new(name, Vec::new())
    }
}

impl NutritionDatabase for FakeNutrition {
    fn provider_name(&self) -> &'static str {
        self.name
    }

    async fn lookup(&self, food_name: String) -> Result<Option<NutritionRecord>, CoreError> {
        self.lookups.lock().unwrap().push(food_name.clone());
        Ok(self.records.get(&food_name.to_lowercase()).cloned())
    }
}

/// LLM scripted per prompt kind. Unscripted calls fail with a retryable error.
/// Queued composite answers are used up in order before `composite`.
#[derive(Default)]
pub struct FakeLlm {
    pub synthesis: Option<Result<String, CoreError>>,
    pub composite: Option<Result<String, CoreError>>,
    pub composite_queue: Mutex<VecDeque<Result<String, CoreError>>>,
    pub analysis: Option<Result<String, CoreError>>,
    pub reformat: Option<Result<String, CoreError>>,
    pub vision: Option<Result<String, CoreError>>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn with_synthesis(answer: &str) -> Self {
        Self {
            synthesis: Some(Ok(answer.to_string())),
            ..Default::default()
        }
    }

    pub fn analysis(mut self, answer: &str) -> Self {
        self.analysis = Some(Ok(answer.to_string()));
        self
    }

    pub fn composite(mut self, answer: &str) -> Self {
        self.composite = Some(Ok(answer.to_string()));
        self
    }

    pub fn composite_sequence(self, answers: &[&str]) -> Self {
        self.composite_queue
            .lock()
            .unwrap()
            .extend(answers.iter().map(|answer| Ok(answer.to_string())));
        self
    }

    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|prompt| prompt.contains(needle))
            .count()
    }

    pub fn reformat(mut self, answer: &str) -> Self {
        self.reformat = Some(Ok(answer.to_string()));
        self
    }

    pub fn vision(mut self, answer: &str) -> Self {
        self.vision = Some(Ok(answer.to_string()));
        self
    }

    fn scripted(slot: &Option<Result<String, CoreError>>) -> Result<String, CoreError> {
        slot.clone()
            .unwrap_or_else(|| Err(CoreError::ExternalServiceError("unscripted prompt".to_string())))
    }
}

impl LLMClient for FakeLlm {
    async fn generate_with_image(
        &self,
        prompt: String,
        _image_data: Vec<u8>,
        _options: GenerationOptions,
    ) -> Result<String, CoreError> {
        self.prompts.lock().unwrap().push(prompt);
        Self::scripted(&self.vision)
    }

    async fn generate_with_text(
        &self,
        prompt: String,
        _options: GenerationOptions,
    ) -> Result<String, CoreError> {
        let slot = if prompt.contains("detected these items") {
            &self.synthesis
        } else if prompt.contains("main ingredients by weight") {
            let queued = self.composite_queue.lock().unwrap().pop_front();
            if let Some(answer) = queued {
                self.prompts.lock().unwrap().push(prompt);
                return answer;
            }
            &self.composite
        } else if prompt.contains("supposed to be a JSON object") {
            &self.reformat
        } else {
            &self.analysis
        };
        self.prompts.lock().unwrap().push(prompt);
        Self::scripted(slot)
    }
}

pub type TestService = Service<FakeVision, FakeNutrition, FakeNutrition, FakeLlm>;

pub fn quota_tracker(vision_limit: u32, llm_limit: u32) -> QuotaTracker {
    QuotaTracker::new(
        QuotaLimit {
            limit: vision_limit,
            window: QuotaWindow::CalendarMonth,
        },
        QuotaLimit {
            limit: llm_limit,
            window: QuotaWindow::Rolling(TimeDelta::minutes(1)),
        },
    )
}

pub fn service(
    vision: FakeVision,
    primary: FakeNutrition,
    fallback: FakeNutrition,
    llm: FakeLlm,
) -> TestService {
    service_with_quota(vision, primary, fallback, llm, quota_tracker(1000, 100))
}

pub fn service_with_quota(
    vision: FakeVision,
    primary: FakeNutrition,
    fallback: FakeNutrition,
    llm: FakeLlm,
    quota: QuotaTracker,
) -> TestService {
    Service::new(vision, primary, fallback, llm, quota, ScanSettings::default())
}

pub fn record(
    name: &str,
    source: NutritionSource,
    calories: f64,
    protein: f64,
    fat: f64,
    sugars: f64,
) -> NutritionRecord {
    let mut record = NutritionRecord::empty(name, source, ServingInfo::per_100g());
    record.calories = calories;
    record.protein = protein;
    record.total_fat = fat;
    record.sugars = sugars;
    record
}

pub fn analysis_json(description: &str, score: u8) -> String {
    serde_json::json!({
        "description": description,
        "healthScore": score,
        "suggestions": ["Add a side of vegetables"],
    })
    .to_string()
}
