use futures::future::join_all;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    common::{entities::app_errors::CoreError, services::Service},
    food_scan::{
        catalog::best_catalog_match,
        composite::{parse_composite_response, synthesize_composite},
        entities::{
            AIAnalysis, ConceptObservation, DishIdentification, DishSource, FoodScanResult,
            NutritionRecord,
        },
        normalizer::{apply_ingredient_heuristics, clean_model_dish_name, normalize_dish_name},
        parser::{coerce_ai_analysis, parse_ai_analysis},
        ports::{FoodScanService, LLMClient, NutritionDatabase, VisionConceptClient},
        prompts::{
            analysis_prompt, composite_prompt, dish_synthesis_prompt, reformat_prompt,
            vision_identification_prompt,
        },
        resolution::{DishStrategy, NutritionStrategy, StrategyFailure, first_success},
        schema::{get_ai_analysis_schema, get_composite_schema},
        validator::{DataFidelity, validate_analysis},
        value_objects::{GenerationOptions, LookupNutritionInput, ScanFoodInput, ScanSettings},
    },
    quota::entities::{QuotaProvider, QuotaSnapshot},
};

const ANALYSIS_MAX_TOKENS: u32 = 512;
const COMPOSITE_MAX_TOKENS: u32 = 256;

#[derive(Debug, Clone, PartialEq)]
struct DishResolution {
    identification: DishIdentification,
    food_items: Vec<String>,
}

/// Keeps concepts at or above the confidence floor, best first, capped at
/// `max_concepts`. When nothing clears the floor the raw top concepts are
/// used instead.
pub fn select_concepts(
    raw: Vec<ConceptObservation>,
    settings: &ScanSettings,
) -> Vec<ConceptObservation> {
    let mut concepts: Vec<ConceptObservation> = raw
        .into_iter()
        .filter(|c| !c.name.trim().is_empty() && c.confidence.is_finite())
        .map(|c| ConceptObservation::new(c.name.trim(), c.confidence.clamp(0.0, 1.0)))
        .collect();
    concepts.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let confident: Vec<ConceptObservation> = concepts
        .iter()
        .filter(|c| c.confidence >= settings.min_concept_confidence)
        .take(settings.max_concepts)
        .cloned()
        .collect();

    if confident.is_empty() {
        concepts.truncate(settings.max_concepts);
        concepts
    } else {
        confident
    }
}

/// Turns a recoverable failure into a warning. Fatal provider errors are
/// returned so the request fails with the provider's category.
fn absorb<T>(
    result: Result<T, CoreError>,
    context: &str,
    warnings: &mut Vec<String>,
) -> Result<Option<T>, CoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal_provider_error() => Err(e),
        Err(e) => {
            warn!("{}: {}", context, e);
            warnings.push(format!("{}: {}", context, e));
            Ok(None)
        }
    }
}

fn first_fatal<S>(failures: &[StrategyFailure<S>]) -> Option<CoreError> {
    failures
        .iter()
        .find(|failure| failure.error.is_fatal_provider_error())
        .map(|failure| failure.error.clone())
}

fn image_fingerprint(image_data: &[u8]) -> String {
    hex::encode(Sha256::digest(image_data))
}

impl<V, P, F, L> Service<V, P, F, L>
where
    V: VisionConceptClient,
    P: NutritionDatabase,
    F: NutritionDatabase,
    L: LLMClient,
{
    async fn extract_concepts(
        &self,
        image_data: &[u8],
    ) -> Result<Vec<ConceptObservation>, CoreError> {
        let decision = self.quota_tracker.reserve(QuotaProvider::Vision);
        if !decision.allowed {
            warn!(
                used = decision.count,
                limit = decision.limit,
                "Vision quota exhausted"
            );
            return Err(CoreError::VisionQuotaExhausted {
                reset_at: decision.reset_at,
            });
        }

        let raw = self
            .vision_client
            .extract_concepts(image_data.to_vec())
            .await
            .map_err(|e| {
                error!("Vision concept extraction failed: {}", e);
                self.quota_tracker.release(QuotaProvider::Vision);
                CoreError::VisionUnavailable(e.to_string())
            })?;

        let concepts = select_concepts(raw, &self.settings);
        if concepts.is_empty() {
            return Err(CoreError::VisionUnavailable(
                "no food concepts detected in image".to_string(),
            ));
        }

        debug!(concepts = ?concepts, "Vision concepts selected");
        Ok(concepts)
    }

    fn reserve_llm(&self) -> Result<(), CoreError> {
        let decision = self.quota_tracker.reserve(QuotaProvider::Llm);
        if decision.allowed {
            Ok(())
        } else {
            Err(CoreError::LlmRateLimited {
                reset_at: decision.reset_at,
            })
        }
    }

    /// Failed calls hand their quota slot back.
    fn settle_llm(&self, result: Result<String, CoreError>) -> Result<String, CoreError> {
        if result.is_err() {
            self.quota_tracker.release(QuotaProvider::Llm);
        }
        result
    }

    async fn llm_text(&self, prompt: String, options: GenerationOptions) -> Result<String, CoreError> {
        self.reserve_llm()?;
        let result = self.llm_client.generate_with_text(prompt, options).await;
        self.settle_llm(result)
    }

    async fn llm_image(
        &self,
        prompt: String,
        image_data: &[u8],
        options: GenerationOptions,
    ) -> Result<String, CoreError> {
        self.reserve_llm()?;
        let result = self
            .llm_client
            .generate_with_image(prompt, image_data.to_vec(), options)
            .await;
        self.settle_llm(result)
    }

    /// Looks a name up in the primary database, then the fallback one.
    /// Auth, credit and remote-quota failures stop the lookup; any other
    /// provider error counts as a miss.
    async fn lookup_name(&self, food_name: &str) -> Result<NutritionRecord, CoreError> {
        match self.primary_nutrition.lookup(food_name.to_string()).await {
            Ok(Some(record)) => return Ok(record.sanitized().with_health_impact()),
            Ok(None) => debug!(
                provider = self.primary_nutrition.provider_name(),
                food_name, "Nutrition lookup miss"
            ),
            Err(e) if e.is_fatal_provider_error() => {
                error!(
                    provider = self.primary_nutrition.provider_name(),
                    food_name, "Nutrition provider rejected the request: {}", e
                );
                return Err(e);
            }
            Err(e) => warn!(
                provider = self.primary_nutrition.provider_name(),
                food_name, "Nutrition lookup failed: {}", e
            ),
        }

        match self.fallback_nutrition.lookup(food_name.to_string()).await {
            Ok(Some(record)) => Ok(record.sanitized().with_health_impact()),
            Ok(None) => {
                debug!(
                    provider = self.fallback_nutrition.provider_name(),
                    food_name, "Nutrition lookup miss"
                );
                Err(CoreError::NoNutritionData)
            }
            Err(e) if e.is_fatal_provider_error() => {
                error!(
                    provider = self.fallback_nutrition.provider_name(),
                    food_name, "Nutrition provider rejected the request: {}", e
                );
                Err(e)
            }
            Err(e) => {
                warn!(
                    provider = self.fallback_nutrition.provider_name(),
                    food_name, "Nutrition lookup failed: {}", e
                );
                Err(CoreError::NoNutritionData)
            }
        }
    }

    async fn run_dish_strategy(
        &self,
        strategy: DishStrategy,
        concepts: &[ConceptObservation],
        concept_names: &[String],
    ) -> Result<DishResolution, CoreError> {
        let confidence = concepts.first().map(|c| c.confidence).unwrap_or(0.0);

        match strategy {
            DishStrategy::LlmSynthesis => {
                let answer = self
                    .llm_text(
                        dish_synthesis_prompt(concepts),
                        GenerationOptions::short_answer(),
                    )
                    .await?;
                let candidate = clean_model_dish_name(&answer).ok_or_else(|| {
                    CoreError::InvalidModelOutput(format!("unusable dish name {:?}", answer.trim()))
                })?;
                let name =
                    apply_ingredient_heuristics(&normalize_dish_name(&candidate), concept_names);

                Ok(DishResolution {
                    identification: DishIdentification {
                        name,
                        source: DishSource::FusionSynthesis,
                        confidence,
                    },
                    food_items: concept_names.to_vec(),
                })
            }
            DishStrategy::CatalogMatch => {
                let matched = best_catalog_match(concepts, &self.settings.heuristic_weights)
                    .ok_or(CoreError::NotFound)?;
                debug!(
                    entry = matched.entry.name,
                    score = matched.score,
                    "Catalog match accepted"
                );
                let name = apply_ingredient_heuristics(
                    &normalize_dish_name(matched.entry.name),
                    concept_names,
                );

                Ok(DishResolution {
                    identification: DishIdentification {
                        name,
                        source: DishSource::HeuristicFallback,
                        confidence,
                    },
                    food_items: matched
                        .entry
                        .ingredients
                        .iter()
                        .map(|i| i.to_string())
                        .collect(),
                })
            }
            DishStrategy::TopConcept => {
                let top = concepts.first().ok_or(CoreError::NotFound)?;

                Ok(DishResolution {
                    identification: DishIdentification {
                        name: normalize_dish_name(&top.name),
                        source: DishSource::HeuristicFallback,
                        confidence,
                    },
                    food_items: vec![top.name.clone()],
                })
            }
        }
    }

    async fn identify_dish(
        &self,
        concepts: &[ConceptObservation],
        concept_names: &[String],
        warnings: &mut Vec<String>,
    ) -> Result<DishResolution, CoreError> {
        let outcome = first_success(&DishStrategy::ORDER, |strategy| {
            self.run_dish_strategy(strategy, concepts, concept_names)
        })
        .await;

        match outcome {
            Ok(resolved) => {
                if let Some(fatal) = first_fatal(&resolved.failures) {
                    return Err(fatal);
                }
                for failure in &resolved.failures {
                    warn!(strategy = %failure.strategy, "Dish strategy failed: {}", failure.error);
                    warnings.push(failure.warning());
                }
                info!(
                    dish = %resolved.value.identification.name,
                    strategy = %resolved.strategy,
                    "Dish identified"
                );
                Ok(resolved.value)
            }
            Err(failures) => Err(first_fatal(&failures).unwrap_or(CoreError::VisionUnavailable(
                "no concepts available to name the dish".to_string(),
            ))),
        }
    }

    async fn estimate_composite(&self, dish_name: &str) -> Result<NutritionRecord, CoreError> {
        let mut ingredients = None;
        let mut last_error = CoreError::InvalidModelOutput("no decomposition attempted".into());

        for attempt in 1..=self.settings.composite_attempts.max(1) {
            let answer = self
                .llm_text(
                    composite_prompt(dish_name),
                    GenerationOptions::structured(get_composite_schema(), COMPOSITE_MAX_TOKENS),
                )
                .await?;
            match parse_composite_response(&answer) {
                Ok(parsed) => {
                    ingredients = Some(parsed);
                    break;
                }
                Err(e) => {
                    debug!(attempt, "Composite decomposition rejected: {}", e);
                    last_error = e;
                }
            }
        }
        let ingredients = ingredients.ok_or(last_error)?;

        let lookups = join_all(
            ingredients
                .iter()
                .map(|ingredient| self.lookup_name(&ingredient.name)),
        )
        .await;

        if let Some(fatal) = lookups
            .iter()
            .find_map(|lookup| lookup.as_ref().err().filter(|e| e.is_fatal_provider_error()))
        {
            return Err(fatal.clone());
        }

        let resolved: Vec<_> = ingredients
            .into_iter()
            .zip(lookups)
            .filter_map(|(ingredient, lookup)| lookup.ok().map(|record| (ingredient, record)))
            .collect();

        if resolved.len() < self.settings.min_composite_matches {
            return Err(CoreError::ExternalServiceError(format!(
                "only {} ingredients resolved, need {}",
                resolved.len(),
                self.settings.min_composite_matches
            )));
        }

        Ok(synthesize_composite(dish_name, &resolved))
    }

    async fn run_nutrition_strategy(
        &self,
        strategy: NutritionStrategy,
        dish_name: &str,
        concept_names: &[String],
    ) -> Result<Vec<NutritionRecord>, CoreError> {
        match strategy {
            NutritionStrategy::DirectLookup => Ok(vec![self.lookup_name(dish_name).await?]),
            NutritionStrategy::CompositeEstimate => {
                Ok(vec![self.estimate_composite(dish_name).await?])
            }
            NutritionStrategy::ConceptLookups => {
                let mut records = Vec::new();
                for name in concept_names {
                    match self.lookup_name(name).await {
                        Ok(record) => records.push(record),
                        Err(e) if e.is_fatal_provider_error() => return Err(e),
                        Err(e) => debug!(concept = %name, "Concept lookup skipped: {}", e),
                    }
                }
                if records.is_empty() {
                    Err(CoreError::NoNutritionData)
                } else {
                    Ok(records)
                }
            }
        }
    }

    async fn resolve_nutrition(
        &self,
        dish_name: &str,
        concept_names: &[String],
        warnings: &mut Vec<String>,
    ) -> Result<Vec<NutritionRecord>, CoreError> {
        let outcome = first_success(&NutritionStrategy::ORDER, |strategy| {
            self.run_nutrition_strategy(strategy, dish_name, concept_names)
        })
        .await;

        match outcome {
            Ok(resolved) => {
                if let Some(fatal) = first_fatal(&resolved.failures) {
                    return Err(fatal);
                }
                for failure in &resolved.failures {
                    warn!(strategy = %failure.strategy, "Nutrition strategy failed: {}", failure.error);
                    warnings.push(failure.warning());
                }
                info!(
                    dish = dish_name,
                    strategy = %resolved.strategy,
                    records = resolved.value.len(),
                    "Nutrition resolved"
                );
                Ok(resolved.value)
            }
            Err(failures) => {
                if let Some(fatal) = first_fatal(&failures) {
                    return Err(fatal);
                }
                error!(dish = dish_name, "No nutrition data after all strategies");
                Err(CoreError::NoNutritionData)
            }
        }
    }

    /// Asks the LLM to name the dish straight from the image. A different
    /// name that resolves in a nutrition database replaces the earlier
    /// result; any other outcome keeps it.
    async fn vision_override(
        &self,
        image_data: &[u8],
        current_name: &str,
        concept_names: &[String],
    ) -> Result<Option<(String, NutritionRecord)>, CoreError> {
        let answer = match self
            .llm_image(
                vision_identification_prompt(),
                image_data,
                GenerationOptions::short_answer(),
            )
            .await
        {
            Ok(answer) => answer,
            Err(e) if e.is_fatal_provider_error() => return Err(e),
            Err(e) => {
                debug!("Vision re-identification skipped: {}", e);
                return Ok(None);
            }
        };

        let Some(candidate) = clean_model_dish_name(&answer) else {
            return Ok(None);
        };
        let name = apply_ingredient_heuristics(&normalize_dish_name(&candidate), concept_names);
        if name.eq_ignore_ascii_case(current_name) {
            return Ok(None);
        }

        match self.lookup_name(&name).await {
            Ok(record) => {
                info!(from = current_name, to = %name, "Vision re-identification override");
                Ok(Some((name, record)))
            }
            Err(e) if e.is_fatal_provider_error() => Err(e),
            Err(_) => Ok(None),
        }
    }

    async fn analyze(
        &self,
        dish_name: &str,
        nutrition: &[NutritionRecord],
        warnings: &mut Vec<String>,
    ) -> Result<Option<AIAnalysis>, CoreError> {
        let Some(truth) = NutritionRecord::combined(nutrition) else {
            return Ok(None);
        };
        let options = GenerationOptions::structured(get_ai_analysis_schema(), ANALYSIS_MAX_TOKENS);

        let raw = self
            .llm_text(analysis_prompt(dish_name, &truth), options.clone())
            .await;
        let Some(raw) = absorb(raw, "AI analysis unavailable", warnings)? else {
            return Ok(None);
        };

        let analysis = match parse_ai_analysis(&raw) {
            Ok(analysis) => Some(analysis),
            Err(shape) => {
                debug!("AI analysis needs reformatting: {}", shape);
                match self.llm_text(reformat_prompt(&raw), options).await {
                    Ok(text) => parse_ai_analysis(&text)
                        .ok()
                        .or_else(|| coerce_ai_analysis(&text))
                        .or_else(|| coerce_ai_analysis(&raw)),
                    Err(e) if e.is_fatal_provider_error() => return Err(e),
                    Err(e) => {
                        debug!("AI analysis reformat failed: {}", e);
                        coerce_ai_analysis(&raw)
                    }
                }
            }
        };

        let Some(mut analysis) = analysis else {
            warnings.push("AI analysis could not be parsed".to_string());
            return Ok(None);
        };

        let report = validate_analysis(&mut analysis, &truth, DataFidelity::Standard);
        debug!(
            issues = report.issues.len(),
            calories_corrected = report.calories_corrected(),
            "AI analysis validated"
        );

        Ok(Some(analysis))
    }
}

impl<V, P, F, L> FoodScanService for Service<V, P, F, L>
where
    V: VisionConceptClient,
    P: NutritionDatabase,
    F: NutritionDatabase,
    L: LLMClient,
{
    #[instrument(skip(self, input), fields(image_bytes = input.image_data.len()))]
    async fn scan_food(&self, input: ScanFoodInput) -> Result<FoodScanResult, CoreError> {
        if input.image_data.is_empty() {
            return Err(CoreError::Invalid("image is empty".to_string()));
        }
        let image_sha256 = image_fingerprint(&input.image_data);
        let mut warnings = Vec::new();

        let concepts = self.extract_concepts(&input.image_data).await?;
        let concept_names: Vec<String> = concepts.iter().map(|c| c.name.clone()).collect();
        let pathway_confidence = concepts.first().map(|c| c.confidence).unwrap_or(0.0);

        let mut dish = self
            .identify_dish(&concepts, &concept_names, &mut warnings)
            .await?;
        let mut nutrition = self
            .resolve_nutrition(&dish.identification.name, &concept_names, &mut warnings)
            .await?;

        if let Some((name, record)) = self
            .vision_override(&input.image_data, &dish.identification.name, &concept_names)
            .await?
        {
            dish = DishResolution {
                identification: DishIdentification {
                    name: name.clone(),
                    source: DishSource::VisionPrimary,
                    confidence: pathway_confidence,
                },
                food_items: vec![name],
            };
            nutrition = vec![record];
        }

        let ai_analysis = self
            .analyze(&dish.identification.name, &nutrition, &mut warnings)
            .await?;

        info!(
            dish = %dish.identification.name,
            source = ?dish.identification.source,
            warnings = warnings.len(),
            "Food scan completed"
        );

        Ok(FoodScanResult::new(
            image_sha256,
            dish.identification,
            dish.food_items,
            nutrition,
            ai_analysis,
            warnings,
            pathway_confidence,
        ))
    }

    #[instrument(skip(self))]
    async fn lookup_nutrition(
        &self,
        input: LookupNutritionInput,
    ) -> Result<NutritionRecord, CoreError> {
        let food_name = input.food_name.trim();
        if food_name.is_empty() {
            return Err(CoreError::Invalid("food name is empty".to_string()));
        }

        self.lookup_name(food_name).await
    }

    fn quota_status(&self) -> Vec<QuotaSnapshot> {
        self.quota_tracker.snapshot()
    }
}
