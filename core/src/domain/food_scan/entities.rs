use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::common::generate_timestamp;

/// One tag returned by the vision provider for an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConceptObservation {
    pub name: String,
    pub confidence: f64,
}

impl ConceptObservation {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DishSource {
    FusionSynthesis,
    HeuristicFallback,
    VisionPrimary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DishIdentification {
    pub name: String,
    pub source: DishSource,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NutritionSource {
    Usda,
    Nutritionix,
    Composite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServingInfo {
    pub quantity: f64,
    pub unit: String,
    pub weight_grams: f64,
}

impl ServingInfo {
    pub fn per_100g() -> Self {
        Self {
            quantity: 100.0,
            unit: "g".to_string(),
            weight_grams: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthImpact {
    pub glycemic_index: f64,
    pub glycemic_load: f64,
    pub inflammatory_score: f64,
}

/// Per-serving nutrient set. Every numeric field is finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NutritionRecord {
    pub food_name: String,
    pub brand: Option<String>,
    pub source: NutritionSource,
    pub serving: ServingInfo,
    pub calories: f64,
    pub protein: f64,
    pub total_fat: f64,
    pub saturated_fat: f64,
    pub total_carbohydrate: f64,
    pub sugars: f64,
    pub dietary_fiber: f64,
    pub sodium: f64,
    pub potassium: f64,
    pub cholesterol: f64,
    pub phosphorus: f64,
    pub health_impact: Option<HealthImpact>,
}

/// Coerces a provider value into the record invariant: absent, NaN, infinite
/// and negative inputs all become 0.
pub fn nutrient_value(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

impl NutritionRecord {
    pub fn empty(food_name: impl Into<String>, source: NutritionSource, serving: ServingInfo) -> Self {
        Self {
            food_name: food_name.into(),
            brand: None,
            source,
            serving,
            calories: 0.0,
            protein: 0.0,
            total_fat: 0.0,
            saturated_fat: 0.0,
            total_carbohydrate: 0.0,
            sugars: 0.0,
            dietary_fiber: 0.0,
            sodium: 0.0,
            potassium: 0.0,
            cholesterol: 0.0,
            phosphorus: 0.0,
            health_impact: None,
        }
    }

    /// Re-applies the non-negative finite invariant to every numeric field.
    pub fn sanitized(mut self) -> Self {
        for value in self.nutrients_mut() {
            *value = nutrient_value(Some(*value));
        }
        self.serving.quantity = nutrient_value(Some(self.serving.quantity));
        self.serving.weight_grams = nutrient_value(Some(self.serving.weight_grams));
        self
    }

    /// Attaches derived glycemic and inflammatory estimates.
    pub fn with_health_impact(mut self) -> Self {
        self.health_impact = Some(HealthImpact::estimate(&self));
        self
    }

    pub fn nutrients(&self) -> [f64; 11] {
        [
            self.calories,
            self.protein,
            self.total_fat,
            self.saturated_fat,
            self.total_carbohydrate,
            self.sugars,
            self.dietary_fiber,
            self.sodium,
            self.potassium,
            self.cholesterol,
            self.phosphorus,
        ]
    }

    pub fn nutrients_mut(&mut self) -> [&mut f64; 11] {
        [
            &mut self.calories,
            &mut self.protein,
            &mut self.total_fat,
            &mut self.saturated_fat,
            &mut self.total_carbohydrate,
            &mut self.sugars,
            &mut self.dietary_fiber,
            &mut self.sodium,
            &mut self.potassium,
            &mut self.cholesterol,
            &mut self.phosphorus,
        ]
    }

    /// Sums several records into one meal-level total.
    pub fn combined(records: &[NutritionRecord]) -> Option<NutritionRecord> {
        let first = records.first()?;
        if records.len() == 1 {
            return Some(first.clone());
        }

        let name = records
            .iter()
            .map(|r| r.food_name.as_str())
            .collect::<Vec<_>>()
            .join(" + ");
        let weight: f64 = records.iter().map(|r| r.serving.weight_grams).sum();
        let mut total = NutritionRecord::empty(
            name,
            first.source,
            ServingInfo {
                quantity: 1.0,
                unit: "meal".to_string(),
                weight_grams: weight,
            },
        );

        for record in records {
            let values = record.nutrients();
            for (slot, value) in total.nutrients_mut().into_iter().zip(values) {
                *slot += value;
            }
        }

        Some(total.sanitized().with_health_impact())
    }
}

impl HealthImpact {
    /// Rough estimates derived from macro composition alone.
    pub fn estimate(record: &NutritionRecord) -> Self {
        let carbs = record.total_carbohydrate;
        let net_carbs = (carbs - record.dietary_fiber).max(0.0);

        let glycemic_index = if carbs <= 0.0 {
            0.0
        } else {
            let sugar_share = (record.sugars / carbs).clamp(0.0, 1.0);
            let fiber_share = (record.dietary_fiber / carbs).clamp(0.0, 1.0);
            (55.0 + 25.0 * sugar_share - 40.0 * fiber_share).clamp(10.0, 100.0)
        };
        let glycemic_load = glycemic_index * net_carbs / 100.0;

        let inflammatory_score = (record.saturated_fat * 0.3 + record.sugars * 0.1
            + record.sodium / 1000.0
            - record.dietary_fiber * 0.4)
            .clamp(-10.0, 10.0);

        Self {
            glycemic_index: round_to(glycemic_index, 1),
            glycemic_load: round_to(glycemic_load, 1),
            inflammatory_score: round_to(inflammatory_score, 1),
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// AI-estimated share of one ingredient in a dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompositeIngredient {
    pub name: String,
    pub percent_by_weight: u32,
}

impl CompositeIngredient {
    pub fn new(name: impl Into<String>, percent_by_weight: u32) -> Self {
        Self {
            name: name.into(),
            percent_by_weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AIAnalysis {
    pub description: String,
    pub health_score: u8,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScanPathway {
    pub source: DishSource,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FoodScanResult {
    pub id: Uuid,
    pub image_sha256: String,
    pub identified_dish: DishIdentification,
    pub food_items: Vec<String>,
    pub nutrition: Vec<NutritionRecord>,
    pub ai_analysis: Option<AIAnalysis>,
    pub warnings: Vec<String>,
    pub pathway: ScanPathway,
    pub created_at: DateTime<Utc>,
}

impl FoodScanResult {
    pub fn new(
        image_sha256: String,
        identified_dish: DishIdentification,
        food_items: Vec<String>,
        nutrition: Vec<NutritionRecord>,
        ai_analysis: Option<AIAnalysis>,
        warnings: Vec<String>,
        pathway_confidence: f64,
    ) -> Self {
        let (now, timestamp) = generate_timestamp();

        Self {
            id: Uuid::new_v7(timestamp),
            image_sha256,
            pathway: ScanPathway {
                source: identified_dish.source,
                confidence: pathway_confidence,
                timestamp: now,
            },
            identified_dish,
            food_items,
            nutrition,
            ai_analysis,
            warnings,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nutrient_value_coerces_missing_and_invalid() {
        assert_eq!(nutrient_value(None), 0.0);
        assert_eq!(nutrient_value(Some(f64::NAN)), 0.0);
        assert_eq!(nutrient_value(Some(f64::INFINITY)), 0.0);
        assert_eq!(nutrient_value(Some(-3.0)), 0.0);
        assert_eq!(nutrient_value(Some(12.5)), 12.5);
    }

    #[test]
    fn test_sanitized_record_has_only_finite_non_negative_values() {
        let mut record =
            NutritionRecord::empty("cola", NutritionSource::Nutritionix, ServingInfo::per_100g());
        record.calories = f64::NAN;
        record.sodium = -1.0;
        record.sugars = 10.6;

        let record = record.sanitized();
        assert!(record.nutrients().iter().all(|v| v.is_finite() && *v >= 0.0));
        assert_eq!(record.calories, 0.0);
        assert_eq!(record.sodium, 0.0);
        assert_eq!(record.sugars, 10.6);
    }

    #[test]
    fn test_combined_sums_nutrients() {
        let mut rice = NutritionRecord::empty("rice", NutritionSource::Usda, ServingInfo::per_100g());
        rice.calories = 130.0;
        rice.protein = 2.7;
        let mut beans =
            NutritionRecord::empty("beans", NutritionSource::Usda, ServingInfo::per_100g());
        beans.calories = 127.0;
        beans.protein = 8.7;

        let total = NutritionRecord::combined(&[rice, beans]).unwrap();
        assert_eq!(total.calories, 257.0);
        assert!((total.protein - 11.4).abs() < 1e-9);
        assert_eq!(total.serving.weight_grams, 200.0);
        assert!(total.health_impact.is_some());
    }
}
