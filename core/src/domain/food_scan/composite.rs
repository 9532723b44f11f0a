use serde_json::Value;

use crate::domain::{
    common::entities::app_errors::CoreError,
    food_scan::{
        entities::{CompositeIngredient, NutritionRecord, NutritionSource, ServingInfo},
        parser::extract_first_json,
    },
};

pub const MIN_COMPOSITE_INGREDIENTS: usize = 2;
pub const MAX_COMPOSITE_INGREDIENTS: usize = 6;

const NAME_KEYS: &[&str] = &["name", "ingredient"];
const PERCENT_KEYS: &[&str] = &["percent", "percentage", "percent_by_weight", "percentByWeight"];

/// Reads the `{"ingredients": [...]}` answer of a decomposition prompt and
/// normalizes it.
pub fn parse_composite_response(raw: &str) -> Result<Vec<CompositeIngredient>, CoreError> {
    let json = extract_first_json(raw)
        .ok_or_else(|| CoreError::InvalidModelOutput("no JSON object in decomposition".into()))?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| CoreError::InvalidModelOutput(format!("invalid decomposition JSON: {}", e)))?;

    let items = value
        .get("ingredients")
        .or_else(|| value.get("components"))
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::InvalidModelOutput("decomposition has no ingredients".into()))?;

    let raw_parts = items
        .iter()
        .filter_map(|item| {
            let name = NAME_KEYS
                .iter()
                .find_map(|key| item.get(*key).and_then(Value::as_str))?;
            let percent = PERCENT_KEYS.iter().find_map(|key| {
                item.get(*key).and_then(|v| match v {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
                    _ => None,
                })
            })?;
            Some((name.to_string(), percent))
        })
        .collect::<Vec<_>>();

    normalize_composite(raw_parts)
}

/// Cleans a model-estimated breakdown into 2..=6 ingredients with integer
/// percentages (each at least 1) summing to exactly 100.
pub fn normalize_composite(parts: Vec<(String, f64)>) -> Result<Vec<CompositeIngredient>, CoreError> {
    let mut merged: Vec<(String, f64)> = Vec::new();
    for (name, percent) in parts {
        let name = name.trim().to_lowercase();
        if name.is_empty() || !percent.is_finite() || percent <= 0.0 {
            continue;
        }
        match merged.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, total)) => *total += percent,
            None => merged.push((name, percent)),
        }
    }

    merged.sort_by(|a, b| b.1.total_cmp(&a.1));
    merged.truncate(MAX_COMPOSITE_INGREDIENTS);

    if merged.len() < MIN_COMPOSITE_INGREDIENTS {
        return Err(CoreError::InvalidModelOutput(format!(
            "decomposition has {} usable ingredients, need at least {}",
            merged.len(),
            MIN_COMPOSITE_INGREDIENTS
        )));
    }

    let sum: f64 = merged.iter().map(|(_, p)| p).sum();
    if sum <= 0.0 {
        return Err(CoreError::InvalidModelOutput(
            "decomposition percentages do not add up to a positive total".into(),
        ));
    }

    let percents = apportion(&merged.iter().map(|(_, p)| p * 100.0 / sum).collect::<Vec<_>>());

    Ok(merged
        .into_iter()
        .zip(percents)
        .map(|((name, _), percent)| CompositeIngredient::new(name, percent))
        .collect())
}

/// Largest-remainder rounding of shares that add up to 100.
fn apportion(shares: &[f64]) -> Vec<u32> {
    let mut rounded: Vec<u32> = shares.iter().map(|s| s.floor() as u32).collect();
    let assigned: u32 = rounded.iter().sum();

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = shares[a] - shares[a].floor();
        let fb = shares[b] - shares[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    for &index in order.iter().take(100u32.saturating_sub(assigned) as usize) {
        rounded[index] += 1;
    }

    // every ingredient keeps at least 1%, taken from the largest share
    while let Some(zero) = rounded.iter().position(|&p| p == 0) {
        let Some((largest, _)) = rounded.iter().enumerate().max_by_key(|(_, p)| **p) else {
            break;
        };
        if rounded[largest] <= 1 {
            break;
        }
        rounded[largest] -= 1;
        rounded[zero] += 1;
    }

    rounded
}

/// Weighted composite of ingredient records on a 100 g basis: each nutrient
/// is `sum(per_gram * percent)`, rescaled when only part of the recipe
/// resolved.
pub fn synthesize_composite(
    dish_name: &str,
    parts: &[(CompositeIngredient, NutritionRecord)],
) -> NutritionRecord {
    let mut composite =
        NutritionRecord::empty(dish_name, NutritionSource::Composite, ServingInfo::per_100g());

    let resolved_percent: f64 = parts
        .iter()
        .map(|(ingredient, _)| f64::from(ingredient.percent_by_weight))
        .sum();
    if resolved_percent <= 0.0 {
        return composite.with_health_impact();
    }
    let scale = 100.0 / resolved_percent;

    for (ingredient, record) in parts {
        let grams = if record.serving.weight_grams > 0.0 {
            record.serving.weight_grams
        } else {
            100.0
        };
        let percent = f64::from(ingredient.percent_by_weight);
        let values = record.nutrients();
        for (slot, value) in composite.nutrients_mut().into_iter().zip(values) {
            *slot += value / grams * percent * scale;
        }
    }

    composite.sanitized().with_health_impact()
}
