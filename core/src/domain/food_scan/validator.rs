//! Cross-checks an LLM-written [`AIAnalysis`] against the nutrition record it
//! was generated from.
//!
//! Calorie claims outside tolerance are rewritten in the description. Every
//! other finding (macro deviations, out-of-band health scores, omissions,
//! contradictory suggestions, unverifiable health-halo phrases) is logged and
//! returned in the [`ValidationReport`] without touching the analysis.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

use crate::domain::food_scan::entities::{AIAnalysis, NutritionRecord};

/// A claimed amount: either comma-grouped thousands ("1,200") or a plain
/// number, captured as `value`. The leading guard keeps a match from starting
/// in the middle of a grouped or decimal number.
const CLAIMED_NUMBER: &str =
    r"(?:^|[^\d.,])\b(?P<value>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)";

fn claim_pattern(unit: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i){CLAIMED_NUMBER}\s*{unit}")).ok()
}

static CALORIE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| claim_pattern(r"(?:kcal|calories|cal)\b"));

static PROTEIN_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| claim_pattern(r"(?:g|grams?)\s+(?:of\s+)?protein\b"));

static FAT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| claim_pattern(r"(?:g|grams?)\s+(?:of\s+)?(?:total\s+)?fat\b"));

static SUGAR_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| claim_pattern(r"(?:g|grams?)\s+(?:of\s+)?sugars?\b"));

const HEALTH_HALO_PHRASES: &[&str] = &[
    "rich in vitamins",
    "good source of minerals",
    "contains antioxidants",
    "heart-healthy",
    "heart healthy",
    "immune-boosting",
    "immune boosting",
    "anti-inflammatory",
];

const SUGAR_ABSOLUTE_TOLERANCE_G: f64 = 1.0;

/// How trustworthy the ground-truth record is. OCR-read labels get a tighter
/// tolerance than database lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFidelity {
    #[default]
    Standard,
    OcrVerified,
}

impl DataFidelity {
    pub fn tolerance(self) -> f64 {
        match self {
            DataFidelity::Standard => 0.10,
            DataFidelity::OcrVerified => 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimedNutrient {
    Calories,
    Protein,
    Fat,
    Sugar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthBand {
    pub floor: u8,
    pub ceiling: u8,
}

impl HealthBand {
    pub fn contains(&self, score: u8) -> bool {
        (self.floor..=self.ceiling).contains(&score)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    NumericDeviation {
        nutrient: ClaimedNutrient,
        claimed: f64,
        expected: f64,
        corrected: bool,
    },
    ScoreOutOfBand {
        score: u8,
        band: HealthBand,
    },
    Omission {
        nutrient: &'static str,
        value: f64,
    },
    ScoreSuggestionConflict {
        score: u8,
        suggestion: String,
    },
    UnverifiableClaim {
        phrase: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub expected_band: HealthBand,
}

impl ValidationReport {
    pub fn calories_corrected(&self) -> bool {
        self.issues.iter().any(|issue| {
            matches!(
                issue,
                ValidationIssue::NumericDeviation {
                    nutrient: ClaimedNutrient::Calories,
                    corrected: true,
                    ..
                }
            )
        })
    }
}

/// Runs every plausibility check. Only calorie claims are corrected in place.
pub fn validate_analysis(
    analysis: &mut AIAnalysis,
    truth: &NutritionRecord,
    fidelity: DataFidelity,
) -> ValidationReport {
    let tolerance = fidelity.tolerance();
    let mut issues = Vec::new();

    let (description, calorie_issues) =
        correct_calorie_claims(&analysis.description, truth.calories, tolerance);
    analysis.description = description;
    issues.extend(calorie_issues);

    let macro_checks = [
        (ClaimedNutrient::Protein, &PROTEIN_PATTERN, truth.protein, 0.0),
        (ClaimedNutrient::Fat, &FAT_PATTERN, truth.total_fat, 0.0),
        (
            ClaimedNutrient::Sugar,
            &SUGAR_PATTERN,
            truth.sugars,
            SUGAR_ABSOLUTE_TOLERANCE_G,
        ),
    ];
    for (nutrient, pattern, expected, floor) in macro_checks {
        let Some(pattern) = pattern.as_ref() else {
            continue;
        };
        for claimed in claimed_values(pattern, &analysis.description) {
            if deviates(claimed, expected, tolerance, floor) {
                issues.push(ValidationIssue::NumericDeviation {
                    nutrient,
                    claimed,
                    expected,
                    corrected: false,
                });
            }
        }
    }

    let expected_band = expected_health_band(truth);
    if !expected_band.contains(analysis.health_score) {
        issues.push(ValidationIssue::ScoreOutOfBand {
            score: analysis.health_score,
            band: expected_band,
        });
    }

    issues.extend(omissions(&analysis.description, truth));

    if analysis.health_score > 70 {
        for suggestion in &analysis.suggestions {
            let lowered = suggestion.to_lowercase();
            if lowered.contains("limit") || lowered.contains("reduce") {
                issues.push(ValidationIssue::ScoreSuggestionConflict {
                    score: analysis.health_score,
                    suggestion: suggestion.clone(),
                });
            }
        }
    }

    let corpus = std::iter::once(analysis.description.as_str())
        .chain(analysis.suggestions.iter().map(String::as_str))
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("\n");
    for phrase in HEALTH_HALO_PHRASES {
        if corpus.contains(phrase) {
            issues.push(ValidationIssue::UnverifiableClaim { phrase });
        }
    }

    for issue in &issues {
        warn!(dish = %truth.food_name, ?issue, "analysis plausibility issue");
    }

    ValidationReport {
        issues,
        expected_band,
    }
}

/// Expected health-score band for a record. Later rules override earlier
/// ones, and a ceiling always wins over a conflicting floor.
pub fn expected_health_band(record: &NutritionRecord) -> HealthBand {
    let mut floor = 40u8;
    let mut ceiling = 70u8;

    if record.calories < 200.0
        && record.total_fat < 10.0
        && record.sugars < 10.0
        && record.dietary_fiber > 3.0
    {
        floor = 60;
    }
    if record.calories < 150.0 && record.protein > 10.0 && record.total_fat < 5.0 {
        floor = 70;
    }
    if record.calories > 500.0
        || record.total_fat > 30.0
        || record.sugars > 20.0
        || record.sodium > 800.0
    {
        ceiling = 55;
    }
    if record.calories > 700.0
        || record.total_fat > 40.0
        || record.sugars > 30.0
        || record.sodium > 1200.0
    {
        ceiling = 45;
    }

    HealthBand {
        floor: floor.min(ceiling),
        ceiling,
    }
}

fn correct_calorie_claims(
    description: &str,
    expected: f64,
    tolerance: f64,
) -> (String, Vec<ValidationIssue>) {
    let Some(pattern) = CALORIE_PATTERN.as_ref() else {
        return (description.to_string(), Vec::new());
    };

    let mut issues = Vec::new();
    let corrected = pattern.replace_all(description, |caps: &Captures| {
        let whole = &caps[0];
        let (Some(matched), Some(value)) = (caps.get(0), caps.name("value")) else {
            return whole.to_string();
        };
        let Some(claimed) = parse_claimed(value.as_str()) else {
            return whole.to_string();
        };
        if !deviates(claimed, expected, tolerance, 0.0) {
            return whole.to_string();
        }
        issues.push(ValidationIssue::NumericDeviation {
            nutrient: ClaimedNutrient::Calories,
            claimed,
            expected,
            corrected: true,
        });
        let start = value.start() - matched.start();
        let end = value.end() - matched.start();
        format!(
            "{}{:.0}{}",
            &whole[..start],
            expected.round(),
            &whole[end..]
        )
    });

    (corrected.into_owned(), issues)
}

fn claimed_values(pattern: &Regex, text: &str) -> Vec<f64> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| parse_claimed(caps.name("value")?.as_str()))
        .collect()
}

fn parse_claimed(number: &str) -> Option<f64> {
    number.replace(',', "").parse().ok()
}

fn deviates(claimed: f64, expected: f64, tolerance: f64, absolute_floor: f64) -> bool {
    let allowed = (expected * tolerance).max(absolute_floor);
    (claimed - expected).abs() > allowed
}

fn omissions(description: &str, truth: &NutritionRecord) -> Vec<ValidationIssue> {
    let lowered = description.to_lowercase();
    let checks: [(&'static str, f64, f64, &[&str]); 4] = [
        ("protein", truth.protein, 20.0, &["protein"]),
        ("sugar", truth.sugars, 20.0, &["sugar"]),
        ("fat", truth.total_fat, 30.0, &["fat"]),
        ("sodium", truth.sodium, 1000.0, &["sodium", "salt"]),
    ];

    checks
        .into_iter()
        .filter(|(_, value, threshold, words)| {
            value > threshold && !words.iter().any(|word| lowered.contains(word))
        })
        .map(|(nutrient, value, _, _)| ValidationIssue::Omission { nutrient, value })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::food_scan::entities::{NutritionSource, ServingInfo};

    fn record(calories: f64, protein: f64, fat: f64, sugars: f64) -> NutritionRecord {
        let mut record =
            NutritionRecord::empty("test dish", NutritionSource::Usda, ServingInfo::per_100g());
        record.calories = calories;
        record.protein = protein;
        record.total_fat = fat;
        record.sugars = sugars;
        record
    }

    fn analysis(description: &str, score: u8, suggestions: &[&str]) -> AIAnalysis {
        AIAnalysis {
            description: description.to_string(),
            health_score: score,
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_calorie_claim_is_rewritten() {
        let mut ai = analysis("This dish has approximately 400 calories per serving.", 55, &[]);
        let report = validate_analysis(&mut ai, &record(245.0, 5.0, 5.0, 2.0), DataFidelity::Standard);

        assert_eq!(ai.description, "This dish has approximately 245 calories per serving.");
        assert!(report.calories_corrected());
    }

    #[test]
    fn test_calorie_claim_within_tolerance_is_kept() {
        let mut ai = analysis("Around 260 kcal in total.", 55, &[]);
        let report = validate_analysis(&mut ai, &record(245.0, 5.0, 5.0, 2.0), DataFidelity::Standard);

        assert_eq!(ai.description, "Around 260 kcal in total.");
        assert!(!report.calories_corrected());
    }

    #[test]
    fn test_grouped_calorie_claim_is_rewritten_whole() {
        let mut ai = analysis("About 1,200 calories per plate.", 55, &[]);
        let report = validate_analysis(&mut ai, &record(245.0, 5.0, 5.0, 2.0), DataFidelity::Standard);

        assert_eq!(ai.description, "About 245 calories per plate.");
        assert!(report.issues.contains(&ValidationIssue::NumericDeviation {
            nutrient: ClaimedNutrient::Calories,
            claimed: 1200.0,
            expected: 245.0,
            corrected: true,
        }));
    }

    #[test]
    fn test_grouped_calorie_claim_within_tolerance_is_kept() {
        let mut ai = analysis("Roughly 1,050 kcal for the whole tray.", 55, &[]);
        let report = validate_analysis(&mut ai, &record(1000.0, 40.0, 45.0, 10.0), DataFidelity::Standard);

        assert_eq!(ai.description, "Roughly 1,050 kcal for the whole tray.");
        assert!(!report.calories_corrected());
    }

    #[test]
    fn test_malformed_grouping_is_not_read_as_a_claim() {
        let description = "Serves 12,34 calories worth of confusion.";
        let mut ai = analysis(description, 55, &[]);
        let report = validate_analysis(&mut ai, &record(245.0, 5.0, 5.0, 2.0), DataFidelity::Standard);

        assert_eq!(ai.description, description);
        assert!(!report.calories_corrected());
    }

    #[test]
    fn test_ocr_fidelity_tightens_tolerance() {
        let truth = record(245.0, 5.0, 5.0, 2.0);
        let mut standard = analysis("About 262 calories.", 55, &[]);
        let mut strict = standard.clone();

        validate_analysis(&mut standard, &truth, DataFidelity::Standard);
        validate_analysis(&mut strict, &truth, DataFidelity::OcrVerified);

        assert_eq!(standard.description, "About 262 calories.");
        assert_eq!(strict.description, "About 245 calories.");
    }

    #[test]
    fn test_macro_deviations_are_flagged_not_rewritten() {
        let description = "Packs 40g of protein and 3 g sugar with 30 grams fat.";
        let mut ai = analysis(description, 55, &[]);
        let report = validate_analysis(&mut ai, &record(300.0, 20.0, 12.0, 2.5), DataFidelity::Standard);

        assert_eq!(ai.description, description);
        let flagged: Vec<_> = report
            .issues
            .iter()
            .filter_map(|issue| match issue {
                ValidationIssue::NumericDeviation { nutrient, corrected, .. } => {
                    Some((*nutrient, *corrected))
                }
                _ => None,
            })
            .collect();
        // sugar 3 vs 2.5 stays inside the 1 g floor
        assert_eq!(
            flagged,
            vec![
                (ClaimedNutrient::Protein, false),
                (ClaimedNutrient::Fat, false)
            ]
        );
    }

    #[test]
    fn test_health_band_rules() {
        let mut lean = record(120.0, 15.0, 2.0, 1.0);
        lean.dietary_fiber = 4.0;
        assert_eq!(expected_health_band(&lean), HealthBand { floor: 70, ceiling: 70 });

        let heavy = record(800.0, 30.0, 45.0, 10.0);
        assert_eq!(expected_health_band(&heavy), HealthBand { floor: 40, ceiling: 45 });

        let mut salty = record(300.0, 10.0, 10.0, 5.0);
        salty.sodium = 900.0;
        assert_eq!(expected_health_band(&salty), HealthBand { floor: 40, ceiling: 55 });

        assert_eq!(
            expected_health_band(&record(300.0, 10.0, 10.0, 5.0)),
            HealthBand { floor: 40, ceiling: 70 }
        );
    }

    #[test]
    fn test_out_of_band_score_is_recorded_not_clamped() {
        let mut ai = analysis("A large plate of fried food with plenty of fat.", 90, &[]);
        let report = validate_analysis(&mut ai, &record(900.0, 20.0, 50.0, 5.0), DataFidelity::Standard);

        assert_eq!(ai.health_score, 90);
        assert!(report.issues.contains(&ValidationIssue::ScoreOutOfBand {
            score: 90,
            band: HealthBand { floor: 40, ceiling: 45 },
        }));
    }

    #[test]
    fn test_omissions_conflicts_and_halo_phrases() {
        let mut truth = record(450.0, 32.0, 12.0, 4.0);
        truth.sodium = 1400.0;
        let mut ai = analysis(
            "A hearty, heart-healthy bowl that is rich in vitamins.",
            80,
            &["Reduce the portion size", "Add greens"],
        );

        let report = validate_analysis(&mut ai, &truth, DataFidelity::Standard);

        assert!(report.issues.contains(&ValidationIssue::Omission {
            nutrient: "protein",
            value: 32.0
        }));
        assert!(report.issues.contains(&ValidationIssue::Omission {
            nutrient: "sodium",
            value: 1400.0
        }));
        assert!(report.issues.contains(&ValidationIssue::ScoreSuggestionConflict {
            score: 80,
            suggestion: "Reduce the portion size".to_string(),
        }));
        assert!(report
            .issues
            .contains(&ValidationIssue::UnverifiableClaim { phrase: "heart-healthy" }));
        assert!(report
            .issues
            .contains(&ValidationIssue::UnverifiableClaim { phrase: "rich in vitamins" }));
    }

    #[test]
    fn test_salt_counts_as_sodium_mention() {
        let mut truth = record(300.0, 10.0, 10.0, 5.0);
        truth.sodium = 1500.0;
        let mut ai = analysis("Tasty but high in salt.", 50, &[]);
        let report = validate_analysis(&mut ai, &truth, DataFidelity::Standard);
        assert!(!report
            .issues
            .iter()
            .any(|issue| matches!(issue, ValidationIssue::Omission { .. })));
    }
}
