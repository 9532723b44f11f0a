//! Turning free-form LLM text into a well-typed [`AIAnalysis`].
//!
//! The strict path is [`parse_ai_analysis`]: locate the first JSON object,
//! deserialize it and validate it. When the model ignores the contract the
//! engine asks it to reformat once, and only then falls back to
//! [`coerce_ai_analysis`], which understands a fixed set of response shapes
//! and finally performs a bounded deep search for usable text.

use serde_json::Value;
use thiserror::Error;

use crate::domain::food_scan::entities::AIAnalysis;

const DEFAULT_HEALTH_SCORE: u8 = 50;
const MAX_SEARCH_DEPTH: usize = 4;
const MIN_PLAUSIBLE_CHARS: usize = 20;

const DESCRIPTION_ALIASES: &[&str] = &["summary", "analysis", "message", "text", "content"];
const SCORE_KEYS: &[&str] = &["healthScore", "health_score", "score", "rating"];
const SUGGESTION_KEYS: &[&str] = &["suggestions", "tips", "advice", "recommendations"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisShapeError {
    #[error("no JSON object found in model output")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("model output is not a JSON object")]
    NotAnObject,

    #[error("description is missing or empty")]
    MissingDescription,

    #[error("healthScore is missing or not a number")]
    InvalidHealthScore,

    #[error("suggestions is missing or not an array of strings")]
    MissingSuggestions,
}

/// Returns the first balanced `{...}` span in `text`.
///
/// Braces inside JSON strings are counted like any other brace.
pub fn extract_first_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;

    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Validates a parsed value against the `AIAnalysis` contract, clamping the
/// health score into 1..=100.
pub fn validate_ai_analysis(value: &Value) -> Result<AIAnalysis, AnalysisShapeError> {
    let object = value.as_object().ok_or(AnalysisShapeError::NotAnObject)?;

    let description = object
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(AnalysisShapeError::MissingDescription)?;

    let health_score = object
        .get("healthScore")
        .or_else(|| object.get("health_score"))
        .and_then(Value::as_f64)
        .ok_or(AnalysisShapeError::InvalidHealthScore)?;

    let suggestions = object
        .get("suggestions")
        .and_then(Value::as_array)
        .ok_or(AnalysisShapeError::MissingSuggestions)?
        .iter()
        .map(|s| s.as_str().map(|s| s.trim().to_string()))
        .collect::<Option<Vec<String>>>()
        .ok_or(AnalysisShapeError::MissingSuggestions)?;

    Ok(AIAnalysis {
        description: description.to_string(),
        health_score: clamp_score(health_score),
        suggestions,
    })
}

pub fn parse_ai_analysis(text: &str) -> Result<AIAnalysis, AnalysisShapeError> {
    let json = extract_first_json(text).ok_or(AnalysisShapeError::NoJson)?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| AnalysisShapeError::InvalidJson(e.to_string()))?;
    validate_ai_analysis(&value)
}

/// Known shapes an LLM answer arrives in.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponseShape {
    /// Object carrying our own `description` key.
    Analysis(Value),
    /// Text nested inside a provider envelope (`candidates/content/parts`,
    /// bare `content`/`parts`, or chat-completion `choices`).
    ProviderEnvelope(String),
    /// Some other JSON value.
    Structured(Value),
    /// Not JSON at all.
    Unstructured(String),
}

pub fn classify_response(raw: &str) -> LlmResponseShape {
    let value = extract_first_json(raw).and_then(|json| serde_json::from_str::<Value>(json).ok());

    let Some(value) = value else {
        return LlmResponseShape::Unstructured(raw.trim().to_string());
    };

    if value.get("description").is_some() {
        return LlmResponseShape::Analysis(value);
    }

    match envelope_text(&value) {
        Some(text) => LlmResponseShape::ProviderEnvelope(text),
        None => LlmResponseShape::Structured(value),
    }
}

/// Best-effort last resort. Always yields a typed value or `None`.
pub fn coerce_ai_analysis(raw: &str) -> Option<AIAnalysis> {
    coerce_shape(classify_response(raw), true)
}

fn coerce_shape(shape: LlmResponseShape, allow_envelope: bool) -> Option<AIAnalysis> {
    match shape {
        LlmResponseShape::ProviderEnvelope(inner) if allow_envelope => parse_ai_analysis(&inner)
            .ok()
            .or_else(|| coerce_shape(classify_response(&inner), false)),
        LlmResponseShape::ProviderEnvelope(inner) | LlmResponseShape::Unstructured(inner) => {
            let text = inner.trim();
            is_plausible_text(text).then(|| AIAnalysis {
                description: text.to_string(),
                health_score: DEFAULT_HEALTH_SCORE,
                suggestions: Vec::new(),
            })
        }
        LlmResponseShape::Analysis(value) | LlmResponseShape::Structured(value) => {
            if let Ok(analysis) = validate_ai_analysis(&value) {
                return Some(analysis);
            }
            coerce_value(&value)
        }
    }
}

fn coerce_value(value: &Value) -> Option<AIAnalysis> {
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .or_else(|| deep_search_text(value, 0))
        .or_else(|| {
            DESCRIPTION_ALIASES.iter().find_map(|key| {
                value
                    .get(*key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
            })
        })?;

    let health_score = SCORE_KEYS
        .iter()
        .find_map(|key| value.get(*key).and_then(score_from_value))
        .unwrap_or(DEFAULT_HEALTH_SCORE);

    let suggestions = SUGGESTION_KEYS
        .iter()
        .find_map(|key| value.get(*key).and_then(strings_from_value))
        .unwrap_or_default();

    Some(AIAnalysis {
        description,
        health_score,
        suggestions,
    })
}

fn envelope_text(value: &Value) -> Option<String> {
    let candidates = [
        value.pointer("/candidates/0/content/parts"),
        value.pointer("/content/parts"),
        value.get("parts"),
    ];
    if let Some(parts) = candidates.into_iter().flatten().find_map(Value::as_array) {
        let text = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("");
        if !text.trim().is_empty() {
            return Some(text);
        }
    }

    value
        .pointer("/choices/0/message/content")
        .or_else(|| value.get("content"))
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Depth-first search for the first natural-language string, at most
/// `MAX_SEARCH_DEPTH` levels down.
fn deep_search_text(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }

    match value {
        Value::String(text) if is_plausible_text(text.trim()) => Some(text.trim().to_string()),
        Value::Array(items) => items
            .iter()
            .find_map(|item| deep_search_text(item, depth + 1)),
        Value::Object(map) => map
            .values()
            .find_map(|item| deep_search_text(item, depth + 1)),
        _ => None,
    }
}

fn is_plausible_text(text: &str) -> bool {
    text.chars().count() >= MIN_PLAUSIBLE_CHARS
        && text.chars().any(char::is_whitespace)
        && text.chars().any(char::is_alphabetic)
        && !text.starts_with('{')
        && !text.starts_with('[')
}

fn score_from_value(value: &Value) -> Option<u8> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if !score.is_finite() {
        return None;
    }
    let score = if score <= 1.0 { score * 100.0 } else { score };
    Some(clamp_score(score))
}

fn strings_from_value(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        Value::String(text) if !text.trim().is_empty() => Some(vec![text.trim().to_string()]),
        _ => None,
    }
}

fn clamp_score(score: f64) -> u8 {
    score.round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extract_first_json_from_code_fence() {
        let text = "prefix ```json {\"description\":\"ok\",\"healthScore\":90,\"suggestions\":[\"s1\"]} ``` suffix";
        let analysis = parse_ai_analysis(text).unwrap();
        assert_eq!(analysis.description, "ok");
        assert_eq!(analysis.health_score, 90);
        assert_eq!(analysis.suggestions, vec!["s1".to_string()]);
    }

    #[test]
    fn test_extract_first_json_handles_nesting_and_partial_text() {
        assert_eq!(
            extract_first_json("a {\"x\": {\"y\": 1}} b {\"z\": 2}"),
            Some("{\"x\": {\"y\": 1}}")
        );
        assert_eq!(extract_first_json("no braces here"), None);
        assert_eq!(extract_first_json("{\"truncated\": {\"a\": 1}"), None);
    }

    #[test]
    fn test_validate_clamps_health_score() {
        let high = json!({"description": "d", "healthScore": 150, "suggestions": []});
        assert_eq!(validate_ai_analysis(&high).unwrap().health_score, 100);

        let low = json!({"description": "d", "healthScore": -4, "suggestions": []});
        assert_eq!(validate_ai_analysis(&low).unwrap().health_score, 1);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let no_description = json!({"healthScore": 50, "suggestions": []});
        assert_eq!(
            validate_ai_analysis(&no_description),
            Err(AnalysisShapeError::MissingDescription)
        );

        let no_suggestions = json!({"description": "d", "healthScore": 50});
        assert_eq!(
            validate_ai_analysis(&no_suggestions),
            Err(AnalysisShapeError::MissingSuggestions)
        );

        let bad_score = json!({"description": "d", "healthScore": "high", "suggestions": []});
        assert_eq!(
            validate_ai_analysis(&bad_score),
            Err(AnalysisShapeError::InvalidHealthScore)
        );
    }

    #[test]
    fn test_classify_known_shapes() {
        assert!(matches!(
            classify_response("{\"description\": \"x\"}"),
            LlmResponseShape::Analysis(_)
        ));
        assert_eq!(
            classify_response(
                "{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"hello\"}]}}]}"
            ),
            LlmResponseShape::ProviderEnvelope("hello".to_string())
        );
        assert!(matches!(
            classify_response("{\"foo\": 1}"),
            LlmResponseShape::Structured(_)
        ));
        assert!(matches!(
            classify_response("just words"),
            LlmResponseShape::Unstructured(_)
        ));
    }

    #[test]
    fn test_coerce_unwraps_provider_envelope() {
        let inner = "{\\\"description\\\":\\\"Grilled chicken is lean\\\",\\\"healthScore\\\":80,\\\"suggestions\\\":[\\\"add greens\\\"]}";
        let raw = format!("{{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{inner}\"}}]}}}}]}}");
        let analysis = coerce_ai_analysis(&raw).unwrap();
        assert_eq!(analysis.description, "Grilled chicken is lean");
        assert_eq!(analysis.health_score, 80);
    }

    #[test]
    fn test_coerce_deep_searches_nested_text() {
        let raw = r#"{"result": {"items": [{"note": "This bowl of ramen is rich in sodium and refined carbs."}]}}"#;
        let analysis = coerce_ai_analysis(raw).unwrap();
        assert_eq!(
            analysis.description,
            "This bowl of ramen is rich in sodium and refined carbs."
        );
        assert_eq!(analysis.health_score, 50);
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn test_coerce_uses_key_aliases() {
        let raw = r#"{"summary": "Light salad", "rating": 0.72, "tips": ["Add protein"]}"#;
        let analysis = coerce_ai_analysis(raw).unwrap();
        assert_eq!(analysis.description, "Light salad");
        assert_eq!(analysis.health_score, 72);
        assert_eq!(analysis.suggestions, vec!["Add protein".to_string()]);
    }

    #[test]
    fn test_coerce_accepts_plain_prose_and_rejects_noise() {
        let prose = coerce_ai_analysis("A balanced plate with lean protein and vegetables.").unwrap();
        assert_eq!(prose.health_score, 50);

        assert_eq!(coerce_ai_analysis("???"), None);
        assert_eq!(coerce_ai_analysis("{\"score\": 3}"), None);
    }
}
