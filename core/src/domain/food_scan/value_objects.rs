use serde_json::Value;

use crate::domain::food_scan::catalog::HeuristicWeights;

#[derive(Debug, Clone)]
pub struct ScanFoodInput {
    pub image_data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct LookupNutritionInput {
    pub food_name: String,
}

/// Per-call generation settings passed to the LLM port.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub response_schema: Option<Value>,
}

impl GenerationOptions {
    pub fn short_answer() -> Self {
        Self {
            max_output_tokens: 32,
            temperature: 0.2,
            response_schema: None,
        }
    }

    pub fn structured(response_schema: Value, max_output_tokens: u32) -> Self {
        Self {
            max_output_tokens,
            temperature: 0.3,
            response_schema: Some(response_schema),
        }
    }
}

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub min_concept_confidence: f64,
    pub max_concepts: usize,
    pub min_composite_matches: usize,
    pub composite_attempts: u32,
    pub heuristic_weights: HeuristicWeights,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            min_concept_confidence: 0.5,
            max_concepts: 7,
            min_composite_matches: 2,
            composite_attempts: 2,
            heuristic_weights: HeuristicWeights::default(),
        }
    }
}

/// Image container recognised from its leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match data {
            [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageFormat::Png),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
                Some(ImageFormat::Webp)
            }
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_image_format() {
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(
            ImageFormat::sniff(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageFormat::Webp));
        assert_eq!(ImageFormat::sniff(b"GIF89a"), None);
        assert_eq!(ImageFormat::sniff(&[]), None);
    }
}
