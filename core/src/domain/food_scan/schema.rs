use serde_json::json;

/// Returns the JSON schema for the nutrition analysis LLM response
pub fn get_ai_analysis_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "description": { "type": "string" },
            "healthScore": { "type": "integer", "minimum": 1, "maximum": 100 },
            "suggestions": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["description", "healthScore", "suggestions"]
    })
}

/// Returns the JSON schema for the recipe decomposition LLM response
pub fn get_composite_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "ingredients": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "percent": { "type": "integer", "minimum": 1, "maximum": 100 }
                    },
                    "required": ["name", "percent"]
                }
            }
        },
        "required": ["ingredients"]
    })
}
