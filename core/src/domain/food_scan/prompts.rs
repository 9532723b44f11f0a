use crate::domain::food_scan::entities::{ConceptObservation, NutritionRecord};

pub fn dish_synthesis_prompt(concepts: &[ConceptObservation]) -> String {
    let ranked = concepts
        .iter()
        .enumerate()
        .map(|(index, concept)| {
            format!(
                "{}. {} ({:.0}% confidence)",
                index + 1,
                concept.name,
                concept.confidence * 100.0
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "An image recognition model detected these items in a food photo, ranked by confidence:\n\
         {ranked}\n\n\
         Name the single dish or food product shown.\n\
         Rules:\n\
         - Answer with exactly one dish name of at most 6 words.\n\
         - No punctuation, no quotes, no explanation.\n\
         - Prefer a specific dish over a generic category (\"Chicken Burrito\", not \"Mexican Food\").\n\
         - Include the brand when the items suggest a packaged product."
    )
}

pub fn vision_identification_prompt() -> String {
    "Identify the food or drink in this photo as specifically as possible.\n\
     Work through these stages before answering:\n\
     1. Packaging: read any visible brand, product name or label text.\n\
     2. Preparation: note whether the food is raw, cooked, fried, baked, frozen or still sealed.\n\
     3. Composition: list the visible components and how they are assembled.\n\
     4. Obscured items: if the food is frozen, wrapped or partly hidden, infer it from shape, \
     packaging and context rather than guessing a generic category.\n\
     Then answer with exactly one name of at most 6 words, including the brand when visible. \
     No punctuation, no quotes, no explanation."
        .to_string()
}

pub fn composite_prompt(dish_name: &str) -> String {
    format!(
        "Break the dish \"{dish_name}\" into its main ingredients by weight.\n\
         Return JSON of the form {{\"ingredients\": [{{\"name\": \"...\", \"percent\": 40}}]}}.\n\
         Rules:\n\
         - Between 2 and 6 ingredients.\n\
         - Use plain ingredient names a nutrition database would recognise (\"ground beef\", \"olive oil\").\n\
         - Percentages are whole numbers and must add up to exactly 100."
    )
}

pub fn analysis_prompt(dish_name: &str, record: &NutritionRecord) -> String {
    format!(
        "You are a nutrition assistant. Write a short summary of \"{dish_name}\" using ONLY these \
         per-serving values ({serving:.0} {unit}):\n\
         - Calories: {calories:.0} kcal\n\
         - Protein: {protein:.1} g\n\
         - Total fat: {fat:.1} g (saturated {sat:.1} g)\n\
         - Carbohydrate: {carbs:.1} g (sugars {sugars:.1} g, fiber {fiber:.1} g)\n\
         - Sodium: {sodium:.0} mg\n\n\
         Return JSON with keys \"description\" (2-3 sentences), \"healthScore\" (integer 1-100) \
         and \"suggestions\" (2-4 short strings). Do not state numbers that differ from the values \
         above and do not claim vitamins, minerals or antioxidants that are not listed.",
        serving = record.serving.quantity,
        unit = record.serving.unit,
        calories = record.calories,
        protein = record.protein,
        fat = record.total_fat,
        sat = record.saturated_fat,
        carbs = record.total_carbohydrate,
        sugars = record.sugars,
        fiber = record.dietary_fiber,
        sodium = record.sodium,
    )
}

pub fn reformat_prompt(previous_output: &str) -> String {
    format!(
        "The following text was supposed to be a JSON object but does not match the required \
         shape:\n\n{previous_output}\n\n\
         Rewrite it as a single JSON object with exactly these keys: \
         \"description\" (non-empty string), \"healthScore\" (integer 1-100), \
         \"suggestions\" (array of strings). Return only the JSON object."
    )
}
