use crate::domain::food_scan::entities::ConceptObservation;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub ingredients: &'static [&'static str],
}

/// Scoring constants for the catalog fallback. Empirical, not derived.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicWeights {
    pub exact_match: f64,
    pub substring_match: f64,
    pub multi_match_bonus: f64,
    pub min_substring_len: usize,
    pub accept_threshold: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            exact_match: 10.0,
            substring_match: 5.0,
            multi_match_bonus: 3.0,
            min_substring_len: 4,
            accept_threshold: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMatch {
    pub entry: &'static CatalogEntry,
    pub score: f64,
    pub matched_concepts: usize,
}

pub static FOOD_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "Spaghetti Bolognese",
        keywords: &["spaghetti", "pasta", "bolognese", "meat", "sauce", "meat sauce", "ground beef"],
        ingredients: &["spaghetti", "ground beef", "tomato sauce", "parmesan cheese"],
    },
    CatalogEntry {
        name: "Macaroni and Cheese",
        keywords: &["macaroni", "mac and cheese", "pasta", "cheese"],
        ingredients: &["macaroni", "cheddar cheese", "milk", "butter"],
    },
    CatalogEntry {
        name: "Margherita Pizza",
        keywords: &["pizza", "mozzarella", "basil", "crust", "pepperoni"],
        ingredients: &["pizza crust", "mozzarella cheese", "tomato sauce", "basil"],
    },
    CatalogEntry {
        name: "Hamburger",
        keywords: &["burger", "hamburger", "cheeseburger", "bun", "patty", "beef"],
        ingredients: &["hamburger bun", "ground beef", "lettuce", "tomato", "cheese"],
    },
    CatalogEntry {
        name: "Caesar Salad",
        keywords: &["salad", "caesar", "romaine", "lettuce", "crouton", "parmesan"],
        ingredients: &["romaine lettuce", "croutons", "parmesan cheese", "caesar dressing"],
    },
    CatalogEntry {
        name: "Chicken Burrito",
        keywords: &["burrito", "tortilla", "rice", "beans", "salsa", "guacamole"],
        ingredients: &["flour tortilla", "chicken", "rice", "black beans", "salsa"],
    },
    CatalogEntry {
        name: "Beef Tacos",
        keywords: &["taco", "tacos", "tortilla", "salsa", "ground beef"],
        ingredients: &["corn tortilla", "ground beef", "lettuce", "salsa", "cheese"],
    },
    CatalogEntry {
        name: "Sushi Roll",
        keywords: &["sushi", "maki", "nori", "seaweed", "sashimi", "salmon"],
        ingredients: &["sushi rice", "nori", "salmon", "cucumber"],
    },
    CatalogEntry {
        name: "Pad Thai",
        keywords: &["pad thai", "noodle", "rice noodles", "peanut", "bean sprouts", "shrimp"],
        ingredients: &["rice noodles", "shrimp", "egg", "peanuts", "bean sprouts"],
    },
    CatalogEntry {
        name: "Fried Rice",
        keywords: &["fried rice", "rice", "peas", "soy sauce", "egg"],
        ingredients: &["white rice", "egg", "peas", "carrots", "soy sauce"],
    },
    CatalogEntry {
        name: "Ramen",
        keywords: &["ramen", "noodle", "broth", "soup", "pork"],
        ingredients: &["ramen noodles", "pork broth", "egg", "green onion"],
    },
    CatalogEntry {
        name: "Chicken Curry",
        keywords: &["curry", "chicken", "masala", "naan"],
        ingredients: &["chicken", "curry sauce", "white rice", "onion"],
    },
    CatalogEntry {
        name: "Grilled Salmon",
        keywords: &["salmon", "fish", "fillet", "seafood"],
        ingredients: &["salmon", "olive oil", "lemon"],
    },
    CatalogEntry {
        name: "Steak and Potatoes",
        keywords: &["steak", "beef", "potato", "sirloin"],
        ingredients: &["beef steak", "baked potato", "butter"],
    },
    CatalogEntry {
        name: "French Fries",
        keywords: &["fries", "french fries", "chips", "potato"],
        ingredients: &["potato", "vegetable oil", "salt"],
    },
    CatalogEntry {
        name: "Pancakes",
        keywords: &["pancake", "pancakes", "syrup", "breakfast", "waffle"],
        ingredients: &["pancakes", "maple syrup", "butter"],
    },
    CatalogEntry {
        name: "Scrambled Eggs",
        keywords: &["egg", "eggs", "scrambled eggs", "omelette", "breakfast"],
        ingredients: &["eggs", "butter", "milk"],
    },
    CatalogEntry {
        name: "Oatmeal",
        keywords: &["oatmeal", "oats", "porridge", "cereal"],
        ingredients: &["rolled oats", "milk", "blueberries"],
    },
    CatalogEntry {
        name: "Greek Yogurt",
        keywords: &["yogurt", "yoghurt", "granola", "berries"],
        ingredients: &["greek yogurt", "granola", "strawberries"],
    },
    CatalogEntry {
        name: "Fruit Salad",
        keywords: &["fruit", "apple", "banana", "grape", "melon", "berries", "strawberry"],
        ingredients: &["apple", "banana", "grapes", "strawberries"],
    },
    CatalogEntry {
        name: "Chocolate Cake",
        keywords: &["cake", "chocolate", "dessert", "frosting", "pastry"],
        ingredients: &["chocolate cake"],
    },
    CatalogEntry {
        name: "Coca-Cola",
        keywords: &["cola", "soda", "soft drink", "beverage", "can", "drink"],
        ingredients: &["cola"],
    },
];

/// Scores every catalog entry against the concepts and returns the best one
/// that clears the acceptance threshold.
pub fn best_catalog_match(
    concepts: &[ConceptObservation],
    weights: &HeuristicWeights,
) -> Option<CatalogMatch> {
    let concepts: Vec<(String, f64)> = concepts
        .iter()
        .map(|c| (c.name.trim().to_lowercase(), c.confidence))
        .collect();

    FOOD_CATALOG
        .iter()
        .map(|entry| score_entry(entry, &concepts, weights))
        .filter(|candidate| candidate.score >= weights.accept_threshold)
        .fold(None, |best: Option<CatalogMatch>, candidate| match best {
            Some(best) if best.score >= candidate.score => Some(best),
            _ => Some(candidate),
        })
}

fn score_entry(
    entry: &'static CatalogEntry,
    concepts: &[(String, f64)],
    weights: &HeuristicWeights,
) -> CatalogMatch {
    let mut score = 0.0;
    let mut matched_concepts = 0;

    for (name, confidence) in concepts {
        if entry.keywords.iter().any(|keyword| keyword == name) {
            score += weights.exact_match * confidence;
            matched_concepts += 1;
        } else if name.chars().count() >= weights.min_substring_len
            && entry
                .keywords
                .iter()
                .any(|keyword| keyword.contains(name.as_str()) || name.contains(keyword))
        {
            score += weights.substring_match * confidence;
            matched_concepts += 1;
        }
    }

    if matched_concepts > 1 {
        score += weights.multi_match_bonus * matched_concepts as f64;
    }

    CatalogMatch {
        entry,
        score,
        matched_concepts,
    }
}
