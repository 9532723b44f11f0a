//! Deterministic dish-name cleanup.
//!
//! Two passes are applied to every candidate name: [`normalize_dish_name`]
//! maps noisy spellings onto canonical labels, then
//! [`apply_ingredient_heuristics`] renames dishes whose concept signals point
//! at a commonly mislabelled family (tortilla dishes read as sandwiches).
//! Both are pure functions of their inputs.

const SYNONYMS: &[(&str, &str)] = &[
    ("spag bol", "Spaghetti Bolognese"),
    ("spaghetti bolognaise", "Spaghetti Bolognese"),
    ("spaghetti with meat sauce", "Spaghetti Bolognese"),
    ("pasta bolognese", "Spaghetti Bolognese"),
    ("mac and cheese", "Macaroni and Cheese"),
    ("mac n cheese", "Macaroni and Cheese"),
    ("mac & cheese", "Macaroni and Cheese"),
    ("pb&j", "Peanut Butter and Jelly Sandwich"),
    ("pbj", "Peanut Butter and Jelly Sandwich"),
    ("peanut butter and jelly", "Peanut Butter and Jelly Sandwich"),
    ("coke", "Coca-Cola"),
    ("coca cola", "Coca-Cola"),
    ("coca-cola classic", "Coca-Cola"),
    ("fries", "French Fries"),
    ("french fry", "French Fries"),
    ("burger", "Hamburger"),
    ("slice of pizza", "Pizza"),
    ("pizza slice", "Pizza"),
    ("caesar", "Caesar Salad"),
    ("maki", "Sushi Roll"),
    ("pad thai noodles", "Pad Thai"),
    ("porridge", "Oatmeal"),
    ("oatmeal porridge", "Oatmeal"),
    ("scrambled egg", "Scrambled Eggs"),
    ("bbq ribs", "Barbecue Ribs"),
    ("tikka masala", "Chicken Tikka Masala"),
    ("chicken tikka", "Chicken Tikka Masala"),
    ("ramen noodles", "Ramen"),
    ("ramen noodle soup", "Ramen"),
    ("greek yoghurt", "Greek Yogurt"),
    ("yoghurt", "Yogurt"),
    ("donut", "Doughnut"),
];

const LEADING_LABELS: &[&str] = &["dish name:", "dish:", "answer:", "name:", "food:"];
const LEADING_ARTICLES: &[&str] = &["a ", "an ", "the "];

const MIN_DISH_NAME_CHARS: usize = 3;
const MAX_DISH_NAME_CHARS: usize = 100;

/// Maps a free-text dish name onto its canonical label.
pub fn normalize_dish_name(raw: &str) -> String {
    let cleaned = collapse_whitespace(
        raw.trim()
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '.' | ',' | ';' | ':' | '!')),
    );

    let mut key = cleaned.to_lowercase();
    for article in LEADING_ARTICLES {
        if let Some(stripped) = key.strip_prefix(article) {
            key = stripped.to_string();
            break;
        }
    }

    if let Some((_, canonical)) = SYNONYMS.iter().find(|(alias, _)| *alias == key) {
        return canonical.to_string();
    }

    let has_upper = cleaned.chars().any(|c| c.is_uppercase());
    let has_lower = cleaned.chars().any(|c| c.is_lowercase());
    if has_upper && has_lower {
        cleaned
    } else {
        title_case(&cleaned)
    }
}

/// Cleans a raw model answer into a candidate dish name, or `None` when the
/// answer cannot be a dish name.
pub fn clean_model_dish_name(raw: &str) -> Option<String> {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("```"))?;

    let mut candidate = line.trim_start_matches(['#', '-', '*', ' ']).trim().to_string();
    let lowered = candidate.to_lowercase();
    for label in LEADING_LABELS {
        if lowered.starts_with(label)
            && let Some(rest) = candidate.get(label.len()..)
        {
            candidate = rest.trim().to_string();
            break;
        }
    }

    let candidate = candidate
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '.' | '!' | '?'))
        .trim()
        .to_string();

    let length = candidate.chars().count();
    if !(MIN_DISH_NAME_CHARS..=MAX_DISH_NAME_CHARS).contains(&length) {
        return None;
    }

    Some(candidate)
}

const TORTILLA_DISHES: &[&str] = &[
    "burrito",
    "taco",
    "quesadilla",
    "enchilada",
    "fajita",
    "chimichanga",
    "nachos",
    "tostada",
];

const PROTEINS: &[(&str, &[&str])] = &[
    ("Chicken", &["chicken", "poultry"]),
    ("Beef", &["beef", "steak", "carne asada", "meat"]),
    ("Pork", &["pork", "carnitas", "chorizo", "bacon", "ham"]),
    ("Fish", &["fish", "salmon", "tuna", "cod", "tilapia", "shrimp", "prawn", "seafood"]),
];

/// Renames tortilla-family dishes that concept-based synthesis tends to
/// mislabel. Returns `name` unchanged when no rule fires.
pub fn apply_ingredient_heuristics(name: &str, concepts: &[String]) -> String {
    let concepts: Vec<String> = concepts.iter().map(|c| c.to_lowercase()).collect();
    let lowered_name = name.to_lowercase();

    let tortilla = has_signal(&concepts, &["tortilla", "wrap"]);
    let rice = has_signal(&concepts, &["rice"]);
    let beans = has_signal(&concepts, &["bean"]);
    let salsa = has_signal(&concepts, &["salsa", "pico de gallo"]);
    let guacamole = has_signal(&concepts, &["guacamole", "avocado"]);
    let cheese = has_signal(&concepts, &["cheese"]);
    let lettuce = has_signal(&concepts, &["lettuce", "cabbage"]);
    let protein = PROTEINS
        .iter()
        .find(|(_, terms)| has_signal(&concepts, terms))
        .map(|(label, _)| *label);

    let is_sandwich = lowered_name.contains("sandwich");
    let wrap_family = tortilla || (is_sandwich && (salsa || guacamole));
    if !wrap_family {
        return name.to_string();
    }

    if !is_sandwich && TORTILLA_DISHES.iter().any(|dish| lowered_name.contains(dish)) {
        return name.to_string();
    }

    let burrito = || match protein {
        Some(protein) => format!("{} Burrito", protein),
        None if beans => "Bean Burrito".to_string(),
        None => "Burrito".to_string(),
    };

    if (rice || beans) && (salsa || guacamole || cheese) {
        return burrito();
    }

    if let Some(protein) = protein
        && (salsa || lettuce)
        && !(rice && beans)
    {
        return format!("{} Tacos", protein);
    }

    if cheese && !rice && !beans {
        return match protein {
            Some(protein) => format!("{} Quesadilla", protein),
            None => "Cheese Quesadilla".to_string(),
        };
    }

    if is_sandwich {
        return burrito();
    }

    name.to_string()
}

/// Matches single-word terms against whole words (plural `s` allowed) and
/// multi-word terms as substrings.
fn has_signal(concepts: &[String], terms: &[&str]) -> bool {
    concepts.iter().any(|concept| {
        terms.iter().any(|term| {
            if term.contains(' ') {
                concept.contains(term)
            } else {
                concept.split(|c: char| !c.is_alphanumeric()).any(|word| {
                    word == *term || word.strip_suffix('s') == Some(term)
                })
            }
        })
    })
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let lower = word.to_lowercase();
            if matches!(lower.as_str(), "and" | "with" | "of" | "in" | "on") {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
