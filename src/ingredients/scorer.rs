use serde::{Deserialize, Serialize};

use crate::ingredients::keywords::KeywordTable;
use crate::ingredients::normalize::{tokenize, IngredientList};
use crate::models::RiskTier;

pub const MAX_SCORE: u8 = 10;
pub const UNSAFE_PENALTY: i32 = 4;
pub const NEUTRAL_PENALTY: i32 = 1;

/// Fungal-acne safety score plus the distinct keywords that lowered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyScore {
    pub value: u8,
    /// Matched unsafe keywords, in keyword-table order.
    pub matched_unsafe: Vec<String>,
    /// Matched neutral-risk keywords, in keyword-table order.
    pub matched_neutral: Vec<String>,
}

impl SafetyScore {
    pub fn tier(&self) -> RiskTier {
        RiskTier::from_score(self.value)
    }
}

/// Score raw ingredient-list text.
pub fn score(raw: &str, keywords: &KeywordTable) -> SafetyScore {
    score_ingredients(&tokenize(raw), keywords)
}

/// Score an already tokenized ingredient list.
///
/// Starts from 10, subtracts 4 per distinct unsafe keyword and 1 per distinct
/// neutral-risk keyword found as a substring of any ingredient, then clamps to
/// `0..=10`. Repeated occurrences of a keyword are penalized once.
pub fn score_ingredients(ingredients: &IngredientList, keywords: &KeywordTable) -> SafetyScore {
    let matched_unsafe: Vec<String> = keywords
        .unsafe_keywords()
        .iter()
        .filter(|k| ingredients.any_contains(k))
        .cloned()
        .collect();

    let matched_neutral: Vec<String> = keywords
        .neutral_risk()
        .iter()
        .filter(|k| ingredients.any_contains(k))
        .cloned()
        .collect();

    let total = i32::from(MAX_SCORE)
        - UNSAFE_PENALTY * matched_unsafe.len() as i32
        - NEUTRAL_PENALTY * matched_neutral.len() as i32;

    SafetyScore {
        value: total.clamp(0, i32::from(MAX_SCORE)) as u8,
        matched_unsafe,
        matched_neutral,
    }
}
