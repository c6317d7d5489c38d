use serde::{Deserialize, Serialize};

use crate::ingredients::keywords::KeywordTable;
use crate::ingredients::normalize::IngredientList;
use crate::ingredients::scorer::SafetyScore;
use crate::models::{RiskCategory, RiskTier};

/// Narrative plus per-ingredient highlighting for one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub tier: RiskTier,
    pub narrative: String,
    pub ingredients: Vec<IngredientRisk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRisk {
    pub ingredient: String,
    pub category: RiskCategory,
    /// Keyword responsible for a `mild` or `high` category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

/// Combine a score and its matched keywords into a human-readable rationale.
///
/// Only the keyword bucket relevant to the tier is listed: neutral-risk
/// keywords for a moderate rating, unsafe keywords for a high one.
pub fn compose(
    ingredients: &IngredientList,
    score: &SafetyScore,
    keywords: &KeywordTable,
) -> Explanation {
    let tier = score.tier();

    let mut narrative = match tier {
        RiskTier::Low => String::from(
            "This product appears low risk for fungal acne. \
             No major fungal acne triggers were detected.",
        ),
        RiskTier::Moderate => String::from(
            "This product has a moderate risk rating. \
             Some ingredients may cause issues for sensitive or acne-prone skin.",
        ),
        RiskTier::High => String::from(
            "This product is rated high risk for fungal acne. \
             It contains fatty acids, esters or other compounds known to feed Malassezia.",
        ),
    };

    match tier {
        RiskTier::Moderate if !score.matched_neutral.is_empty() => {
            narrative.push_str(&format!(
                " Mild-risk ingredients: {}.",
                score.matched_neutral.join(", ")
            ));
        }
        RiskTier::High if !score.matched_unsafe.is_empty() => {
            narrative.push_str(&format!(
                " High-risk ingredients: {}.",
                score.matched_unsafe.join(", ")
            ));
        }
        _ => {}
    }

    Explanation {
        tier,
        narrative,
        ingredients: categorize(ingredients, keywords),
    }
}

/// Bucket each ingredient: `high` beats `mild` beats `safe`.
pub fn categorize(ingredients: &IngredientList, keywords: &KeywordTable) -> Vec<IngredientRisk> {
    ingredients
        .iter()
        .map(|ing| {
            let (category, keyword) = if let Some(k) = keywords.unsafe_match(ing) {
                (RiskCategory::High, Some(k.to_string()))
            } else if let Some(k) = keywords.neutral_match(ing) {
                (RiskCategory::Mild, Some(k.to_string()))
            } else {
                (RiskCategory::Safe, None)
            };
            IngredientRisk {
                ingredient: ing.clone(),
                category,
                keyword,
            }
        })
        .collect()
}
