use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attribution::{self, AttributionParams, AttributionResult};
use crate::error::{FaiscError, Result};
use crate::ingredients::explain::{compose, Explanation};
use crate::ingredients::keywords::KeywordTable;
use crate::ingredients::normalize::{tokenize, IngredientList};
use crate::ingredients::scorer::{score_ingredients, SafetyScore};
use crate::model::ModelHandle;
use crate::models::{ClassificationResult, RiskTier};

/// Everything produced for one ingredient list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub raw_text: String,
    pub ingredients: IngredientList,
    pub score: SafetyScore,
    pub tier: RiskTier,
    pub explanation: Explanation,
    /// Absent when the analysis ran without a model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
}

/// Injected dependencies for analysis: the keyword table and, optionally, a
/// loaded model shared across callers.
#[derive(Debug, Clone)]
pub struct Analyzer {
    keywords: KeywordTable,
    model: Option<Arc<ModelHandle>>,
}

impl Analyzer {
    pub fn new(keywords: KeywordTable) -> Self {
        Self {
            keywords,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Arc<ModelHandle>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn model(&self) -> Option<&ModelHandle> {
        self.model.as_deref()
    }

    pub fn score(&self, raw: &str) -> SafetyScore {
        score_ingredients(&tokenize(raw), &self.keywords)
    }

    pub fn predict(&self, raw: &str) -> Result<ClassificationResult> {
        Ok(self.require_model()?.predict(raw))
    }

    pub fn explain(&self, raw: &str) -> Explanation {
        let ingredients = tokenize(raw);
        let score = score_ingredients(&ingredients, &self.keywords);
        compose(&ingredients, &score, &self.keywords)
    }

    /// Score and explanation only; never touches the model.
    pub fn assess(&self, raw: &str) -> AnalysisReport {
        let ingredients = tokenize(raw);
        let score = score_ingredients(&ingredients, &self.keywords);
        let explanation = compose(&ingredients, &score, &self.keywords);
        AnalysisReport {
            raw_text: raw.to_string(),
            tier: score.tier(),
            ingredients,
            score,
            explanation,
            classification: None,
        }
    }

    /// Full result bundle: classification, score and explanation.
    pub fn analyze(&self, raw: &str) -> Result<AnalysisReport> {
        let classification = self.predict(raw)?;
        let mut report = self.assess(raw);
        report.classification = Some(classification);
        Ok(report)
    }

    /// Local attribution of the model's decision on `raw`.
    pub fn attribute(&self, raw: &str, params: &AttributionParams) -> Result<Vec<AttributionResult>> {
        attribution::attribute(raw, self.require_model()?, params)
    }

    fn require_model(&self) -> Result<&ModelHandle> {
        self.model.as_deref().ok_or(FaiscError::ModelNotLoaded)
    }
}
