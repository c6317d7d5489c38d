use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FaiscError;

/// The fixed 10-class formulation taxonomy predicted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassLabel {
    Safe,
    Neutral,
    MalasseziaTrigger,
    Comedogenic,
    Irritant,
    FragranceHeavy,
    FattyAcid,
    EmollientHeavy,
    Surfactant,
    Preservative,
}

impl ClassLabel {
    /// Every label, in canonical taxonomy order.
    pub const ALL: [ClassLabel; 10] = [
        ClassLabel::Safe,
        ClassLabel::Neutral,
        ClassLabel::MalasseziaTrigger,
        ClassLabel::Comedogenic,
        ClassLabel::Irritant,
        ClassLabel::FragranceHeavy,
        ClassLabel::FattyAcid,
        ClassLabel::EmollientHeavy,
        ClassLabel::Surfactant,
        ClassLabel::Preservative,
    ];

    /// Machine identifier as it appears in training data and model artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassLabel::Safe => "safe",
            ClassLabel::Neutral => "neutral",
            ClassLabel::MalasseziaTrigger => "malassezia_trigger",
            ClassLabel::Comedogenic => "comedogenic",
            ClassLabel::Irritant => "irritant",
            ClassLabel::FragranceHeavy => "fragrance_heavy",
            ClassLabel::FattyAcid => "fatty_acid",
            ClassLabel::EmollientHeavy => "emollient_heavy",
            ClassLabel::Surfactant => "surfactant",
            ClassLabel::Preservative => "preservative",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ClassLabel::Safe => "Safe",
            ClassLabel::Neutral => "Neutral",
            ClassLabel::MalasseziaTrigger => "Fungal Acne Trigger",
            ClassLabel::Comedogenic => "Comedogenic",
            ClassLabel::Irritant => "Irritant",
            ClassLabel::FragranceHeavy => "Fragrance Heavy",
            ClassLabel::FattyAcid => "Fatty-Acid Rich",
            ClassLabel::EmollientHeavy => "Emollient Heavy",
            ClassLabel::Surfactant => "Surfactant Based",
            ClassLabel::Preservative => "Preservative Focused",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ClassLabel::Safe => "Low-risk, non-comedogenic, suitable for most skin types.",
            ClassLabel::Neutral => {
                "Does not strongly help or harm skin; minimal overall impact."
            }
            ClassLabel::MalasseziaTrigger => {
                "Contains ingredients that may feed Malassezia and worsen fungal acne."
            }
            ClassLabel::Comedogenic => {
                "Higher chance of clogging pores; acne-prone skin may react."
            }
            ClassLabel::Irritant => "May cause redness, stinging or sensitivity in reactive skin.",
            ClassLabel::FragranceHeavy => {
                "Contains strong fragrance; can be irritating for sensitive skin."
            }
            ClassLabel::FattyAcid => "Nourishing but can be risky for fungal acne or clogged pores.",
            ClassLabel::EmollientHeavy => {
                "Very moisturising and occlusive; good for dry skin, heavy for oily skin."
            }
            ClassLabel::Surfactant => "Contains cleansing agents typically used in washes/shampoos.",
            ClassLabel::Preservative => {
                "Formula where preservatives are the main functional ingredients."
            }
        }
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClassLabel {
    type Err = FaiscError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ClassLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FaiscError::Data(format!("unknown label '{}'", wanted)))
    }
}

/// Per-ingredient highlighting bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Safe,
    Mild,
    High,
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskCategory::Safe => write!(f, "safe"),
            RiskCategory::Mild => write!(f, "mild"),
            RiskCategory::High => write!(f, "high"),
        }
    }
}

/// Narrative tier selected from the safety score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            8..=u8::MAX => RiskTier::Low,
            5..=7 => RiskTier::Moderate,
            _ => RiskTier::High,
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "Low Risk"),
            RiskTier::Moderate => write!(f, "Moderate Risk"),
            RiskTier::High => write!(f, "High Risk"),
        }
    }
}

/// How sure the classifier is about its top label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Moderate,
    Low,
}

impl ConfidenceLevel {
    pub fn from_probability(p: f64) -> Self {
        if p >= 0.80 {
            ConfidenceLevel::High
        } else if p >= 0.60 {
            ConfidenceLevel::Moderate
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "High model confidence"),
            ConfidenceLevel::Moderate => write!(f, "Moderate model confidence"),
            ConfidenceLevel::Low => write!(f, "Low model confidence"),
        }
    }
}

/// Output of one classifier call: the arg-max label and the full distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: ClassLabel,
    /// One entry per model label, in the model's class order.
    pub probabilities: Vec<(ClassLabel, f64)>,
}

impl ClassificationResult {
    /// Build a result from class-ordered probabilities. The first maximum wins ties.
    pub fn from_distribution(labels: &[ClassLabel], probs: &[f64]) -> Option<Self> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &p) in probs.iter().enumerate() {
            if best.map_or(true, |(_, bp)| p > bp) {
                best = Some((i, p));
            }
        }
        let (idx, _) = best?;
        Some(ClassificationResult {
            label: *labels.get(idx)?,
            probabilities: labels.iter().copied().zip(probs.iter().copied()).collect(),
        })
    }

    pub fn probability(&self, label: ClassLabel) -> f64 {
        self.probabilities
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }

    pub fn confidence(&self) -> f64 {
        self.probability(self.label)
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_probability(self.confidence())
    }

    /// Probabilities sorted from most to least likely.
    pub fn ranked(&self) -> Vec<(ClassLabel, f64)> {
        let mut ranked = self.probabilities.clone();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}
