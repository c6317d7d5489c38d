use serde::{Deserialize, Serialize};

use crate::error::{FaiscError, Result};
use crate::ingredients::normalize::normalize;

/// Ingredients strongly linked to fungal acne. Each distinct match costs 4 points.
pub const DEFAULT_UNSAFE: &[&str] = &[
    "lauric acid",
    "myristic acid",
    "stearic acid",
    "oleic acid",
    "isopropyl myristate",
    "cetyl alcohol",
    "cetearyl alcohol",
    "glyceryl stearate",
    "polysorbate",
    "sorbitan",
];

/// Mild-risk ingredients. Each distinct match costs 1 point.
pub const DEFAULT_NEUTRAL_RISK: &[&str] = &["dimethicone", "caprylic/capric triglyceride", "fragrance"];

/// The two disjoint keyword lists used by the scorer and the explanation composer.
///
/// Keywords are stored normalized so they can be matched by substring against
/// normalized ingredient tokens. Built once and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawKeywordTable")]
pub struct KeywordTable {
    unsafe_keywords: Vec<String>,
    neutral_risk: Vec<String>,
}

impl KeywordTable {
    /// Build a validated table.
    ///
    /// Keywords are normalized and deduplicated (first occurrence wins). Fails
    /// when a keyword normalizes to nothing or appears in both lists.
    pub fn new<U, N>(unsafe_keywords: U, neutral_risk: N) -> Result<Self>
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        let unsafe_keywords = clean_list(unsafe_keywords, "unsafe")?;
        let neutral_risk = clean_list(neutral_risk, "neutral_risk")?;

        if let Some(dup) = unsafe_keywords.iter().find(|k| neutral_risk.contains(k)) {
            return Err(FaiscError::Keywords(format!(
                "'{}' is listed as both unsafe and neutral-risk",
                dup
            )));
        }

        Ok(Self {
            unsafe_keywords,
            neutral_risk,
        })
    }

    pub fn unsafe_keywords(&self) -> &[String] {
        &self.unsafe_keywords
    }

    pub fn neutral_risk(&self) -> &[String] {
        &self.neutral_risk
    }

    /// First unsafe keyword contained in `ingredient`, if any.
    pub fn unsafe_match(&self, ingredient: &str) -> Option<&str> {
        self.unsafe_keywords
            .iter()
            .find(|k| ingredient.contains(k.as_str()))
            .map(String::as_str)
    }

    /// First neutral-risk keyword contained in `ingredient`, if any.
    pub fn neutral_match(&self, ingredient: &str) -> Option<&str> {
        self.neutral_risk
            .iter()
            .find(|k| ingredient.contains(k.as_str()))
            .map(String::as_str)
    }
}

/// Unvalidated serde form of [`KeywordTable`].
#[derive(Deserialize)]
struct RawKeywordTable {
    unsafe_keywords: Vec<String>,
    neutral_risk: Vec<String>,
}

impl TryFrom<RawKeywordTable> for KeywordTable {
    type Error = FaiscError;

    fn try_from(raw: RawKeywordTable) -> Result<Self> {
        KeywordTable::new(raw.unsafe_keywords, raw.neutral_risk)
    }
}

impl Default for KeywordTable {
    /// The canonical built-in table.
    fn default() -> Self {
        Self {
            unsafe_keywords: DEFAULT_UNSAFE.iter().map(|s| s.to_string()).collect(),
            neutral_risk: DEFAULT_NEUTRAL_RISK.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn clean_list<I>(items: I, list: &str) -> Result<Vec<String>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in items {
        let keyword = normalize(raw.as_ref());
        if keyword.is_empty() || keyword.contains(',') {
            return Err(FaiscError::Keywords(format!(
                "{} keyword '{}' is empty or spans several ingredients",
                list,
                raw.as_ref()
            )));
        }
        if !out.contains(&keyword) {
            out.push(keyword);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid_and_disjoint() {
        let default = KeywordTable::default();
        let rebuilt = KeywordTable::new(DEFAULT_UNSAFE, DEFAULT_NEUTRAL_RISK).unwrap();
        assert_eq!(default, rebuilt);
        assert_eq!(default.unsafe_keywords().len(), 10);
        assert_eq!(default.neutral_risk().len(), 3);
        assert!(default.unsafe_keywords().iter().any(|k| k == "cetearyl alcohol"));
    }

    #[test]
    fn test_keywords_are_normalized_and_deduplicated() {
        let table = KeywordTable::new(["  Lauric ACID ", "lauric acid"], ["Fragrance*"]).unwrap();
        assert_eq!(table.unsafe_keywords(), ["lauric acid"]);
        assert_eq!(table.neutral_risk(), ["fragrance"]);
    }

    #[test]
    fn test_overlapping_lists_are_rejected() {
        let err = KeywordTable::new(["fragrance"], ["Fragrance"]).unwrap_err();
        assert!(matches!(err, FaiscError::Keywords(_)));
    }

    #[test]
    fn test_deserialization_is_validated() {
        let table: KeywordTable = serde_json::from_str(
            r#"{"unsafe_keywords": ["Oleic Acid"], "neutral_risk": ["fragrance"]}"#,
        )
        .unwrap();
        assert_eq!(table.unsafe_keywords(), ["oleic acid"]);

        let overlapping = serde_json::from_str::<KeywordTable>(
            r#"{"unsafe_keywords": ["fragrance"], "neutral_risk": ["fragrance"]}"#,
        );
        assert!(overlapping.is_err());
    }

    #[test]
    fn test_empty_keyword_is_rejected() {
        assert!(KeywordTable::new(["  ", "oleic acid"], ["dimethicone"]).is_err());
        assert!(KeywordTable::new(["oleic acid, lauric acid"], ["dimethicone"]).is_err());
    }

    #[test]
    fn test_match_helpers() {
        let table = KeywordTable::default();
        assert_eq!(table.unsafe_match("polysorbate 20"), Some("polysorbate"));
        assert_eq!(table.neutral_match("parfum/fragrance"), Some("fragrance"));
        assert_eq!(table.unsafe_match("glycerin"), None);
    }
}
