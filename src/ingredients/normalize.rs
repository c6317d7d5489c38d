use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9,/%\s\-]").expect("valid regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Canonicalize raw ingredient-list text.
///
/// Lower-cases, turns newlines and tabs into spaces, deletes every character
/// outside `a-z 0-9 , / % -` and whitespace, collapses whitespace runs and
/// trims. Never fails; empty input gives an empty string.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let lower = raw.to_lowercase().replace(['\n', '\t'], " ");
    let kept = disallowed_chars().replace_all(&lower, "");
    whitespace_runs().replace_all(&kept, " ").trim().to_string()
}

/// Decode raw input bytes, degrading to an empty string when they are not
/// valid UTF-8.
pub fn decode_input(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(e) => {
            tracing::warn!("input is not valid UTF-8 ({e}); treating it as empty");
            Cow::Borrowed("")
        }
    }
}

/// [`normalize`] for raw bytes.
pub fn normalize_bytes(bytes: &[u8]) -> String {
    normalize(&decode_input(bytes))
}

/// Split raw text into normalized ingredient names.
///
/// Order is preserved and duplicates are kept.
pub fn tokenize(raw: &str) -> IngredientList {
    let cleaned = normalize(raw);
    let items = cleaned
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    IngredientList(items)
}

/// Ordered, normalized ingredient names from one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientList(Vec<String>);

impl IngredientList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Whether any ingredient contains `keyword` as a substring.
    pub fn any_contains(&self, keyword: &str) -> bool {
        self.0.iter().any(|ing| ing.contains(keyword))
    }
}

impl<'a> IntoIterator for &'a IngredientList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic_cleanup() {
        assert_eq!(
            normalize("  Aqua (Water),\tGlycerin,\nNiacinamide 5%  "),
            "aqua water, glycerin, niacinamide 5%"
        );
    }

    #[test]
    fn test_normalize_keeps_slash_and_hyphen() {
        assert_eq!(
            normalize("Caprylic/Capric Triglyceride, PEG-100 Stearate"),
            "caprylic/capric triglyceride, peg-100 stearate"
        );
    }

    #[test]
    fn test_normalize_deletes_other_characters() {
        assert_eq!(normalize("Parfum*; Linalool!"), "parfum linalool");
        assert_eq!(normalize("Crème"), "crme");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "",
            "   ",
            "Aqua, Glycerin , , Niacinamide",
            "Ωmega-3 \u{00A0} Oil;; (and) Café  ,",
            "İsopropyl Myristate\r\n\tK",
            "100%,,//--",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input {:?}", s);
        }
    }

    #[test]
    fn test_tokenize_splits_and_drops_empty_pieces() {
        let list = tokenize("Aqua, , Glycerin,Aqua,");
        assert_eq!(list.as_slice(), ["aqua", "glycerin", "aqua"]);
    }

    #[test]
    fn test_tokenize_empty_and_whitespace() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \n\t ").is_empty());
        assert!(tokenize(" , ,, ").is_empty());
    }

    #[test]
    fn test_invalid_utf8_degrades_to_empty() {
        assert_eq!(normalize_bytes(&[0xff, 0xfe, b'a']), "");
        assert_eq!(normalize_bytes(b"Aqua, Glycerin"), "aqua, glycerin");
    }

    #[test]
    fn test_any_contains_is_substring_match() {
        let list = tokenize("Sodium Lauroyl Sarcosinate, Isopropyl Myristate (and) Water");
        assert!(list.any_contains("isopropyl myristate"));
        assert!(!list.any_contains("lauric acid"));
    }
}
