use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{FaiscError, Result};

/// A sparse feature row: `(feature index, value)` pairs sorted by index.
pub type SparseRow = Vec<(usize, f64)>;

/// Bag-of-n-grams TF-IDF feature extractor.
///
/// Tokens are runs of two or more alphanumeric characters; n-grams are joined
/// with a single space.
///
/// ```text
/// idf(t)   = ln((1 + n) / (1 + df(t))) + 1
/// x(t, d)  = count(t, d) * idf(t), then each row is L2-normalized
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    ngram_range: (usize, usize),
    max_features: Option<usize>,
    min_df: usize,
    max_df: f64,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self {
            ngram_range: (1, 1),
            max_features: None,
            min_df: 1,
            max_df: 1.0,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        let min_n = min_n.max(1);
        self.ngram_range = (min_n, max_n.max(min_n));
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Terms appearing in fewer than `min_df` documents are ignored.
    pub fn with_min_df(mut self, min_df: usize) -> Self {
        self.min_df = min_df;
        self
    }

    /// Terms appearing in more than this fraction of documents are ignored.
    pub fn with_max_df(mut self, max_df: f64) -> Self {
        self.max_df = max_df.clamp(0.0, 1.0);
        self
    }

    /// Learn the vocabulary and IDF weights.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        if documents.is_empty() {
            return Err(FaiscError::Data("cannot fit vectorizer on zero documents".into()));
        }

        let n_docs = documents.len();
        let mut term_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let mut doc_terms: HashSet<String> = HashSet::new();
            for term in self.terms(doc.as_ref()) {
                *term_freq.entry(term.clone()).or_insert(0) += 1;
                doc_terms.insert(term);
            }
            for term in doc_terms {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let max_df_count = self.max_df * n_docs as f64;
        let mut kept: Vec<(String, usize)> = term_freq
            .into_iter()
            .filter(|(term, _)| {
                let df = doc_freq.get(term).copied().unwrap_or(0);
                df >= self.min_df && (df as f64) <= max_df_count
            })
            .collect();

        // Most frequent first, ties broken alphabetically for a stable vocabulary.
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(max_features) = self.max_features {
            kept.truncate(max_features);
        }

        if kept.is_empty() {
            return Err(FaiscError::Data(format!(
                "no terms left after document-frequency pruning (min_df={}, max_df={}, {} documents)",
                self.min_df, self.max_df, n_docs
            )));
        }

        // Feature indices follow alphabetical order of the surviving terms.
        let ordered: BTreeMap<String, usize> = kept
            .into_iter()
            .map(|(term, _)| {
                let df = doc_freq.get(&term).copied().unwrap_or(0);
                (term, df)
            })
            .collect();

        self.vocabulary = HashMap::with_capacity(ordered.len());
        self.idf = Vec::with_capacity(ordered.len());
        for (idx, (term, df)) in ordered.into_iter().enumerate() {
            self.idf
                .push(((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0);
            self.vocabulary.insert(term, idx);
        }

        tracing::debug!(
            vocabulary = self.vocabulary.len(),
            documents = n_docs,
            "fitted TF-IDF vocabulary"
        );
        Ok(())
    }

    /// Transform one document into an L2-normalized sparse TF-IDF row.
    ///
    /// Terms outside the vocabulary are ignored; a document with no known
    /// terms yields an empty row.
    pub fn transform_one(&self, document: &str) -> SparseRow {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.terms(document) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut row {
                *v /= norm;
            }
        }
        row
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Vec<SparseRow> {
        documents
            .iter()
            .map(|d| self.transform_one(d.as_ref()))
            .collect()
    }

    pub fn vocabulary(&self) -> &HashMap<String, usize> {
        &self.vocabulary
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Internal consistency of a deserialized vectorizer.
    pub(crate) fn check_consistency(&self) -> std::result::Result<(), String> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(format!(
                "vocabulary has {} terms but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }
        if self.vocabulary.values().any(|&idx| idx >= self.idf.len()) {
            return Err("vocabulary index out of range".into());
        }
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid n-gram range ({}, {})", min_n, max_n));
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err("non-finite idf weight".into());
        }
        Ok(())
    }

    fn terms(&self, document: &str) -> Vec<String> {
        let words = words(document);
        let mut terms = Vec::new();
        for n in self.ngram_range.0..=self.ngram_range.1 {
            for gram in words.windows(n) {
                terms.push(gram.join(" "));
            }
        }
        terms
    }
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Word tokens: runs of at least two alphanumeric characters.
pub fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<&'static str> {
        vec![
            "aqua, glycerin, niacinamide",
            "aqua, glycerin, lauric acid",
            "aqua, fragrance, lauric acid",
            "water, glycerin, fragrance",
        ]
    }

    #[test]
    fn test_words_skip_short_tokens_and_punctuation() {
        assert_eq!(
            words("caprylic/capric triglyceride, vitamin e, 5% peg-100"),
            ["caprylic", "capric", "triglyceride", "vitamin", "peg", "100"]
        );
    }

    #[test]
    fn test_fit_applies_min_and_max_df() {
        let mut v = TfidfVectorizer::new()
            .with_ngram_range(1, 2)
            .with_min_df(2)
            .with_max_df(0.95);
        v.fit(&docs()).unwrap();

        let vocab = v.vocabulary();
        // in 3 of 4 documents: kept
        assert!(vocab.contains_key("aqua"));
        assert!(vocab.contains_key("glycerin"));
        // bigram present in 2 documents
        assert!(vocab.contains_key("lauric acid"));
        assert!(vocab.contains_key("aqua glycerin"));
        // single-document terms pruned
        assert!(!vocab.contains_key("niacinamide"));
        assert!(!vocab.contains_key("water"));
    }

    #[test]
    fn test_consistency_rejects_bad_ngram_range_and_idf() {
        let mut v = TfidfVectorizer::new();
        v.fit(&docs()).unwrap();
        assert!(v.check_consistency().is_ok());

        let mut bad = v.clone();
        bad.ngram_range = (0, 1);
        assert!(bad.check_consistency().is_err());

        let mut bad = v.clone();
        bad.ngram_range = (2, 1);
        assert!(bad.check_consistency().is_err());

        let mut bad = v;
        bad.idf[0] = f64::NAN;
        assert!(bad.check_consistency().is_err());
    }

    #[test]
    fn test_max_df_drops_ubiquitous_terms() {
        let mut v = TfidfVectorizer::new().with_max_df(0.5);
        v.fit(&["aqua oil", "aqua wax", "aqua oil", "aqua wax"]).unwrap();
        assert!(!v.vocabulary().contains_key("aqua"));
        assert!(v.vocabulary().contains_key("oil"));
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let mut v = TfidfVectorizer::new().with_max_features(2);
        v.fit(&["aqua aqua aqua oil", "aqua oil wax"]).unwrap();
        assert_eq!(v.vocabulary_size(), 2);
        assert!(v.vocabulary().contains_key("aqua"));
        assert!(v.vocabulary().contains_key("oil"));
    }

    #[test]
    fn test_transform_rows_are_unit_length() {
        let mut v = TfidfVectorizer::new().with_ngram_range(1, 2);
        v.fit(&docs()).unwrap();
        for row in v.transform(&docs()) {
            let norm: f64 = row.iter().map(|(_, x)| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
            assert!(row.windows(2).all(|w| w[0].0 < w[1].0));
        }
    }

    #[test]
    fn test_unknown_document_gives_empty_row() {
        let mut v = TfidfVectorizer::new();
        v.fit(&docs()).unwrap();
        assert!(v.transform_one("zinc oxide").is_empty());
        assert!(v.transform_one("").is_empty());
    }

    #[test]
    fn test_empty_vocabulary_is_data_error() {
        let mut v = TfidfVectorizer::new().with_min_df(2);
        let err = v.fit(&["aqua", "glycerin"]).unwrap_err();
        assert!(matches!(err, FaiscError::Data(_)));
        assert!(v.fit::<&str>(&[]).is_err());
    }
}
