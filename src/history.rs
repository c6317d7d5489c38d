//! Append-only CSV log of past analyses and the aggregate statistics
//! computed from it.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ingredients::keywords::KeywordTable;
use crate::ingredients::normalize::normalize;
use crate::models::ClassLabel;

/// One logged analysis. Columns: `timestamp,raw_text,pred_label,score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub raw_text: String,
    /// Empty when the analysis ran without a model.
    pub pred_label: Option<ClassLabel>,
    pub score: u8,
}

impl HistoryRecord {
    pub fn now(raw_text: impl Into<String>, pred_label: Option<ClassLabel>, score: u8) -> Self {
        Self {
            timestamp: Utc::now(),
            raw_text: raw_text.into(),
            pred_label,
            score,
        }
    }
}

/// Aggregates over the whole log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total: usize,
    pub average_score: Option<f64>,
    pub label_counts: BTreeMap<ClassLabel, usize>,
    pub unclassified: usize,
    /// Analyses per score value.
    pub score_counts: BTreeMap<u8, usize>,
    /// Analyses mentioning each unsafe keyword, keyword-table order, zero counts omitted.
    pub unsafe_counts: Vec<(String, usize)>,
}

/// Append one record, creating the file (with header) and its directory on
/// first use.
pub fn append(path: &Path, record: &HistoryRecord) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;

    tracing::debug!(path = %path.display(), score = record.score, "appended history record");
    Ok(())
}

/// Read every record. A missing log is an empty history.
pub fn load(path: &Path) -> Result<Vec<HistoryRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<HistoryRecord>, _>>()?;
    tracing::debug!(path = %path.display(), rows = records.len(), "loaded history");
    Ok(records)
}

pub fn summarize(records: &[HistoryRecord], keywords: &KeywordTable) -> HistorySummary {
    let mut label_counts = BTreeMap::new();
    let mut score_counts = BTreeMap::new();
    let mut unclassified = 0;

    for r in records {
        match r.pred_label {
            Some(label) => *label_counts.entry(label).or_insert(0) += 1,
            None => unclassified += 1,
        }
        *score_counts.entry(r.score).or_insert(0) += 1;
    }

    let average_score = (!records.is_empty()).then(|| {
        records.iter().map(|r| f64::from(r.score)).sum::<f64>() / records.len() as f64
    });

    let texts: Vec<String> = records.iter().map(|r| normalize(&r.raw_text)).collect();
    let unsafe_counts = keywords
        .unsafe_keywords()
        .iter()
        .map(|k| (k.clone(), texts.iter().filter(|t| t.contains(k.as_str())).count()))
        .filter(|(_, n)| *n > 0)
        .collect();

    HistorySummary {
        total: records.len(),
        average_score,
        label_counts,
        unclassified,
        score_counts,
        unsafe_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("analysis_log.csv");

        let first = HistoryRecord::now("Aqua, Glycerin", Some(ClassLabel::Safe), 10);
        let second = HistoryRecord::now("Aqua, \"Lauric\" Acid\nFragrance", None, 5);
        append(&path, &first).unwrap();
        append(&path, &second).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("timestamp,raw_text,pred_label,score"));
        assert_eq!(content.matches("timestamp,").count(), 1);

        let records = load(&path).unwrap();
        assert_eq!(records, vec![first, second]);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("none.csv")).unwrap().is_empty());
    }

    #[test]
    fn test_summary() {
        let records = vec![
            HistoryRecord::now("Aqua, Lauric Acid, Fragrance", Some(ClassLabel::MalasseziaTrigger), 5),
            HistoryRecord::now("LAURIC ACID, Oleic Acid", Some(ClassLabel::MalasseziaTrigger), 2),
            HistoryRecord::now("Aqua, Glycerin", None, 10),
        ];
        let summary = summarize(&records, &KeywordTable::default());

        assert_eq!(summary.total, 3);
        assert!((summary.average_score.unwrap() - 17.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.label_counts[&ClassLabel::MalasseziaTrigger], 2);
        assert_eq!(summary.unclassified, 1);
        assert_eq!(summary.score_counts[&10], 1);
        assert_eq!(
            summary.unsafe_counts,
            vec![("lauric acid".to_string(), 2), ("oleic acid".to_string(), 1)]
        );
    }

    #[test]
    fn test_empty_summary_has_no_average() {
        let summary = summarize(&[], &KeywordTable::default());
        assert_eq!(summary.total, 0);
        assert!(summary.average_score.is_none());
        assert!(summary.unsafe_counts.is_empty());
    }
}
