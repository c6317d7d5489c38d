use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FaiscError, Result};
use crate::models::ClassLabel;

pub const INGREDIENTS_COLUMN: &str = "ingredients";
pub const LABEL_COLUMN: &str = "label";

/// One labeled training row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub ingredients: String,
    pub label: ClassLabel,
}

impl LabeledExample {
    pub fn new(ingredients: impl Into<String>, label: ClassLabel) -> Self {
        Self {
            ingredients: ingredients.into(),
            label,
        }
    }
}

/// Load a training corpus from a CSV file with `ingredients` and `label` columns.
pub fn load_corpus(path: &Path) -> Result<Vec<LabeledExample>> {
    if !path.exists() {
        return Err(FaiscError::Data(format!(
            "training corpus not found at {}",
            path.display()
        )));
    }
    let file = std::fs::File::open(path)?;
    let examples = read_corpus(file)?;
    tracing::info!(rows = examples.len(), path = %path.display(), "loaded training corpus");
    Ok(examples)
}

/// Parse CSV training data.
///
/// Extra columns are ignored. Rows whose ingredients or label are missing or
/// blank are discarded; a label outside the taxonomy is an error.
pub fn read_corpus<R: Read>(reader: R) -> Result<Vec<LabeledExample>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| FaiscError::Data(format!("missing required column '{}'", name)))
    };
    let ingredients_idx = column(INGREDIENTS_COLUMN)?;
    let label_idx = column(LABEL_COLUMN)?;

    let mut examples = Vec::new();
    let mut dropped = 0usize;

    for record in rdr.records() {
        let record = record?;
        let ingredients = record.get(ingredients_idx).unwrap_or("").trim();
        let label = record.get(label_idx).unwrap_or("").trim();

        if ingredients.is_empty() || label.is_empty() {
            dropped += 1;
            continue;
        }

        let label: ClassLabel = label.parse().map_err(|_| {
            let line = record.position().map_or(0, |p| p.line());
            FaiscError::Data(format!("line {}: unknown label '{}'", line, label))
        })?;

        examples.push(LabeledExample::new(ingredients, label));
    }

    if dropped > 0 {
        tracing::warn!(dropped, "discarded rows with missing ingredients or label");
    }

    Ok(examples)
}
