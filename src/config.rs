use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::attribution::AttributionParams;
use crate::ingredients::keywords::{KeywordTable, DEFAULT_NEUTRAL_RISK, DEFAULT_UNSAFE};
use crate::model::train::TrainingParams;

/// Root configuration structure, deserialized from `.faisc/config.toml`.
///
/// Every section is optional; missing values fall back to the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub keywords: KeywordsConfig,
    pub training: TrainingParams,
    pub attribution: AttributionParams,
}

/// Locations of the model artifact, training corpus and history log.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub model: PathBuf,
    pub corpus: PathBuf,
    pub history: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models").join("tfidf_multiclass_model.json"),
            corpus: PathBuf::from("data").join("ingredients_multilabel.csv"),
            history: PathBuf::from("logs").join("analysis_log.csv"),
        }
    }
}

/// Keyword overrides. Either list replaces the built-in list when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordsConfig {
    #[serde(rename = "unsafe")]
    pub unsafe_keywords: Option<Vec<String>>,
    pub neutral_risk: Option<Vec<String>>,
}

impl Config {
    /// Build and validate the keyword table this configuration describes.
    pub fn keyword_table(&self) -> Result<KeywordTable> {
        let unsafe_keywords = match &self.keywords.unsafe_keywords {
            Some(list) => list.clone(),
            None => DEFAULT_UNSAFE.iter().map(|s| s.to_string()).collect(),
        };
        let neutral_risk = match &self.keywords.neutral_risk {
            Some(list) => list.clone(),
            None => DEFAULT_NEUTRAL_RISK.iter().map(|s| s.to_string()).collect(),
        };
        Ok(KeywordTable::new(unsafe_keywords, neutral_risk)?)
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<base_dir>/.faisc/config.toml`
/// 3. `~/.config/faisc/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(base_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let local_config = base_dir.join(".faisc").join("config.toml");
    if local_config.exists() {
        return read_config(&local_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("faisc").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    tracing::debug!("no config file found, using built-in defaults");
    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.paths.model, Path::new("models/tfidf_multiclass_model.json"));
        assert_eq!(cfg.training.seed, 42);
        assert_eq!(cfg.attribution.num_features, 8);
        assert_eq!(cfg.keyword_table().unwrap(), KeywordTable::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [paths]
            model = "artifacts/model.json"

            [training]
            c = 4.0

            [attribution]
            num_samples = 250
            "#,
        )
        .unwrap();
        assert_eq!(cfg.paths.model, Path::new("artifacts/model.json"));
        assert_eq!(cfg.paths.history, Path::new("logs/analysis_log.csv"));
        assert_eq!(cfg.training.c, 4.0);
        assert_eq!(cfg.training.max_iter, 600);
        assert_eq!(cfg.attribution.num_samples, 250);
        assert_eq!(cfg.attribution.kernel_width, 25.0);
    }

    #[test]
    fn test_keyword_override() {
        let cfg: Config = toml::from_str(
            r#"
            [keywords]
            unsafe = ["Coconut Oil", "lauric acid"]
            "#,
        )
        .unwrap();
        let table = cfg.keyword_table().unwrap();
        assert_eq!(table.unsafe_keywords(), ["coconut oil", "lauric acid"]);
        assert_eq!(table.neutral_risk().len(), DEFAULT_NEUTRAL_RISK.len());
    }

    #[test]
    fn test_overlapping_keywords_rejected() {
        let cfg: Config = toml::from_str(
            r#"
            [keywords]
            neutral_risk = ["fragrance", "lauric acid"]
            "#,
        )
        .unwrap();
        assert!(cfg.keyword_table().is_err());
    }

    #[test]
    fn test_search_order_prefers_local_dir() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join(".faisc");
        std::fs::create_dir_all(&local).unwrap();
        std::fs::write(local.join("config.toml"), "[training]\nseed = 7\n").unwrap();

        let cfg = load_config(dir.path(), None).unwrap();
        assert_eq!(cfg.training.seed, 7);

        let other = dir.path().join("other.toml");
        std::fs::write(&other, "[training]\nseed = 9\n").unwrap();
        let cfg = load_config(dir.path(), Some(&other)).unwrap();
        assert_eq!(cfg.training.seed, 9);
    }

    #[test]
    fn test_malformed_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[training\nseed = ").unwrap();
        assert!(load_config(dir.path(), Some(&path)).is_err());
    }
}
