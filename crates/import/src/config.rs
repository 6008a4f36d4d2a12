use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use reckon_core::CanonicalTransaction;

/// Category rollup rules: raw categories to drop entirely, raw→canonical
/// renames, and the categories whose amounts always count as income.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoriesConfig {
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub normalize: BTreeMap<String, String>,
    #[serde(default)]
    pub income_categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuppressLists {
    #[serde(default)]
    pub expense_ignore: Vec<String>,
    #[serde(default)]
    pub income_ignore: Vec<String>,
}

/// Merchant-suppression regex lists, split by source family.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuppressConfig {
    #[serde(default)]
    pub bank: SuppressLists,
    #[serde(default)]
    pub cards: SuppressLists,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub categories: CategoriesConfig,
    pub suppress: SuppressConfig,
}

/// Configuration problems are fatal at startup: running with silently
/// empty suppression/category rules would produce plausible-looking but
/// wrong reconciliations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing config file: {0}")]
    Missing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl AppConfig {
    /// Loads `categories.toml` and `suppress.toml` from `dir`. Both files
    /// are required. Loaded once at process start and threaded through as
    /// a value — no global cache.
    pub fn load(dir: &Path) -> Result<AppConfig, ConfigError> {
        Ok(AppConfig {
            categories: read_toml(&dir.join("categories.toml"))?,
            suppress: read_toml(&dir.join("suppress.toml"))?,
        })
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Applies category rules during canonicalization: renames first, then
/// exclusions, then the income-category sign force (income categories are
/// always inflows, whatever sign the source row carried).
pub fn apply_categories(
    txns: Vec<CanonicalTransaction>,
    config: &CategoriesConfig,
) -> Vec<CanonicalTransaction> {
    txns.into_iter()
        .filter_map(|mut t| {
            if let Some(cat) = t.category_raw.as_deref() {
                if let Some(renamed) = config.normalize.get(cat) {
                    t.category_raw = Some(renamed.clone());
                }
            }
            let cat = t.category_raw.as_deref().unwrap_or("");
            if config.exclude.iter().any(|e| e == cat) {
                return None;
            }
            if config.income_categories.iter().any(|c| c == cat) {
                t.amount = -t.amount.abs();
            }
            Some(t)
        })
        .collect()
}
