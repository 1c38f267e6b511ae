//! Injected configuration for the reconciliation core.
//!
//! # Responsibility
//! - Carry taxonomy identifiers and labels that a host CMS would otherwise
//!   register as process-wide constants.
//! - Load/initialize the JSON config file and register configured
//!   taxonomies with the term repository.
//!
//! # Invariants
//! - Every taxonomy name is non-blank and unique across the configuration.
//! - `unknown_slug` is a valid term slug.

use crate::model::term::TaxonomyKind;
use crate::repo::term_repo::{is_valid_slug, TermRepoResult, TermRepository};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_NAME: &str = "photoroll.json";

/// One date taxonomy that receives taken-date assignments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTaxonomyConfig {
    pub name: String,
    pub kind: TaxonomyKind,
}

impl DateTaxonomyConfig {
    pub fn new(name: impl Into<String>, kind: TaxonomyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Core configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Flat taxonomy holding genre tags of items.
    pub genre_taxonomy: String,
    /// Flat taxonomy keyed by publication date; aggregates' date axis.
    pub published_date_taxonomy: String,
    /// Taxonomies receiving resolved taken dates.
    pub taken_date_taxonomies: Vec<DateTaxonomyConfig>,
    /// Display name of the sentinel genre for untagged items.
    pub all_genre_label: String,
    /// Slug of the unknown-date bucket.
    pub unknown_slug: String,
    /// Display name of the unknown-date bucket.
    pub unknown_label: String,
    /// Placed between date and genre name in aggregate titles.
    pub title_separator: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            genre_taxonomy: "photo_genre".to_string(),
            published_date_taxonomy: "published_date".to_string(),
            taken_date_taxonomies: vec![
                DateTaxonomyConfig::new("taken_date", TaxonomyKind::Hierarchical),
                DateTaxonomyConfig::new("taken_day", TaxonomyKind::Flat),
            ],
            all_genre_label: "All".to_string(),
            unknown_slug: "unknown".to_string(),
            unknown_label: "Unknown".to_string(),
            title_separator: " \u{2013} ".to_string(),
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "config io `{}`: {source}", path.display()),
            Self::Parse(err) => write!(f, "config parse: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl CoreConfig {
    /// Loads `photoroll.json` from `base_dir`, writing defaults when absent.
    pub fn load_or_init(base_dir: &Path) -> Result<Self, ConfigError> {
        fs::create_dir_all(base_dir).map_err(|source| ConfigError::Io {
            path: base_dir.to_path_buf(),
            source,
        })?;
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
                path: config_path.clone(),
                source,
            })?;
            let config: CoreConfig = serde_json::from_str(&raw)?;
            config.validate()?;
            return Ok(config);
        }

        let default = CoreConfig::default();
        let payload = serde_json::to_string_pretty(&default)?;
        fs::write(&config_path, payload).map_err(|source| ConfigError::Io {
            path: config_path,
            source,
        })?;
        Ok(default)
    }

    /// Checks identifiers and labels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let names = [
            self.genre_taxonomy.as_str(),
            self.published_date_taxonomy.as_str(),
        ]
        .into_iter()
        .chain(self.taken_date_taxonomies.iter().map(|t| t.name.as_str()));
        for name in names {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("taxonomy name must not be blank".into()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "taxonomy `{name}` is configured twice"
                )));
            }
        }

        if !is_valid_slug(&self.unknown_slug) {
            return Err(ConfigError::Invalid(format!(
                "unknown_slug `{}` is not a valid slug",
                self.unknown_slug
            )));
        }
        if self.all_genre_label.trim().is_empty() || self.unknown_label.trim().is_empty() {
            return Err(ConfigError::Invalid("labels must not be blank".into()));
        }
        Ok(())
    }

    /// Registers every configured taxonomy with its kind. Idempotent.
    pub fn register_taxonomies<R: TermRepository>(&self, repo: &R) -> TermRepoResult<()> {
        repo.register_taxonomy(&self.genre_taxonomy, TaxonomyKind::Flat)?;
        repo.register_taxonomy(&self.published_date_taxonomy, TaxonomyKind::Flat)?;
        for taxonomy in &self.taken_date_taxonomies {
            repo.register_taxonomy(&taxonomy.name, taxonomy.kind)?;
        }
        Ok(())
    }
}
