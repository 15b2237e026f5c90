//! Publish configuration: which artifacts or directories become documents,
//! and how.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::split_index_files;
use crate::site::SiteDocument;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Document #{index}: title is required")]
    MissingTitle { index: usize },

    #[error("Document #{index}: artifacts pattern is required")]
    MissingPattern { index: usize },

    #[error("No documents configured")]
    Empty,
}

/// One configured document.
///
/// `artifacts_pattern` may match several archives; each becomes its own
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentConfig {
    pub title: String,
    pub artifacts_pattern: String,
    #[serde(default)]
    pub initial_path: Option<String>,
    /// Comma-separated index file names.
    #[serde(default)]
    pub index_file: Option<String>,
}

impl DocumentConfig {
    /// Trim every field and drop optional ones left blank.
    pub fn new(
        title: &str,
        artifacts_pattern: &str,
        initial_path: Option<&str>,
        index_file: Option<&str>,
    ) -> Self {
        Self {
            title: title.trim().to_string(),
            artifacts_pattern: artifacts_pattern.trim().to_string(),
            initial_path: non_blank(initial_path),
            index_file: non_blank(index_file),
        }
    }

    fn normalized(self) -> Self {
        Self::new(
            &self.title,
            &self.artifacts_pattern,
            self.initial_path.as_deref(),
            self.index_file.as_deref(),
        )
    }

    pub fn index_file_names(&self) -> Vec<String> {
        self.index_file
            .as_deref()
            .map(split_index_files)
            .unwrap_or_default()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Deserialize)]
struct ConfigFile<T> {
    documents: Vec<T>,
}

/// Normalize and validate a list of document configs.
pub fn validate(configs: Vec<DocumentConfig>) -> Result<Vec<DocumentConfig>, ConfigError> {
    if configs.is_empty() {
        return Err(ConfigError::Empty);
    }

    configs
        .into_iter()
        .map(DocumentConfig::normalized)
        .enumerate()
        .map(|(i, config)| {
            let index = i + 1;
            if config.title.is_empty() {
                return Err(ConfigError::MissingTitle { index });
            }
            if config.artifacts_pattern.is_empty() {
                return Err(ConfigError::MissingPattern { index });
            }
            Ok(config)
        })
        .collect()
}

/// Normalize and validate a list of directory documents.
pub fn validate_site(documents: Vec<SiteDocument>) -> Result<Vec<SiteDocument>, ConfigError> {
    if documents.is_empty() {
        return Err(ConfigError::Empty);
    }

    documents
        .into_iter()
        .map(SiteDocument::normalized)
        .enumerate()
        .map(|(i, doc)| {
            if doc.title.is_empty() {
                return Err(ConfigError::MissingTitle { index: i + 1 });
            }
            Ok(doc)
        })
        .collect()
}

/// Load document configs from a JSON file of the form
/// `{"documents": [{"title": ..., "artifactsPattern": ...}, ...]}`.
pub fn load_config(path: &Path) -> Result<Vec<DocumentConfig>, ConfigError> {
    let documents = read_documents(path)?;
    tracing::debug!(config_path = ?path, documents = documents.len(), "Loaded publish config");
    validate(documents)
}

/// Load directory documents from a JSON file of the form
/// `{"documents": [{"title": ..., "directory": ..., "recursive": true}, ...]}`.
pub fn load_site_config(path: &Path) -> Result<Vec<SiteDocument>, ConfigError> {
    let documents = read_documents(path)?;
    tracing::debug!(config_path = ?path, documents = documents.len(), "Loaded site config");
    validate_site(documents)
}

fn read_documents<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let file: ConfigFile<T> = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.documents)
}
