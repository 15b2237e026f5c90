//! Publishing ZIP artifacts of a build, or workspace directories, as
//! documents.

use anyhow::Context;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use walkdir::WalkDir;

use crate::build::{Build, Project};
use crate::catalog::{DocumentDescriptor, assign_next_id};
use crate::config::DocumentConfig;
use crate::io::LocalFileReader;
use crate::pattern::ArtifactPattern;
use crate::site::{SiteCatalog, SiteDocument};
use crate::zip::{ZipArchive, ZipError};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("No artifacts found for {pattern}")]
    NoArtifacts { pattern: String },

    #[error("{artifact} seems not a zip file: {source}")]
    NotAZip {
        artifact: String,
        source: ZipError,
    },

    #[error("No artifacts to publish as documents")]
    NoDocuments,

    #[error("{title}: directory {directory} is not inside the workspace")]
    InvalidDirectory { title: String, directory: String },

    #[error("{title}: {} does not exist", .path.display())]
    MissingDirectory { title: String, path: PathBuf },

    #[error("Document id {id} is used more than once")]
    DuplicateId { id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Turns matching artifacts into documents attached to their build, and
/// workspace directories into the project's directory documents.
///
/// Catalog updates go through one lock, so concurrent publishes never hand
/// out the same id twice.
#[derive(Default)]
pub struct Publisher {
    lock: Mutex<()>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the artifacts of `build` selected by `configs`.
    ///
    /// Every config must match at least one artifact and every match must
    /// be a ZIP archive; otherwise nothing is published. New documents are
    /// appended after the ones already attached to the build. Returns the
    /// documents added, with their ids.
    pub async fn publish(
        &self,
        build: &Build,
        configs: &[DocumentConfig],
    ) -> Result<Vec<DocumentDescriptor>, PublishError> {
        tracing::info!(build = %build.display_name(), "Publishing artifacts as documents");

        let artifacts_dir = build.artifacts_dir();
        let mut docs = Vec::new();

        for config in configs {
            let files = scan_artifacts(&artifacts_dir, &config.artifacts_pattern)?;

            if files.is_empty() {
                tracing::error!(pattern = %config.artifacts_pattern, "No artifacts found");
                return Err(PublishError::NoArtifacts {
                    pattern: config.artifacts_pattern.clone(),
                });
            }

            for file in &files {
                check_zip(&artifacts_dir.join(file)).await.map_err(|source| {
                    tracing::error!(artifact = %file, error = %source, "Artifact is not a zip file");
                    PublishError::NotAZip {
                        artifact: file.clone(),
                        source,
                    }
                })?;

                let title = if files.len() <= 1 {
                    config.title.clone()
                } else {
                    format!("{}({})", config.title, file)
                };

                tracing::info!(artifact = %file, title = %title, "Found document archive");
                docs.push(DocumentDescriptor {
                    id: None,
                    archive_name: file.clone(),
                    title,
                    initial_path: config.initial_path.clone(),
                    index_file_names: config.index_file_names(),
                });
            }
        }

        if docs.is_empty() {
            return Err(PublishError::NoDocuments);
        }

        let _guard = self.lock.lock().await;

        let mut catalog = build.load_catalog()?.unwrap_or_default();
        let first_new = catalog.len();
        catalog.extend_assigning_ids(docs);
        build.save_catalog(&catalog)?;

        let added = catalog.documents.split_off(first_new);
        tracing::info!(
            build = %build.display_name(),
            added = added.len(),
            "Published documents"
        );
        Ok(added)
    }

    /// Copy workspace directories into the project as directory documents.
    ///
    /// Everything published before is replaced. Documents without an id
    /// get the next free one among `documents`. Every directory is checked
    /// before anything is copied, and the copy is staged beside the site
    /// directory, so a failure leaves the previous documents in place.
    /// Returns the published documents, with their ids.
    pub async fn publish_site(
        &self,
        project: &Project,
        workspace: &Path,
        documents: &[SiteDocument],
    ) -> Result<Vec<SiteDocument>, PublishError> {
        tracing::info!(workspace = %workspace.display(), "Publishing directories as documents");

        if documents.is_empty() {
            return Err(PublishError::NoDocuments);
        }

        let mut docs: Vec<SiteDocument> = documents.iter().cloned().map(SiteDocument::normalized).collect();
        for i in 0..docs.len() {
            if docs[i].id.is_none() {
                let id = assign_next_id(&docs);
                docs[i].id = Some(id);
            }
        }

        let mut seen = HashSet::new();
        for id in docs.iter().filter_map(|doc| doc.id.as_deref()) {
            if !seen.insert(id) {
                return Err(PublishError::DuplicateId { id: id.to_string() });
            }
        }

        let mut sources = Vec::with_capacity(docs.len());
        for doc in &docs {
            let Some(relative) = doc.relative_directory() else {
                tracing::error!(title = %doc.title, directory = ?doc.directory, "Directory is outside the workspace");
                return Err(PublishError::InvalidDirectory {
                    title: doc.title.clone(),
                    directory: doc.directory.clone().unwrap_or_default(),
                });
            };

            let source = workspace.join(&relative);
            if !source.is_dir() {
                tracing::error!(title = %doc.title, path = %source.display(), "Directory does not exist");
                return Err(PublishError::MissingDirectory {
                    title: doc.title.clone(),
                    path: source,
                });
            }
            sources.push(source);
        }

        let _guard = self.lock.lock().await;

        let site_dir = project.site_dir();
        let catalog = SiteCatalog::new(docs);
        let catalog = tokio::task::spawn_blocking(move || {
            replace_site(&site_dir, &catalog, &sources)?;
            Ok::<_, anyhow::Error>(catalog)
        })
        .await
        .map_err(anyhow::Error::from)??;

        tracing::info!(published = catalog.documents.len(), "Published directory documents");
        Ok(catalog.documents)
    }
}

/// Stage the copies and the catalog, then swap them in for the site
/// directory.
fn replace_site(site_dir: &Path, catalog: &SiteCatalog, sources: &[PathBuf]) -> anyhow::Result<()> {
    let staging = site_dir.with_extension("staging");
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("Failed to clear {}", staging.display()))?;
    }
    fs::create_dir_all(&staging).with_context(|| format!("Failed to create {}", staging.display()))?;

    // A workspace may contain the project itself
    let excluded: Vec<PathBuf> = [site_dir, staging.as_path()]
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();

    for (doc, source) in catalog.documents.iter().zip(sources) {
        let id = doc.id.as_deref().unwrap_or_default();
        let copied = copy_directory(source, &staging.join(id), doc.recursive, &excluded)?;
        tracing::info!(title = %doc.title, files = copied, "Copied directory");
    }
    catalog.save(&staging)?;

    if site_dir.exists() {
        fs::remove_dir_all(site_dir)
            .with_context(|| format!("Failed to remove {}", site_dir.display()))?;
    }
    fs::rename(&staging, site_dir)
        .with_context(|| format!("Failed to replace {}", site_dir.display()))?;
    Ok(())
}

/// Copy the regular files under `source` to `target`, descending into
/// subdirectories only when `recursive`. Returns the number of files.
fn copy_directory(source: &Path, target: &Path, recursive: bool, excluded: &[PathBuf]) -> anyhow::Result<usize> {
    fs::create_dir_all(target).with_context(|| format!("Failed to create {}", target.display()))?;

    let walker = WalkDir::new(source)
        .follow_links(true)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry.path().canonicalize().is_ok_and(|p| excluded.contains(&p)))
        });

    let mut copied = 0;
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let dest = target.join(entry.path().strip_prefix(source)?);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &dest)
            .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        copied += 1;
    }

    Ok(copied)
}

/// Artifact paths under `dir` matching `pattern`, `/`-separated and sorted.
pub fn scan_artifacts(dir: &Path, pattern: &str) -> anyhow::Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = ArtifactPattern::new(pattern);
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir)?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if pattern.matches(&relative) {
            files.push(relative);
        }
    }

    files.sort();
    Ok(files)
}

async fn check_zip(path: &Path) -> Result<(), ZipError> {
    let reader = LocalFileReader::new(path)?;
    ZipArchive::open(Arc::new(reader)).await?;
    Ok(())
}
