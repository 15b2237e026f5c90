//! Directory documents: folders copied out of a workspace into the project
//! and served file by file.
//!
//! ```text
//! <root>/site/documents.json     the published directory documents
//! <root>/site/<id>/...           copy of each document's directory
//! ```
//!
//! Requests use the same `{documentId}/{subpath}` shape as archive
//! documents and get the same [`DocumentResponse`] answers.

use anyhow::{Context, Result};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::build::Project;
use crate::catalog::{Identified, normalize_subpath, parse_request_path};
use crate::index::DEFAULT_INDEX_FILES;
use crate::server::{DocumentRequest, DocumentResponse, EntryContent};

pub(crate) const SITE_CATALOG_FILE: &str = "documents.json";

/// A workspace directory published as a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source directory relative to the workspace; the workspace itself
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Copy subdirectories too, not only the top-level files.
    #[serde(default)]
    pub recursive: bool,
    /// Page opened when the document root is requested without a slash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl SiteDocument {
    /// Trim every field and drop optional ones left blank.
    pub fn new(
        title: &str,
        description: Option<&str>,
        directory: Option<&str>,
        recursive: bool,
        file: Option<&str>,
    ) -> Self {
        Self {
            id: None,
            title: title.trim().to_string(),
            description: non_blank(description),
            directory: non_blank(directory),
            recursive,
            file: non_blank(file),
        }
    }

    pub(crate) fn normalized(self) -> Self {
        let mut normalized = Self::new(
            &self.title,
            self.description.as_deref(),
            self.directory.as_deref(),
            self.recursive,
            self.file.as_deref(),
        );
        normalized.id = non_blank(self.id.as_deref());
        normalized
    }

    /// The directory with `/` separators, or `None` when it climbs out of
    /// the workspace or is absolute.
    pub fn relative_directory(&self) -> Option<String> {
        let dir = self.directory.as_deref().unwrap_or_default().replace('\\', "/");
        let absolute = dir.starts_with('/') || Path::new(&dir).is_absolute() || dir.contains(':');
        if absolute || dir.split('/').any(|segment| segment == "..") {
            return None;
        }
        Some(dir.trim_end_matches('/').to_string())
    }

    /// URL of the document relative to the mount point.
    pub fn url(&self) -> String {
        let id = self.id.as_deref().unwrap_or_default();
        match &self.file {
            Some(file) => format!("{}/{}", id, file.trim_start_matches('/')),
            None => format!("{}/", id),
        }
    }
}

impl Identified for SiteDocument {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// The directory documents of a project, in publish order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCatalog {
    pub documents: Vec<SiteDocument>,
}

impl SiteCatalog {
    pub fn new(documents: Vec<SiteDocument>) -> Self {
        Self { documents }
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<&SiteDocument> {
        self.documents.iter().find(|doc| doc.id.as_deref() == Some(id))
    }

    /// The catalog under `site_dir`, if anything was published there.
    pub async fn load(site_dir: &Path) -> Result<Option<Self>> {
        let path = site_dir.join(SITE_CATALOG_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        let catalog = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(catalog))
    }

    pub(crate) fn save(&self, site_dir: &Path) -> Result<()> {
        let path = site_dir.join(SITE_CATALOG_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Serves directory documents from a project's site directory.
#[derive(Debug, Clone)]
pub struct SiteServer {
    site_dir: PathBuf,
}

impl SiteServer {
    pub fn new(project: &Project) -> Self {
        Self {
            site_dir: project.site_dir(),
        }
    }

    /// Answer `request` from the copied directories. The request context
    /// is ignored: directory documents belong to the project.
    pub async fn handle(&self, request: &DocumentRequest) -> DocumentResponse {
        let Some((id, rest)) = parse_request_path(&request.rest_of_path) else {
            return DocumentResponse::NotFound;
        };

        let catalog = match SiteCatalog::load(&self.site_dir).await {
            Ok(Some(catalog)) => catalog,
            Ok(None) => return DocumentResponse::NotFound,
            Err(e) => {
                tracing::error!(url = %request.request_path, error = %e, "Failed to load site documents");
                return DocumentResponse::NotFound;
            }
        };

        let Some(doc) = catalog.lookup_by_id(id) else {
            return DocumentResponse::NotFound;
        };

        let root = self.site_dir.join(id);
        if !root.is_dir() {
            tracing::warn!(document = %doc.title, "Directory document has no published files");
            return DocumentResponse::NotFound;
        }

        let path = normalize_subpath(rest);
        if path.split('/').any(|segment| segment == ".." || segment == ".") {
            return DocumentResponse::NotFound;
        }
        let trailing_slash = request.request_path.ends_with('/');

        if path.is_empty() && !trailing_slash {
            if let Some(file) = doc.file.as_deref() {
                let file = file.trim_start_matches('/');
                if !file.is_empty() {
                    return DocumentResponse::Redirect {
                        location: request.location(&format!("/{file}")),
                    };
                }
            }
        }

        let target = root.join(&path);
        let Ok(metadata) = tokio::fs::metadata(&target).await else {
            return DocumentResponse::NotFound;
        };

        let file = if metadata.is_dir() {
            if !path.is_empty() && !trailing_slash {
                return DocumentResponse::Redirect {
                    location: request.location("/"),
                };
            }
            match find_index_file(&target).await {
                Some(file) => file,
                None => return DocumentResponse::NotFound,
            }
        } else if metadata.is_file() {
            target
        } else {
            return DocumentResponse::Forbidden;
        };

        serve_file(&file, request.if_modified_since).await
    }
}

async fn find_index_file(dir: &Path) -> Option<PathBuf> {
    for name in DEFAULT_INDEX_FILES {
        let candidate = dir.join(name);
        if tokio::fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            return Some(candidate);
        }
    }
    None
}

async fn serve_file(path: &Path, if_modified_since: Option<Timestamp>) -> DocumentResponse {
    let last_modified = match tokio::fs::metadata(path).await {
        Ok(metadata) => modified_seconds(&metadata),
        Err(_) => return DocumentResponse::NotFound,
    };

    if let Some(since) = if_modified_since {
        if since >= last_modified {
            return DocumentResponse::NotModified { last_modified };
        }
    }

    match tokio::fs::read(path).await {
        Ok(body) => DocumentResponse::Content(EntryContent {
            content_length: body.len() as u64,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            body,
            last_modified,
        }),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read site file");
            DocumentResponse::NotFound
        }
    }
}

/// Modification time truncated to the whole seconds HTTP dates carry.
fn modified_seconds(metadata: &std::fs::Metadata) -> Timestamp {
    metadata
        .modified()
        .ok()
        .and_then(|t| Timestamp::try_from(t).ok())
        .and_then(|t| Timestamp::from_second(t.as_second()).ok())
        .unwrap_or(Timestamp::UNIX_EPOCH)
}
