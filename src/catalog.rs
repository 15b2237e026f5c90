//! Documents published from a build's archives.

use serde::{Deserialize, Serialize};

/// One archive served as a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDescriptor {
    /// Numeric string, unique within its catalog.
    pub id: Option<String>,
    /// Artifact path relative to the build's artifacts directory.
    pub archive_name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index_file_names: Vec<String>,
}

impl DocumentDescriptor {
    /// URL of the document relative to the mount point, pointing at the
    /// initial path when one is set.
    pub fn url(&self) -> String {
        let id = self.id.as_deref().unwrap_or_default();
        match &self.initial_path {
            Some(initial) => format!("{}/{}", id, initial.trim_start_matches('/')),
            None => format!("{}/", id),
        }
    }
}

/// The ordered list of documents attached to one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCatalog {
    pub documents: Vec<DocumentDescriptor>,
}

impl DocumentCatalog {
    pub fn new(documents: Vec<DocumentDescriptor>) -> Self {
        Self { documents }
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<&DocumentDescriptor> {
        self.documents
            .iter()
            .find(|doc| doc.id.as_deref() == Some(id))
    }

    /// Append documents, giving every one without an id the next free id.
    ///
    /// Callers publishing concurrently must serialize around this.
    pub fn extend_assigning_ids(&mut self, documents: impl IntoIterator<Item = DocumentDescriptor>) {
        for mut doc in documents {
            if doc.id.is_none() {
                doc.id = Some(assign_next_id(&self.documents));
            }
            self.documents.push(doc);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Anything listed under a document id.
pub trait Identified {
    fn id(&self) -> Option<&str>;
}

impl Identified for DocumentDescriptor {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Next document id: one more than the largest numeric id present.
///
/// Documents without an id, or with a non-numeric one, are ignored; the
/// first document gets `"1"`.
pub fn assign_next_id<D: Identified>(existing: &[D]) -> String {
    let max = existing
        .iter()
        .filter_map(Identified::id)
        .filter_map(|id| id.trim().parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    (max + 1).to_string()
}

/// Split a request path into the document id and the rest.
///
/// A leading slash is ignored. Returns `None` when there is no id segment.
pub fn parse_request_path(path: &str) -> Option<(&str, &str)> {
    let path = path.strip_prefix('/').unwrap_or(path);

    let (id, rest) = match path.split_once('/') {
        Some((id, rest)) => (id, rest),
        None => (path, ""),
    };

    if id.is_empty() {
        return None;
    }

    Some((id, rest))
}

/// Normalize a subpath for lookup: `/` separators, no leading or trailing
/// slashes.
pub fn normalize_subpath(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

/// Split a comma-separated index file list, dropping blanks.
pub fn split_index_files(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
