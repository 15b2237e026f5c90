//! Serving document requests out of ZIP artifacts.
//!
//! [`DocumentServer::handle`] takes a request addressed to a build (or to
//! the project) and a path of the form `{documentId}/{subpath}`, and
//! decides what to answer:
//!
//! 1. Split off the document id; no id is a 404.
//! 2. Resolve the build through the [`ContainerResolver`] and look the id
//!    up in its catalog; either missing is a 404.
//! 3. Open the artifact through the [`ArtifactStore`]. A missing artifact is
//!    a 404, one that is not a regular file or not a ZIP archive is a 403.
//! 4. A directory requested without a trailing slash is redirected to the
//!    same URL with the slash appended.
//! 5. Otherwise the subpath, or an index file below it, is served with the
//!    artifact's modification time as `Last-Modified`. A fresh enough
//!    `If-Modified-Since` gets a 304 instead.
//!
//! Every request opens its own archive handle and drops it before
//! returning.

use jiff::Timestamp;
use std::sync::Arc;

use crate::build::{ContainerResolver, RequestContext};
use crate::catalog::{normalize_subpath, parse_request_path};
use crate::index::ArchiveIndex;
use crate::store::{Artifact, ArtifactStore};
use crate::zip::{ZipArchive, ZipError};

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    pub context: RequestContext,
    /// Path after the mount point: `{documentId}/{subpath}`.
    pub rest_of_path: String,
    /// Path of the request URI, used to detect a trailing slash and to build
    /// redirects.
    pub request_path: String,
    pub query: Option<String>,
    pub if_modified_since: Option<Timestamp>,
}

impl DocumentRequest {
    pub fn new(context: RequestContext, request_path: impl Into<String>, rest_of_path: impl Into<String>) -> Self {
        Self {
            context,
            rest_of_path: rest_of_path.into(),
            request_path: request_path.into(),
            query: None,
            if_modified_since: None,
        }
    }

    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_if_modified_since(mut self, since: Option<Timestamp>) -> Self {
        self.if_modified_since = since;
        self
    }

    /// The request URL with `suffix` appended to its path, query kept.
    pub(crate) fn location(&self, suffix: &str) -> String {
        match &self.query {
            Some(q) => format!("{}{}?{}", self.request_path, suffix, q),
            None => format!("{}{}", self.request_path, suffix),
        }
    }
}

/// Entry content ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryContent {
    pub body: Vec<u8>,
    /// Uncompressed size from the central directory.
    pub content_length: u64,
    /// Base name of the entry, for content type inference.
    pub file_name: String,
    pub last_modified: Timestamp,
}

/// What to answer a [`DocumentRequest`] with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentResponse {
    Redirect { location: String },
    NotFound,
    Forbidden,
    NotModified { last_modified: Timestamp },
    Content(EntryContent),
}

impl DocumentResponse {
    pub fn status(&self) -> u16 {
        match self {
            DocumentResponse::Redirect { .. } => 302,
            DocumentResponse::NotFound => 404,
            DocumentResponse::Forbidden => 403,
            DocumentResponse::NotModified { .. } => 304,
            DocumentResponse::Content(_) => 200,
        }
    }
}

/// Serves documents from the artifacts of resolved builds.
#[derive(Clone)]
pub struct DocumentServer {
    resolver: Arc<dyn ContainerResolver>,
    store: Arc<dyn ArtifactStore>,
}

impl DocumentServer {
    pub fn new(resolver: Arc<dyn ContainerResolver>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { resolver, store }
    }

    pub async fn handle(&self, request: &DocumentRequest) -> DocumentResponse {
        let Some((id, rest)) = parse_request_path(&request.rest_of_path) else {
            return DocumentResponse::NotFound;
        };

        let container = match self.resolver.resolve(request.context).await {
            Ok(Some(container)) => container,
            Ok(None) => {
                tracing::warn!(url = %request.request_path, "No build found for url");
                return DocumentResponse::NotFound;
            }
            Err(e) => {
                tracing::error!(url = %request.request_path, error = %e, "Failed to resolve build");
                return DocumentResponse::NotFound;
            }
        };

        let Some(doc) = container.catalog.lookup_by_id(id) else {
            return DocumentResponse::NotFound;
        };

        let build = &container.display_name;
        let artifact = &doc.archive_name;

        let reader = match self.store.open(container.build_number, artifact).await {
            Ok(Artifact::Found(reader)) => reader,
            Ok(Artifact::Missing) => {
                tracing::warn!(%artifact, %build, "Artifact does not exist");
                return DocumentResponse::NotFound;
            }
            Ok(Artifact::NotAFile) => {
                tracing::warn!(%artifact, %build, "Artifact is not a file");
                return DocumentResponse::Forbidden;
            }
            Err(e) => {
                tracing::error!(%artifact, %build, error = %e, "Failed to open artifact");
                return DocumentResponse::NotFound;
            }
        };

        let last_modified = reader
            .last_modified()
            .and_then(|t| Timestamp::from_second(t.as_second()).ok())
            .unwrap_or(Timestamp::UNIX_EPOCH);

        let archive = match ZipArchive::open(reader).await {
            Ok(archive) => archive,
            Err(e) => {
                tracing::warn!(%artifact, %build, error = %e, "Artifact is not a zip file");
                return failure_response(&e);
            }
        };

        let path = normalize_subpath(rest);
        let trailing_slash = request.request_path.ends_with('/');

        if path.is_empty() && !trailing_slash {
            if let Some(initial) = doc.initial_path.as_deref() {
                let initial = initial.trim_start_matches('/');
                if !initial.is_empty() {
                    return DocumentResponse::Redirect {
                        location: request.location(&format!("/{initial}")),
                    };
                }
            }
        }

        let index = ArchiveIndex::new(&archive);

        if !path.is_empty() && !trailing_slash {
            match index.is_directory(&path).await {
                Ok(true) => {
                    return DocumentResponse::Redirect {
                        location: request.location("/"),
                    };
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(%artifact, %build, %path, error = %e, "Failed to inspect archive");
                    return failure_response(&e);
                }
            }
        }

        let entry = match index.resolve_entry(&path, &doc.index_file_names).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return DocumentResponse::NotFound,
            Err(e) => {
                tracing::error!(%artifact, %build, %path, error = %e, "Failed to resolve entry");
                return failure_response(&e);
            }
        };

        if let Some(since) = request.if_modified_since {
            if since >= last_modified {
                return DocumentResponse::NotModified { last_modified };
            }
        }

        match archive.read_entry(entry).await {
            Ok(body) => DocumentResponse::Content(EntryContent {
                body,
                content_length: entry.uncompressed_size,
                file_name: entry.base_name().to_string(),
                last_modified,
            }),
            Err(e) => {
                tracing::error!(%artifact, %build, entry = %entry.file_name, error = %e, "Failed to read entry");
                failure_response(&e)
            }
        }
    }
}

/// Broken archive content is refused; failing to read the source is
/// reported as a missing document.
fn failure_response(e: &ZipError) -> DocumentResponse {
    if e.is_format_error() {
        DocumentResponse::Forbidden
    } else {
        DocumentResponse::NotFound
    }
}
