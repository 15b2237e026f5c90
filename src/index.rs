//! Path resolution inside a single archive.
//!
//! Maps a request subpath to a servable entry, deciding on the way whether
//! the path names a directory and, if so, which index file stands in for
//! it.

use crate::io::ReadAt;
use crate::zip::{ZipArchive, ZipError, ZipFileEntry};

/// Index files tried when a document does not configure its own.
pub const DEFAULT_INDEX_FILES: &[&str] = &["index.html", "index.htm"];

/// Resolves relative paths against one opened archive.
pub struct ArchiveIndex<'a, R: ReadAt + ?Sized> {
    archive: &'a ZipArchive<R>,
}

impl<'a, R: ReadAt + ?Sized> ArchiveIndex<'a, R> {
    pub fn new(archive: &'a ZipArchive<R>) -> Self {
        Self { archive }
    }

    /// Whether `path` names a directory in the archive.
    ///
    /// The root (empty or `/`) always does. An existing entry is a
    /// directory when flagged as one or when it has no readable content.
    /// A path without an entry of its own is a directory when some entry
    /// lives below it.
    pub async fn is_directory(&self, path: &str) -> Result<bool, ZipError> {
        if path.is_empty() || path == "/" {
            return Ok(true);
        }
        let path = path.strip_suffix('/').unwrap_or(path);

        if let Some(entry) = self.archive.by_name(path) {
            return self.entry_is_directory(entry).await;
        }

        let prefix = format!("{path}/");
        Ok(self
            .archive
            .entries()
            .iter()
            .any(|e| e.file_name.starts_with(&prefix)))
    }

    /// Resolve `path` to the entry to serve.
    ///
    /// A file path resolves to itself. A directory resolves to the first
    /// candidate of `index_files` (or [`DEFAULT_INDEX_FILES`] when empty)
    /// that exists below it and is not a directory itself. Returns
    /// `Ok(None)` when nothing matches.
    pub async fn resolve_entry(
        &self,
        path: &str,
        index_files: &[String],
    ) -> Result<Option<&'a ZipFileEntry>, ZipError> {
        let path = path.strip_suffix('/').unwrap_or(path);

        if !self.is_directory(path).await? {
            if let Some(entry) = self.archive.by_name(path) {
                return Ok(Some(entry));
            }
        }

        let candidates: Vec<&str> = if index_files.is_empty() {
            DEFAULT_INDEX_FILES.to_vec()
        } else {
            index_files.iter().map(String::as_str).collect()
        };

        for candidate in candidates {
            let candidate_path = if path.is_empty() {
                candidate.to_string()
            } else {
                format!("{path}/{candidate}")
            };

            if let Some(entry) = self.archive.by_name(&candidate_path) {
                if !self.entry_is_directory(entry).await? {
                    return Ok(Some(entry));
                }
            }
        }

        Ok(None)
    }

    async fn entry_is_directory(&self, entry: &ZipFileEntry) -> Result<bool, ZipError> {
        if entry.is_directory() {
            return Ok(true);
        }

        // Some writers leave directories as plain entries with no usable data.
        match self.archive.open_entry(entry).await {
            Ok(_) => Ok(false),
            Err(e) if e.is_format_error() => Ok(true),
            Err(e) => Err(e),
        }
    }
}
