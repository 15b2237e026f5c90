//! Shared fixtures: archive builder and scratch projects.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jiff::Timestamp;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use zipdocs::{
    DocumentCatalog, DocumentDescriptor, DocumentServer, FsContainerResolver, LocalArtifactStore,
    Project,
};

/// Builds ZIP archives for tests.
///
/// Parent directories get explicit entries unless
/// [`no_entry_for_directories`](TestZip::no_entry_for_directories) is set.
#[derive(Default)]
pub struct TestZip {
    files: Vec<(String, Vec<u8>)>,
    dirs: Vec<String>,
    no_entry_for_directories: bool,
    stored: bool,
}

impl TestZip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_entry_for_directories(mut self) -> Self {
        self.no_entry_for_directories = true;
        self
    }

    pub fn stored(mut self) -> Self {
        self.stored = true;
        self
    }

    pub fn file(mut self, name: &str, content: &str) -> Self {
        self.files.push((name.to_string(), content.as_bytes().to_vec()));
        self
    }

    /// An explicit directory entry, written even in no-entry mode.
    pub fn dir(mut self, name: &str) -> Self {
        self.dirs.push(name.trim_end_matches('/').to_string());
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let method = if self.stored {
            zip::CompressionMethod::Stored
        } else {
            zip::CompressionMethod::Deflated
        };
        let options = SimpleFileOptions::default().compression_method(method);

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let mut written_dirs = BTreeSet::new();

        for dir in &self.dirs {
            if written_dirs.insert(dir.clone()) {
                writer.add_directory(format!("{dir}/"), options).unwrap();
            }
        }

        for (name, content) in &self.files {
            if !self.no_entry_for_directories {
                let segments: Vec<&str> = name.split('/').collect();
                let mut parent = String::new();
                for segment in &segments[..segments.len() - 1] {
                    if !parent.is_empty() {
                        parent.push('/');
                    }
                    parent.push_str(segment);
                    if written_dirs.insert(parent.clone()) {
                        writer.add_directory(format!("{parent}/"), options).unwrap();
                    }
                }
            }

            writer.start_file(name.as_str(), options).unwrap();
            writer.write_all(content).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, self.to_bytes()).unwrap();
    }
}

/// Rewrite the compression method of `name` to one no reader supports, in
/// both the local and the central header.
pub fn break_compression(bytes: &mut [u8], name: &str) {
    let mut patched = 0;

    for i in 0..bytes.len().saturating_sub(46) {
        let (name_len_at, name_at, method_at) = match &bytes[i..i + 4] {
            b"PK\x03\x04" => (i + 26, i + 30, i + 8),
            b"PK\x01\x02" => (i + 28, i + 46, i + 10),
            _ => continue,
        };
        let name_len = u16::from_le_bytes([bytes[name_len_at], bytes[name_len_at + 1]]) as usize;
        if bytes.get(name_at..name_at + name_len) == Some(name.as_bytes()) {
            bytes[method_at..method_at + 2].copy_from_slice(&99u16.to_le_bytes());
            patched += 1;
        }
    }

    assert_eq!(patched, 2, "entry {name} not found in both headers");
}

/// Append an archive comment to a ZIP written without one.
pub fn add_comment(bytes: &mut Vec<u8>, comment: &str) {
    let eocd = bytes.len() - 22;
    assert_eq!(&bytes[eocd..eocd + 4], b"PK\x05\x06");
    bytes[eocd + 20..eocd + 22].copy_from_slice(&(comment.len() as u16).to_le_bytes());
    bytes.extend_from_slice(comment.as_bytes());
}

/// The archive used by most scenarios.
pub fn site_zip() -> TestZip {
    TestZip::new()
        .file("index.html", "Default top page.")
        .file("subdir/index.html", "Page in a sub directory.")
        .file("subdir/index.htm", "Page in a sub directory 2.")
        .file("subdir/default.html", "Alternate page in a sub directory.")
        .file("subdir/default.htm", "Alternate page in a sub directory 2.")
        .file("subdir/content.txt", "Plain content.")
        .file("subdir2/index.htm", "Only the htm page.")
        .file("start/begin.html", "Start here.")
}

pub fn doc(id: &str, archive: &str) -> DocumentDescriptor {
    DocumentDescriptor {
        id: Some(id.to_string()),
        archive_name: archive.to_string(),
        title: format!("Document {id}"),
        initial_path: None,
        index_file_names: Vec::new(),
    }
}

/// A scratch project directory.
pub struct TestProject {
    pub dir: TempDir,
    pub project: Project,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path());
        Self { dir, project }
    }

    pub fn artifact_path(&self, build: u64, name: &str) -> PathBuf {
        self.project.build(build).artifacts_dir().join(name)
    }

    pub fn add_zip(&self, build: u64, name: &str, zip: &TestZip) -> PathBuf {
        let path = self.artifact_path(build, name);
        zip.write(&path);
        path
    }

    pub fn add_file(&self, build: u64, name: &str, content: &[u8]) -> PathBuf {
        let path = self.artifact_path(build, name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn set_documents(&self, build: u64, documents: Vec<DocumentDescriptor>) {
        self.project
            .build(build)
            .save_catalog(&DocumentCatalog::new(documents))
            .unwrap();
    }

    pub fn server(&self) -> DocumentServer {
        DocumentServer::new(
            Arc::new(FsContainerResolver::new(self.project.clone())),
            Arc::new(LocalArtifactStore::new(self.project.clone())),
        )
    }
}

/// Modification time of a file, truncated to whole seconds.
pub fn mtime(path: &Path) -> Timestamp {
    let modified = fs::metadata(path).unwrap().modified().unwrap();
    let ts = Timestamp::try_from(modified).unwrap();
    Timestamp::from_second(ts.as_second()).unwrap()
}

/// ZIP64 values a central directory header can be made to claim.
#[derive(Default, Clone, Copy)]
pub struct Zip64Claim {
    pub uncompressed_size: Option<u64>,
    pub lfh_offset: Option<u64>,
}

/// A single deflated entry whose central directory takes its uncompressed
/// size and header offset from a ZIP64 extra field when claimed.
pub fn zip64_archive(name: &str, content: &str, claim: Zip64Claim) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::DeflateEncoder;

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut crc = flate2::Crc::new();
    crc.update(content.as_bytes());
    let crc = crc.sum();

    let mut out = Vec::new();

    // Local file header with the real sizes
    out.extend_from_slice(b"PK\x03\x04");
    out.extend_from_slice(&20u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&(content.len() as u32).to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&compressed);

    let mut extra = Vec::new();
    if let Some(size) = claim.uncompressed_size {
        extra.extend_from_slice(&size.to_le_bytes());
    }
    if let Some(offset) = claim.lfh_offset {
        extra.extend_from_slice(&offset.to_le_bytes());
    }
    let saturated = |claimed: Option<u64>, real: u32| match claimed {
        Some(_) => 0xFFFF_FFFFu32,
        None => real,
    };

    let cd_offset = out.len();
    out.extend_from_slice(b"PK\x01\x02");
    out.extend_from_slice(&45u16.to_le_bytes());
    out.extend_from_slice(&45u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    out.extend_from_slice(&saturated(claim.uncompressed_size, content.len() as u32).to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    let extra_len = if extra.is_empty() { 0 } else { extra.len() + 4 };
    out.extend_from_slice(&(extra_len as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&saturated(claim.lfh_offset, 0).to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    if !extra.is_empty() {
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&extra);
    }
    let cd_size = out.len() - cd_offset;

    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&(cd_size as u32).to_le_bytes());
    out.extend_from_slice(&(cd_offset as u32).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// [`zip64_archive`] claiming only an uncompressed size.
pub fn zip64_size_claim(name: &str, content: &str, claimed: u64) -> Vec<u8> {
    zip64_archive(
        name,
        content,
        Zip64Claim {
            uncompressed_size: Some(claimed),
            ..Zip64Claim::default()
        },
    )
}
