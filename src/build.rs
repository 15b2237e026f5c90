//! Builds on disk and the resolver that picks the one a request is about.
//!
//! A project directory looks like:
//!
//! ```text
//! <root>/builds/<number>/archive/...        artifacts of the build
//! <root>/builds/<number>/documents.json     documents published from them
//! <root>/site/...                            directory documents
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::DocumentCatalog;

const BUILDS_DIR: &str = "builds";
const ARTIFACTS_DIR: &str = "archive";
const CATALOG_FILE: &str = "documents.json";
const SITE_DIR: &str = "site";

/// A directory holding numbered builds.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where directory documents are copied to.
    pub fn site_dir(&self) -> PathBuf {
        self.root.join(SITE_DIR)
    }

    pub fn build(&self, number: u64) -> Build {
        Build {
            number,
            dir: self.root.join(BUILDS_DIR).join(number.to_string()),
        }
    }

    /// All builds, newest first. Entries that are not numbered directories
    /// are skipped.
    pub fn builds_descending(&self) -> Result<Vec<Build>> {
        let dir = self.root.join(BUILDS_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut numbers = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("Failed to list {}", dir.display()))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(number) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok()) {
                numbers.push(number);
            }
        }

        numbers.sort_unstable_by(|a, b| b.cmp(a));
        Ok(numbers.into_iter().map(|n| self.build(n)).collect())
    }

    /// Newest build that has documents attached.
    pub fn last_documented_build(&self) -> Result<Option<(Build, DocumentCatalog)>> {
        for build in self.builds_descending()? {
            if let Some(catalog) = build.load_catalog()? {
                return Ok(Some((build, catalog)));
            }
        }
        Ok(None)
    }
}

/// One numbered build.
#[derive(Debug, Clone)]
pub struct Build {
    number: u64,
    dir: PathBuf,
}

impl Build {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.dir.join(ARTIFACTS_DIR)
    }

    pub fn display_name(&self) -> String {
        format!("#{}", self.number)
    }

    /// The documents attached to this build, if any were published.
    pub fn load_catalog(&self) -> Result<Option<DocumentCatalog>> {
        let path = self.dir.join(CATALOG_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let catalog = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(catalog))
    }

    /// Write the catalog through a temporary file so readers never see a
    /// partial document list.
    pub fn save_catalog(&self, catalog: &DocumentCatalog) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.dir.join(CATALOG_FILE);
        let tmp = self.dir.join(format!("{CATALOG_FILE}.tmp"));
        let content = serde_json::to_string_pretty(catalog)?;

        fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// What a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestContext {
    /// A specific build.
    Build(u64),
    /// The project as a whole; served from its newest documented build.
    Project,
}

/// The build serving a request, with its documents.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    pub build_number: u64,
    pub display_name: String,
    pub catalog: DocumentCatalog,
}

/// Finds the build whose archives a request should be served from.
#[async_trait]
pub trait ContainerResolver: Send + Sync {
    async fn resolve(&self, context: RequestContext) -> Result<Option<ContainerHandle>>;
}

/// Resolves builds from a project directory.
#[derive(Debug, Clone)]
pub struct FsContainerResolver {
    project: Project,
}

impl FsContainerResolver {
    pub fn new(project: Project) -> Self {
        Self { project }
    }
}

#[async_trait]
impl ContainerResolver for FsContainerResolver {
    async fn resolve(&self, context: RequestContext) -> Result<Option<ContainerHandle>> {
        let project = self.project.clone();

        // Directory scans and catalog reads are plain blocking file I/O
        tokio::task::spawn_blocking(move || {
            let found = match context {
                RequestContext::Build(number) => {
                    let build = project.build(number);
                    build.load_catalog()?.map(|catalog| (build, catalog))
                }
                RequestContext::Project => project.last_documented_build()?,
            };

            Ok::<_, anyhow::Error>(found.map(|(build, catalog)| ContainerHandle {
                build_number: build.number(),
                display_name: build.display_name(),
                catalog,
            }))
        })
        .await?
    }
}
