//! Where build artifacts are read from.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Duration;

use crate::build::Project;
use crate::io::{HttpRangeReader, LocalFileReader, ReadAt};

/// Outcome of looking up an artifact.
pub enum Artifact {
    Missing,
    /// The name exists but is not a regular file (a directory, say).
    NotAFile,
    Found(Arc<dyn ReadAt>),
}

/// Gives access to the archived artifacts of a build.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn open(&self, build_number: u64, archive_name: &str) -> Result<Artifact>;
}

/// Artifacts kept in the build directories of a local project.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    project: Project,
}

impl LocalArtifactStore {
    pub fn new(project: Project) -> Self {
        Self { project }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn open(&self, build_number: u64, archive_name: &str) -> Result<Artifact> {
        if !is_contained(archive_name) {
            return Ok(Artifact::Missing);
        }

        let path = self
            .project
            .build(build_number)
            .artifacts_dir()
            .join(archive_name);

        if !path.exists() {
            return Ok(Artifact::Missing);
        }
        if !path.is_file() {
            return Ok(Artifact::NotAFile);
        }

        let reader = LocalFileReader::new(&path)?;
        Ok(Artifact::Found(Arc::new(reader)))
    }
}

/// Artifacts published to a remote host as `<base>/<build>/<name>`, read
/// with HTTP Range requests.
#[derive(Debug, Clone)]
pub struct HttpArtifactStore {
    client: Client,
    base_url: String,
}

impl HttpArtifactStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, build_number: u64, archive_name: &str) -> String {
        format!("{}/{}/{}", self.base_url, build_number, archive_name)
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn open(&self, build_number: u64, archive_name: &str) -> Result<Artifact> {
        if !is_contained(archive_name) {
            return Ok(Artifact::Missing);
        }

        let url = self.url(build_number, archive_name);
        match HttpRangeReader::open(self.client.clone(), url).await? {
            Some(reader) => Ok(Artifact::Found(Arc::new(reader))),
            None => Ok(Artifact::Missing),
        }
    }
}

/// Whether a relative artifact name stays inside the artifacts directory.
fn is_contained(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn names_escaping_the_artifacts_dir_are_rejected() {
        assert!(is_contained("docs.zip"));
        assert!(is_contained("target/site/docs.zip"));
        assert!(!is_contained("../other/docs.zip"));
        assert!(!is_contained("/etc/passwd"));
        assert!(!is_contained(""));
    }

    #[test]
    fn remote_urls_join_build_and_name() {
        let store = HttpArtifactStore::new("https://artifacts.example.com/project/").unwrap();
        assert_eq!(
            store.url(12, "site/docs.zip"),
            "https://artifacts.example.com/project/12/site/docs.zip"
        );
    }

    #[tokio::test]
    async fn local_store_distinguishes_missing_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::new(tmp.path());
        let artifacts = project.build(1).artifacts_dir();
        fs::create_dir_all(artifacts.join("folder.zip")).unwrap();
        fs::write(artifacts.join("real.zip"), b"bytes").unwrap();

        let store = LocalArtifactStore::new(project);

        assert!(matches!(store.open(1, "absent.zip").await.unwrap(), Artifact::Missing));
        assert!(matches!(store.open(1, "folder.zip").await.unwrap(), Artifact::NotAFile));
        assert!(matches!(store.open(1, "../1/archive/real.zip").await.unwrap(), Artifact::Missing));

        match store.open(1, "real.zip").await.unwrap() {
            Artifact::Found(reader) => {
                assert_eq!(reader.size(), 5);
                assert!(reader.last_modified().is_some());
            }
            _ => panic!("expected the artifact to be found"),
        }
    }
}
