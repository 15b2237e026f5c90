//! # zipdocs
//!
//! Serve documentation straight out of ZIP build artifacts.
//!
//! A build publishes some of its archived artifacts as documents. Each
//! document gets a numeric id, and requests of the form
//! `{documentId}/{subpath}` are answered from inside the archive without
//! extracting it: directories redirect to their slash-terminated form,
//! directory requests fall back to an index file, and `If-Modified-Since`
//! is honored against the archive's modification time.
//!
//! ## Features
//!
//! - Own ZIP reader (ZIP64, STORED and DEFLATE) over local files or remote
//!   artifact hosts using HTTP Range requests
//! - Directory detection for archives written without directory entries
//! - Configurable index files per document
//! - Ant-style artifact patterns for publishing
//! - Directory documents: workspace folders copied into the project and
//!   served the same way
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zipdocs::{
//!     DocumentRequest, DocumentServer, FsContainerResolver, LocalArtifactStore, Project,
//!     RequestContext,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let project = Project::new("/var/lib/ci/my-project");
//!     let server = DocumentServer::new(
//!         Arc::new(FsContainerResolver::new(project.clone())),
//!         Arc::new(LocalArtifactStore::new(project)),
//!     );
//!
//!     let request = DocumentRequest::new(RequestContext::Build(12), "/builds/12/docs/1/", "1/");
//!     let response = server.handle(&request).await;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod http_date;
pub mod index;
pub mod io;
pub mod pattern;
pub mod publish;
pub mod server;
pub mod site;
pub mod store;
pub mod transport;
pub mod zip;

pub use build::{ContainerHandle, ContainerResolver, FsContainerResolver, Project, RequestContext};
pub use catalog::{DocumentCatalog, DocumentDescriptor, Identified, assign_next_id};
pub use cli::Cli;
pub use index::{ArchiveIndex, DEFAULT_INDEX_FILES};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use publish::{PublishError, Publisher};
pub use server::{DocumentRequest, DocumentResponse, DocumentServer, EntryContent};
pub use site::{SiteCatalog, SiteDocument, SiteServer};
pub use store::{Artifact, ArtifactStore, HttpArtifactStore, LocalArtifactStore};
pub use crate::zip::{ZipArchive, ZipError, ZipFileEntry};
