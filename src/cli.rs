use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zipdocs")]
#[command(version)]
#[command(about = "Serve documentation straight out of ZIP build artifacts", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipdocs publish --root ./project --build 12 --title Manual --pattern 'site/*.zip'\n  \
  zipdocs publish-site --root ./project --workspace . --title Site --directory target/site --recursive\n  \
  zipdocs serve --root ./project --listen 0.0.0.0:8080\n  \
  zipdocs cat --root ./project 1/index.html | less")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Only log warnings and errors (unless RUST_LOG is set)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve documents over HTTP
    Serve(ServeArgs),
    /// Publish ZIP artifacts of a build as documents
    Publish(PublishArgs),
    /// Publish workspace directories as the project's directory documents
    PublishSite(PublishSiteArgs),
    /// List the documents of a build, or the directory documents
    List(ListArgs),
    /// Write a document entry to stdout
    Cat(CatArgs),
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Project directory holding builds/<number>/
    #[arg(long, env = "ZIPDOCS_ROOT", value_name = "DIR")]
    pub root: PathBuf,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Address to listen on
    #[arg(long, env = "ZIPDOCS_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Read archives from <URL>/<build>/<artifact> instead of the project directory
    #[arg(long, env = "ZIPDOCS_ARTIFACTS_URL", value_name = "URL")]
    pub artifacts_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Build number whose artifacts are published
    #[arg(long)]
    pub build: u64,

    /// JSON file listing the documents to publish
    #[arg(long, value_name = "FILE", conflicts_with_all = ["title", "pattern"])]
    pub config: Option<PathBuf>,

    /// Title of the document
    #[arg(long, requires = "pattern")]
    pub title: Option<String>,

    /// Comma-separated artifact patterns, e.g. 'site/**/*.zip'
    #[arg(long, requires = "title")]
    pub pattern: Option<String>,

    /// Path to open first
    #[arg(long)]
    pub initial_path: Option<String>,

    /// Comma-separated index files (default: index.html,index.htm)
    #[arg(long)]
    pub index_file: Option<String>,
}

#[derive(Args, Debug)]
pub struct PublishSiteArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Directory the document directories are relative to
    #[arg(long, env = "ZIPDOCS_WORKSPACE", value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,

    /// JSON file listing the directories to publish
    #[arg(long, value_name = "FILE", conflicts_with_all = ["title", "directory"])]
    pub config: Option<PathBuf>,

    /// Title of the document
    #[arg(long)]
    pub title: Option<String>,

    /// Description shown in listings
    #[arg(long)]
    pub description: Option<String>,

    /// Directory to publish, relative to the workspace
    #[arg(long)]
    pub directory: Option<String>,

    /// Include subdirectories
    #[arg(long)]
    pub recursive: bool,

    /// Page to open first
    #[arg(long)]
    pub file: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Build number (default: newest build with documents)
    #[arg(long, conflicts_with = "site")]
    pub build: Option<u64>,

    /// List the directory documents instead
    #[arg(long)]
    pub site: bool,
}

#[derive(Args, Debug)]
pub struct CatArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Build number (default: newest build with documents)
    #[arg(long, conflicts_with = "site")]
    pub build: Option<u64>,

    /// Read from the directory documents instead
    #[arg(long)]
    pub site: bool,

    /// Document path: {documentId}/{subpath}
    #[arg(value_name = "PATH")]
    pub path: String,
}
