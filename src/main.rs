//! Main entry point for the zipdocs CLI application.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use zipdocs::cli::{CatArgs, Command, ListArgs, PublishArgs, PublishSiteArgs, ServeArgs};
use zipdocs::config::{self, DocumentConfig};
use zipdocs::{
    ArtifactStore, Cli, DocumentRequest, DocumentResponse, DocumentServer, FsContainerResolver,
    HttpArtifactStore, LocalArtifactStore, Project, Publisher, RequestContext, SiteCatalog,
    SiteDocument, SiteServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Publish(args) => publish(args).await,
        Command::PublishSite(args) => publish_site(args).await,
        Command::List(args) => list(args).await,
        Command::Cat(args) => cat(args).await,
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn document_server(project: Project, artifacts_url: Option<String>) -> Result<DocumentServer> {
    let store: Arc<dyn ArtifactStore> = match artifacts_url {
        Some(url) => Arc::new(HttpArtifactStore::new(url)?),
        None => Arc::new(LocalArtifactStore::new(project.clone())),
    };
    let resolver = Arc::new(FsContainerResolver::new(project));
    Ok(DocumentServer::new(resolver, store))
}

async fn serve(args: ServeArgs) -> Result<()> {
    let project = Project::new(args.project.root);
    let site = SiteServer::new(&project);
    let server = document_server(project, args.artifacts_url)?;
    zipdocs::transport::serve(server, site, args.listen).await
}

async fn publish(args: PublishArgs) -> Result<()> {
    let configs = match (&args.config, &args.title, &args.pattern) {
        (Some(path), _, _) => config::load_config(path)?,
        (None, Some(title), Some(pattern)) => config::validate(vec![DocumentConfig::new(
            title,
            pattern,
            args.initial_path.as_deref(),
            args.index_file.as_deref(),
        )])?,
        _ => bail!("Either --config or --title with --pattern is required"),
    };

    let project = Project::new(args.project.root);
    let build = project.build(args.build);
    if !build.exists() {
        bail!("Build {} does not exist in {}", args.build, project.root().display());
    }

    let added = Publisher::new().publish(&build, &configs).await?;
    for doc in &added {
        println!("{}", doc.archive_name);
    }

    Ok(())
}

async fn publish_site(args: PublishSiteArgs) -> Result<()> {
    let documents = match (&args.config, &args.title) {
        (Some(path), _) => config::load_site_config(path)?,
        (None, Some(title)) => config::validate_site(vec![SiteDocument::new(
            title,
            args.description.as_deref(),
            args.directory.as_deref(),
            args.recursive,
            args.file.as_deref(),
        )])?,
        _ => bail!("Either --config or --title is required"),
    };

    let project = Project::new(args.project.root);
    let published = Publisher::new()
        .publish_site(&project, &args.workspace, &documents)
        .await?;
    for doc in &published {
        println!("{}", doc.url());
    }

    Ok(())
}

async fn list(args: ListArgs) -> Result<()> {
    let project = Project::new(args.project.root);
    if args.site {
        return list_site(&project).await;
    }

    let (build, catalog) = match args.build {
        Some(number) => {
            let build = project.build(number);
            let catalog = build
                .load_catalog()?
                .with_context(|| format!("Build {} has no documents", number))?;
            (build, catalog)
        }
        None => project
            .last_documented_build()?
            .context("No build with documents")?,
    };

    println!("Build {}", build.display_name());
    println!("{:>4}  {:<30}  {:<30}  URL", "Id", "Title", "Archive");
    println!("{}", "-".repeat(90));
    for doc in &catalog.documents {
        println!(
            "{:>4}  {:<30}  {:<30}  {}",
            doc.id.as_deref().unwrap_or("-"),
            doc.title,
            doc.archive_name,
            doc.url()
        );
    }

    Ok(())
}

async fn list_site(project: &Project) -> Result<()> {
    let catalog = SiteCatalog::load(&project.site_dir())
        .await?
        .context("No directory documents")?;

    println!("{:>4}  {:<30}  {:<30}  URL", "Id", "Title", "Description");
    println!("{}", "-".repeat(90));
    for doc in &catalog.documents {
        println!(
            "{:>4}  {:<30}  {:<30}  {}",
            doc.id.as_deref().unwrap_or("-"),
            doc.title,
            doc.description.as_deref().unwrap_or(""),
            doc.url()
        );
    }

    Ok(())
}

async fn cat(args: CatArgs) -> Result<()> {
    let project = Project::new(args.project.root);

    let context = match args.build {
        Some(number) => RequestContext::Build(number),
        None => RequestContext::Project,
    };
    let request = DocumentRequest::new(context, format!("/{}", args.path), args.path.clone());

    let response = if args.site {
        SiteServer::new(&project).handle(&request).await
    } else {
        document_server(project, None)?.handle(&request).await
    };

    match response {
        DocumentResponse::Content(content) => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&content.body).await?;
            stdout.flush().await?;
            Ok(())
        }
        DocumentResponse::Redirect { location } => {
            bail!("{} is a directory (try {})", args.path, location.trim_start_matches('/'))
        }
        DocumentResponse::NotModified { .. } => Ok(()),
        DocumentResponse::NotFound => bail!("{}: not found", args.path),
        DocumentResponse::Forbidden => bail!("{}: not readable", args.path),
    }
}
