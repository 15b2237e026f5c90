//! HTTP front end for the [`DocumentServer`] and the [`SiteServer`].
//!
//! Routes:
//!
//! - `GET /docs/{documentId}/{subpath}`: the project's newest documented build
//! - `GET /builds/{number}/docs/{documentId}/{subpath}`: a specific build
//! - `GET /site/{documentId}/{subpath}`: the project's directory documents

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use jiff::Timestamp;
use std::net::SocketAddr;

use crate::build::RequestContext;
use crate::http_date::{format_http_date, parse_http_date};
use crate::server::{DocumentRequest, DocumentResponse, DocumentServer};
use crate::site::SiteServer;

/// Build the router serving archive and directory documents.
pub fn router(server: DocumentServer, site: SiteServer) -> Router {
    let archives = Router::new()
        .route("/docs/{*rest}", get(project_document))
        .route("/builds/{number}/docs/{*rest}", get(build_document))
        .with_state(server);

    let directories = Router::new()
        .route("/site/{*rest}", get(site_document))
        .with_state(site);

    archives.merge(directories)
}

/// Serve until Ctrl-C.
pub async fn serve(server: DocumentServer, site: SiteServer, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Serving documents");

    axum::serve(listener, router(server, site))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}

async fn project_document(
    State(server): State<DocumentServer>,
    Path(rest): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    respond(&server, RequestContext::Project, rest, &uri, &headers).await
}

async fn build_document(
    State(server): State<DocumentServer>,
    Path((number, rest)): Path<(u64, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    respond(&server, RequestContext::Build(number), rest, &uri, &headers).await
}

async fn site_document(
    State(site): State<SiteServer>,
    Path(rest): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = document_request(RequestContext::Project, rest, &uri, &headers);
    let response = site.handle(&request).await;
    tracing::debug!(path = %uri.path(), status = response.status(), "Handled site request");
    into_http(response)
}

async fn respond(
    server: &DocumentServer,
    context: RequestContext,
    rest: String,
    uri: &Uri,
    headers: &HeaderMap,
) -> Response {
    let request = document_request(context, rest, uri, headers);
    let response = server.handle(&request).await;
    tracing::debug!(path = %uri.path(), status = response.status(), "Handled request");
    into_http(response)
}

fn document_request(context: RequestContext, rest: String, uri: &Uri, headers: &HeaderMap) -> DocumentRequest {
    let if_modified_since = headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date);

    DocumentRequest::new(context, uri.path(), rest)
        .with_query(uri.query().map(str::to_string))
        .with_if_modified_since(if_modified_since)
}

fn into_http(response: DocumentResponse) -> Response {
    match response {
        DocumentResponse::Redirect { location } => match HeaderValue::from_str(&location) {
            Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
            Err(_) => StatusCode::NOT_FOUND.into_response(),
        },
        DocumentResponse::NotFound => StatusCode::NOT_FOUND.into_response(),
        DocumentResponse::Forbidden => StatusCode::FORBIDDEN.into_response(),
        DocumentResponse::NotModified { last_modified } => {
            let mut headers = HeaderMap::new();
            insert_last_modified(&mut headers, last_modified);
            (StatusCode::NOT_MODIFIED, headers).into_response()
        }
        DocumentResponse::Content(content) => {
            let mut headers = HeaderMap::new();
            insert_last_modified(&mut headers, content.last_modified);
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static(content_type(&content.file_name)),
            );
            headers.insert(CONTENT_LENGTH, HeaderValue::from(content.content_length));
            (StatusCode::OK, headers, Body::from(content.body)).into_response()
        }
    }
}

fn insert_last_modified(headers: &mut HeaderMap, last_modified: Timestamp) {
    if let Some(value) = format_http_date(last_modified).and_then(|s| HeaderValue::from_str(&s).ok()) {
        headers.insert(LAST_MODIFIED, value);
    }
}

/// Content type guessed from a file name's extension.
pub fn content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" | "md" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type("STYLE.CSS"), "text/css; charset=utf-8");
        assert_eq!(content_type("logo.png"), "image/png");
        assert_eq!(content_type("README"), "application/octet-stream");
    }
}
