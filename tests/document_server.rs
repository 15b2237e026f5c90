mod common;

use jiff::{SignedDuration, Timestamp};

use common::{TestProject, TestZip, break_compression, doc, mtime, site_zip, zip64_size_claim};
use zipdocs::{DocumentRequest, DocumentResponse, DocumentServer, EntryContent, RequestContext};

fn build_request(build: u64, rest: &str) -> DocumentRequest {
    DocumentRequest::new(
        RequestContext::Build(build),
        format!("/builds/{build}/docs/{rest}"),
        rest,
    )
}

async fn get(server: &DocumentServer, rest: &str) -> DocumentResponse {
    server.handle(&build_request(1, rest)).await
}

fn content(response: DocumentResponse) -> EntryContent {
    match response {
        DocumentResponse::Content(content) => content,
        other => panic!("expected content, got {other:?}"),
    }
}

fn body(response: DocumentResponse) -> String {
    String::from_utf8(content(response).body).unwrap()
}

fn redirect(location: &str) -> DocumentResponse {
    DocumentResponse::Redirect {
        location: location.to_string(),
    }
}

/// Project with `docs.zip` published as document 1 of build 1.
fn site_project(zip: &TestZip) -> TestProject {
    let project = TestProject::new();
    project.add_zip(1, "docs.zip", zip);
    project.set_documents(1, vec![doc("1", "docs.zip")]);
    project
}

#[tokio::test]
async fn browse_a_published_archive() {
    let project = site_project(&site_zip());
    let server = project.server();

    assert_eq!(body(get(&server, "1/").await), "Default top page.");
    assert_eq!(get(&server, "1/subdir").await, redirect("/builds/1/docs/1/subdir/"));
    assert_eq!(body(get(&server, "1/subdir/").await), "Page in a sub directory.");
    assert_eq!(body(get(&server, "1/subdir/content.txt").await), "Plain content.");
    assert_eq!(body(get(&server, "1/subdir2/").await), "Only the htm page.");
}

#[tokio::test]
async fn document_root_is_served_with_or_without_slash() {
    let project = site_project(&site_zip());
    let server = project.server();

    assert_eq!(body(get(&server, "1").await), "Default top page.");
    assert_eq!(body(get(&server, "1/").await), "Default top page.");
}

#[tokio::test]
async fn archive_without_directory_entries() {
    let project = site_project(&site_zip().no_entry_for_directories());
    let server = project.server();

    assert_eq!(get(&server, "1/subdir").await, redirect("/builds/1/docs/1/subdir/"));
    assert_eq!(body(get(&server, "1/subdir/").await), "Page in a sub directory.");
    assert_eq!(get(&server, "1/start/").await, DocumentResponse::NotFound);
}

#[tokio::test]
async fn redirect_keeps_the_query() {
    let project = site_project(&site_zip());
    let server = project.server();

    let request = build_request(1, "1/subdir").with_query(Some("lang=en&v=2".to_string()));
    assert_eq!(
        server.handle(&request).await,
        redirect("/builds/1/docs/1/subdir/?lang=en&v=2")
    );
}

#[tokio::test]
async fn custom_index_files() {
    let project = TestProject::new();
    project.add_zip(1, "docs.zip", &site_zip());
    let mut document = doc("1", "docs.zip");
    document.index_file_names = vec!["default.htm".to_string(), "default.html".to_string()];
    project.set_documents(1, vec![document]);
    let server = project.server();

    assert_eq!(
        body(get(&server, "1/subdir/").await),
        "Alternate page in a sub directory 2."
    );
    // No default.htm at the root and the defaults are not consulted
    assert_eq!(get(&server, "1/").await, DocumentResponse::NotFound);
}

#[tokio::test]
async fn initial_path_redirect() {
    let project = TestProject::new();
    project.add_zip(1, "docs.zip", &site_zip());
    let mut document = doc("1", "docs.zip");
    document.initial_path = Some("/start/begin.html".to_string());
    project.set_documents(1, vec![document]);
    let server = project.server();

    assert_eq!(
        get(&server, "1").await,
        redirect("/builds/1/docs/1/start/begin.html")
    );
    assert_eq!(body(get(&server, "1/").await), "Default top page.");
    assert_eq!(body(get(&server, "1/start/begin.html").await), "Start here.");
}

#[tokio::test]
async fn unknown_documents_are_not_found() {
    let project = site_project(&site_zip());
    let server = project.server();

    assert_eq!(get(&server, "").await, DocumentResponse::NotFound);
    assert_eq!(get(&server, "/").await, DocumentResponse::NotFound);
    assert_eq!(get(&server, "2/").await, DocumentResponse::NotFound);
    assert_eq!(get(&server, "one/index.html").await, DocumentResponse::NotFound);
}

#[tokio::test]
async fn missing_entries_are_not_found() {
    let project = site_project(&site_zip());
    let server = project.server();

    assert_eq!(get(&server, "1/nothing.html").await, DocumentResponse::NotFound);
    assert_eq!(get(&server, "1/subdir/nothing/").await, DocumentResponse::NotFound);
}

#[tokio::test]
async fn missing_build_is_not_found() {
    let project = site_project(&site_zip());
    let server = project.server();

    let response = server.handle(&build_request(7, "1/")).await;
    assert_eq!(response, DocumentResponse::NotFound);
}

#[tokio::test]
async fn missing_artifact_is_not_found() {
    let project = TestProject::new();
    project.set_documents(1, vec![doc("1", "gone.zip")]);
    let server = project.server();

    assert_eq!(get(&server, "1/").await, DocumentResponse::NotFound);
}

#[tokio::test]
async fn directory_artifact_is_forbidden() {
    let project = TestProject::new();
    project.add_file(1, "site.zip/index.html", b"not an archive");
    project.set_documents(1, vec![doc("1", "site.zip")]);
    let server = project.server();

    assert_eq!(get(&server, "1/").await, DocumentResponse::Forbidden);
}

#[tokio::test]
async fn non_zip_artifact_is_forbidden() {
    let project = TestProject::new();
    project.add_file(1, "notes.txt", b"Just some words, no archive here.");
    project.set_documents(1, vec![doc("1", "notes.txt")]);
    let server = project.server();

    assert_eq!(get(&server, "1/").await, DocumentResponse::Forbidden);
    assert_eq!(get(&server, "1/index.html").await, DocumentResponse::Forbidden);
}

#[tokio::test]
async fn artifact_outside_the_build_is_not_served() {
    let project = site_project(&site_zip());
    project.add_zip(2, "docs.zip", &site_zip());
    project.set_documents(2, vec![doc("1", "../../1/archive/docs.zip")]);
    let server = project.server();

    let response = server.handle(&build_request(2, "1/")).await;
    assert_eq!(response, DocumentResponse::NotFound);
}

#[tokio::test]
async fn unreadable_entry_is_a_directory() {
    let mut bytes = TestZip::new()
        .stored()
        .no_entry_for_directories()
        .file("legacy", "")
        .file("index.html", "Top.")
        .to_bytes();
    break_compression(&mut bytes, "legacy");

    let project = TestProject::new();
    project.add_file(1, "docs.zip", &bytes);
    project.set_documents(1, vec![doc("1", "docs.zip")]);
    let server = project.server();

    assert_eq!(get(&server, "1/legacy").await, redirect("/builds/1/docs/1/legacy/"));
    assert_eq!(get(&server, "1/legacy/").await, DocumentResponse::NotFound);
}

#[tokio::test]
async fn content_metadata() {
    let project = TestProject::new();
    let path = project.add_zip(1, "docs.zip", &site_zip());
    project.set_documents(1, vec![doc("1", "docs.zip")]);
    let server = project.server();

    let served = content(get(&server, "1/subdir/content.txt").await);
    assert_eq!(served.file_name, "content.txt");
    assert_eq!(served.content_length, "Plain content.".len() as u64);
    assert_eq!(served.last_modified, mtime(&path));
}

#[tokio::test]
async fn conditional_requests() {
    let project = TestProject::new();
    let path = project.add_zip(1, "docs.zip", &site_zip());
    project.set_documents(1, vec![doc("1", "docs.zip")]);
    let server = project.server();
    let modified = mtime(&path);

    let same = build_request(1, "1/index.html").with_if_modified_since(Some(modified));
    assert_eq!(
        server.handle(&same).await,
        DocumentResponse::NotModified {
            last_modified: modified
        }
    );

    let later = build_request(1, "1/index.html")
        .with_if_modified_since(Some(modified + SignedDuration::from_hours(1)));
    assert_eq!(server.handle(&later).await.status(), 304);

    let earlier = build_request(1, "1/index.html")
        .with_if_modified_since(Some(modified - SignedDuration::from_secs(1)));
    assert_eq!(body(server.handle(&earlier).await), "Default top page.");

    // Directories still redirect first
    let dir = build_request(1, "1/subdir").with_if_modified_since(Some(modified));
    assert_eq!(server.handle(&dir).await.status(), 302);

    // And missing entries stay missing
    let missing = build_request(1, "1/nothing.html").with_if_modified_since(Some(Timestamp::MAX));
    assert_eq!(server.handle(&missing).await, DocumentResponse::NotFound);
}

#[tokio::test]
async fn project_context_uses_newest_documented_build() {
    let project = TestProject::new();
    project.add_zip(1, "docs.zip", &TestZip::new().file("index.html", "Build one."));
    project.set_documents(1, vec![doc("1", "docs.zip")]);
    project.add_zip(2, "docs.zip", &TestZip::new().file("index.html", "Build two."));
    project.set_documents(2, vec![doc("1", "docs.zip")]);
    // Newest build, nothing published
    project.add_zip(3, "docs.zip", &TestZip::new().file("index.html", "Build three."));
    let server = project.server();

    let request = DocumentRequest::new(RequestContext::Project, "/docs/1/", "1/");
    assert_eq!(body(server.handle(&request).await), "Build two.");

    let request = DocumentRequest::new(RequestContext::Project, "/docs/1/subdir", "1/subdir");
    assert_eq!(server.handle(&request).await, DocumentResponse::NotFound);
}

#[tokio::test]
async fn project_without_documents_is_not_found() {
    let project = TestProject::new();
    project.add_zip(1, "docs.zip", &site_zip());
    let server = project.server();

    let request = DocumentRequest::new(RequestContext::Project, "/docs/1/", "1/");
    assert_eq!(server.handle(&request).await, DocumentResponse::NotFound);
}

#[tokio::test]
async fn several_documents_in_one_build() {
    let project = TestProject::new();
    project.add_zip(1, "api.zip", &TestZip::new().file("index.html", "API."));
    project.add_zip(1, "guide/manual.zip", &TestZip::new().file("index.html", "Manual."));
    project.set_documents(1, vec![doc("1", "api.zip"), doc("2", "guide/manual.zip")]);
    let server = project.server();

    assert_eq!(body(get(&server, "1/").await), "API.");
    assert_eq!(body(get(&server, "2/index.html").await), "Manual.");
}

#[tokio::test]
async fn lying_entry_size_is_forbidden() {
    let project = TestProject::new();
    project.add_file(1, "docs.zip", &zip64_size_claim("a.html", "Small page.", 1 << 63));
    project.set_documents(1, vec![doc("1", "docs.zip")]);
    let server = project.server();

    // Served from a spawned task so a panic would surface as a join error
    let response = tokio::spawn(async move { get(&server, "1/a.html").await })
        .await
        .unwrap();
    assert_eq!(response, DocumentResponse::Forbidden);
}
