// Client against a real quire-server router on an ephemeral port.

use std::time::Duration;

use quire_client::api::{ClientError, DocumentApi, HttpDocumentApi};
use quire_client::autosave::DebounceConfig;
use quire_client::session::WorkspaceSession;
use quire_client::workspace::{CreateOutcome, SaveOutcome, Workspace};
use quire_common::types::{DocumentPatch, NEW_DOC_CONTENT, WELCOME_CONTENT, WELCOME_TITLE};
use quire_server::app::build_router;
use quire_server::store::DocumentStore;
use tokio::net::TcpListener;

async fn spawn_server() -> String {
    let store = DocumentStore::in_memory().expect("in-memory store");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, build_router(store, &[])).await.expect("server should run");
    });

    format!("http://{addr}")
}

async fn client() -> HttpDocumentApi {
    HttpDocumentApi::parse(&spawn_server().await).expect("valid base url")
}

#[tokio::test]
async fn first_list_seeds_a_single_welcome_document() {
    let api = client().await;

    let documents = api.list().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, WELCOME_TITLE);

    assert_eq!(api.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn create_with_title_only_gets_welcome_content() {
    let api = client().await;

    let created = api.create(&DocumentPatch::new(Some("Notes".into()), None)).await.unwrap();
    assert_eq!(created.title, "Notes");
    assert_eq!(created.content, WELCOME_CONTENT);

    let fetched = api.get(&created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn empty_patch_is_rejected_with_message() {
    let api = client().await;
    let created = api.create(&DocumentPatch::default()).await.unwrap();

    match api.update(&created.id, &DocumentPatch::default()).await {
        Err(ClientError::Status { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "No fields were provided for update.");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn missing_document_is_not_found() {
    let api = client().await;

    let result = api.update("missing-id", &DocumentPatch::new(Some("x".into()), None)).await;
    assert!(matches!(result, Err(ClientError::NotFound)));
    assert!(matches!(api.get("missing-id").await, Err(ClientError::NotFound)));
}

#[tokio::test]
async fn title_update_keeps_content_and_advances_updated_at() {
    let api = client().await;
    let created = api.create(&DocumentPatch::full("Draft", "body text")).await.unwrap();

    let updated = api.update(&created.id, &DocumentPatch::new(Some("Final".into()), None)).await.unwrap();
    assert_eq!(updated.content, "body text");
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(api.get(&created.id).await.unwrap().content, "body text");
}

#[tokio::test]
async fn workspace_round_trip_through_the_service() {
    let api = client().await;
    let mut workspace = Workspace::new(api.clone(), DebounceConfig::default());

    workspace.load().await.unwrap();
    assert_eq!(workspace.active_document().unwrap().title, WELCOME_TITLE);

    workspace.edit_title("  Renamed  ");
    assert_eq!(workspace.manual_save().await, SaveOutcome::Saved);
    assert_eq!(workspace.active_document().unwrap().title, "Renamed");
    assert!(!workspace.has_unsaved_changes());

    let CreateOutcome::Created(created) = workspace.create_document().await else {
        panic!("expected a created document");
    };
    assert_eq!(created.content, NEW_DOC_CONTENT);
    assert_eq!(workspace.documents().len(), 2);

    let welcome_id = workspace.documents()[1].id.clone();
    tokio::time::sleep(Duration::from_millis(5)).await;
    workspace.edit_content("left behind");
    assert!(workspace.switch_to(&welcome_id).await);

    assert_eq!(api.get(&created.id).await.unwrap().content, "left behind");
    assert_eq!(api.list().await.unwrap()[0].id, created.id);
}

#[tokio::test]
async fn session_autosaves_through_the_service() {
    let api = client().await;
    let workspace = Workspace::new(api.clone(), DebounceConfig::with_millis(50));
    let handle = WorkspaceSession::spawn(workspace);

    handle.load().await.unwrap();
    handle.edit_content("saved by the timer").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.settle().await.unwrap();

    let view = handle.view().await.unwrap();
    assert!(!view.has_unsaved_changes);
    let id = view.active.expect("active document").id;
    assert_eq!(api.get(&id).await.unwrap().content, "saved by the timer");

    handle.shutdown().await.unwrap();
}
