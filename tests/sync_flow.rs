//! End-to-end editing sessions against a mock stickies API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockito::{Matcher, Server};
use stickies_sync::{
    Frontend, HttpStore, NullFrontend, SaveStatus, SyncConfig, SyncController, SyncState,
};

const DOC_ID: &str = "abc123abc123abc123abc123";
const DEBOUNCE: Duration = Duration::from_millis(50);
const SETTLE: Duration = Duration::from_millis(400);

#[derive(Default)]
struct Locations(Mutex<Vec<String>>);

impl Locations {
    fn last(&self) -> Option<String> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl Frontend for Locations {
    fn sync_state_changed(&self, _state: &SyncState) {}

    fn location_changed(&self, path: &str) {
        self.0.lock().unwrap().push(path.to_string());
    }
}

fn controller_for(server: &Server) -> (SyncController, Arc<Locations>) {
    let config = SyncConfig::with_base_url(server.url())
        .unwrap()
        .debounce(DEBOUNCE);
    let store = HttpStore::new(&config).unwrap();
    let locations = Arc::new(Locations::default());
    let controller = SyncController::new(Arc::new(store), locations.clone(), config);
    (controller, locations)
}

#[tokio::test]
async fn typing_into_a_new_document_creates_it_once() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/api/")
        .match_body(Matcher::Regex(
            r##"^\[\{"id":\d+,"text":"hello","color":"#fcfa5d"\}\]$"##.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"id":"{DOC_ID}"}}"#))
        .expect(1)
        .create_async()
        .await;
    let update = server
        .mock("PUT", format!("/api/{DOC_ID}").as_str())
        .match_body(Matcher::Regex(r#""text":"hello world""#.to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let (controller, locations) = controller_for(&server);
    controller.open("/").await;
    for text in ["h", "he", "hell", "hello"] {
        controller.set_text(0, text).await.unwrap();
    }
    tokio::time::sleep(SETTLE).await;

    create.assert_async().await;
    assert_eq!(controller.document().await.remote_id.as_deref(), Some(DOC_ID));
    assert_eq!(locations.last(), Some(format!("/{DOC_ID}")));
    assert_eq!(controller.sync_state().await.status, SaveStatus::Saved);

    controller.set_text(0, "hello world").await.unwrap();
    tokio::time::sleep(SETTLE).await;
    update.assert_async().await;
    assert_eq!(controller.sync_state().await.status, SaveStatus::Saved);
}

#[tokio::test]
async fn deleting_the_last_note_deletes_the_document() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", format!("/api/{DOC_ID}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r##"{"stickies":[{"id":1,"text":"last one","color":"#ff9999"}]}"##)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", format!("/api/{DOC_ID}").as_str())
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let update = server
        .mock("PUT", format!("/api/{DOC_ID}").as_str())
        .expect(0)
        .create_async()
        .await;

    let (controller, locations) = controller_for(&server);
    controller.open(&format!("/{DOC_ID}")).await;
    assert_eq!(controller.document().await.notes[0].text, "last one");

    controller.delete_note(0).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    delete.assert_async().await;
    update.assert_async().await;
    let doc = controller.document().await;
    assert!(doc.remote_id.is_none());
    assert_eq!(doc.notes.len(), 1);
    assert!(doc.notes[0].is_blank());
    assert_eq!(locations.last().as_deref(), Some("/"));
}

#[tokio::test]
async fn a_missing_document_opens_blank_and_saved() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", format!("/api/{DOC_ID}").as_str())
        .with_status(404)
        .create_async()
        .await;

    let config = SyncConfig::with_base_url(server.url()).unwrap();
    let store = HttpStore::new(&config).unwrap();
    let controller = SyncController::new(Arc::new(store), Arc::new(NullFrontend), config);
    controller.open(&format!("/{DOC_ID}")).await;

    let doc = controller.document().await;
    assert_eq!(doc.notes.len(), 1);
    assert!(doc.notes[0].is_blank());
    assert_eq!(controller.sync_state().await.status, SaveStatus::Saved);
}

#[tokio::test]
async fn a_failing_server_shows_an_error_until_the_next_edit() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/api/")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let (controller, _) = controller_for(&server);
    controller.open("/").await;
    controller.set_text(0, "draft").await.unwrap();
    tokio::time::sleep(SETTLE).await;

    failing.assert_async().await;
    let state = controller.sync_state().await;
    assert_eq!(state.status, SaveStatus::Error);
    assert!(state.has_unsaved_changes);
    assert!(controller.document().await.remote_id.is_none());
    failing.remove_async().await;

    let created = server
        .mock("POST", "/api/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"id":"{DOC_ID}"}}"#))
        .expect(1)
        .create_async()
        .await;
    controller.set_text(0, "draft two").await.unwrap();
    tokio::time::sleep(SETTLE).await;

    created.assert_async().await;
    assert_eq!(controller.sync_state().await.status, SaveStatus::Saved);
}
