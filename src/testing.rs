//! In-memory collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::time::sleep;

use crate::api::RemoteStore;
use crate::error::{Result, SyncError};
use crate::frontend::Frontend;
use crate::types::{Note, SyncState};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(String),
    Create(Vec<Note>),
    Update(String, Vec<Note>),
    Delete(String),
}

/// In-memory server that records every call it receives.
#[derive(Default)]
pub struct FakeStore {
    calls: Mutex<Vec<Call>>,
    pub documents: Mutex<HashMap<String, Vec<Note>>>,
    latency: Duration,
    failing: AtomicBool,
    next_id: AtomicU64,
}

impl FakeStore {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn respond(&self, call: Call, operation: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Status {
                operation,
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn load(&self, id: &str) -> Result<Option<Vec<Note>>> {
        self.respond(Call::Load(id.to_string()), "load").await?;
        Ok(self.documents.lock().unwrap().get(id).cloned())
    }

    async fn create(&self, notes: &[Note]) -> Result<String> {
        self.respond(Call::Create(notes.to_vec()), "create").await?;
        let id = format!("{:024x}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.documents
            .lock()
            .unwrap()
            .insert(id.clone(), notes.to_vec());
        Ok(id)
    }

    async fn update(&self, id: &str, notes: &[Note]) -> Result<()> {
        self.respond(Call::Update(id.to_string(), notes.to_vec()), "update")
            .await?;
        self.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), notes.to_vec());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.respond(Call::Delete(id.to_string()), "delete").await?;
        self.documents.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingFrontend {
    locations: Mutex<Vec<String>>,
}

impl RecordingFrontend {
    pub fn last_location(&self) -> Option<String> {
        self.locations.lock().unwrap().last().cloned()
    }
}

impl Frontend for RecordingFrontend {
    fn sync_state_changed(&self, _state: &SyncState) {}

    fn location_changed(&self, path: &str) {
        self.locations.lock().unwrap().push(path.to_string());
    }
}

pub fn texts(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|n| n.text.as_str()).collect()
}
