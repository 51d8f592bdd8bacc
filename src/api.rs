use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::types::Note;

/// The remote side of a document. One call per remote operation; the
/// controller never issues two at once.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a document's notes. `Ok(None)` means the server has no such
    /// document, which callers treat as an empty state rather than a failure.
    async fn load(&self, id: &str) -> Result<Option<Vec<Note>>>;

    /// Persist a new document and return the identifier the server assigned.
    async fn create(&self, notes: &[Note]) -> Result<String>;

    /// Replace the stored notes of an existing document.
    async fn update(&self, id: &str, notes: &[Note]) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    stickies: Vec<Note>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

/// `RemoteStore` backed by the `/api/` REST routes.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/api/{}", self.base_url, id)
    }
}

/// Turn a non-2xx response into `SyncError::Status`.
fn ensure_success(response: Response, operation: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SyncError::Status { operation, status })
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn load(&self, id: &str) -> Result<Option<Vec<Note>>> {
        let response = self.client.get(self.document_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: LoadResponse = ensure_success(response, "load")?.json().await?;
        Ok(Some(body.stickies))
    }

    async fn create(&self, notes: &[Note]) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/", self.base_url))
            .json(notes)
            .send()
            .await?;
        let body: CreateResponse = ensure_success(response, "create")?.json().await?;
        Ok(body.id)
    }

    async fn update(&self, id: &str, notes: &[Note]) -> Result<()> {
        let response = self
            .client
            .put(self.document_url(id))
            .json(notes)
            .send()
            .await?;
        ensure_success(response, "update")?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self.client.delete(self.document_url(id)).send().await?;
        ensure_success(response, "delete")?;
        Ok(())
    }
}
