use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced a usable response.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{operation} failed: {status}")]
    Status {
        operation: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("note index {index} out of range (len {len})")]
    NoteIndex { index: usize, len: usize },

    #[error("invalid API base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
