use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Colour of the blank note a fresh document starts with.
pub const DEFAULT_COLOR: &str = "#fcfa5d";

/// Colours a note cycles through. New notes pick one at random.
pub const PALETTE: [&str; 8] = [
    DEFAULT_COLOR,
    "#6eed2a",
    "#f989d6",
    "#20dff8",
    "#ff9999",
    "#99ff99",
    "#9999ff",
    "#ffcc99",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: i64, // creation time in ms
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Note {
    pub fn blank(id: i64, color: impl Into<String>) -> Self {
        Self {
            id,
            text: String::new(),
            color: color.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One persisted unit: the notes in display order plus the identifier the
/// server assigned on first create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub remote_id: Option<String>,
    pub notes: Vec<Note>,
}

impl Document {
    /// True when at least one note carries non-whitespace text.
    pub fn has_content(&self) -> bool {
        self.notes.iter().any(|n| !n.is_blank())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Saving,
    #[default]
    Saved,
    Error,
}

/// Save status reported to the frontend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub status: SaveStatus,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub has_unsaved_changes: bool,
    /// True while a load/create/update/delete is in flight. Prevents
    /// overlapping remote calls.
    pub is_loading: bool,
}

/// Validate that a document id is a 24-character hex string (either case).
pub fn is_valid_document_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Palette entry following `color`. Unknown colours restart the cycle.
pub fn next_color(color: &str) -> &'static str {
    match PALETTE.iter().position(|c| c.eq_ignore_ascii_case(color)) {
        Some(i) => PALETTE[(i + 1) % PALETTE.len()],
        None => PALETTE[0],
    }
}
