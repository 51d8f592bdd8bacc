use std::sync::Arc;

use chrono::Utc;
use rand::seq::IndexedRandom;
use tokio::sync::{Mutex, Notify};

use crate::api::RemoteStore;
use crate::config::SyncConfig;
use crate::debounce::DebounceSlot;
use crate::error::{Result, SyncError};
use crate::frontend::Frontend;
use crate::types::{
    is_valid_document_id, next_color, Document, Note, SaveStatus, SyncState, DEFAULT_COLOR,
    PALETTE,
};

/// Everything the controller owns. Only touched under the controller's lock.
struct EditorState {
    document: Document,
    sync: SyncState,
    debounce: DebounceSlot,
    /// Bumped on every change to the document. A write that settles with a
    /// different revision than it was sent with is stale.
    revision: u64,
    /// Bumped by every reset. A remote call that settles under a different
    /// epoch belongs to a document that no longer exists locally.
    epoch: u64,
    /// Last note id handed out, so two notes created in the same
    /// millisecond still get distinct ids.
    last_note_id: i64,
}

impl EditorState {
    fn new() -> Self {
        let mut state = Self {
            document: Document::default(),
            sync: SyncState::default(),
            debounce: DebounceSlot::default(),
            revision: 0,
            epoch: 0,
            last_note_id: 0,
        };
        state.start_blank();
        state
    }

    fn next_note_id(&mut self) -> i64 {
        let id = Utc::now().timestamp_millis().max(self.last_note_id + 1);
        self.last_note_id = id;
        id
    }

    /// Replace the notes with a single blank note in the default colour.
    fn start_blank(&mut self) {
        let id = self.next_note_id();
        self.document.notes = vec![Note::blank(id, DEFAULT_COLOR)];
        self.revision += 1;
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.document.notes.len();
        if index < len {
            Ok(())
        } else {
            Err(SyncError::NoteIndex { index, len })
        }
    }
}

/// Keeps the remote copy of a document in step with local edits.
///
/// Every mutation schedules a save; saves are debounced so a burst of edits
/// becomes one remote write. At most one remote call runs at a time: a call
/// that finds another one in flight is dropped, not queued. Remote failures
/// never surface as errors here, they end up in [`SyncState::status`].
///
/// Cloning yields another handle onto the same editor.
#[derive(Clone)]
pub struct SyncController {
    store: Arc<dyn RemoteStore>,
    frontend: Arc<dyn Frontend>,
    config: SyncConfig,
    state: Arc<Mutex<EditorState>>,
    /// Signalled whenever a remote call settles and `is_loading` drops.
    idle: Arc<Notify>,
}

impl SyncController {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        frontend: Arc<dyn Frontend>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            frontend,
            config,
            state: Arc::new(Mutex::new(EditorState::new())),
            idle: Arc::new(Notify::new()),
        }
    }

    // ─── Queries ───────────────────────────────────────────────────────────────

    pub async fn document(&self) -> Document {
        self.state.lock().await.document.clone()
    }

    pub async fn sync_state(&self) -> SyncState {
        self.state.lock().await.sync.clone()
    }

    /// Whether leaving the page now would lose an edit that is still waiting
    /// to be saved.
    pub async fn should_warn_on_unload(&self) -> bool {
        let s = self.state.lock().await;
        s.sync.has_unsaved_changes && s.sync.status == SaveStatus::Saving
    }

    // ─── Startup ───────────────────────────────────────────────────────────────

    /// Open the document named by a page path such as `/0123456789abcdef01234567`.
    /// Anything that is not a valid document id starts a new, blank document.
    pub async fn open(&self, path: &str) {
        let candidate = path.strip_prefix('/').unwrap_or(path);
        if is_valid_document_id(candidate) {
            tracing::info!(id = %candidate, "found document id in path");
            self.load(candidate).await;
        } else {
            tracing::info!("no document id in path, starting with a blank note");
            let mut s = self.state.lock().await;
            s.document.remote_id = None;
            s.start_blank();
            self.frontend.sync_state_changed(&s.sync);
        }
    }

    /// Fetch a document and make it the local one. A missing document starts
    /// blank; any other failure starts blank with an error status.
    pub async fn load(&self, id: &str) {
        let epoch = {
            let mut s = self.state.lock().await;
            if s.sync.is_loading {
                tracing::debug!(id = %id, "load dropped: another remote call is in flight");
                return;
            }
            s.sync.is_loading = true;
            s.document.remote_id = Some(id.to_string());
            s.epoch
        };

        let result = self.store.load(id).await;

        let mut s = self.state.lock().await;
        if !self.finish_call(&mut s, epoch) {
            return;
        }
        match result {
            Ok(Some(notes)) => {
                tracing::info!(id = %id, notes = notes.len(), "document loaded");
                let max_id = notes.iter().map(|n| n.id).max().unwrap_or(0);
                s.last_note_id = s.last_note_id.max(max_id);
                s.document.notes = notes;
                s.revision += 1;
                s.sync.status = SaveStatus::Saved;
                s.sync.has_unsaved_changes = false;
            }
            Ok(None) => {
                tracing::info!(id = %id, "document not found on server, starting blank");
                s.start_blank();
                s.sync.status = SaveStatus::Saved;
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "failed to load document");
                s.start_blank();
                s.sync.status = SaveStatus::Error;
            }
        }
        self.frontend.sync_state_changed(&s.sync);
    }

    // ─── Local mutations ───────────────────────────────────────────────────────

    /// Append a blank note in a random palette colour. Returns its index.
    pub async fn add_note(&self) -> usize {
        let mut s = self.state.lock().await;
        let id = s.next_note_id();
        let color = PALETTE
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(DEFAULT_COLOR);
        s.document.notes.push(Note::blank(id, color));
        self.record_edit(&mut s);
        s.document.notes.len() - 1
    }

    pub async fn set_text(&self, index: usize, text: impl Into<String>) -> Result<()> {
        let mut s = self.state.lock().await;
        s.check_index(index)?;
        s.document.notes[index].text = text.into();
        self.record_edit(&mut s);
        Ok(())
    }

    /// Remove a note whatever its text. Removing the last note makes the next
    /// save delete the remote document.
    pub async fn delete_note(&self, index: usize) -> Result<Note> {
        let mut s = self.state.lock().await;
        s.check_index(index)?;
        let note = s.document.notes.remove(index);
        self.record_edit(&mut s);
        Ok(note)
    }

    /// Remove a note only when it holds no text (backspace on an empty note).
    pub async fn delete_if_blank(&self, index: usize) -> Result<bool> {
        let mut s = self.state.lock().await;
        s.check_index(index)?;
        if !s.document.notes[index].is_blank() {
            return Ok(false);
        }
        s.document.notes.remove(index);
        self.record_edit(&mut s);
        Ok(true)
    }

    pub async fn cycle_color(&self, index: usize) -> Result<()> {
        let mut s = self.state.lock().await;
        s.check_index(index)?;
        let note = &mut s.document.notes[index];
        note.color = next_color(&note.color).to_string();
        self.record_edit(&mut s);
        Ok(())
    }

    /// Move a note to a new display position.
    pub async fn move_note(&self, from: usize, to: usize) -> Result<()> {
        let mut s = self.state.lock().await;
        s.check_index(from)?;
        s.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let note = s.document.notes.remove(from);
        s.document.notes.insert(to, note);
        self.record_edit(&mut s);
        Ok(())
    }

    fn record_edit(&self, s: &mut EditorState) {
        s.revision += 1;
        self.schedule_save_locked(s);
    }

    // ─── Saving ────────────────────────────────────────────────────────────────

    /// Mark the document as having unsaved changes and restart the debounce.
    /// Only the last call within one debounce window reaches the server.
    pub async fn schedule_save(&self) {
        let mut s = self.state.lock().await;
        self.schedule_save_locked(&mut s);
    }

    fn schedule_save_locked(&self, s: &mut EditorState) {
        s.sync.status = SaveStatus::Saving;
        s.sync.has_unsaved_changes = true;
        self.frontend.sync_state_changed(&s.sync);
        self.arm_debounce(s);
    }

    fn arm_debounce(&self, s: &mut EditorState) {
        let generation = s.debounce.arm();
        let controller = self.clone();
        let delay = self.config.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.debounce_elapsed(generation).await;
        });
        s.debounce.attach(generation, handle);
    }

    async fn debounce_elapsed(&self, generation: u64) {
        if !self.state.lock().await.debounce.claim(generation) {
            return;
        }
        self.flush().await;
    }

    /// Save right away: create the document if the server has never seen it,
    /// update it otherwise.
    pub async fn flush(&self) {
        let persisted = self.state.lock().await.document.remote_id.is_some();
        if persisted {
            self.update().await;
        } else {
            self.create().await;
        }
    }

    /// Push the notes to the existing remote document, or delete it when no
    /// notes are left. Does nothing for a document the server has not seen.
    pub async fn update(&self) {
        let (id, notes, revision, epoch) = {
            let mut s = self.state.lock().await;
            if s.sync.is_loading {
                tracing::debug!("update dropped: another remote call is in flight");
                return;
            }
            let Some(id) = s.document.remote_id.clone() else {
                return;
            };
            s.sync.is_loading = true;
            (id, s.document.notes.clone(), s.revision, s.epoch)
        };

        if notes.is_empty() {
            self.delete_remote(id, epoch).await;
        } else {
            self.update_remote(id, notes, revision, epoch).await;
        }
    }

    async fn update_remote(&self, id: String, notes: Vec<Note>, revision: u64, epoch: u64) {
        let result = self.store.update(&id, &notes).await;

        let mut s = self.state.lock().await;
        if !self.finish_call(&mut s, epoch) {
            return;
        }
        match result {
            Ok(()) => {
                tracing::info!(id = %id, notes = notes.len(), "document saved");
                self.settle_saved(&mut s, revision);
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "failed to save document");
                s.sync.status = SaveStatus::Error;
            }
        }
        self.frontend.sync_state_changed(&s.sync);
    }

    async fn delete_remote(&self, id: String, epoch: u64) {
        let result = self.store.delete(&id).await;

        let mut s = self.state.lock().await;
        if !self.finish_call(&mut s, epoch) {
            return;
        }
        match result {
            Ok(()) => {
                tracing::info!(id = %id, "document deleted on server");
                if s.document.notes.is_empty() {
                    self.reset_locked(&mut s);
                } else {
                    // Notes were added while the delete was in flight; they
                    // become a new document.
                    s.document.remote_id = None;
                    self.frontend.location_changed("/");
                    if !s.debounce.is_pending() {
                        self.arm_debounce(&mut s);
                    }
                }
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "failed to delete document");
                s.sync.status = SaveStatus::Error;
            }
        }
        self.frontend.sync_state_changed(&s.sync);
    }

    /// Persist a new document. Documents without any text are never sent.
    pub async fn create(&self) {
        let (notes, revision, epoch) = {
            let mut s = self.state.lock().await;
            if s.sync.is_loading {
                tracing::debug!("create dropped: another remote call is in flight");
                return;
            }
            if !s.document.has_content() {
                s.sync.status = SaveStatus::Saved;
                self.frontend.sync_state_changed(&s.sync);
                return;
            }
            s.sync.is_loading = true;
            (s.document.notes.clone(), s.revision, s.epoch)
        };

        let result = self.store.create(&notes).await;

        let mut s = self.state.lock().await;
        if !self.finish_call(&mut s, epoch) {
            return;
        }
        match result {
            Ok(id) => {
                if !is_valid_document_id(&id) {
                    tracing::warn!(id = %id, "server assigned an unexpected document id");
                }
                tracing::info!(id = %id, notes = notes.len(), "document created on server");
                self.frontend.location_changed(&format!("/{id}"));
                s.document.remote_id = Some(id);
                self.settle_saved(&mut s, revision);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to create document");
                s.sync.status = SaveStatus::Error;
            }
        }
        self.frontend.sync_state_changed(&s.sync);
    }

    /// Clear the in-flight flag once a remote call returns. False when the
    /// document was reset while the call was out: its result is dropped, and
    /// edits made to the new document in the meantime get their save.
    fn finish_call(&self, s: &mut EditorState, epoch: u64) -> bool {
        s.sync.is_loading = false;
        self.idle.notify_waiters();
        if s.epoch == epoch {
            return true;
        }
        tracing::debug!("document was reset during a remote call, dropping its result");
        if s.sync.has_unsaved_changes && !s.debounce.is_pending() {
            self.arm_debounce(s);
        }
        self.frontend.sync_state_changed(&s.sync);
        false
    }

    /// Wait until no remote call is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if !self.state.lock().await.sync.is_loading {
                return;
            }
            notified.await;
        }
    }

    /// Write out everything still pending before shutting down: wait for the
    /// call in flight, then flush instead of waiting on the debounce. Repeats
    /// while settled writes leave newer edits behind.
    pub async fn settle(&self) {
        let mut first = true;
        loop {
            self.wait_idle().await;
            let flush = {
                let mut s = self.state.lock().await;
                if s.sync.is_loading {
                    continue;
                }
                let pending = s.debounce.is_pending();
                s.debounce.cancel();
                pending || (first && s.sync.has_unsaved_changes)
            };
            if !flush {
                return;
            }
            first = false;
            self.flush().await;
        }
    }

    /// Record a successful write of `revision`. If the document moved on while
    /// the write was in flight, stay in `saving` and make sure a save follows.
    fn settle_saved(&self, s: &mut EditorState, revision: u64) {
        s.sync.last_saved_at = Some(Utc::now());
        if s.revision == revision {
            s.sync.status = SaveStatus::Saved;
            s.sync.has_unsaved_changes = false;
        } else if s.sync.has_unsaved_changes && !s.debounce.is_pending() {
            tracing::debug!("document changed during save, scheduling another");
            self.arm_debounce(s);
        }
    }

    // ─── Reset ─────────────────────────────────────────────────────────────────

    /// Drop the current document and start a fresh, unsaved one.
    pub async fn reset(&self) {
        let mut s = self.state.lock().await;
        self.reset_locked(&mut s);
        self.frontend.sync_state_changed(&s.sync);
    }

    fn reset_locked(&self, s: &mut EditorState) {
        s.debounce.cancel();
        s.epoch += 1;
        s.document.remote_id = None;
        s.start_blank();
        s.sync = SyncState {
            is_loading: s.sync.is_loading,
            ..SyncState::default()
        };
        self.frontend.location_changed("/");
        tracing::info!("started a new document");
    }
}
