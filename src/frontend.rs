use crate::types::SyncState;

/// What the controller tells the rendering layer. Implementations must be
/// cheap; they are called with the controller's state lock held.
pub trait Frontend: Send + Sync {
    /// The save status indicator should show `state`.
    fn sync_state_changed(&self, state: &SyncState);

    /// The page path should become `path` without a reload (`/` or `/{id}`).
    fn location_changed(&self, path: &str);
}

/// Frontend that ignores every notification. Used headless.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFrontend;

impl Frontend for NullFrontend {
    fn sync_state_changed(&self, _state: &SyncState) {}

    fn location_changed(&self, _path: &str) {}
}
