use tokio::task::JoinHandle;

/// Single pending-task slot for the save debounce.
///
/// Arming aborts whatever task was waiting and hands out a new generation.
/// A task that wakes up must `claim` its generation before doing any work:
/// a stale generation means it was superseded, and a successful claim empties
/// the slot so a later `arm` cannot abort a request that is already in flight.
#[derive(Debug, Default)]
pub struct DebounceSlot {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl DebounceSlot {
    /// Cancel the pending task and return the generation for its replacement.
    pub fn arm(&mut self) -> u64 {
        self.cancel();
        self.generation
    }

    /// Store the task spawned for `generation`. A task for an outdated
    /// generation is aborted instead.
    pub fn attach(&mut self, generation: u64, handle: JoinHandle<()>) {
        if generation == self.generation {
            self.handle = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Called by a woken task. True when it is still the current one.
    pub fn claim(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.handle.is_none() {
            return false;
        }
        // Dropping the handle detaches the task rather than aborting it.
        self.handle = None;
        true
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }
}
