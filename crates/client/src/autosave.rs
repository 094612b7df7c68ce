// Autosave debouncer for the workspace.
//
// Holds at most one pending save per session. Arming again replaces the
// pending entry and restarts the window, so a burst of edits produces a
// single save of the latest state once the window elapses.

use std::time::Duration;

use tokio::time::Instant;

/// Default debounce window.
const DEFAULT_AUTOSAVE_MS: u64 = 800;
/// Minimum allowed debounce window.
const MIN_AUTOSAVE_MS: u64 = 50;
/// Maximum allowed debounce window.
const MAX_AUTOSAVE_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    pub window: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self { window: Duration::from_millis(DEFAULT_AUTOSAVE_MS) }
    }
}

impl DebounceConfig {
    /// Create a config with the given window in milliseconds, clamped to [50, 10000].
    pub fn with_millis(ms: u64) -> Self {
        let clamped = ms.clamp(MIN_AUTOSAVE_MS, MAX_AUTOSAVE_MS);
        Self { window: Duration::from_millis(clamped) }
    }
}

#[derive(Debug)]
struct PendingSave {
    doc_id: String,
    armed_at: Instant,
}

#[derive(Debug)]
pub struct AutosaveTimer {
    config: DebounceConfig,
    pending: Option<PendingSave>,
}

impl AutosaveTimer {
    pub fn new(config: DebounceConfig) -> Self {
        Self { config, pending: None }
    }

    /// Arm (or re-arm) the timer for `doc_id`, replacing anything pending.
    pub fn arm(&mut self, doc_id: &str) {
        self.arm_at(doc_id, Instant::now());
    }

    pub fn arm_at(&mut self, doc_id: &str, now: Instant) {
        self.pending = Some(PendingSave { doc_id: doc_id.to_owned(), armed_at: now });
    }

    /// Drop the pending save, returning the document it was for.
    pub fn cancel(&mut self) -> Option<String> {
        self.pending.take().map(|pending| pending.doc_id)
    }

    /// Take the pending document if its window has elapsed at `now`.
    pub fn take_ready(&mut self, now: Instant) -> Option<String> {
        let deadline = self.next_deadline()?;
        if now >= deadline {
            self.cancel()
        } else {
            None
        }
    }

    pub fn pending_doc(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.doc_id.as_str())
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.armed_at + self.config.window)
    }

    pub fn window(&self) -> Duration {
        self.config.window
    }
}
