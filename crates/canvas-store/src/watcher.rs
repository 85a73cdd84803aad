//! Falling-edge detection on a watched running flag

/// Detects the `running → idle` transition of a watched generator
///
/// The previous observation is tracked explicitly and updated only after
/// the edge is evaluated. When the watched target disappears the state is
/// reset, so a target that reappears idle does not look like a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionWatcher {
    last_running: Option<bool>,
}

impl CompletionWatcher {
    /// Create a watcher with nothing observed yet
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current running state, `None` if the target is unavailable
    ///
    /// Returns `true` exactly once per completion.
    pub fn observe(&mut self, running: Option<bool>) -> bool {
        let Some(running) = running else {
            self.reset();
            return false;
        };
        let completed = self.last_running == Some(true) && !running;
        self.last_running = Some(running);
        completed
    }

    /// Forget the previous observation
    #[inline]
    pub fn reset(&mut self) {
        self.last_running = None;
    }

    /// Last observed running state
    #[inline]
    #[must_use]
    pub fn last_running(&self) -> Option<bool> {
        self.last_running
    }
}
