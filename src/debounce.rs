use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Coalesces bursts of input into a single firing once input has been quiet
/// for `window`. Time is passed in, so callers decide what "now" is.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_input: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last_input: None }
    }

    /// Records an input event, restarting the quiet window.
    pub fn touch(&mut self, now: Instant) {
        self.last_input = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_input.is_some()
    }

    /// When the pending input settles, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_input.map(|last| last + self.window)
    }

    /// True exactly once per burst, when the window has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.last_input = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.last_input = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
