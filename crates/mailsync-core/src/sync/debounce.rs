//! Trailing debounce timer feeding the engine's event channel.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Delays an event until `window` has passed without another `schedule` call.
///
/// Each schedule bumps a generation counter and aborts the previous timer. The
/// delivered event carries its generation; [`Debounce::fire`] only accepts the
/// latest one, so an event that raced past an abort is ignored.
#[derive(Debug)]
pub struct Debounce {
    window: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debounce {
    /// Creates an idle debounce with the given quiet period.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            generation: 0,
            pending: None,
        }
    }

    /// Restarts the quiet period. `make` builds the event from the new
    /// generation number.
    pub fn schedule<T, F>(&mut self, tx: &UnboundedSender<T>, make: F)
    where
        T: Send + 'static,
        F: FnOnce(u64) -> T,
    {
        self.abort_timer();
        self.generation += 1;

        let event = make(self.generation);
        let tx = tx.clone();
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send(event);
        }));
    }

    /// Accepts a delivered event. Returns false for stale generations.
    pub fn fire(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.pending.is_none() {
            return false;
        }
        self.pending = None;
        true
    }

    /// Returns true while an event is waiting to fire.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn abort_timer(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debounce {
    fn drop(&mut self) {
        self.abort_timer();
    }
}
