//! Timer tasks delivering events to the engine loop.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::event::{Event, Timer};

/// Shortest recurring period; `interval_at` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Owns the spawned timer tasks; all of them stop when this is dropped.
#[derive(Debug, Default)]
pub(crate) struct Timers {
    handles: Vec<JoinHandle<()>>,
}

impl Timers {
    /// Sends `timer` every `period`, first after one full period. Periods
    /// below one millisecond are raised to it.
    pub(crate) fn every(&mut self, tx: &UnboundedSender<Event>, period: Duration, timer: Timer) {
        let period = period.max(MIN_PERIOD);
        let tx = tx.clone();
        self.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(Event::Timer(timer)).is_err() {
                    break;
                }
            }
        }));
    }

    /// Sends `timer` once after `delay`.
    pub(crate) fn after(&mut self, tx: &UnboundedSender<Event>, delay: Duration, timer: Timer) {
        let tx = tx.clone();
        self.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event::Timer(timer));
        }));
    }

    /// Stops every timer.
    pub(crate) fn clear(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.clear();
    }
}
