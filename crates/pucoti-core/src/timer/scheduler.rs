//! Periodic tick sources.
//!
//! The machine never spawns anything itself: it asks a [`Scheduler`] for a
//! recurring callback and keeps the returned [`TickHandle`] for exactly as
//! long as the session lives. Dropping the handle stops the callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};

/// Callback run on every interval.
pub type TickTask = Box<dyn FnMut() + Send + 'static>;

/// Host-provided interval primitive.
pub trait Scheduler: Send + Sync {
    /// Run `task` every `interval`, first call one interval from now.
    fn every(&self, interval: Duration, task: TickTask) -> TickHandle;
}

/// Guard for a recurring callback. Cancels on drop.
#[must_use = "dropping a TickHandle cancels the recurring callback"]
pub struct TickHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TickHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop the callback now.
    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ── Tokio ────────────────────────────────────────────────────────────

/// Runs each recurring callback as a task on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the runtime of the calling context.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn every(&self, interval: Duration, mut task: TickTask) -> TickHandle {
        let join = self.handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                task();
            }
        });
        TickHandle::new(move || join.abort())
    }
}

// ── Manual ───────────────────────────────────────────────────────────

struct Slot {
    interval: Duration,
    task: TickTask,
    cancelled: Arc<AtomicBool>,
}

impl Slot {
    fn is_live(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst)
    }
}

/// A scheduler that fires only when asked, for deterministic hosts and tests.
#[derive(Default)]
pub struct ManualScheduler {
    slots: Mutex<Vec<Slot>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every live callback once. Returns how many ran.
    ///
    /// Callbacks may schedule or cancel other callbacks; those changes take
    /// effect for the next `fire`.
    pub fn fire(&self) -> usize {
        let mut due = std::mem::take(&mut *self.lock());
        let mut fired = 0;
        for slot in due.iter_mut() {
            if slot.is_live() {
                (slot.task)();
                fired += 1;
            }
        }

        let mut slots = self.lock();
        due.retain(Slot::is_live);
        due.append(&mut slots);
        *slots = due;
        fired
    }

    /// Number of callbacks that have not been cancelled.
    pub fn live(&self) -> usize {
        self.lock().iter().filter(|s| s.is_live()).count()
    }

    /// Intervals of the live callbacks, oldest first.
    pub fn intervals(&self) -> Vec<Duration> {
        self.lock()
            .iter()
            .filter(|s| s.is_live())
            .map(|s| s.interval)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, interval: Duration, task: TickTask) -> TickHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.lock().push(Slot {
            interval,
            task,
            cancelled: Arc::clone(&cancelled),
        });
        TickHandle::new(move || cancelled.store(true, Ordering::SeqCst))
    }
}
