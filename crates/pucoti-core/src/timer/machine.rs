//! Timer state machine.
//!
//! Holds the single authoritative focus session and turns every command and
//! tick into [`TimerEvent`]s for subscribers. All time values are derived from
//! the session's `start_time` and the [`Clock`] on each read, so nothing can
//! drift.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start/reset--> Active <--tick--> ActiveOvertime
//!   ^                     |                    |
//!   +---complete/cancel---+--------------------+
//! ```
//!
//! ## Delivery
//!
//! Events are queued while the state lock is held and delivered after it is
//! released, in emission order, by whichever call started draining. A
//! listener may call back into the machine (e.g. `reset()` from a `completed`
//! handler) or subscribe/unsubscribe; the resulting events are delivered right
//! after the current one finishes, so every listener sees one global order.
//!
//! A command issued from another thread while delivery is in progress waits
//! for that delivery to finish, so its own events have reached every listener
//! by the time it returns.
//!
//! ## Usage
//!
//! ```ignore
//! let machine = TimerMachine::new(Arc::new(SystemClock), Arc::new(TokioScheduler::current()));
//! let _sub = machine.subscribe(|event| println!("{}", event.kind()));
//! machine.start("write docs", Some(1500), 0, vec!["mode:predict".into()]);
//! ```

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

use super::clock::Clock;
use super::scheduler::{Scheduler, TickHandle};
use super::session::{SessionSnapshot, TimerComputed, TimerSession, DEFAULT_COUNTDOWN_SECONDS};
use crate::events::TimerEvent;

/// Tick cadence: smooth sub-second display without busy wake-ups.
pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

type Listener = Arc<dyn Fn(&TimerEvent) + Send + Sync + 'static>;

/// Coarse machine state, derived from the session and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Idle,
    Active,
    ActiveOvertime,
}

/// Opaque listener registration id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Handle to the timer machine. Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct TimerMachine {
    inner: Arc<Inner>,
}

struct Inner {
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    tick_interval: Duration,
    core: Mutex<Core>,
    listeners: Mutex<Listeners>,
    dispatch: Mutex<Dispatch>,
    /// Signalled whenever a delivery run ends.
    delivered: Condvar,
}

#[derive(Default)]
struct Core {
    session: Option<TimerSession>,
    /// Bumped on every new session so stale tick callbacks are ignored.
    generation: u64,
    /// Overtime flag observed by the previous tick.
    was_overtime: bool,
    ticker: Option<TickHandle>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

#[derive(Default)]
struct Dispatch {
    queue: VecDeque<TimerEvent>,
    /// Thread currently delivering, if any.
    drainer: Option<ThreadId>,
}

impl TimerMachine {
    pub fn new(clock: Arc<dyn Clock>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::with_tick_interval(clock, scheduler, TICK_INTERVAL)
    }

    pub fn with_tick_interval(
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                scheduler,
                tick_interval,
                core: Mutex::new(Core::default()),
                listeners: Mutex::new(Listeners::default()),
                dispatch: Mutex::new(Dispatch::default()),
                delivered: Condvar::new(),
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Snapshot of the current session, if any.
    pub fn state(&self) -> Option<TimerSession> {
        self.inner.core().session.clone()
    }

    /// Elapsed/remaining/overtime recomputed from the clock right now.
    pub fn computed(&self) -> Option<TimerComputed> {
        let now = self.inner.clock.now();
        self.inner
            .core()
            .session
            .as_ref()
            .map(|s| s.computed_at(now))
    }

    pub fn machine_state(&self) -> MachineState {
        match self.computed() {
            None => MachineState::Idle,
            Some(c) if c.is_overtime => MachineState::ActiveOvertime,
            Some(_) => MachineState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.core().session.is_some()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.inner.clock.now()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace any session with a fresh one and start ticking.
    ///
    /// A session that was still active is dropped without a terminal event;
    /// call `complete`/`cancel` first if it must be recorded.
    pub fn start(
        &self,
        focus_text: impl Into<String>,
        predicted_seconds: Option<u64>,
        adjustment_seconds: i64,
        tags: Vec<String>,
    ) {
        let session = TimerSession {
            focus_text: focus_text.into(),
            predicted_seconds,
            start_time: self.inner.clock.now(),
            adjustment_seconds,
            tags,
        };
        self.begin(session);
    }

    /// Start the idle sentinel: no intent, no prediction, default countdown.
    pub fn reset(&self) {
        let session = TimerSession {
            focus_text: String::new(),
            predicted_seconds: None,
            start_time: self.inner.clock.now(),
            adjustment_seconds: DEFAULT_COUNTDOWN_SECONDS,
            tags: Vec::new(),
        };
        self.begin(session);
    }

    /// Add `delta` seconds (may be negative) to the countdown. No-op when idle.
    pub fn adjust(&self, delta: i64) {
        {
            let mut core = self.inner.core();
            let Some(session) = core.session.as_mut() else {
                return;
            };
            session.adjustment_seconds = session.adjustment_seconds.saturating_add(delta);
            let state = session.clone();
            tracing::debug!(delta, adjustment = state.adjustment_seconds, "timer adjusted");
            self.inner.enqueue(TimerEvent::Adjusted { delta, state });
        }
        self.inner.drain();
    }

    /// End the session as completed. `None` (and no event) when idle.
    pub fn complete(&self) -> Option<SessionSnapshot> {
        self.finish(|state, elapsed| TimerEvent::Completed { state, elapsed })
    }

    /// End the session as canceled. `None` (and no event) when idle.
    pub fn cancel(&self) -> Option<SessionSnapshot> {
        self.finish(|state, elapsed| TimerEvent::Canceled { state, elapsed })
    }

    /// Register a listener for every event. Dropping the returned
    /// [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&TimerEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.inner.listeners();
        let id = ListenerId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            machine: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    /// Run one tick now. Hosts normally leave this to the scheduler.
    pub fn tick(&self) {
        {
            let mut core = self.inner.core();
            let generation = core.generation;
            self.inner.tick_locked(&mut core, generation);
        }
        self.inner.drain();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin(&self, session: TimerSession) {
        {
            let mut core = self.inner.core();
            // Old loop goes first so it can never tick the new session.
            drop(core.ticker.take());
            core.generation += 1;
            core.was_overtime = false;
            core.session = Some(session.clone());

            let generation = core.generation;
            let weak = Arc::downgrade(&self.inner);
            core.ticker = Some(self.inner.scheduler.every(
                self.inner.tick_interval,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.scheduled_tick(generation);
                    }
                }),
            ));

            tracing::debug!(
                focus_text = %session.focus_text,
                predicted_seconds = ?session.predicted_seconds,
                adjustment_seconds = session.adjustment_seconds,
                "timer started"
            );
            self.inner.enqueue(TimerEvent::Started { state: session });
            // Immediate first tick so subscribers see time values at once.
            self.inner.tick_locked(&mut core, generation);
        }
        self.inner.drain();
    }

    fn finish(
        &self,
        make_event: impl FnOnce(TimerSession, i64) -> TimerEvent,
    ) -> Option<SessionSnapshot> {
        let snapshot = {
            let mut core = self.inner.core();
            let state = core.session.take()?;
            let elapsed = state.elapsed_at(self.inner.clock.now());
            drop(core.ticker.take());
            core.was_overtime = false;

            let event = make_event(state.clone(), elapsed);
            tracing::debug!(kind = event.kind(), elapsed, focus_text = %state.focus_text, "timer finished");
            self.inner.enqueue(event);
            SessionSnapshot { state, elapsed }
        };
        self.inner.drain();
        Some(snapshot)
    }
}

impl std::fmt::Debug for TimerMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerMachine")
            .field("state", &self.state())
            .field("tick_interval", &self.inner.tick_interval)
            .finish()
    }
}

impl Inner {
    fn core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dispatch(&self) -> MutexGuard<'_, Dispatch> {
        self.dispatch.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn scheduled_tick(&self, generation: u64) {
        {
            let mut core = self.core();
            self.tick_locked(&mut core, generation);
        }
        self.drain();
    }

    /// Recompute, emit `tick`, then emit any overtime crossing.
    fn tick_locked(&self, core: &mut Core, generation: u64) {
        if core.generation != generation {
            return;
        }
        let Some(session) = core.session.as_ref() else {
            return;
        };
        let computed = session.computed_at(self.clock.now());

        tracing::trace!(elapsed = computed.elapsed, remaining = computed.remaining, "tick");
        self.enqueue(TimerEvent::Tick {
            elapsed: computed.elapsed,
            remaining: computed.remaining,
            is_overtime: computed.is_overtime,
        });

        match (core.was_overtime, computed.is_overtime) {
            (false, true) => {
                tracing::debug!(elapsed = computed.elapsed, "overtime entered");
                self.enqueue(TimerEvent::OvertimeEntered {
                    focus_text: session.focus_text.clone(),
                    elapsed: computed.elapsed,
                });
            }
            (true, false) => {
                tracing::debug!(elapsed = computed.elapsed, "overtime exited");
                self.enqueue(TimerEvent::OvertimeExited);
            }
            _ => {}
        }
        core.was_overtime = computed.is_overtime;
    }

    fn enqueue(&self, event: TimerEvent) {
        self.dispatch().queue.push_back(event);
    }

    /// Deliver queued events.
    ///
    /// Reentrant calls from a listener return at once and leave their events
    /// to the outer frame. Calls from other threads wait for the running
    /// delivery, which also carries their events, before returning.
    fn drain(&self) {
        let me = thread::current().id();
        {
            let mut dispatch = self.dispatch();
            loop {
                match dispatch.drainer {
                    Some(owner) if owner == me => return,
                    Some(_) => {
                        dispatch = self
                            .delivered
                            .wait(dispatch)
                            .unwrap_or_else(|e| e.into_inner());
                    }
                    None => break,
                }
            }
            if dispatch.queue.is_empty() {
                return;
            }
            dispatch.drainer = Some(me);
        }

        loop {
            let event = {
                let mut dispatch = self.dispatch();
                match dispatch.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        dispatch.drainer = None;
                        drop(dispatch);
                        self.delivered.notify_all();
                        return;
                    }
                }
            };

            let listeners: Vec<Listener> = self
                .listeners()
                .entries
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect();

            for listener in listeners {
                if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                    tracing::error!(kind = event.kind(), "timer listener panicked");
                }
            }
        }
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners().entries.retain(|(lid, _)| *lid != id);
    }
}

/// Listener registration. Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    machine: Weak<Inner>,
    id: Option<ListenerId>,
}

impl Subscription {
    pub fn id(&self) -> Option<ListenerId> {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let (Some(id), Some(inner)) = (self.id.take(), self.machine.upgrade()) {
            inner.unsubscribe(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
