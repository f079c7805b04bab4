//! Composition root: one machine, the four coordinators and the shell.
//!
//! Everything is wired by explicit construction. Dropping the [`App`]
//! unsubscribes every listener; the machine itself lives as long as any
//! handle to it.

use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use crate::shell::Shell;
use crate::sinks::{
    CommandNotifier, NoopWindowController, NotificationSink, NullStatusSink, StatusSink, WindowController,
};
use crate::storage::{recover_orphaned_session, ActiveSessionStore, ConfigHandle, SessionLog};
use crate::subscribers::{BellCoordinator, PersistenceCoordinator, StatusPublisher, WindowCoordinator};
use crate::timer::{Subscription, TimerMachine};

/// Builder for [`App`]. The session log is the only required collaborator.
pub struct AppBuilder {
    machine: TimerMachine,
    config: ConfigHandle,
    log: Arc<dyn SessionLog>,
    active: Option<Arc<dyn ActiveSessionStore>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    status: Option<Arc<dyn StatusSink>>,
    window: Option<Arc<dyn WindowController>>,
}

impl AppBuilder {
    /// Keep an active-session marker in `store` and recover a stale one on build.
    pub fn active_store(mut self, store: Arc<dyn ActiveSessionStore>) -> Self {
        self.active = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status = Some(sink);
        self
    }

    pub fn window_controller(mut self, controller: Arc<dyn WindowController>) -> Self {
        self.window = Some(controller);
        self
    }

    pub fn build(self) -> App {
        let AppBuilder {
            machine,
            config,
            log,
            active,
            notifier,
            status,
            window,
        } = self;

        if let Some(store) = &active {
            match recover_orphaned_session(store.as_ref(), log.as_ref(), machine.now()) {
                Ok(Some(record)) => {
                    warn!(focus_text = %record.focus_text, "recovered session left running by a previous run")
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to recover previous session"),
            }
        }

        let notifier =
            notifier.unwrap_or_else(|| Arc::new(CommandNotifier::new(config.clone())));
        let status = status.unwrap_or_else(|| Arc::new(NullStatusSink));
        let window = window.unwrap_or_else(|| Arc::new(NoopWindowController));

        let mut persistence = PersistenceCoordinator::new(log);
        if let Some(store) = active {
            persistence = persistence.with_active_store(store);
        }
        let persistence = Arc::new(persistence);
        let bell = Arc::new(BellCoordinator::new(notifier, config.clone()));
        let status = Arc::new(StatusPublisher::new(status, config.clone()));

        let shell = Shell::new(machine.clone(), config.clone());
        let weak_shell: Weak<Shell> = Arc::downgrade(&shell);
        let window = Arc::new(WindowCoordinator::new(window, config.clone()).on_mode(move |mode| {
            if let Some(shell) = weak_shell.upgrade() {
                shell.set_display_mode(mode);
            }
        }));

        // The shell resets after a terminal event; its listener goes last so
        // the follow-up `started` reaches everyone after the terminal event.
        let subscriptions = vec![
            persistence.attach(&machine),
            bell.attach(&machine),
            status.attach(&machine),
            window.attach(&machine),
            shell.attach(),
        ];
        debug!(listeners = subscriptions.len(), "app composed");

        App {
            machine,
            config,
            shell,
            persistence,
            bell,
            status,
            subscriptions,
        }
    }
}

/// The running application.
pub struct App {
    machine: TimerMachine,
    config: ConfigHandle,
    shell: Arc<Shell>,
    persistence: Arc<PersistenceCoordinator>,
    bell: Arc<BellCoordinator>,
    status: Arc<StatusPublisher>,
    subscriptions: Vec<Subscription>,
}

impl App {
    pub fn builder(machine: TimerMachine, config: ConfigHandle, log: Arc<dyn SessionLog>) -> AppBuilder {
        AppBuilder {
            machine,
            config,
            log,
            active: None,
            notifier: None,
            status: None,
            window: None,
        }
    }

    pub fn machine(&self) -> &TimerMachine {
        &self.machine
    }

    pub fn shell(&self) -> &Arc<Shell> {
        &self.shell
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Whether the overtime bell is currently repeating.
    pub fn bell_repeating(&self) -> bool {
        self.bell.is_repeating()
    }

    /// Host is shutting down: record the running session, detach, and leave
    /// the status sink showing a stopped timer.
    pub fn close(mut self) {
        self.persistence.on_close(&self.machine);
        self.subscriptions.clear();
        self.status.on_close();
        debug!("app closed");
    }
}
