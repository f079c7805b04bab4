//! Integration tests for a full session: shell input through every
//! coordinator to the on-disk stores.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pucoti_core::shell::{Screen, TAG_PREDICT, TAG_TIMEBOX};
use pucoti_core::sinks::{MemoryNotifier, MemoryWindowController, NotifierCall, StatusFile, TimerStatus};
use pucoti_core::stats::CalibrationStats;
use pucoti_core::storage::{Config, ConfigHandle, CsvSessionLog, Database, SessionStatus};
use pucoti_core::timer::{ManualClock, ManualScheduler, TimerMachine, TokioScheduler};
use pucoti_core::App;

struct Rig {
    clock: Arc<ManualClock>,
    scheduler: Arc<ManualScheduler>,
    notifier: Arc<MemoryNotifier>,
    log: Arc<CsvSessionLog>,
    status_path: std::path::PathBuf,
    app: App,
    _dir: tempfile::TempDir,
}

impl Rig {
    fn new(config: Config) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let scheduler = Arc::new(ManualScheduler::new());
        let machine = TimerMachine::new(clock.clone(), scheduler.clone());
        let notifier = Arc::new(MemoryNotifier::new());
        let log = Arc::new(CsvSessionLog::new(dir.path().join("sessions.csv")));
        let status_path = dir.path().join("status.json");
        let app = App::builder(machine, ConfigHandle::new(config), log.clone())
            .notifier(notifier.clone())
            .status_sink(Arc::new(StatusFile::new(&status_path)))
            .window_controller(Arc::new(MemoryWindowController::new()))
            .build();
        Self {
            clock,
            scheduler,
            notifier,
            log,
            status_path,
            app,
            _dir: dir,
        }
    }

    fn wait(&self, secs: i64) {
        self.clock.advance_secs(secs);
        self.scheduler.fire();
    }

    fn status(&self) -> TimerStatus {
        let raw = std::fs::read_to_string(&self.status_path).unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

#[test]
fn predicted_session_is_logged_and_calibrated() {
    let rig = Rig::new(Config::default());
    rig.app.shell().submit("write the intro 10m");
    rig.wait(30);
    assert_eq!(rig.status(), TimerStatus::running(570, "write the intro", false));

    rig.wait(630);
    rig.app.machine().complete();
    // stopped was published, then the shell's idle countdown took over
    assert_eq!(rig.status(), TimerStatus::running(300, "", false));
    assert_eq!(rig.app.shell().screen(), Screen::Completion);

    let completion = rig.app.shell().last_completion().unwrap();
    assert_eq!(completion.snapshot.elapsed, 660);
    assert!((completion.error_percent.unwrap() - 10.0).abs() < 1e-9);
    assert!(completion.remark.is_some());

    let records = rig.log.read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].focus_text, "write the intro");
    assert_eq!(records[0].predicted_seconds, 600);
    assert_eq!(records[0].actual_seconds, 660);
    assert_eq!(records[0].tags, vec![TAG_PREDICT.to_string()]);

    let stats = CalibrationStats::compute(&records).unwrap();
    assert_eq!(stats.session_count, 1);
    assert!((stats.mean_bias - 10.0).abs() < 1e-9);
}

#[test]
fn timebox_uses_last_duration_and_has_no_error_percent() {
    let mut config = Config::default();
    config.timer.last_duration_secs = Some(900);
    let rig = Rig::new(config);

    rig.app.shell().submit("inbox zero");
    let state = rig.app.machine().state().unwrap();
    assert_eq!(state.predicted_seconds, None);
    assert_eq!(state.adjustment_seconds, 900);
    assert_eq!(state.tags, vec![TAG_TIMEBOX.to_string()]);

    rig.wait(100);
    rig.app.machine().complete();
    let completion = rig.app.shell().last_completion().unwrap();
    assert!(completion.error_percent.is_none());
    assert!(completion.remark.is_none());

    let records = rig.log.read_all().unwrap();
    assert_eq!(records[0].predicted_seconds, 0);
    assert_eq!(records[0].status, SessionStatus::Completed);
}

#[test]
fn overtime_rings_repeatedly_with_live_interval() {
    let rig = Rig::new(Config::default());
    rig.app.shell().submit("review 1m");

    rig.wait(61);
    assert_eq!(rig.notifier.bell_count(), 1);
    let notified = rig
        .notifier
        .calls()
        .into_iter()
        .any(|c| matches!(c, NotifierCall::Notification { ref body, .. } if body == "You focused on review for 1m 1s"));
    assert!(notified);

    rig.wait(10);
    assert_eq!(rig.notifier.bell_count(), 1);
    rig.wait(10);
    assert_eq!(rig.notifier.bell_count(), 2);

    rig.app
        .config()
        .update(|c| c.notifications.bell_repeat_interval_secs = 0);
    rig.wait(60);
    assert_eq!(rig.notifier.bell_count(), 2);

    // pulling back out of overtime stops the repeat for good
    rig.app.config().update(|c| c.notifications.bell_repeat_interval_secs = 5);
    rig.app.machine().adjust(600);
    rig.wait(1);
    assert!(!rig.app.bell_repeating());
    rig.wait(30);
    assert_eq!(rig.notifier.bell_count(), 2);
}

#[test]
fn cancel_records_only_sessions_with_intent() {
    let rig = Rig::new(Config::default());
    rig.app.shell().submit("");
    rig.wait(5);
    rig.app.machine().cancel();
    assert!(rig.log.read_all().unwrap().is_empty());
    assert_eq!(rig.app.shell().screen(), Screen::NewFocus);

    rig.app.shell().submit("refactor 20m");
    rig.wait(45);
    rig.app.machine().cancel();
    let records = rig.log.read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, SessionStatus::Canceled);
    assert_eq!(records[0].actual_seconds, 45);

    // the shell restarted the idle countdown after each cancel
    assert!(rig.app.machine().is_active());
}

#[test]
fn failing_notifier_never_stops_the_timer() {
    let rig = Rig::new(Config::default());
    rig.notifier.set_failing(true);
    rig.app.shell().submit("x 1m");
    rig.wait(70);
    rig.app.machine().complete();
    assert_eq!(rig.log.read_all().unwrap().len(), 1);
}

#[test]
fn database_log_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pucoti.db");
    let clock = Arc::new(ManualClock::new(Utc::now()));
    {
        let db = Arc::new(Database::open_at(&path).unwrap());
        let machine = TimerMachine::new(clock.clone(), Arc::new(ManualScheduler::new()));
        let app = App::builder(machine, ConfigHandle::default(), db.clone())
            .active_store(db)
            .notifier(Arc::new(MemoryNotifier::new()))
            .build();
        app.shell().submit("persist me 5m");
        clock.advance_secs(300);
        app.machine().complete();
        app.close();
    }
    let db = Database::open_at(&path).unwrap();
    let sessions = db.recent_sessions(10).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].focus_text, "persist me");
    assert_eq!(sessions[0].actual_seconds, 300);
}

#[tokio::test(start_paused = true)]
async fn tokio_scheduler_drives_ticks_until_complete() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let machine = TimerMachine::new(clock.clone(), Arc::new(TokioScheduler::current()));
    let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let _sub = machine.subscribe(move |e| {
        if e.kind() == "tick" {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    });

    machine.start("async", Some(60), 0, vec![]);
    // one immediate tick plus five scheduled ones
    tokio::time::sleep(Duration::from_millis(1010)).await;
    assert_eq!(ticks.load(std::sync::atomic::Ordering::SeqCst), 6);

    machine.complete();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(ticks.load(std::sync::atomic::Ordering::SeqCst), 6);
}
