//! Foreground session: the timer runs on a tokio runtime while commands are
//! read line by line from stdin.

use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex, Weak};

use clap::Args;
use pucoti_core::format::{format_countdown, format_duration, format_timestamp};
use pucoti_core::parse::require_duration;
use pucoti_core::shell::{format_error_percent, DisplayMode, Screen, Shell};
use pucoti_core::sinks::{window_controller_for_desktop, CommandNotifier, NullStatusSink, StatusFile, StatusSink};
use pucoti_core::storage::{Config, ConfigHandle, Database};
use pucoti_core::timer::{Subscription, SystemClock, TimerMachine, TokioScheduler};
use pucoti_core::{App, TimerEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str =
    "commands: + / - (±1 min), +N / -N (±N min), set <duration>, done, cancel, new <input>, status, zen, history, quit";

/// Sessions shown by the `history` command.
const HISTORY_LINES: usize = 5;

#[derive(Args)]
pub struct RunArgs {
    /// What to focus on and for how long, e.g. `write the intro 45m`.
    /// Empty starts the idle countdown.
    #[arg(allow_hyphen_values = true)]
    input: Vec<String>,
}

/// One line typed while the timer runs.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Adjust(i64),
    SetRemaining(u64),
    Done,
    Cancel,
    New(String),
    Status,
    Zen,
    History,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let command = match line {
            "+" => Ok(Self::Adjust(60)),
            "-" => Ok(Self::Adjust(-60)),
            "done" => Ok(Self::Done),
            "cancel" => Ok(Self::Cancel),
            "status" => Ok(Self::Status),
            "zen" => Ok(Self::Zen),
            "history" => Ok(Self::History),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "new" => Ok(Self::New(String::new())),
            _ => {
                if let Some(rest) = line.strip_prefix("new ") {
                    Ok(Self::New(rest.trim().to_string()))
                } else if let Some(rest) = line.strip_prefix("set ") {
                    require_duration(rest)
                        .map(Self::SetRemaining)
                        .map_err(|e| e.to_string())
                } else if let Some(seconds) = parse_minutes(line).and_then(|m| m.checked_mul(60)) {
                    Ok(Self::Adjust(seconds))
                } else {
                    Err(format!("unknown command: {line}"))
                }
            }
        };
        Some(command)
    }
}

fn parse_minutes(s: &str) -> Option<i64> {
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    digits.parse::<i64>().ok().map(|n| sign * n)
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Ticks and typed commands share one thread, so they never interleave.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(session(args.input.join(" ")));
    // A pending stdin read would otherwise hold shutdown open.
    runtime.shutdown_background();
    result
}

async fn session(input: String) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = Config::path()?;
    let config = Config::load_from(&config_path)?;
    let status: Arc<dyn StatusSink> = match config.status.resolved_path() {
        Some(path) => Arc::new(StatusFile::new(path)),
        None => Arc::new(NullStatusSink),
    };
    let config = ConfigHandle::with_path(config, config_path);
    let db = Arc::new(Database::open()?);

    let machine = TimerMachine::new(Arc::new(SystemClock), Arc::new(TokioScheduler::current()));
    let app = App::builder(machine, config.clone(), db.clone())
        .active_store(db.clone())
        .notifier(Arc::new(CommandNotifier::new(config)))
        .status_sink(status)
        .window_controller(Arc::from(window_controller_for_desktop()))
        .build();
    let printer = attach_printer(app.shell());

    app.shell().submit(&input);
    eprintln!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    None => {}
                    Some(Err(message)) => eprintln!("{message}"),
                    Some(Ok(Command::Quit)) => break,
                    Some(Ok(command)) => execute(&app, &db, command),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
        }
    }

    drop(printer);
    app.close();
    Ok(())
}

fn execute(app: &App, db: &Database, command: Command) {
    let shell = app.shell();
    match command {
        Command::Adjust(delta) => shell.machine().adjust(delta),
        Command::SetRemaining(seconds) => {
            shell.set_remaining(i64::try_from(seconds).unwrap_or(i64::MAX));
        }
        Command::Done => {
            shell.machine().complete();
        }
        Command::Cancel => {
            shell.machine().cancel();
        }
        Command::New(input) => shell.submit(&input),
        Command::Status => match (shell.machine().state(), shell.machine().computed()) {
            (Some(state), Some(computed)) => println!(
                "{} {}",
                format_countdown(computed.remaining),
                display_text(&state.focus_text)
            ),
            _ => println!("idle"),
        },
        Command::Zen => match shell.toggle_zen() {
            DisplayMode::Zen => eprintln!("zen on: live countdown hidden"),
            _ => eprintln!("zen off"),
        },
        Command::History => {
            shell.set_screen(Screen::History);
            match db.recent_sessions(HISTORY_LINES) {
                Ok(sessions) if sessions.is_empty() => println!("no sessions yet"),
                Ok(sessions) => {
                    for s in sessions {
                        println!(
                            "{}  {:<9}  {:>8}  {}",
                            format_timestamp(s.timestamp),
                            s.status.as_str(),
                            format_duration(s.actual_seconds),
                            display_text(&s.focus_text),
                        );
                    }
                }
                Err(e) => eprintln!("history unavailable: {e}"),
            }
        }
        Command::Help => eprintln!("{HELP}"),
        Command::Quit => {}
    }
}

fn display_text(focus_text: &str) -> &str {
    if focus_text.is_empty() {
        "(no intent)"
    } else {
        focus_text
    }
}

/// Print session milestones to stdout and a live countdown to a terminal stderr.
fn attach_printer(shell: &Arc<Shell>) -> Subscription {
    let weak: Weak<Shell> = Arc::downgrade(shell);
    let live = std::io::stderr().is_terminal();
    let shown = Mutex::new(None::<i64>);

    shell.machine().subscribe(move |event| match event {
        TimerEvent::Started { state } if state.has_content() => {
            println!("started: {}", display_text(&state.focus_text));
        }
        TimerEvent::Tick { remaining, .. }
            if live && weak.upgrade().is_some_and(|s| s.display_mode() != DisplayMode::Zen) =>
        {
            let mut shown = shown.lock().unwrap_or_else(|e| e.into_inner());
            if *shown != Some(*remaining) {
                *shown = Some(*remaining);
                let mut err = std::io::stderr().lock();
                let _ = write!(err, "\r\x1b[K{}", format_countdown(*remaining));
                let _ = err.flush();
            }
        }
        TimerEvent::OvertimeEntered { .. } => println!("\ntime's up"),
        TimerEvent::Completed { state, elapsed } => {
            let mut line = format!(
                "completed: {} in {}",
                display_text(&state.focus_text),
                format_duration((*elapsed).max(0) as u64)
            );
            if let Some(completion) = weak.upgrade().and_then(|s| s.last_completion()) {
                if let Some(p) = completion.error_percent {
                    line.push_str(&format!(", {}", format_error_percent(p)));
                }
                if let Some(remark) = completion.remark {
                    line.push_str(&format!(". {remark}"));
                }
            }
            println!("\n{line}");
        }
        TimerEvent::Canceled { state, .. } if state.has_content() => {
            println!("\ncanceled: {}", display_text(&state.focus_text));
        }
        _ => {}
    })
}
