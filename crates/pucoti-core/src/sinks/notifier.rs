//! Bell and notifications through external programs.
//!
//! Nothing here blocks the caller: children are spawned and reaped on a
//! background thread.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use super::NotificationSink;
use crate::error::SinkError;
use crate::storage::ConfigHandle;

/// Plays the bell with `notifications.bell_command` (or rodio with the
/// `audio` feature) and shows notifications with `notify-send` or the
/// configured command.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    config: ConfigHandle,
}

impl CommandNotifier {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }

    fn bell_file(&self, custom_path: Option<&str>) -> Result<PathBuf, SinkError> {
        let path = match custom_path.filter(|p| !p.is_empty()) {
            Some(custom) if Path::new(custom).exists() => PathBuf::from(custom),
            Some(custom) => {
                tracing::warn!(path = custom, "custom bell not found, using default");
                PathBuf::from(self.config.read(|c| c.notifications.default_bell_path.clone()))
            }
            None => PathBuf::from(self.config.read(|c| c.notifications.default_bell_path.clone())),
        };
        if path.as_os_str().is_empty() || !path.exists() {
            return Err(SinkError::Unavailable(format!(
                "bell sound '{}' not found",
                path.display()
            )));
        }
        Ok(path)
    }

    #[cfg(feature = "audio")]
    fn play_file(&self, path: PathBuf) -> Result<(), SinkError> {
        std::thread::Builder::new()
            .name("pucoti-bell".into())
            .spawn(move || {
                use rodio::{Decoder, OutputStream, Sink};
                use std::fs::File;
                use std::io::BufReader;

                let Ok((_stream, stream_handle)) = OutputStream::try_default() else {
                    tracing::warn!("no audio output device");
                    return;
                };
                let Ok(file) = File::open(&path) else { return };
                let Ok(source) = Decoder::new(BufReader::new(file)) else {
                    tracing::warn!(path = %path.display(), "unsupported bell format");
                    return;
                };
                let Ok(sink) = Sink::try_new(&stream_handle) else {
                    return;
                };
                sink.append(source);
                sink.sleep_until_end();
            })?;
        Ok(())
    }

    #[cfg(not(feature = "audio"))]
    fn play_file(&self, path: PathBuf) -> Result<(), SinkError> {
        let player = self.config.read(|c| c.notifications.bell_command.clone());
        let mut cmd = Command::new(&player);
        cmd.arg(&path);
        spawn_detached(&player, cmd)
    }
}

impl NotificationSink for CommandNotifier {
    fn play_bell(&self, custom_path: Option<&str>) -> Result<(), SinkError> {
        let path = self.bell_file(custom_path)?;
        tracing::debug!(path = %path.display(), "ringing bell");
        self.play_file(path)
    }

    fn show_notification(
        &self,
        title: &str,
        body: &str,
        custom_command: Option<&str>,
    ) -> Result<(), SinkError> {
        match custom_command.map(str::trim).filter(|c| !c.is_empty()) {
            Some(template) => {
                let line = template
                    .replace("{title}", &shell_escape(title))
                    .replace("{body}", &shell_escape(body));
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(&line);
                spawn_detached(template, cmd)
            }
            None => {
                let mut cmd = Command::new("notify-send");
                cmd.arg(title).arg(body);
                spawn_detached("notify-send", cmd)
            }
        }
    }
}

/// Quote `s` for a POSIX shell.
pub fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn spawn_detached(label: &str, mut cmd: Command) -> Result<(), SinkError> {
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| SinkError::CommandFailed {
            command: label.to_string(),
            message: e.to_string(),
        })?;
    reap(label.to_string(), child);
    Ok(())
}

fn reap(label: String, mut child: Child) {
    let spawned = std::thread::Builder::new()
        .name("pucoti-reaper".into())
        .spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                tracing::debug!(command = %label, %status, "command exited with failure");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(command = %label, error = %e, "wait failed"),
        });
    if let Err(e) = spawned {
        tracing::debug!(error = %e, "could not spawn reaper thread");
    }
}
