//! Window placement. Only sway is driven directly; elsewhere the host keeps
//! whatever layout it has.

use std::process::Command;

use tracing::{debug, warn};

use super::WindowController;
use crate::error::SinkError;
use crate::storage::{Corner, WindowConfig};

const FALLBACK_DISPLAY: (u32, u32) = (1920, 1080);

/// Top-left position of a `size` window pinned to `corner` of `display`.
pub fn corner_position(display: (u32, u32), size: (u32, u32), corner: Corner, margin: u32) -> (i64, i64) {
    let (dw, dh) = (i64::from(display.0), i64::from(display.1));
    let (w, h) = (i64::from(size.0), i64::from(size.1));
    let m = i64::from(margin);
    let right = (dw - w - m).max(0);
    let bottom = (dh - h - m).max(0);
    match corner {
        Corner::TopLeft => (m, m),
        Corner::TopRight => (right, m),
        Corner::BottomLeft => (m, bottom),
        Corner::BottomRight => (right, bottom),
    }
}

/// Pick the controller for the running desktop.
pub fn window_controller_for_desktop() -> Box<dyn WindowController> {
    match SwayWindowController::detect() {
        Some(sway) => Box::new(sway),
        None => Box::new(NoopWindowController),
    }
}

/// Drives the focused window through `swaymsg`.
#[derive(Debug, Clone, Default)]
pub struct SwayWindowController {
    _private: (),
}

impl SwayWindowController {
    /// `Some` when `XDG_CURRENT_DESKTOP` says sway.
    pub fn detect() -> Option<Self> {
        let desktop = std::env::var("XDG_CURRENT_DESKTOP").ok()?;
        desktop
            .split(':')
            .any(|d| d.eq_ignore_ascii_case("sway"))
            .then(Self::default)
    }

    fn run_in_background(label: &'static str, build: impl FnOnce() -> Vec<String> + Send + 'static) -> Result<(), SinkError> {
        std::thread::Builder::new()
            .name("pucoti-window".into())
            .spawn(move || {
                for command in build() {
                    if let Err(e) = swaymsg(&command) {
                        warn!(mode = label, error = %e, "window mode change failed");
                        return;
                    }
                }
                debug!(mode = label, "window mode applied");
            })?;
        Ok(())
    }
}

impl WindowController for SwayWindowController {
    fn set_compact_mode(&self, window: &WindowConfig) -> Result<(), SinkError> {
        let window = window.clone();
        Self::run_in_background("compact", move || {
            let display = focused_output_size().unwrap_or(FALLBACK_DISPLAY);
            let (x, y) = corner_position(
                display,
                (window.small_width, window.small_height),
                window.corner,
                window.margin,
            );
            vec![format!(
                "floating enable, resize set {} {}, move position {x} {y}, sticky enable",
                window.small_width, window.small_height
            )]
        })
    }

    fn set_normal_mode(&self, window: &WindowConfig) -> Result<(), SinkError> {
        let (w, h) = (window.normal_width, window.normal_height);
        Self::run_in_background("normal", move || {
            vec![
                "sticky disable, floating disable".to_string(),
                format!("resize set {w} {h}"),
            ]
        })
    }
}

fn swaymsg(command: &str) -> Result<(), SinkError> {
    let output = Command::new("swaymsg").arg(command).output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(SinkError::CommandFailed {
            command: format!("swaymsg {command}"),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn focused_output_size() -> Option<(u32, u32)> {
    let output = Command::new("swaymsg")
        .args(["-t", "get_outputs"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_output_size(&output.stdout)
}

fn parse_output_size(json: &[u8]) -> Option<(u32, u32)> {
    let outputs: Vec<serde_json::Value> = serde_json::from_slice(json).ok()?;
    let output = outputs
        .iter()
        .find(|o| o.get("focused").and_then(|f| f.as_bool()) == Some(true))
        .or_else(|| outputs.first())?;
    let rect = output.get("rect")?;
    let width = rect.get("width")?.as_u64()?;
    let height = rect.get("height")?.as_u64()?;
    Some((u32::try_from(width).ok()?, u32::try_from(height).ok()?))
}

/// Leaves the window alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWindowController;

impl WindowController for NoopWindowController {
    fn set_compact_mode(&self, _window: &WindowConfig) -> Result<(), SinkError> {
        Ok(())
    }

    fn set_normal_mode(&self, _window: &WindowConfig) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_keep_margin() {
        let display = (1920, 1080);
        let size = (320, 120);
        assert_eq!(corner_position(display, size, Corner::TopLeft, 16), (16, 16));
        assert_eq!(corner_position(display, size, Corner::TopRight, 16), (1584, 16));
        assert_eq!(corner_position(display, size, Corner::BottomLeft, 16), (16, 944));
        assert_eq!(corner_position(display, size, Corner::BottomRight, 16), (1584, 944));
    }

    #[test]
    fn tiny_display_clamps_to_origin() {
        assert_eq!(corner_position((200, 100), (320, 120), Corner::BottomRight, 16), (0, 0));
    }

    #[test]
    fn parse_prefers_focused_output() {
        let json = br#"[
            {"name": "eDP-1", "focused": false, "rect": {"x": 0, "y": 0, "width": 1920, "height": 1080}},
            {"name": "DP-2", "focused": true, "rect": {"x": 1920, "y": 0, "width": 2560, "height": 1440}}
        ]"#;
        assert_eq!(parse_output_size(json), Some((2560, 1440)));
    }

    #[test]
    fn parse_falls_back_to_first_output() {
        let json = br#"[{"name": "eDP-1", "rect": {"width": 1280, "height": 800}}]"#;
        assert_eq!(parse_output_size(json), Some((1280, 800)));
        assert_eq!(parse_output_size(b"not json"), None);
        assert_eq!(parse_output_size(b"[]"), None);
    }
}
