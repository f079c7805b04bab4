//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Bell and notification behavior
//! - Status file publishing
//! - Window placement when a timer starts
//! - The last duration the user asked for
//!
//! Configuration is stored at `~/.config/pucoti/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::data_dir;
use crate::error::ConfigError;

/// Bell and desktop notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Seconds between repeated bells while in overtime. `0` rings once.
    #[serde(default = "default_bell_repeat_interval")]
    pub bell_repeat_interval_secs: u64,
    /// Sound file played instead of the stock bell.
    #[serde(default)]
    pub custom_bell_path: Option<String>,
    #[serde(default = "default_bell_path")]
    pub default_bell_path: String,
    /// Player invoked with the bell path as its only argument.
    #[serde(default = "default_bell_command")]
    pub bell_command: String,
    /// Shell command run instead of `notify-send`. `{title}` and `{body}`
    /// are substituted.
    #[serde(default)]
    pub notification_command: Option<String>,
}

/// Status publishing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Where the status JSON is written. Defaults to `status.json` in the
    /// data directory.
    #[serde(default)]
    pub path: Option<String>,
}

/// What happens to the window when a focus session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStartMode {
    None,
    Corner,
}

/// Screen corner used for the compact window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Window geometry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_on_timer_start")]
    pub on_timer_start: WindowStartMode,
    #[serde(default = "default_corner")]
    pub corner: Corner,
    #[serde(default = "default_normal_width")]
    pub normal_width: u32,
    #[serde(default = "default_normal_height")]
    pub normal_height: u32,
    #[serde(default = "default_small_width")]
    pub small_width: u32,
    #[serde(default = "default_small_height")]
    pub small_height: u32,
    #[serde(default = "default_margin")]
    pub margin: u32,
}

impl WindowConfig {
    pub fn auto_compact(&self) -> bool {
        self.on_timer_start == WindowStartMode::Corner
    }
}

/// Timer state remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default)]
    pub last_duration_secs: Option<u64>,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub timer: TimerConfig,
}

fn default_bell_repeat_interval() -> u64 {
    20
}
fn default_bell_path() -> String {
    "/usr/share/sounds/freedesktop/stereo/complete.oga".to_string()
}
fn default_bell_command() -> String {
    "paplay".to_string()
}
fn default_true() -> bool {
    true
}
fn default_on_timer_start() -> WindowStartMode {
    WindowStartMode::Corner
}
fn default_corner() -> Corner {
    Corner::BottomRight
}
fn default_normal_width() -> u32 {
    600
}
fn default_normal_height() -> u32 {
    500
}
fn default_small_width() -> u32 {
    320
}
fn default_small_height() -> u32 {
    120
}
fn default_margin() -> u32 {
    16
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            bell_repeat_interval_secs: default_bell_repeat_interval(),
            custom_bell_path: None,
            default_bell_path: default_bell_path(),
            bell_command: default_bell_command(),
            notification_command: None,
        }
    }
}

impl NotificationsConfig {
    /// The sound to play: the custom bell when set, else the stock one.
    pub fn bell_path(&self) -> &str {
        self.custom_bell_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_bell_path)
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl StatusConfig {
    /// The status file location, or `None` if the data directory is unusable.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        match self.path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => Some(PathBuf::from(path)),
            None => data_dir().ok().map(|dir| dir.join("status.json")),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            on_timer_start: default_on_timer_start(),
            corner: default_corner(),
            normal_width: default_normal_width(),
            normal_height: default_normal_height(),
            small_width: default_small_width(),
            small_height: default_small_height(),
            margin: default_margin(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Unset optionals take numbers, booleans and `null` as JSON, anything else as text.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default location: `config.toml` in the data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not touch disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit
    /// the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Every leaf key with its current value, in document order.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

/// Shared, live configuration.
///
/// Coordinators read through the handle at the moment they act, so a
/// change made mid-session takes effect on the next decision.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Config>>,
    path: Option<PathBuf>,
}

impl ConfigHandle {
    /// In-memory handle; `persist` is a no-op.
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: None,
        }
    }

    /// Handle that writes back to `path` on `persist`.
    pub fn with_path(config: Config, path: PathBuf) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: Some(path),
        }
    }

    /// Copy of the current configuration.
    pub fn snapshot(&self) -> Config {
        self.read(Config::clone)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Config) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Config) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Write the current configuration to the backing file, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn persist(&self) -> Result<(), ConfigError> {
        match &self.path {
            Some(path) => self.snapshot().save_to(path),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("status.enabled").as_deref(), Some("true"));
        assert_eq!(
            cfg.get("notifications.bell_repeat_interval_secs").as_deref(),
            Some("20")
        );
        assert_eq!(cfg.get("window.corner").as_deref(), Some("bottom-right"));
        assert!(cfg.get("status.missing_key").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_bool() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "status.enabled", "false").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "status.enabled").unwrap(),
            &serde_json::Value::Bool(false)
        );
    }

    #[test]
    fn set_json_value_by_path_updates_nested_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "notifications.bell_repeat_interval_secs", "45")
            .unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "notifications.bell_repeat_interval_secs")
                .unwrap(),
            &serde_json::Value::Number(45.into())
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "status.nonexistent_key", "value");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_type() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "status.enabled", "not_a_bool");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn set_fills_unset_optionals() {
        let mut cfg = Config::default();
        cfg.set("timer.last_duration_secs", "1500").unwrap();
        assert_eq!(cfg.timer.last_duration_secs, Some(1500));

        cfg.set("notifications.custom_bell_path", "/tmp/ding.wav").unwrap();
        assert_eq!(
            cfg.notifications.custom_bell_path.as_deref(),
            Some("/tmp/ding.wav")
        );
        assert_eq!(cfg.notifications.bell_path(), "/tmp/ding.wav");

        cfg.set("timer.last_duration_secs", "null").unwrap();
        assert_eq!(cfg.timer.last_duration_secs, None);
    }

    #[test]
    fn set_rejects_unknown_enum_variant() {
        let mut cfg = Config::default();
        assert!(cfg.set("window.corner", "middle").is_err());
        cfg.set("window.corner", "top-left").unwrap();
        assert_eq!(cfg.window.corner, Corner::TopLeft);
        cfg.set("window.on_timer_start", "none").unwrap();
        assert!(!cfg.window.auto_compact());
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.notifications.bell_repeat_interval_secs, 20);
        assert_eq!(cfg.notifications.bell_command, "paplay");
        assert!(cfg.notifications.notification_command.is_none());
        assert!(cfg.status.enabled);
        assert_eq!(cfg.window.on_timer_start, WindowStartMode::Corner);
        assert_eq!((cfg.window.normal_width, cfg.window.normal_height), (600, 500));
        assert_eq!((cfg.window.small_width, cfg.window.small_height), (320, 120));
        assert_eq!(cfg.window.margin, 16);
        assert!(cfg.timer.last_duration_secs.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[status]\nenabled = false\n").unwrap();
        assert!(!parsed.status.enabled);
        assert_eq!(parsed.notifications, NotificationsConfig::default());
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "status = [[").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn entries_lists_leaf_keys() {
        let entries = Config::default().entries();
        assert!(entries
            .iter()
            .any(|(k, v)| k == "window.margin" && v == "16"));
        assert!(entries.iter().all(|(k, _)| k.contains('.')));
    }

    #[test]
    fn handle_updates_are_visible_to_clones_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let handle = ConfigHandle::with_path(Config::default(), path.clone());
        let other = handle.clone();

        handle.update(|c| c.notifications.bell_repeat_interval_secs = 5);
        assert_eq!(
            other.read(|c| c.notifications.bell_repeat_interval_secs),
            5
        );

        handle.persist().unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.notifications.bell_repeat_interval_secs, 5);
    }
}
