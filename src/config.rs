//! User settings for the card-layout tool
//!
//! Stored as JSON under the platform config dir. Environment variables take
//! precedence over the file, and everything is validated after loading.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level as TraceLevel};

use crate::constants::config::{APP_DIR, LAYOUT_FILENAME, SETTINGS_FILENAME};
use crate::types::Point;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// `trace`, `debug`, `info`, `warn` or `error`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where the override payload lives. Defaults next to the settings file.
    #[serde(default)]
    pub layout_path: Option<PathBuf>,

    /// External card defaults table; the built-in table is used when unset
    #[serde(default)]
    pub registry_path: Option<PathBuf>,

    /// Center anchor the card offsets are measured from
    #[serde(default)]
    pub center: Point,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            layout_path: None,
            registry_path: None,
            center: Point::default(),
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn config_path() -> PathBuf {
        let mut path = app_dir();
        path.push(SETTINGS_FILENAME);
        path
    }

    /// Read settings from `path` (or the default location) and apply env
    /// overrides. A missing file gives defaults; a malformed one is an error.
    ///
    /// Call [`Settings::validate_and_clamp`] once logging is up so its
    /// warnings are visible.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        let mut settings = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Settings>(&contents)
                .context(format!("Failed to parse settings file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => {
                return Err(e).context(format!("Failed to read settings file {}", path.display()));
            }
        };

        settings.apply_overrides_from(|var| env::var(var).ok());
        Ok(settings)
    }

    /// Apply overrides from the environment-like `lookup`
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(x) = parse_num(&lookup, "CARD_LAYOUT_CENTER_X") {
            self.center.x = x;
        }
        if let Some(y) = parse_num(&lookup, "CARD_LAYOUT_CENTER_Y") {
            self.center.y = y;
        }
    }

    /// Clamp values to safe ranges
    pub fn validate_and_clamp(&mut self) {
        if parse_level(&self.log_level).is_none() {
            warn!(log_level = %self.log_level, using = "info", "Unknown log_level, using default");
            self.log_level = default_log_level();
        }

        if !self.center.x.is_finite() || !self.center.y.is_finite() {
            warn!(x = self.center.x, y = self.center.y, "center is not finite, using origin");
            self.center = Point::default();
        }
    }

    pub fn trace_level(&self) -> TraceLevel {
        parse_level(&self.log_level).unwrap_or(TraceLevel::INFO)
    }

    /// Configured layout path, or `<config_dir>/card-layout/layout-config.json`
    pub fn layout_path(&self) -> PathBuf {
        self.layout_path.clone().unwrap_or_else(|| {
            let mut path = app_dir();
            path.push(LAYOUT_FILENAME);
            path
        })
    }
}

fn app_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

fn parse_level(level: &str) -> Option<TraceLevel> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(TraceLevel::TRACE),
        "debug" => Some(TraceLevel::DEBUG),
        "info" => Some(TraceLevel::INFO),
        "warn" => Some(TraceLevel::WARN),
        "error" => Some(TraceLevel::ERROR),
        _ => None,
    }
}

fn parse_num<T>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Debug,
{
    let raw = lookup(var)?;
    raw.trim()
        .parse::<T>()
        .inspect_err(|e| error!(var = %var, error = ?e, "failed to parse env var"))
        .ok()
}

/// Log where settings came from, once a subscriber is installed
pub fn log_loaded(settings: &Settings, path: &Path) {
    if path.exists() {
        info!(path = %path.display(), "Loaded settings");
    } else {
        info!(path = %path.display(), "No settings file found, using defaults");
    }
    info!(
        layout = %settings.layout_path().display(),
        center_x = settings.center.x,
        center_y = settings.center.y,
        "Active settings"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("settings.json"))).unwrap();
        assert_eq!(settings.registry_path, None);
        assert_eq!(settings.layout_path, None);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ \"center\": ").unwrap();
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "center": { "x": 640.0, "y": 360.0 } }"#).unwrap();
        assert_eq!(settings.center, Point::new(640.0, 360.0));
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.registry_path, None);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_overrides_from(lookup_from(&[
            ("LOG_LEVEL", "debug"),
            ("CARD_LAYOUT_CENTER_Y", " 12 "),
            ("CARD_LAYOUT_CENTER_X", "512.5"),
        ]));
        assert_eq!(settings.trace_level(), TraceLevel::DEBUG);
        assert_eq!(settings.center, Point::new(512.5, 12.0));
    }

    #[test]
    fn test_unparseable_env_value_is_ignored() {
        let mut settings = Settings { center: Point::new(8.0, 9.0), ..Default::default() };
        settings.apply_overrides_from(lookup_from(&[("CARD_LAYOUT_CENTER_X", "lots")]));
        assert_eq!(settings.center, Point::new(8.0, 9.0));
    }

    #[test]
    fn test_validate_and_clamp() {
        let mut settings = Settings {
            log_level: "chatty".to_string(),
            center: Point::new(f64::NAN, 4.0),
            ..Default::default()
        };
        settings.validate_and_clamp();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.center, Point::default());
    }

    #[test]
    fn test_explicit_layout_path_wins() {
        let settings: Settings = serde_json::from_str(r#"{ "layout_path": "/tmp/cards/layout.json" }"#).unwrap();
        assert_eq!(settings.layout_path(), PathBuf::from("/tmp/cards/layout.json"));
    }

    #[test]
    fn test_default_layout_path_is_under_app_dir() {
        let path = Settings::default().layout_path();
        assert!(path.ends_with("card-layout/layout-config.json"));
    }
}
