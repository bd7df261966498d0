//! Configuration loading and types for redink
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/redink/config.toml)
//! 3. Environment variables (REDINK_API_KEY / GEMINI_API_KEY)
//! 4. CLI arguments (highest priority)

use crate::error::RedinkError;
use crate::mode::CorrectionMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Redink Configuration
#
# Location: ~/.config/redink/config.toml
# All settings can be overridden via CLI flags

[api]
# Google Gemini API key. Get one from: https://aistudio.google.com/app/apikey
# Can also be set via REDINK_API_KEY or GEMINI_API_KEY.
key = ""

# Model name to use
model = "gemini-2.0-flash-exp"

# Maximum attempts per correction (transient failures only)
max_retries = 3

# Per-attempt network timeout in seconds
timeout_secs = 10

[hotkeys]
# Chord strings: modifiers joined with '+', non-modifier key last.
# Key names are evdev KEY_* names without the prefix (see evtest).
grammar_fix = "leftctrl+leftshift+g"
formal = "leftctrl+leftshift+f"
casual = "leftctrl+leftshift+c"
simplify = "leftctrl+leftshift+s"
expand = "leftctrl+leftshift+e"

[rate_limit]
# Outbound API requests per trailing 60 seconds (1..=60)
requests_per_minute = 50

# What to do when the window is full: "wait" (block until a slot frees)
# or "fail" (notify and drop the request)
on_limit = "wait"

[clipboard]
# How long to wait for the copy gesture to land in the clipboard (ms)
capture_timeout_ms = 300

# Settle time after the paste gesture before the clipboard is restored (ms)
restore_delay_ms = 150

[ui]
# Desktop notifications for working/success/failure
show_notifications = true

# Notification display duration in seconds
notification_duration_secs = 2

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Optional log file, written in addition to stderr
# file = "/home/you/.local/state/redink/redink.log"
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    /// Mode name -> chord string
    #[serde(default = "default_hotkeys")]
    pub hotkeys: HashMap<String, String>,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub clipboard: ClipboardConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API key; empty means "take it from the environment"
    #[serde(default)]
    pub key: String,

    /// Model name sent to the API
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum attempts per correction (transient failures only)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-attempt network timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Behavior when the rate window is full
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnLimit {
    /// Block the caller until the oldest entry leaves the window (default:
    /// a user is actively waiting for an interactive correction)
    #[default]
    Wait,
    /// Fail fast with a retry-after hint
    Fail,
}

/// Rate limiter configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per trailing 60 seconds (provider hard limit is 60)
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,

    #[serde(default)]
    pub on_limit: OnLimit,
}

/// Clipboard transaction timings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClipboardConfig {
    /// Bounded wait for the copy gesture to change the clipboard (ms)
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,

    /// Settle time after the paste gesture before restore (ms)
    #[serde(default = "default_restore_delay_ms")]
    pub restore_delay_ms: u64,
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub show_notifications: bool,

    /// Notification display duration in seconds
    #[serde(default = "default_notification_duration")]
    pub notification_duration_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional log file, written in addition to stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_rpm() -> u32 {
    50
}

fn default_capture_timeout_ms() -> u64 {
    300
}

fn default_restore_delay_ms() -> u64 {
    150
}

fn default_notification_duration() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_hotkeys() -> HashMap<String, String> {
    [
        ("grammar_fix", "leftctrl+leftshift+g"),
        ("formal", "leftctrl+leftshift+f"),
        ("casual", "leftctrl+leftshift+c"),
        ("simplify", "leftctrl+leftshift+s"),
        ("expand", "leftctrl+leftshift+e"),
    ]
    .into_iter()
    .map(|(m, c)| (m.to_string(), c.to_string()))
    .collect()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            model: default_model(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_rpm(),
            on_limit: OnLimit::default(),
        }
    }
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            capture_timeout_ms: default_capture_timeout_ms(),
            restore_delay_ms: default_restore_delay_ms(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_notifications: true,
            notification_duration_secs: default_notification_duration(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            hotkeys: default_hotkeys(),
            rate_limit: RateLimitConfig::default(),
            clipboard: ClipboardConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// A validated chord -> mode binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub mode: CorrectionMode,
    pub chord: String,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "redink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Validate the loaded configuration. Fatal at startup.
    pub fn validate(&self) -> Result<(), RedinkError> {
        if self.api.key.trim().is_empty() || self.api.key == "YOUR_GEMINI_API_KEY_HERE" {
            return Err(RedinkError::Config(
                "Gemini API key not configured.\n\
                 Add it to config.toml under [api], or set REDINK_API_KEY.\n\
                 Get a key from: https://aistudio.google.com/app/apikey"
                    .to_string(),
            ));
        }

        let rpm = self.rate_limit.requests_per_minute;
        if rpm == 0 || rpm > 60 {
            return Err(RedinkError::Config(format!(
                "rate_limit.requests_per_minute must be between 1 and 60, got {rpm}"
            )));
        }

        if self.api.max_retries == 0 {
            return Err(RedinkError::Config(
                "api.max_retries must be at least 1".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(RedinkError::Config(format!(
                    "logging.level must be one of trace, debug, info, warn, error; got '{other}'"
                )));
            }
        }

        self.bindings()?;
        Ok(())
    }

    /// Resolve `[hotkeys]` into validated bindings, in mode declaration order.
    /// Unknown mode names and duplicate chords are configuration errors.
    /// Key-name parsing inside a chord is deferred to the platform listener,
    /// which owns the key table; a bad key name is still fatal at startup.
    pub fn bindings(&self) -> Result<Vec<HotkeyBinding>, RedinkError> {
        for name in self.hotkeys.keys() {
            if CorrectionMode::from_config_name(name).is_none() {
                return Err(RedinkError::Config(format!(
                    "Unknown mode '{name}' under [hotkeys]. Valid modes: {}",
                    CorrectionMode::ALL
                        .iter()
                        .map(|m| m.config_name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }

        let mut bindings = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for mode in CorrectionMode::ALL {
            if let Some(chord) = self.hotkeys.get(mode.config_name()) {
                let normalized = normalize_chord(chord);
                if normalized.is_empty() {
                    return Err(RedinkError::Config(format!(
                        "Empty chord for mode '{mode}'"
                    )));
                }
                if !seen.insert(normalized.clone()) {
                    return Err(crate::error::HotkeyError::DuplicateChord(normalized).into());
                }
                bindings.push(HotkeyBinding {
                    mode,
                    chord: normalized,
                });
            }
        }

        if bindings.is_empty() {
            return Err(RedinkError::Config(
                "No hotkeys configured under [hotkeys]".to_string(),
            ));
        }

        Ok(bindings)
    }
}

/// Canonical chord form: lowercase, no spaces
pub fn normalize_chord(chord: &str) -> String {
    chord
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, RedinkError> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| RedinkError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| RedinkError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(key) = std::env::var("REDINK_API_KEY") {
        config.api.key = key;
    } else if config.api.key.trim().is_empty() {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            config.api.key = key;
        }
    }
    if let Ok(model) = std::env::var("REDINK_MODEL") {
        config.api.model = model;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key(mut config: Config) -> Config {
        config.api.key = "test-key".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.model, "gemini-2.0-flash-exp");
        assert_eq!(config.api.max_retries, 3);
        assert_eq!(config.rate_limit.requests_per_minute, 50);
        assert_eq!(config.rate_limit.on_limit, OnLimit::Wait);
        assert_eq!(config.clipboard.capture_timeout_ms, 300);
        assert!(config.ui.show_notifications);
        assert_eq!(config.hotkeys.len(), 5);
    }

    #[test]
    fn test_default_config_literal_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.hotkeys.len(), 5);
        assert_eq!(config.rate_limit.requests_per_minute, 50);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
            [api]
            key = "abc123"
            model = "gemini-1.5-pro"
            timeout_secs = 20

            [hotkeys]
            grammar_fix = "leftctrl+leftalt+g"

            [rate_limit]
            requests_per_minute = 10
            on_limit = "fail"

            [ui]
            show_notifications = false
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.key, "abc123");
        assert_eq!(config.api.model, "gemini-1.5-pro");
        assert_eq!(config.api.timeout_secs, 20);
        assert_eq!(config.api.max_retries, 3); // default
        assert_eq!(config.rate_limit.requests_per_minute, 10);
        assert_eq!(config.rate_limit.on_limit, OnLimit::Fail);
        assert!(!config.ui.show_notifications);
        assert_eq!(config.hotkeys.len(), 1);
    }

    #[test]
    fn test_validate_rejects_missing_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_validate_rejects_bad_rate_limit() {
        let mut config = with_key(Config::default());
        config.rate_limit.requests_per_minute = 0;
        assert!(config.validate().is_err());

        config.rate_limit.requests_per_minute = 61;
        assert!(config.validate().is_err());

        config.rate_limit.requests_per_minute = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = with_key(Config::default());
        config.logging.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        for level in ["trace", "debug", "info", "warn", "error"] {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "level '{level}' must validate");
        }
    }

    #[test]
    fn test_bindings_ordered_by_mode() {
        let config = with_key(Config::default());
        let bindings = config.bindings().unwrap();
        assert_eq!(bindings.len(), 5);
        assert_eq!(bindings[0].mode, CorrectionMode::GrammarFix);
        assert_eq!(bindings[0].chord, "leftctrl+leftshift+g");
        assert_eq!(bindings[4].mode, CorrectionMode::Expand);
    }

    #[test]
    fn test_bindings_reject_duplicate_chord() {
        let mut config = with_key(Config::default());
        config
            .hotkeys
            .insert("formal".to_string(), "LeftCtrl + LeftShift + G".to_string());
        let err = config.bindings().unwrap_err();
        assert!(err.to_string().contains("more than one mode"));
    }

    #[test]
    fn test_bindings_reject_unknown_mode() {
        let mut config = with_key(Config::default());
        config
            .hotkeys
            .insert("shouty".to_string(), "leftctrl+leftshift+y".to_string());
        let err = config.bindings().unwrap_err();
        assert!(err.to_string().contains("Unknown mode"));
    }

    #[test]
    fn test_bindings_reject_empty_table() {
        let mut config = with_key(Config::default());
        config.hotkeys.clear();
        assert!(config.bindings().is_err());
    }

    #[test]
    fn test_normalize_chord() {
        assert_eq!(normalize_chord("LeftCtrl + LeftShift + G"), "leftctrl+leftshift+g");
        assert_eq!(normalize_chord("f13"), "f13");
    }
}
