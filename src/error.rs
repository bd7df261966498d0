//! Error types for redink
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the redink application
#[derive(Error, Debug)]
pub enum RedinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("Correction error: {0}")]
    Correction(#[from] CorrectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest or wev to find valid key names.")]
    UnknownKey(String),

    #[error("Chord '{0}' is bound to more than one mode")]
    DuplicateChord(String),

    #[error("Chord '{0}' has no non-modifier key")]
    EmptyChord(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("evdev error: {0}")]
    Evdev(String),
}

/// Errors related to the clipboard transaction
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("No text selected")]
    NoSelection,

    #[error("{0} not found in PATH. Install it via your package manager.")]
    ToolMissing(&'static str),

    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool\n  Enable at boot: systemctl --user enable ydotool")]
    YdotoolNotRunning,

    #[error("Clipboard command failed: {0}")]
    CommandFailed(String),
}

/// Errors from the correction API call
#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error("Transient API failure: {0}")]
    Transient(String),

    #[error("Rate limited, retry after {retry_after:.1}s")]
    RateLimited { retry_after: f64 },

    #[error("Authentication failed: {0}\n  Check api.key in your config (or REDINK_API_KEY).")]
    Auth(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl CorrectionError {
    /// Short label for notifications and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            CorrectionError::Transient(_) => "transient",
            CorrectionError::RateLimited { .. } => "rate limited",
            CorrectionError::Auth(_) => "auth",
            CorrectionError::InvalidResponse(_) => "invalid response",
        }
    }
}

/// Result type alias using RedinkError
pub type Result<T> = std::result::Result<T, RedinkError>;

#[cfg(target_os = "linux")]
impl From<evdev::Error> for HotkeyError {
    fn from(e: evdev::Error) -> Self {
        HotkeyError::Evdev(e.to_string())
    }
}
