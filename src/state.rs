//! Request state machine for the redink daemon
//!
//! One correction request moves through:
//! Idle → Capturing → Calling → Replacing → Idle
//! with Capturing/Calling short-circuiting back to Idle on failure.
//! At most one request occupies the non-Idle states at a time.

use crate::mode::CorrectionMode;
use std::time::Instant;

/// Application state
#[derive(Debug, Clone)]
pub enum State {
    /// Waiting for a hotkey match
    Idle,

    /// Copy gesture sent, waiting for the selection to land in the clipboard
    Capturing {
        mode: CorrectionMode,
        started_at: Instant,
    },

    /// Selection captured, correction API call in flight
    Calling {
        mode: CorrectionMode,
        source_chars: usize,
    },

    /// Correction received, pasting and restoring the clipboard
    Replacing { mode: CorrectionMode },
}

impl State {
    pub fn new() -> Self {
        State::Idle
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }

    /// Begin a request: transition Idle → Capturing and return true.
    /// While a request is in flight this returns false and leaves the
    /// state untouched, so overlapping triggers are dropped, not queued.
    pub fn try_begin(&mut self, mode: CorrectionMode) -> bool {
        if self.is_idle() {
            *self = State::Capturing {
                mode,
                started_at: Instant::now(),
            };
            true
        } else {
            false
        }
    }

    /// Mode of the in-flight request, if any
    pub fn mode(&self) -> Option<CorrectionMode> {
        match self {
            State::Idle => None,
            State::Capturing { mode, .. }
            | State::Calling { mode, .. }
            | State::Replacing { mode } => Some(*mode),
        }
    }

    /// How long the in-flight request has been running
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        match self {
            State::Capturing { started_at, .. } => Some(started_at.elapsed()),
            _ => None,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Capturing { mode, started_at } => {
                write!(
                    f,
                    "Capturing ({}, {:.1}s)",
                    mode,
                    started_at.elapsed().as_secs_f32()
                )
            }
            State::Calling { mode, source_chars } => {
                write!(f, "Calling ({}, {} chars)", mode, source_chars)
            }
            State::Replacing { mode } => write!(f, "Replacing ({})", mode),
        }
    }
}
