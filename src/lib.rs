//! Redink: hotkey-driven text correction for Wayland
//!
//! This library provides the core functionality for:
//! - Detecting hotkey chords via evdev (kernel-level, works on all compositors)
//! - Capturing the active selection through a clipboard transaction
//!   (wl-paste/wl-copy + ydotool copy/paste gestures, original clipboard
//!   restored on every exit path)
//! - Rewriting the captured text via the Gemini API (rate limited, retried
//!   with exponential backoff)
//! - Pasting the rewritten text back into the focused application
//!
//! # Architecture
//!
//! ```text
//!   ┌──────────────┐   matched mode    ┌──────────────────────────────┐
//!   │    Hotkey    │ ────────────────▶ │            Daemon            │
//!   │   (evdev)    │   mpsc channel    │  (single-flight state machine)│
//!   └──────────────┘                   └──────────────┬───────────────┘
//!                                                     │ one request
//!                                                     ▼
//!                                      ┌──────────────────────────────┐
//!                                      │     Clipboard Transaction    │
//!                                      │ snapshot ▶ copy ▶ capture ▶  │
//!                                      │ [correct] ▶ paste ▶ restore  │
//!                                      └──────────────┬───────────────┘
//!                                                     │ captured text
//!                                                     ▼
//!                                      ┌──────────────┐  ┌────────────┐
//!                                      │  Correction  │─▶│    Rate    │
//!                                      │Client (retry)│  │  Limiter   │
//!                                      └──────────────┘  └────────────┘
//! ```

pub mod clipboard;
pub mod config;
pub mod correct;
pub mod daemon;
pub mod error;
pub mod hotkey;
pub mod mode;
pub mod notification;
pub mod rate_limit;
pub mod state;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{RedinkError, Result};
pub use mode::CorrectionMode;
