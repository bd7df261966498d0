//! Global hotkey detection
//!
//! Kernel-level key event detection using evdev, which works on all Wayland
//! compositors because it operates at the Linux input subsystem level.
//! Requires the user to be in the 'input' group.
//!
//! The listener runs on its own blocking task and only enqueues matched
//! correction modes on a bounded channel; it never performs I/O of its own.

#[cfg(target_os = "linux")]
pub mod evdev_listener;

use crate::config::HotkeyBinding;
use crate::error::HotkeyError;
use crate::mode::CorrectionMode;
use tokio::sync::mpsc;

/// Trait for hotkey dispatcher implementations
#[async_trait::async_trait]
pub trait HotkeyListener: Send + Sync {
    /// Start listening. Returns a channel of matched correction modes.
    async fn start(&mut self) -> Result<mpsc::Receiver<CorrectionMode>, HotkeyError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), HotkeyError>;
}

/// Create the platform hotkey listener for a validated binding set
#[cfg(target_os = "linux")]
pub fn create_listener(bindings: &[HotkeyBinding]) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Ok(Box::new(evdev_listener::EvdevListener::new(bindings)?))
}
