//! Clipboard transaction: capture the active selection and replace it
//!
//! The whole sequence — snapshot, simulated Ctrl+C, bounded wait for the
//! clipboard to change, replacement call, write-back, simulated Ctrl+V,
//! restore — is one unit of work. The original clipboard content is restored
//! on every exit path, so outside an in-flight transaction the clipboard is
//! always in the user's state.
//!
//! Uses wl-paste/wl-copy for clipboard access and ydotool for the copy and
//! paste gestures. A focused field that rejects programmatic paste (secure
//! input) is indistinguishable from success at this layer; that is a
//! documented limitation, not an error.

use crate::config::ClipboardConfig;
use crate::error::ClipboardError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::Instant;

/// ydotool key codes: press/release sequences for the two gestures.
/// 29 = KEY_LEFTCTRL, 46 = KEY_C, 47 = KEY_V.
const COPY_GESTURE: [&str; 5] = ["key", "29:1", "46:1", "46:0", "29:0"];
const PASTE_GESTURE: [&str; 5] = ["key", "29:1", "47:1", "47:0", "29:0"];

/// How often the capture wait re-reads the clipboard
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Settle time between writing the replacement and the paste gesture
const SET_DELAY: Duration = Duration::from_millis(100);

/// Scoped capture-and-replace over the shared OS clipboard
pub struct ClipboardTransaction {
    capture_timeout: Duration,
    restore_delay: Duration,
}

impl ClipboardTransaction {
    pub fn new(config: &ClipboardConfig) -> Self {
        Self {
            capture_timeout: Duration::from_millis(config.capture_timeout_ms),
            restore_delay: Duration::from_millis(config.restore_delay_ms),
        }
    }

    /// Run one transaction. `replacement` receives the captured selection
    /// and produces the text to paste in its place; it may block on network
    /// I/O. The pre-transaction clipboard is restored before this returns,
    /// success or failure.
    pub async fn run_capture_and_replace<F, Fut>(&self, replacement: F) -> crate::error::Result<()>
    where
        F: FnOnce(String) -> Fut,
        Fut: std::future::Future<Output = crate::error::Result<String>>,
    {
        let snapshot = self.read_clipboard().await?;
        tracing::debug!(
            "Clipboard snapshot: {}",
            match &snapshot {
                Some(s) => format!("{} chars", s.chars().count()),
                None => "empty".to_string(),
            }
        );

        let result = self.capture_and_replace(snapshot.as_deref(), replacement).await;

        // Unconditional restore. Failures here are logged, not propagated;
        // the transaction outcome is whatever `result` says.
        if let Err(e) = self.restore(snapshot.as_deref()).await {
            tracing::warn!("Failed to restore clipboard: {}", e);
        }

        result
    }

    async fn capture_and_replace<F, Fut>(
        &self,
        snapshot: Option<&str>,
        replacement: F,
    ) -> crate::error::Result<()>
    where
        F: FnOnce(String) -> Fut,
        Fut: std::future::Future<Output = crate::error::Result<String>>,
    {
        self.key_gesture(&COPY_GESTURE).await?;

        let captured = self.wait_for_capture(snapshot).await?;
        tracing::info!("Captured {} characters", captured.chars().count());

        let replacement_text = replacement(captured).await?;

        self.set_clipboard(&replacement_text).await?;
        tokio::time::sleep(SET_DELAY).await;
        self.key_gesture(&PASTE_GESTURE).await?;

        // Give the focused application time to consume the paste before the
        // snapshot overwrites the clipboard again.
        tokio::time::sleep(self.restore_delay).await;

        tracing::info!(
            "Replaced selection with {} characters",
            replacement_text.chars().count()
        );
        Ok(())
    }

    /// Poll until the clipboard holds a usable selection or the bounded
    /// timeout expires.
    async fn wait_for_capture(&self, snapshot: Option<&str>) -> Result<String, ClipboardError> {
        let deadline = Instant::now() + self.capture_timeout;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let current = self.read_clipboard().await?;
            if let Some(text) = captured_selection(snapshot, current.as_deref()) {
                return Ok(text);
            }

            if Instant::now() >= deadline {
                return Err(ClipboardError::NoSelection);
            }
        }
    }

    /// Read the current clipboard. `None` means the clipboard is empty.
    async fn read_clipboard(&self) -> Result<Option<String>, ClipboardError> {
        let output = Command::new("wl-paste")
            .arg("--no-newline")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipboardError::ToolMissing("wl-paste")
                } else {
                    ClipboardError::CommandFailed(e.to_string())
                }
            })?;

        // wl-paste exits non-zero when no selection is offered
        if !output.status.success() {
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    /// Write text to the clipboard via wl-copy
    async fn set_clipboard(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new("wl-copy")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipboardError::ToolMissing("wl-copy")
                } else {
                    ClipboardError::CommandFailed(e.to_string())
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| ClipboardError::CommandFailed(e.to_string()))?;
            drop(stdin);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ClipboardError::CommandFailed(e.to_string()))?;

        if !status.success() {
            return Err(ClipboardError::CommandFailed(
                "wl-copy exited with error".to_string(),
            ));
        }

        Ok(())
    }

    /// Put the clipboard back in its pre-transaction state
    async fn restore(&self, snapshot: Option<&str>) -> Result<(), ClipboardError> {
        match snapshot {
            Some(text) => self.set_clipboard(text).await,
            None => {
                let status = Command::new("wl-copy")
                    .arg("--clear")
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .map_err(|e| ClipboardError::CommandFailed(e.to_string()))?;
                if !status.success() {
                    return Err(ClipboardError::CommandFailed(
                        "wl-copy --clear exited with error".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Simulate a key chord via ydotool
    async fn key_gesture(&self, args: &[&str]) -> Result<(), ClipboardError> {
        let output = Command::new("ydotool")
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipboardError::ToolMissing("ydotool")
                } else {
                    ClipboardError::CommandFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon")
            {
                return Err(ClipboardError::YdotoolNotRunning);
            }
            return Err(ClipboardError::CommandFailed(stderr.into_owned()));
        }

        Ok(())
    }
}

/// A clipboard read counts as a captured selection only if it is present,
/// non-whitespace, and different from the pre-transaction snapshot.
fn captured_selection(snapshot: Option<&str>, current: Option<&str>) -> Option<String> {
    let text = current?;
    if text.trim().is_empty() {
        return None;
    }
    if snapshot == Some(text) {
        return None;
    }
    Some(text.to_string())
}
