//! Daemon module - main event loop orchestration
//!
//! Wires the hotkey listener, clipboard transaction, correction client, and
//! notifier into one request lifecycle per hotkey match:
//! capture → call → replace → notify. Requests are strictly serialized; a
//! hotkey event observed while a request is in flight is dropped.

use crate::clipboard::ClipboardTransaction;
use crate::config::Config;
use crate::correct::CorrectionClient;
use crate::error::{ClipboardError, CorrectionError, RedinkError, Result};
use crate::hotkey;
use crate::mode::CorrectionMode;
use crate::notification::Notifier;
use crate::state::State;
use std::sync::{Arc, Mutex};
use tokio::signal::unix::{signal, SignalKind};

/// Main daemon that orchestrates all components
pub struct Daemon {
    config: Config,
    notifier: Notifier,
    client: Arc<CorrectionClient>,
    state: Arc<Mutex<State>>,
}

impl Daemon {
    /// Create a new daemon with the given (validated) configuration
    pub fn new(config: Config) -> Self {
        let notifier = Notifier::new(&config.ui);
        let client = Arc::new(CorrectionClient::new(&config.api, &config.rate_limit));

        Self {
            config,
            notifier,
            client,
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }

    /// Run the daemon main loop until SIGINT/SIGTERM
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting redink daemon");

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| RedinkError::Config(format!("Failed to set up SIGTERM handler: {}", e)))?;

        let bindings = self.config.bindings()?;
        let mut listener = hotkey::create_listener(&bindings)?;
        let mut hotkey_rx = listener.start().await?;

        tracing::info!(
            "Listening for {} chord(s), model: {}",
            bindings.len(),
            self.config.api.model
        );

        self.notifier.send("Redink", "Ready to help!").await;

        // Handle to the in-flight request task, if any. Single-flight is
        // decided by the state machine; the handle only matters at shutdown
        // (a clipboard transaction must not be killed mid-gesture).
        let mut in_flight: Option<tokio::task::JoinHandle<()>> = None;

        loop {
            tokio::select! {
                Some(mode) = hotkey_rx.recv() => {
                    let accepted = self
                        .state
                        .lock()
                        .expect("state poisoned")
                        .try_begin(mode);

                    if !accepted {
                        // Deliberate drop, not a queue: overlapping clipboard
                        // transactions would corrupt each other.
                        tracing::debug!(
                            "Hotkey {} ignored, request in flight: {}",
                            mode,
                            self.state.lock().expect("state poisoned")
                        );
                        continue;
                    }

                    tracing::info!("Hotkey triggered: {}", mode);
                    in_flight = Some(tokio::spawn(run_request(
                        mode,
                        self.config.clone(),
                        self.client.clone(),
                        self.notifier.clone(),
                        self.state.clone(),
                    )));
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        // A clipboard transaction is not safely interruptible; let the
        // current request finish before tearing down.
        if let Some(handle) = in_flight.take() {
            if !handle.is_finished() {
                tracing::info!("Waiting for in-flight correction to finish...");
                let _ = handle.await;
            }
        }

        listener.stop().await?;
        tracing::info!("Daemon stopped");

        Ok(())
    }
}

/// One request lifecycle. Runs on its own task; the daemon loop stays free
/// to observe (and drop) further hotkey events. Every error is contained
/// here: converted to a notification plus a log line, never propagated.
async fn run_request(
    mode: CorrectionMode,
    config: Config,
    client: Arc<CorrectionClient>,
    notifier: Notifier,
    state: Arc<Mutex<State>>,
) {
    notifier
        .send("Redink", &format!("Processing ({})...", mode))
        .await;

    let transaction = ClipboardTransaction::new(&config.clipboard);

    let call_state = state.clone();
    let result = transaction
        .run_capture_and_replace(|source_text| async move {
            *call_state.lock().expect("state poisoned") = State::Calling {
                mode,
                source_chars: source_text.chars().count(),
            };

            // The client is blocking (HTTP, backoff, rate-limit waits);
            // keep it off the async runtime. Each attempt is bounded by the
            // network timeout, so the single-flight slot cannot hang.
            let client = client.clone();
            let corrected = tokio::task::spawn_blocking(move || {
                client.correct(mode, &source_text)
            })
            .await
            .map_err(|e| {
                RedinkError::Correction(CorrectionError::Transient(format!(
                    "correction task failed: {e}"
                )))
            })??;

            *call_state.lock().expect("state poisoned") = State::Replacing { mode };
            Ok(corrected)
        })
        .await;

    match result {
        Ok(()) => {
            tracing::info!("Text replaced successfully ({})", mode);
            notifier
                .send("Redink", &format!("Text improved ({})", mode))
                .await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Correction request failed ({})", mode);
            notifier.send("Redink", &failure_body(&e)).await;
        }
    }

    *state.lock().expect("state poisoned") = State::Idle;
}

/// User-facing notification body for a failed request
fn failure_body(error: &RedinkError) -> String {
    match error {
        RedinkError::Clipboard(ClipboardError::NoSelection) => "No text selected".to_string(),
        RedinkError::Clipboard(_) => "Failed to replace text".to_string(),
        RedinkError::Correction(CorrectionError::RateLimited { retry_after }) => {
            format!("Rate limited, try again in {:.0}s", retry_after)
        }
        RedinkError::Correction(e) => format!("Failed to improve text ({})", e.kind()),
        _ => "An error occurred".to_string(),
    }
}
