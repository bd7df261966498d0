//! Correction client
//!
//! Builds a mode-specific prompt around the verbatim source text, calls the
//! remote API through the rate limiter, and classifies failures. Transient
//! failures (timeouts, connection resets, 5xx, 429) are retried with
//! exponential backoff; auth and validation failures surface immediately.
//!
//! The client is synchronous and is driven from `spawn_blocking`, so the
//! backoff and rate-limit waits never sit on the async runtime.

pub mod gemini;

use crate::config::{ApiConfig, RateLimitConfig};
use crate::error::CorrectionError;
use crate::mode::CorrectionMode;
use crate::rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

/// A raw failure from the transport, before classification
#[derive(Debug)]
pub enum ApiFailure {
    /// Timeout, connection reset, DNS failure
    Network(String),
    /// HTTP status with a body excerpt
    Status(u16, String),
    /// 2xx response whose body could not be interpreted
    Malformed(String),
}

/// Seam between the retry/classification logic and the wire protocol
pub trait Transport: Send + Sync {
    /// Send one generation request, returning the raw model text
    fn generate(&self, prompt: &str) -> Result<String, ApiFailure>;
}

/// Explicit retry schedule: attempt count plus exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff after the given 1-based attempt: base * 2^(attempt-1)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Whether a classified failure is worth another attempt
enum Disposition {
    Retry(CorrectionError),
    Fatal(CorrectionError),
}

fn classify(failure: ApiFailure) -> Disposition {
    match failure {
        ApiFailure::Network(msg) => Disposition::Retry(CorrectionError::Transient(msg)),
        ApiFailure::Status(code, body) => {
            let msg = if body.is_empty() {
                format!("HTTP {code}")
            } else {
                format!("HTTP {code}: {body}")
            };
            match code {
                429 => Disposition::Retry(CorrectionError::Transient(msg)),
                c if c >= 500 => Disposition::Retry(CorrectionError::Transient(msg)),
                401 | 403 => Disposition::Fatal(CorrectionError::Auth(msg)),
                _ => Disposition::Fatal(CorrectionError::InvalidResponse(msg)),
            }
        }
        ApiFailure::Malformed(msg) => Disposition::Fatal(CorrectionError::InvalidResponse(msg)),
    }
}

/// Rate-limited, retried client for the text-generation API
pub struct CorrectionClient {
    transport: Box<dyn Transport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl CorrectionClient {
    /// Build the production client (Gemini transport)
    pub fn new(api: &ApiConfig, rate: &RateLimitConfig) -> Self {
        Self::with_transport(
            Box::new(gemini::GeminiTransport::new(api)),
            Arc::new(RateLimiter::new(rate)),
            RetryPolicy::new(api.max_retries, Duration::from_secs(1)),
        )
    }

    /// Build a client around an arbitrary transport (used by tests)
    pub fn with_transport(
        transport: Box<dyn Transport>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            limiter,
            retry,
        }
    }

    /// Rewrite `text` per `mode`. Returns the model output trimmed of
    /// leading/trailing whitespace, otherwise verbatim.
    pub fn correct(&self, mode: CorrectionMode, text: &str) -> Result<String, CorrectionError> {
        let prompt = mode.build_prompt(text);
        let max = self.retry.max_attempts();
        let mut last_err = None;

        for attempt in 1..=max {
            self.limiter.acquire()?;

            tracing::debug!(%mode, attempt, max, "Sending correction request");
            match self.transport.generate(&prompt) {
                Ok(raw) => {
                    let out = raw.trim();
                    if out.is_empty() {
                        return Err(CorrectionError::InvalidResponse(
                            "empty response from model".to_string(),
                        ));
                    }
                    tracing::info!(%mode, chars = out.chars().count(), "Correction succeeded");
                    return Ok(out.to_string());
                }
                Err(failure) => match classify(failure) {
                    Disposition::Fatal(err) => {
                        tracing::warn!(%mode, attempt, error = %err, "Terminal API failure");
                        return Err(err);
                    }
                    Disposition::Retry(err) => {
                        tracing::warn!(%mode, attempt, error = %err, "Transient API failure");
                        if attempt < max {
                            let delay = self.retry.delay_after(attempt);
                            tracing::debug!("Retrying in {:.1}s", delay.as_secs_f64());
                            std::thread::sleep(delay);
                        }
                        last_err = Some(err);
                    }
                },
            }
        }

        Err(last_err.unwrap_or_else(|| {
            CorrectionError::Transient("retry budget exhausted".to_string())
        }))
    }
}
