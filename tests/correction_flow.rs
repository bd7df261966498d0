//! Behavioral tests for the correction client against a scripted transport
//!
//! These exercise the retry budget, rate limiting, and prompt construction
//! without touching the network or the live clipboard.

use redink::config::{ApiConfig, OnLimit, RateLimitConfig};
use redink::correct::{ApiFailure, CorrectionClient, RetryPolicy, Transport};
use redink::error::CorrectionError;
use redink::mode::CorrectionMode;
use redink::rate_limit::RateLimiter;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Transport that fails every attempt with the given status and counts calls
struct AlwaysFailing {
    status: u16,
    attempts: Arc<AtomicU32>,
}

impl Transport for AlwaysFailing {
    fn generate(&self, _prompt: &str) -> Result<String, ApiFailure> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ApiFailure::Status(self.status, String::new()))
    }
}

/// Transport that records the prompt it was given and succeeds
struct Recording {
    prompt: Arc<Mutex<String>>,
    reply: &'static str,
}

impl Transport for Recording {
    fn generate(&self, prompt: &str) -> Result<String, ApiFailure> {
        *self.prompt.lock().unwrap() = prompt.to_string();
        Ok(self.reply.to_string())
    }
}

fn limiter(rpm: u32, on_limit: OnLimit) -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(&RateLimitConfig {
        requests_per_minute: rpm,
        on_limit,
    }))
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1))
}

#[test]
fn transient_failures_consume_exactly_the_retry_budget() {
    let attempts = Arc::new(AtomicU32::new(0));
    let client = CorrectionClient::with_transport(
        Box::new(AlwaysFailing {
            status: 503,
            attempts: attempts.clone(),
        }),
        limiter(60, OnLimit::Fail),
        fast_retry(3),
    );

    let result = client.correct(CorrectionMode::GrammarFix, "some text");

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    match result {
        Err(CorrectionError::Transient(_)) => {}
        other => panic!("expected terminal Transient, got {:?}", other),
    }
}

#[test]
fn auth_failure_makes_exactly_one_attempt() {
    let attempts = Arc::new(AtomicU32::new(0));
    let client = CorrectionClient::with_transport(
        Box::new(AlwaysFailing {
            status: 403,
            attempts: attempts.clone(),
        }),
        limiter(60, OnLimit::Fail),
        fast_retry(3),
    );

    let result = client.correct(CorrectionMode::Formal, "some text");

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(CorrectionError::Auth(_))));
}

#[test]
fn validation_failure_makes_exactly_one_attempt() {
    let attempts = Arc::new(AtomicU32::new(0));
    let client = CorrectionClient::with_transport(
        Box::new(AlwaysFailing {
            status: 400,
            attempts: attempts.clone(),
        }),
        limiter(60, OnLimit::Fail),
        fast_retry(3),
    );

    let result = client.correct(CorrectionMode::Casual, "some text");

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(CorrectionError::InvalidResponse(_))));
}

#[test]
fn full_rate_window_fails_fast_with_retry_after() {
    let limiter = limiter(2, OnLimit::Fail);

    assert!(limiter.acquire().is_ok());
    assert!(limiter.acquire().is_ok());

    match limiter.acquire() {
        Err(CorrectionError::RateLimited { retry_after }) => {
            assert!(retry_after > 0.0 && retry_after <= 60.0);
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[test]
fn rate_limit_is_consumed_per_attempt_not_per_request() {
    let attempts = Arc::new(AtomicU32::new(0));
    // Two slots, three attempts configured: the third attempt hits the
    // full window and surfaces as RateLimited in fail-fast mode.
    let client = CorrectionClient::with_transport(
        Box::new(AlwaysFailing {
            status: 500,
            attempts: attempts.clone(),
        }),
        limiter(2, OnLimit::Fail),
        fast_retry(3),
    );

    let result = client.correct(CorrectionMode::Simplify, "some text");

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(matches!(result, Err(CorrectionError::RateLimited { .. })));
}

#[test]
fn prompt_carries_source_text_verbatim_and_output_is_trimmed() {
    let prompt = Arc::new(Mutex::new(String::new()));
    let client = CorrectionClient::with_transport(
        Box::new(Recording {
            prompt: prompt.clone(),
            reply: "  I went to the store yesterday.\n",
        }),
        limiter(60, OnLimit::Fail),
        fast_retry(1),
    );

    let source = "i went too the store yesterday";
    let out = client.correct(CorrectionMode::GrammarFix, source).unwrap();

    assert_eq!(out, "I went to the store yesterday.");

    let sent = prompt.lock().unwrap().clone();
    assert!(sent.contains(source), "source text must be embedded verbatim");
    assert!(sent.contains("grammar, spelling, and punctuation"));
}

#[test]
fn production_client_builds_from_config() {
    // Construction only; no request is sent.
    let api = ApiConfig {
        key: "test-key".to_string(),
        model: "gemini-2.0-flash-exp".to_string(),
        max_retries: 3,
        timeout_secs: 10,
    };
    let rate = RateLimitConfig {
        requests_per_minute: 50,
        on_limit: OnLimit::Wait,
    };
    let _client = CorrectionClient::new(&api, &rate);
}
