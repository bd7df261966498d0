//! Gemini `generateContent` transport
//!
//! Speaks the Google Generative Language REST API over blocking HTTP.
//! Generation parameters are fixed: low temperature for consistent
//! corrections, a 2048-token output cap.

use super::{ApiFailure, Transport};
use crate::config::ApiConfig;
use std::time::Duration;
use ureq::serde_json;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Blocking Gemini API transport
pub struct GeminiTransport {
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiTransport {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: config.model.clone(),
            api_key: config.key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.3,
                "maxOutputTokens": 2048,
            }
        })
    }

    /// Pull the generated text out of a response body:
    /// `candidates[0].content.parts[*].text`, concatenated.
    fn extract_text(json: &serde_json::Value) -> Result<String, ApiFailure> {
        let parts = json
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| {
                ApiFailure::Malformed(format!("response missing candidates: {}", excerpt(json)))
            })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();

        if text.is_empty() {
            return Err(ApiFailure::Malformed(format!(
                "candidate has no text parts: {}",
                excerpt(json)
            )));
        }

        Ok(text)
    }
}

/// Bounded excerpt of a JSON value for error messages
fn excerpt(json: &serde_json::Value) -> String {
    let s = json.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

impl Transport for GeminiTransport {
    fn generate(&self, prompt: &str) -> Result<String, ApiFailure> {
        let start = std::time::Instant::now();

        let response = ureq::post(&self.url())
            .timeout(self.timeout)
            .set("x-goog-api-key", &self.api_key)
            .send_json(Self::request_body(prompt))
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    let body = if body.chars().count() > 200 {
                        format!("{}...", body.chars().take(200).collect::<String>())
                    } else {
                        body
                    };
                    ApiFailure::Status(code, body)
                }
                ureq::Error::Transport(t) => ApiFailure::Network(t.to_string()),
            })?;

        let json: serde_json::Value = response
            .into_json()
            .map_err(|e| ApiFailure::Malformed(format!("unparsable response body: {}", e)))?;

        let text = Self::extract_text(&json)?;

        tracing::debug!(
            "Gemini responded in {:.2}s ({} chars)",
            start.elapsed().as_secs_f64(),
            text.chars().count()
        );

        Ok(text)
    }
}
