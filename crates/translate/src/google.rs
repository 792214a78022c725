//! Client for the public `translate_a/single` endpoint.
//!
//! Sync HTTP via ureq with a global timeout; the service answers with a
//! nested JSON array whose first element lists `[translated, original, ...]`
//! segments.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::{Language, TranslateError, Translator};

/// Public endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Default bound on one translation round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote translator.
pub struct GoogleTranslator {
    endpoint: String,
    agent: ureq::Agent,
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

impl GoogleTranslator {
    /// Translator against `endpoint`, giving up after `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self { endpoint: endpoint.into(), agent: make_agent(timeout) }
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_TIMEOUT)
    }
}

impl Translator for GoogleTranslator {
    fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslateError> {
        if target == Language::Auto {
            return Err(TranslateError::AutoTarget);
        }
        let response = self
            .agent
            .get(&self.endpoint)
            .query("client", "gtx")
            .query("sl", source.code())
            .query("tl", target.code())
            .query("dt", "t")
            .query("q", text)
            .call()?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(TranslateError::Status { status });
        }
        let body = response.into_body().read_to_string()?;
        let translated = parse_response(&body)?;
        debug!(
            source = %source,
            detected = ?detected_language(&body),
            target = %target,
            chars = translated.len(),
            "translated text"
        );
        Ok(translated)
    }
}

/// Join the translated segments of a service response.
pub fn parse_response(body: &str) -> Result<String, TranslateError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| TranslateError::Malformed(e.to_string()))?;
    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Malformed("missing segment list".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    if translated.trim().is_empty() {
        return Err(TranslateError::Empty);
    }
    Ok(translated)
}

/// Source language reported by the service, if any.
pub fn detected_language(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get(2).and_then(Value::as_str).map(str::to_string)
}
