#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![deny(missing_docs, unused_must_use)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing))]

//! Translation adapter: normalizes input text to the analysis language.
//!
//! Translation never blocks analysis. [`translate_or_fallback`] returns the
//! original text together with a warning whenever the service fails.

use serde::Serialize;
use tracing::{debug, warn};

/// Remote translation service client.
pub mod google;
/// Language codes.
pub mod language;

pub use google::GoogleTranslator;
pub use language::Language;

/// Translation failures. All of them are recoverable by falling back.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// Transport failure, including timeouts
    #[error("translation request failed: {0}")]
    Transport(#[from] ureq::Error),

    /// The service answered with an error status
    #[error("translation service returned HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The response body could not be understood
    #[error("malformed translation response: {0}")]
    Malformed(String),

    /// The service answered without any translated text
    #[error("translation service returned no text")]
    Empty,

    /// `auto` can only be a source language
    #[error("`auto` is not a valid target language")]
    AutoTarget,

    /// Unsupported language code
    #[error("unknown language code `{0}`")]
    UnknownLanguage(String),
}

/// Something that translates text between languages.
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` (possibly [`Language::Auto`]) to `target`.
    fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslateError>;

    /// False for translators that never change the text.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Translator used when translation is switched off.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl Translator for Passthrough {
    fn translate(&self, text: &str, _: Language, _: Language) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Outcome of a translation attempt. Always carries usable text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Translation {
    /// The service translated the text
    Translated {
        /// translated text
        text: String,
    },
    /// No call was made (translation disabled, or source equals target)
    Skipped {
        /// original text
        text: String,
    },
    /// The service failed; the original text is used instead
    Fallback {
        /// original text
        text: String,
        /// non-fatal warning for the user
        warning: String,
    },
}

impl Translation {
    /// Text to analyze.
    pub fn text(&self) -> &str {
        match self {
            Translation::Translated { text }
            | Translation::Skipped { text }
            | Translation::Fallback { text, .. } => text,
        }
    }

    /// Warning to surface, if the translation fell back.
    pub fn warning(&self) -> Option<&str> {
        match self {
            Translation::Fallback { warning, .. } => Some(warning),
            _ => None,
        }
    }

    /// Take the text to analyze.
    pub fn into_text(self) -> String {
        match self {
            Translation::Translated { text }
            | Translation::Skipped { text }
            | Translation::Fallback { text, .. } => text,
        }
    }
}

/// Translate `text`, falling back to the original on any failure.
pub fn translate_or_fallback(
    translator: &dyn Translator,
    text: &str,
    source: Language,
    target: Language,
) -> Translation {
    if !translator.is_enabled() || source == target {
        debug!(source = %source, target = %target, "translation skipped");
        return Translation::Skipped { text: text.to_string() };
    }
    match translator.translate(text, source, target) {
        Ok(translated) if !translated.trim().is_empty() => {
            Translation::Translated { text: translated }
        }
        Ok(_) => fallback(text, &TranslateError::Empty),
        Err(e) => fallback(text, &e),
    }
}

fn fallback(text: &str, error: &TranslateError) -> Translation {
    warn!(error = %error, "translation failed, analyzing original text");
    Translation::Fallback { text: text.to_string(), warning: format!("Translation error: {error}") }
}
