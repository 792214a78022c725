#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![deny(missing_docs, unused_must_use)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing))]

//! GPT Shield: estimates whether a text was machine generated.
//!
//! Perplexity under GPT-2 and lexical burstiness feed a two-threshold rule.
//! Non-English text is translated first when a translator is configured.
//! The [`Detector`] is built once and shared by the CLI, the HTTP server and
//! the desktop app.

/// Configuration file and environment overrides.
pub mod config;
/// The analysis pipeline.
pub mod detector;
/// Subscriber setup shared by the binaries.
pub mod logging;
/// Terminal output.
pub mod render;
/// HTTP front end.
pub mod server;
/// Detection rule.
pub mod verdict;

pub use config::{ConfigError, ShieldConfig};
pub use detector::{
    AnalysisError, AnalysisReport, AnalysisRequest, Detector, RankedWord,
    DEFAULT_SCORING_WORKERS, DISCLAIMER,
};
pub use translate::Language;
pub use verdict::{Thresholds, Verdict};
