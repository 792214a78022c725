//! The detection pipeline.
//!
//! One request runs linearly: empty check, translation (with fallback),
//! perplexity, burstiness, repeated words, verdict. The scorer is loaded once
//! and shared behind an `Arc`; nothing here takes a lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lexstats::WordCount;
use perplexity::{ModelError, PerplexityScore, PerplexityScorer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use translate::{translate_or_fallback, Language, Passthrough, Translation, Translator};

use crate::config::{Backend, ConfigError, ShieldConfig};
use crate::verdict::{Thresholds, Verdict};

/// Advisory shown with every result.
pub const DISCLAIMER: &str = "Disclaimer: AI plagiarism detector apps can assist in identifying \
potential instances of plagiarism; however, it is important to note that their results may not \
be entirely flawless or completely reliable. These tools employ advanced algorithms, but they can \
still produce false positives or false negatives. Therefore, it is recommended to use AI \
plagiarism detectors as a supplementary tool alongside human judgment and manual verification \
for accurate and comprehensive plagiarism detection.";

/// Scoring threads a detector runs at once when a timeout is set.
pub const DEFAULT_SCORING_WORKERS: usize = 4;

/// Errors that abort a single analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Nothing to analyze
    #[error("input text is empty")]
    EmptyInput,

    /// Perplexity could not be computed
    #[error("perplexity computation failed: {0}")]
    Model(#[from] ModelError),
}

/// Text to analyze and its language.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// raw user text
    pub text: String,
    /// source language, `auto` when omitted
    #[serde(default)]
    pub language: Language,
}

impl AnalysisRequest {
    /// Request for `text` in `language`.
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self { text: text.into(), language }
    }
}

/// One entry of the repeated-words chart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankedWord {
    /// lowercased word
    pub word: String,
    /// occurrences
    pub count: usize,
}

impl From<WordCount> for RankedWord {
    fn from(wc: WordCount) -> Self {
        Self { word: wc.word, count: wc.count }
    }
}

/// Everything a front end shows for one text.
///
/// An undefined perplexity serializes as `null`.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    /// text as submitted
    pub input: String,
    /// language the user selected
    pub language: Language,
    /// text the metrics were computed on
    pub analyzed_text: String,
    /// whether `analyzed_text` came back from the translation service
    pub translated: bool,
    /// perplexity under the language model
    pub perplexity: PerplexityScore,
    /// share of distinct tokens that repeat
    pub burstiness: f64,
    /// detection outcome
    pub verdict: Verdict,
    /// `verdict` as shown to users
    pub verdict_label: &'static str,
    /// most repeated non-stopwords, most frequent first
    pub top_words: Vec<RankedWord>,
    /// non-fatal problems (translation fallback, truncation, timeout)
    pub warnings: Vec<String>,
    /// advisory text
    pub disclaimer: &'static str,
    /// completion time
    pub analyzed_at: DateTime<Utc>,
}

/// Shared, immutable detection service.
pub struct Detector {
    scorer: Arc<PerplexityScorer>,
    translator: Box<dyn Translator>,
    target: Language,
    thresholds: Thresholds,
    top_words: usize,
    inference_timeout: Option<Duration>,
    max_workers: usize,
    in_flight: Arc<AtomicUsize>,
}

/// Holds one scoring slot until the worker finishes, including after the
/// caller stopped waiting.
struct WorkerSlot(Arc<AtomicUsize>);

impl WorkerSlot {
    fn acquire(in_flight: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| Self(Arc::clone(in_flight)))
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Detector {
    /// Detector with default thresholds and translation switched off.
    pub fn new(scorer: PerplexityScorer) -> Self {
        Self {
            scorer: Arc::new(scorer),
            translator: Box::new(Passthrough),
            target: Language::En,
            thresholds: Thresholds::default(),
            top_words: lexstats::TOP_WORDS,
            inference_timeout: None,
            max_workers: DEFAULT_SCORING_WORKERS,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build the scorer and translator described by `config`.
    pub fn from_config(config: &ShieldConfig) -> Result<Self, ConfigError> {
        let started = Instant::now();
        let scorer = match config.model.backend {
            Backend::Gpt2 => PerplexityScorer::gpt2(&config.model_source())?,
            Backend::Bigram => {
                let weights = config
                    .model
                    .bigram_weights
                    .as_deref()
                    .ok_or(ConfigError::MissingBigramWeights)?;
                PerplexityScorer::bigram(weights)?
            }
        };
        let scorer = match config.model.max_context {
            Some(limit) => scorer.with_context_limit(limit),
            None => scorer,
        };
        info!(
            backend = ?config.model.backend,
            max_context = scorer.max_context(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "detector ready"
        );
        Ok(Self::new(scorer)
            .with_boxed_translator(config.translator())
            .with_target(config.translation.target)
            .with_thresholds(config.thresholds)
            .with_top_words(config.report.top_words)
            .with_inference_timeout(config.inference_timeout())
            .with_scoring_workers(config.model.scoring_workers))
    }

    /// Translate inputs with `translator`.
    pub fn with_translator(self, translator: impl Translator + 'static) -> Self {
        self.with_boxed_translator(Box::new(translator))
    }

    /// Translate inputs with an already boxed translator.
    pub fn with_boxed_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    /// Language texts are translated into.
    pub fn with_target(mut self, target: Language) -> Self {
        self.target = target;
        self
    }

    /// Verdict cut-offs.
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Length of the repeated-words list.
    pub fn with_top_words(mut self, k: usize) -> Self {
        self.top_words = k;
        self
    }

    /// Bound each scoring call; `None` waits indefinitely.
    pub fn with_inference_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.inference_timeout = timeout;
        self
    }

    /// Cap on timed scoring threads alive at once, counting ones whose
    /// caller already gave up. At least one.
    pub fn with_scoring_workers(mut self, max: usize) -> Self {
        self.max_workers = max.max(1);
        self
    }

    /// Run the full pipeline on one request.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        if request.text.trim().is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        let started = Instant::now();
        let mut warnings = Vec::new();

        let translation =
            translate_or_fallback(self.translator.as_ref(), &request.text, request.language, self.target);
        if let Some(warning) = translation.warning() {
            warnings.push(warning.to_string());
        }
        let translated = matches!(translation, Translation::Translated { .. });
        let analyzed_text = translation.into_text();

        let perplexity = self.score(&analyzed_text, &mut warnings)?;
        if perplexity.truncated {
            warnings.push(format!(
                "Input exceeds the model context; only the first {} tokens were scored.",
                perplexity.tokens_scored
            ));
        }
        let burstiness = lexstats::burstiness(&analyzed_text);
        let top_words = lexstats::top_repeated_words(&analyzed_text, self.top_words)
            .into_iter()
            .map(RankedWord::from)
            .collect();
        let verdict = Verdict::decide(perplexity.value, burstiness, &self.thresholds);

        debug!(
            perplexity = perplexity.value,
            burstiness,
            verdict = %verdict,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );
        Ok(AnalysisReport {
            input: request.text.clone(),
            language: request.language,
            analyzed_text,
            translated,
            perplexity,
            burstiness,
            verdict,
            verdict_label: verdict.label(),
            top_words,
            warnings,
            disclaimer: DISCLAIMER,
            analyzed_at: Utc::now(),
        })
    }

    /// Score on the calling thread, or on a worker when a timeout is set.
    /// A timed-out worker keeps running and keeps its slot; its result is
    /// dropped. With every slot taken the text is not scored at all.
    fn score(&self, text: &str, warnings: &mut Vec<String>) -> Result<PerplexityScore, AnalysisError> {
        let Some(timeout) = self.inference_timeout else {
            return Ok(self.scorer.score(text)?);
        };
        let Some(slot) = WorkerSlot::acquire(&self.in_flight, self.max_workers) else {
            warn!(max_workers = self.max_workers, "all scoring workers busy");
            warnings.push(
                "Scoring capacity exhausted by earlier requests that are still running; \
                 the score is undefined."
                    .to_string(),
            );
            return Ok(PerplexityScore::undefined(0));
        };
        let (tx, rx) = mpsc::channel();
        let scorer = Arc::clone(&self.scorer);
        let owned = text.to_string();
        thread::Builder::new()
            .name("shield-score".to_string())
            .spawn(move || {
                let _slot = slot;
                let _ = tx.send(scorer.score(&owned));
            })
            .map_err(|e| ModelError::Inference(format!("failed to start scoring worker: {e}")))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => Ok(result?),
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "perplexity computation timed out");
                warnings.push(format!(
                    "Perplexity computation timed out after {:.1}s; the score is undefined.",
                    timeout.as_secs_f64()
                ));
                Ok(PerplexityScore::undefined(0))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(ModelError::Inference("scoring worker stopped".to_string()).into())
            }
        }
    }
}
