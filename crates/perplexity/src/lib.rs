#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![deny(missing_docs, unused_must_use)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing))]

//! Perplexity scoring under a pretrained causal language model.
//!
//! The scorer is built once (weights are immutable after load) and shared
//! read-only between requests.
//!
//! Layout:
//! - `loss.rs`: log-sum-exp, cross-entropy, next-token shift
//! - `linear.rs`: dense layer used by the bigram backend
//! - `loader.rs`: model file resolution (hub or local dir), f32 blobs
//! - `model.rs`: `LanguageModel` trait + `BigramModel`
//! - `gpt2.rs`: GPT-2 on candle
//! - `tokenizer.rs`: `TokenEncoder` trait, subword and byte encoders

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

/// Error type.
pub mod error;
/// GPT-2 transformer.
pub mod gpt2;
/// Dense layer helper.
pub mod linear;
/// Model file resolution and weight blobs.
pub mod loader;
/// Loss and perplexity math over plain logits rows.
pub mod loss;
/// Language model trait and the bigram backend.
pub mod model;
/// Token encoders.
pub mod tokenizer;

pub use error::ModelError;
pub use gpt2::{Gpt2, Gpt2Config};
pub use loader::{ModelFiles, ModelSource};
pub use model::{BigramModel, LanguageModel};
pub use tokenizer::{ByteEncoder, HfTokenizer, TokenEncoder};

/// Perplexity of one text.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PerplexityScore {
    /// exp(mean next-token cross-entropy); `f64::INFINITY` when undefined
    pub value: f64,
    /// tokens fed to the model (after truncation)
    pub tokens_scored: usize,
    /// whether the input was cut to the model's context length
    pub truncated: bool,
}

impl PerplexityScore {
    /// Sentinel for inputs with fewer than two tokens.
    pub fn undefined(tokens_scored: usize) -> Self {
        Self { value: f64::INFINITY, tokens_scored, truncated: false }
    }

    /// False for the undefined sentinel.
    pub fn is_defined(&self) -> bool {
        self.value.is_finite()
    }
}

/// A tokenizer may use fewer ids than the model scores (padded embedding
/// tables), never more.
fn check_vocab(tokenizer: usize, model: usize) -> Result<(), ModelError> {
    if tokenizer > model {
        return Err(ModelError::VocabMismatch { tokenizer, model });
    }
    Ok(())
}

/// Encoder + model pair producing perplexity scores.
pub struct PerplexityScorer {
    encoder: Box<dyn TokenEncoder>,
    model: Box<dyn LanguageModel>,
    context_limit: Option<usize>,
}

impl PerplexityScorer {
    /// Pair an encoder with a model sharing its vocabulary.
    pub fn new(
        encoder: impl TokenEncoder + 'static,
        model: impl LanguageModel + 'static,
    ) -> Self {
        Self { encoder: Box::new(encoder), model: Box::new(model), context_limit: None }
    }

    /// Score at most `limit` tokens, even if the model accepts more.
    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = Some(limit);
        self
    }

    /// Load the GPT-2 scorer from `source`.
    pub fn gpt2(source: &ModelSource) -> Result<Self, ModelError> {
        let started = Instant::now();
        let files = source.resolve()?;
        let encoder = HfTokenizer::from_file(&files.tokenizer)?;
        let model = Gpt2::from_files(&files.config, &files.weights)?;
        check_vocab(encoder.vocab_size(), model.vocab_size())?;
        debug!(
            vocab = model.config().vocab_size,
            layers = model.config().n_layer,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gpt2 scorer loaded"
        );
        Ok(Self::new(encoder, model))
    }

    /// Load the byte-level bigram scorer from a weight file.
    pub fn bigram(weights: &Path) -> Result<Self, ModelError> {
        let model = BigramModel::load(weights, ByteEncoder::VOCAB)?;
        Ok(Self::new(ByteEncoder, model))
    }

    /// Longest sequence scored: the model context, lowered by any configured limit.
    pub fn max_context(&self) -> usize {
        let model = self.model.max_context();
        self.context_limit.map_or(model, |limit| limit.min(model))
    }

    /// Score `text`.
    ///
    /// Empty encodings return the undefined sentinel without calling the
    /// model. Sequences longer than the context are cut to their first
    /// `max_context()` tokens.
    pub fn score(&self, text: &str) -> Result<PerplexityScore, ModelError> {
        let tokens = self.encoder.encode(text)?;
        self.score_tokens(&tokens)
    }

    /// Score an already encoded sequence.
    pub fn score_tokens(&self, tokens: &[u32]) -> Result<PerplexityScore, ModelError> {
        if tokens.is_empty() {
            return Ok(PerplexityScore::undefined(0));
        }
        let limit = self.max_context();
        let truncated = tokens.len() > limit;
        let tokens = if truncated {
            warn!(tokens = tokens.len(), limit, "input exceeds model context, truncating");
            tokens.get(..limit).unwrap_or(tokens)
        } else {
            tokens
        };
        if tokens.len() < 2 {
            return Ok(PerplexityScore { truncated, ..PerplexityScore::undefined(tokens.len()) });
        }

        let started = Instant::now();
        let logits = self.model.logits(tokens)?;
        let value = loss::perplexity_from_logits(&logits, tokens)?;
        debug!(
            tokens = tokens.len(),
            perplexity = value,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scored text"
        );
        Ok(PerplexityScore { value, tokens_scored: tokens.len(), truncated })
    }
}
