#![forbid(unsafe_code)]

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::error::ModelError;
use crate::linear::Linear;
use crate::loader;

/// A causal language model: one forward pass yields next-token logits for
/// every input position.
pub trait LanguageModel: Send + Sync {
    /// Size of each logits row.
    fn vocab_size(&self) -> usize;

    /// Longest token sequence accepted by one forward pass.
    fn max_context(&self) -> usize;

    /// Row `i` holds the logits of the token following `tokens[..=i]`.
    fn logits(&self, tokens: &[u32]) -> Result<Vec<Vec<f32>>, ModelError>;
}

/// Context length used by the bigram model unless overridden.
pub const BIGRAM_CONTEXT: usize = 1024;

/// Bigram model: a single dense layer over a one-hot of the previous token.
///
/// Weight file layout: `vocab * vocab` weights (row-major, next x previous)
/// followed by `vocab` biases, little-endian f32.
pub struct BigramModel {
    head: Linear,
    max_context: usize,
}

impl BigramModel {
    /// Build from a raw weight buffer.
    pub fn from_weights(vocab: usize, raw: &[f32]) -> Result<Self, ModelError> {
        let head = Linear::from_raw(vocab, vocab, raw)?;
        Ok(Self { head, max_context: BIGRAM_CONTEXT })
    }

    /// Load weights from a little-endian f32 file.
    pub fn load(path: &Path, vocab: usize) -> Result<Self, ModelError> {
        let raw = loader::load_f32_file(path)?;
        Self::from_weights(vocab, &raw)
    }

    /// Every next token equally likely.
    pub fn uniform(vocab: usize) -> Self {
        Self { head: Linear::zeros(vocab, vocab), max_context: BIGRAM_CONTEXT }
    }

    /// Deterministic pseudo-random weights in [-1, 1) drawn from `seed`.
    pub fn seeded(vocab: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let raw: Vec<f32> = (0..vocab * vocab + vocab).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let (weights, bias) = raw.split_at(vocab * vocab);
        let head = Linear {
            in_dim: vocab,
            out_dim: vocab,
            weights: weights.to_vec(),
            bias: bias.to_vec(),
        };
        Self { head, max_context: BIGRAM_CONTEXT }
    }

    /// Override the context length.
    pub fn with_max_context(mut self, max_context: usize) -> Self {
        self.max_context = max_context;
        self
    }

    /// Raw weights followed by biases, the layout [`BigramModel::load`] reads.
    pub fn to_raw(&self) -> Vec<f32> {
        self.head.weights.iter().chain(&self.head.bias).copied().collect()
    }
}

impl LanguageModel for BigramModel {
    fn vocab_size(&self) -> usize {
        self.head.out_dim
    }

    fn max_context(&self) -> usize {
        self.max_context
    }

    fn logits(&self, tokens: &[u32]) -> Result<Vec<Vec<f32>>, ModelError> {
        let vocab = self.head.in_dim;
        tokens
            .par_iter()
            .map(|&token| {
                self.head
                    .forward_one_hot(token as usize)
                    .ok_or(ModelError::TokenOutOfVocab { token, vocab })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logits_have_one_row_per_token() {
        let model = BigramModel::seeded(16, 7);
        let rows = model.logits(&[1, 2, 3]).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 16));
    }

    #[test]
    fn rows_depend_only_on_the_previous_token() {
        let model = BigramModel::seeded(8, 1);
        let rows = model.logits(&[4, 2, 4]).unwrap();
        assert_eq!(rows[0], rows[2]);
        assert_ne!(rows[0], rows[1]);
    }

    #[test]
    fn seeded_weights_are_deterministic() {
        assert_eq!(BigramModel::seeded(8, 3).to_raw(), BigramModel::seeded(8, 3).to_raw());
        assert_ne!(BigramModel::seeded(8, 3).to_raw(), BigramModel::seeded(8, 4).to_raw());
    }

    #[test]
    fn out_of_vocab_token_is_an_error() {
        let model = BigramModel::uniform(4);
        assert!(matches!(
            model.logits(&[1, 9]),
            Err(ModelError::TokenOutOfVocab { token: 9, vocab: 4 })
        ));
    }

    #[test]
    fn weights_survive_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bigram.bin");
        let model = BigramModel::seeded(6, 11);
        loader::save_f32_file(&path, &model.to_raw()).unwrap();
        let loaded = BigramModel::load(&path, 6).unwrap();
        assert_eq!(loaded.logits(&[0, 5]).unwrap(), model.logits(&[0, 5]).unwrap());
    }
}
