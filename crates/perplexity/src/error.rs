use std::path::PathBuf;

/// Errors raised while loading or running the language model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The tokenizer could not be loaded or failed to encode the text
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// A model file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// file that failed to load
        path: PathBuf,
        /// underlying IO error
        source: std::io::Error,
    },

    /// `config.json` could not be parsed
    #[error("invalid model config: {0}")]
    Config(#[from] serde_json::Error),

    /// Weights have the wrong size for the declared dimensions
    #[error("weight buffer has {got} values, expected {expected}")]
    WeightSize {
        /// values found in the buffer
        got: usize,
        /// values required by the layer dimensions
        expected: usize,
    },

    /// Downloading model files from the hub failed
    #[error("model hub error: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    /// A tensor operation failed during load or inference
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// The model returned a different number of logit rows than tokens
    #[error("model returned {rows} logit rows for {tokens} tokens")]
    LogitsShape {
        /// rows returned by the model
        rows: usize,
        /// tokens fed to the model
        tokens: usize,
    },

    /// A token id does not fit the model vocabulary
    #[error("token {token} is outside the vocabulary of size {vocab}")]
    TokenOutOfVocab {
        /// offending token id
        token: u32,
        /// size of the logits row / vocabulary
        vocab: usize,
    },

    /// The tokenizer emits ids the model has no logits for
    #[error("tokenizer vocabulary ({tokenizer}) is larger than the model vocabulary ({model})")]
    VocabMismatch {
        /// ids the tokenizer can produce
        tokenizer: usize,
        /// logits per row
        model: usize,
    },

    /// Loss needs at least two tokens (one prediction)
    #[error("need at least 2 tokens to score, got {0}")]
    TooFewTokens(usize),

    /// Inference produced an unusable result
    #[error("inference failed: {0}")]
    Inference(String),
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModelError::Io { path: path.into(), source }
    }
}
