#![forbid(unsafe_code)]

use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::ModelError;

/// Turns text into the model's token ids.
pub trait TokenEncoder: Send + Sync {
    /// Encode `text` without inserting special boundary tokens.
    fn encode(&self, text: &str) -> Result<Vec<u32>, ModelError>;
}

/// Subword tokenizer loaded from a `tokenizer.json` definition.
pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    /// Load the tokenizer definition from `path`.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let inner = Tokenizer::from_file(path)
            .map_err(|e| ModelError::Tokenizer(format!("{}: {}", path.display(), e)))?;
        Ok(Self { inner })
    }

    /// Vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl TokenEncoder for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, ModelError> {
        let encoding =
            self.inner.encode(text, false).map_err(|e| ModelError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}

/// One token per UTF-8 byte; vocabulary of 256.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByteEncoder;

impl ByteEncoder {
    /// Number of distinct byte tokens.
    pub const VOCAB: usize = 256;
}

impl TokenEncoder for ByteEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u32>, ModelError> {
        Ok(text.bytes().map(u32::from).collect())
    }
}
