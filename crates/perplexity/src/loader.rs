#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tracing::info;

use crate::error::ModelError;

/// Default hub repository for the scoring model.
pub const DEFAULT_REPO: &str = "gpt2";

/// Where the pretrained model comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelSource {
    /// Download (or reuse the local cache of) a Hugging Face hub repository.
    Hub {
        /// repository id, e.g. `gpt2`
        repo: String,
        /// branch, tag or commit
        revision: String,
    },
    /// A directory holding `config.json`, `tokenizer.json` and `model.safetensors`.
    Local(PathBuf),
}

impl Default for ModelSource {
    fn default() -> Self {
        ModelSource::Hub { repo: DEFAULT_REPO.to_string(), revision: "main".to_string() }
    }
}

/// Resolved paths of the files needed to build a scorer.
#[derive(Clone, Debug)]
pub struct ModelFiles {
    /// model hyper-parameters
    pub config: PathBuf,
    /// tokenizer definition
    pub tokenizer: PathBuf,
    /// safetensors weights
    pub weights: PathBuf,
}

impl ModelSource {
    /// Resolve the model files, downloading them on first use for hub sources.
    pub fn resolve(&self) -> Result<ModelFiles, ModelError> {
        match self {
            ModelSource::Local(dir) => {
                let files = ModelFiles {
                    config: dir.join("config.json"),
                    tokenizer: dir.join("tokenizer.json"),
                    weights: dir.join("model.safetensors"),
                };
                for path in [&files.config, &files.tokenizer, &files.weights] {
                    if !path.exists() {
                        return Err(ModelError::io(
                            path,
                            std::io::Error::new(std::io::ErrorKind::NotFound, "missing model file"),
                        ));
                    }
                }
                Ok(files)
            }
            ModelSource::Hub { repo, revision } => {
                info!(repo = %repo, revision = %revision, "resolving model from hub");
                let api = Api::new()?;
                let repo =
                    api.repo(Repo::with_revision(repo.clone(), RepoType::Model, revision.clone()));
                Ok(ModelFiles {
                    config: repo.get("config.json")?,
                    tokenizer: repo.get("tokenizer.json")?,
                    weights: repo.get("model.safetensors")?,
                })
            }
        }
    }
}

/// Read a whole file into memory.
pub fn load_bytes(path: &Path) -> Result<Vec<u8>, ModelError> {
    std::fs::read(path).map_err(|e| ModelError::io(path, e))
}

/// Load file containing f32 values in little-endian and return Vec<f32>
pub fn load_f32_file(path: &Path) -> Result<Vec<f32>, ModelError> {
    let buf = load_bytes(path)?;
    if buf.len() % 4 != 0 {
        return Err(ModelError::WeightSize { got: buf.len(), expected: buf.len() / 4 * 4 });
    }
    Ok(buf
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Write f32 values little-endian, the layout [`load_f32_file`] reads.
pub fn save_f32_file(path: &Path, values: &[f32]) -> Result<(), ModelError> {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes).map_err(|e| ModelError::io(path, e))
}
