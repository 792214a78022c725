//! Configuration for the shield front ends.
//!
//! Sources, first match wins for the file:
//! - an explicit `--config PATH`
//! - `./shield.toml`
//! - `~/.config/shield/config.toml`
//!
//! then `SHIELD_*` environment variables override individual fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use perplexity::loader::DEFAULT_REPO;
use perplexity::{ModelError, ModelSource};
use serde::{Deserialize, Serialize};
use translate::google::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use translate::{GoogleTranslator, Language, Passthrough, Translator};

use crate::detector::DEFAULT_SCORING_WORKERS;
use crate::verdict::Thresholds;

/// File looked up in the working directory.
pub const LOCAL_CONFIG: &str = "shield.toml";

/// Environment variable naming a local model directory.
pub const ENV_MODEL_DIR: &str = "SHIELD_MODEL_DIR";
/// Environment variable naming a hub repository.
pub const ENV_MODEL_REPO: &str = "SHIELD_MODEL_REPO";
/// Environment variable overriding the translation endpoint.
pub const ENV_TRANSLATE_URL: &str = "SHIELD_TRANSLATE_URL";

/// Configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("config file {path}: {source}")]
    Io {
        /// offending file
        path: PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`ShieldConfig`]
    #[error("invalid config {path}: {source}")]
    Parse {
        /// offending file
        path: PathBuf,
        /// parser error
        #[source]
        source: toml::de::Error,
    },

    /// Refused to overwrite an existing file
    #[error("{0} already exists")]
    Exists(PathBuf),

    /// No directory to put a user config in
    #[error("could not determine the user config directory")]
    NoConfigDir,

    /// `backend = "bigram"` without weights
    #[error("model.bigram_weights is required for the bigram backend")]
    MissingBigramWeights,

    /// The scorer could not be loaded
    #[error("failed to load model: {0}")]
    Model(#[from] ModelError),
}

/// Which language model computes perplexity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// pretrained GPT-2 on candle
    #[default]
    Gpt2,
    /// byte-level bigram weights, for offline use and tests
    Bigram,
}

/// `[model]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// scoring backend
    pub backend: Backend,
    /// hub repository holding the checkpoint
    pub repo: String,
    /// hub revision
    pub revision: String,
    /// load from this directory instead of the hub
    pub local_dir: Option<PathBuf>,
    /// weight file for the bigram backend
    pub bigram_weights: Option<PathBuf>,
    /// score at most this many tokens
    pub max_context: Option<usize>,
    /// give up on a single scoring call after this many seconds
    pub inference_timeout_secs: Option<u64>,
    /// scoring threads allowed to run at once when a timeout is set
    pub scoring_workers: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Gpt2,
            repo: DEFAULT_REPO.to_string(),
            revision: "main".to_string(),
            local_dir: None,
            bigram_weights: None,
            max_context: None,
            inference_timeout_secs: None,
            scoring_workers: DEFAULT_SCORING_WORKERS,
        }
    }
}

/// `[translation]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// call the translation service at all
    pub enabled: bool,
    /// service endpoint
    pub endpoint: String,
    /// language the model was trained on
    pub target: Language,
    /// round-trip bound
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            target: Language::En,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// `[report]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// length of the repeated-words list
    pub top_words: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { top_words: lexstats::TOP_WORDS }
    }
}

/// `[server]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// listen address
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: "127.0.0.1:3030".to_string() }
    }
}

/// Complete configuration. Every field has a default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    /// model selection
    pub model: ModelConfig,
    /// translation adapter
    pub translation: TranslationConfig,
    /// verdict cut-offs
    pub thresholds: Thresholds,
    /// report shape
    pub report: ReportConfig,
    /// HTTP server
    pub server: ServerConfig,
}

impl ShieldConfig {
    /// Load from `explicit`, or the first config file found, then apply
    /// environment overrides. A missing explicit file is an error; missing
    /// implicit files fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };
        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// First existing implicit config file.
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG);
        if local.is_file() {
            return Some(local);
        }
        Self::user_config_path().filter(|p| p.is_file())
    }

    /// `~/.config/shield/config.toml` on Linux, platform equivalent elsewhere.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("shield").join("config.toml"))
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Override fields from `SHIELD_*` variables, as returned by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = set(ENV_MODEL_DIR) {
            self.model.local_dir = Some(PathBuf::from(dir));
        }
        if let Some(repo) = set(ENV_MODEL_REPO) {
            self.model.repo = repo;
        }
        if let Some(url) = set(ENV_TRANSLATE_URL) {
            self.translation.endpoint = url;
        }
    }

    /// Where GPT-2 files come from. A local directory wins over the hub.
    pub fn model_source(&self) -> ModelSource {
        match &self.model.local_dir {
            Some(dir) => ModelSource::Local(dir.clone()),
            None => ModelSource::Hub {
                repo: self.model.repo.clone(),
                revision: self.model.revision.clone(),
            },
        }
    }

    /// Bound on a single scoring call, if any.
    pub fn inference_timeout(&self) -> Option<Duration> {
        self.model.inference_timeout_secs.filter(|&s| s > 0).map(Duration::from_secs)
    }

    /// Translator matching the `[translation]` section.
    pub fn translator(&self) -> Box<dyn Translator> {
        if self.translation.enabled {
            Box::new(GoogleTranslator::new(
                self.translation.endpoint.clone(),
                Duration::from_secs(self.translation.timeout_secs.max(1)),
            ))
        } else {
            Box::new(Passthrough)
        }
    }

    /// Write [`EXAMPLE_CONFIG`] to `path`, creating parent directories.
    pub fn write_example(path: &Path, overwrite: bool) -> Result<(), ConfigError> {
        if path.exists() && !overwrite {
            return Err(ConfigError::Exists(path.to_path_buf()));
        }
        let io = |source| ConfigError::Io { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(path, EXAMPLE_CONFIG).map_err(io)
    }
}

/// Commented config written by `shield init-config`.
pub const EXAMPLE_CONFIG: &str = r#"# GPT Shield configuration

[model]
# "gpt2" (downloads from the Hugging Face hub) or "bigram" (offline byte model)
backend = "gpt2"
repo = "gpt2"
revision = "main"
# local_dir = "/models/gpt2"          # config.json, tokenizer.json, model.safetensors
# bigram_weights = "weights/bigram.bin"
# max_context = 1024
# inference_timeout_secs = 30
scoring_workers = 4

[translation]
enabled = true
endpoint = "https://translate.googleapis.com/translate_a/single"
target = "en"
timeout_secs = 10

[thresholds]
max_perplexity = 1000.0
min_burstiness = 0.5

[report]
top_words = 10

[server]
addr = "127.0.0.1:3030"
"#;
