//! Configuration handling for paperrag.
//!
//! Configuration is read from `config.toml` in the config directory. Every
//! field has a default, so a missing file or a partial file is fine.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use paperrag_core::{ChunkConfig, ConfigError, DistanceMetric, DEFAULT_EXCERPT_CHARS};
use paperrag_embed::{DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL};
use paperrag_query::{PromptComposer, DEFAULT_CHAT_MODEL, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;

const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chunking-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length (characters)
    #[serde(default = "default_max_chunk_length")]
    pub max_chunk_length: usize,

    /// Overlap between consecutive chunks (characters)
    #[serde(default = "default_overlap_length")]
    pub overlap_length: usize,
}

fn default_max_chunk_length() -> usize {
    1000
}

fn default_overlap_length() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: default_max_chunk_length(),
            overlap_length: default_overlap_length(),
        }
    }
}

impl ChunkingConfig {
    /// Chunker parameters.
    #[must_use]
    pub fn to_chunk_config(&self) -> ChunkConfig {
        ChunkConfig::new(self.max_chunk_length, self.overlap_length)
    }
}

/// Retrieval-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Distance metric
    #[serde(default)]
    pub metric: DistanceMetric,

    /// Characters shown per cited excerpt
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_excerpt_chars() -> usize {
    DEFAULT_EXCERPT_CHARS
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            metric: DistanceMetric::default(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible HTTP API
    #[default]
    OpenAi,
    /// Local word-hash vectors, no network
    Hash,
}

/// Embedding-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Texts per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Max concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Vector dimension of the hash provider
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_batch_size() -> usize {
    64
}

fn default_max_concurrent() -> usize {
    4
}

fn default_dimension() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            base_url: default_base_url(),
            batch_size: default_batch_size(),
            max_concurrent: default_max_concurrent(),
            dimension: default_dimension(),
        }
    }
}

/// Generation-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Chat model
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Reply length cap (tokens)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            base_url: default_base_url(),
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

/// Custom prompt templates. Both must contain `{context}` and `{question}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptConfig {
    /// Template for the summary question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_template: Option<String>,

    /// Template for every other question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_template: Option<String>,
}

impl PromptConfig {
    /// Composer with the configured templates.
    pub fn to_composer(&self) -> std::result::Result<PromptComposer, ConfigError> {
        let mut composer = PromptComposer::new();
        if let Some(template) = &self.summary_template {
            composer = composer.with_summary_template(template)?;
        }
        if let Some(template) = &self.answer_template {
            composer = composer.with_answer_template(template)?;
        }
        Ok(composer)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const SAMPLE_CONFIG: &str = r#"# paperrag configuration

[chunking]
# Window size and overlap, in characters
max_chunk_length = 1000
overlap_length = 200

[retrieval]
top_k = 4
# cosine, l2 or dot
metric = "cosine"
excerpt_chars = 500

[embedding]
# openai or hash
provider = "openai"
model = "text-embedding-ada-002"
base_url = "https://api.openai.com/v1"
batch_size = 64
max_concurrent = 4
# Only used by the hash provider
dimension = 384

[generation]
model = "gpt-3.5-turbo"
base_url = "https://api.openai.com/v1"
temperature = 0.0
# max_tokens = 1024

[prompt]
# Custom templates must contain {context} and {question}
# answer_template = "Context: {context}\nQuestion: {question}"

[logging]
level = "info"
"#;

impl Config {
    /// Load the configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load the configuration from `path`, or from the default location.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::read(&path)?,
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.chunking.to_chunk_config().validate()?;
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid {
                field: "retrieval.top_k",
                reason: "must be > 0".to_string(),
            });
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "embedding.batch_size",
                reason: "must be > 0".to_string(),
            });
        }
        if self.embedding.max_concurrent == 0 {
            return Err(ConfigError::Invalid {
                field: "embedding.max_concurrent",
                reason: "must be > 0".to_string(),
            });
        }
        if self.logging.level.parse::<Level>().is_err() {
            return Err(ConfigError::Invalid {
                field: "logging.level",
                reason: format!(
                    "unknown level {:?} (expected trace, debug, info, warn or error)",
                    self.logging.level
                ),
            });
        }
        self.prompt.to_composer()?;
        Ok(())
    }

    /// Path of the default config file.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Commented sample configuration file.
    pub fn sample_toml() -> &'static str {
        SAMPLE_CONFIG
    }
}

/// Get the data directory for paperrag.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("PAPERRAG_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "paperrag").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the config directory for paperrag.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("PAPERRAG_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "paperrag").map(|dirs| dirs.config_dir().to_path_buf())
}
