use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::retrieval::{DEFAULT_EXPANSION_COUNT, MAX_RESULTS_LIMIT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the whole query pipeline.
///
/// Covers the external model service, retrieval tuning, caching, the corpus
/// source and the socket the service listens on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Configuration for the generation/embedding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    /// Deadline applied to every call made to the service.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl LlmConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration for query expansion, scoring and ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub embedding_model: String,
    /// Number of alternative phrasings requested from the generator.
    #[serde(default = "default_expansion_count")]
    pub expansion_count: usize,
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
    #[serde(default = "default_min_question_chars")]
    pub min_question_chars: usize,
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
    /// Upper bound on embedding calls in flight for one query.
    #[serde(default = "default_embedding_concurrency")]
    pub embedding_concurrency: usize,
    /// Worker threads for candidate scoring; 0 means one per CPU.
    #[serde(default)]
    pub scoring_threads: usize,
    #[serde(default = "default_source_preview_chars")]
    pub source_preview_chars: usize,
}

/// Lifetimes and capacity of the result cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_query_ttl_secs")]
    pub query_ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: u64,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn query_ttl(&self) -> Duration {
        Duration::from_secs(self.query_ttl_secs)
    }
}

/// Where chunks are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CorpusConfig {
    /// Chunks held in process memory, filled by an ingestion collaborator.
    Memory,
    /// A JSON array of chunks on disk, re-read on every listing.
    Json { path: String },
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self::Json {
            path: "./data/chunks.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub socket_path: String,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant. Answer the question using only the provided context. \
     If the context does not contain the answer, say so."
        .to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_expansion_count() -> usize {
    DEFAULT_EXPANSION_COUNT
}

fn default_max_results() -> usize {
    5
}

fn default_min_question_chars() -> usize {
    3
}

fn default_max_question_chars() -> usize {
    1000
}

fn default_embedding_concurrency() -> usize {
    4
}

fn default_source_preview_chars() -> usize {
    200
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_query_ttl_secs() -> u64 {
    1800
}

fn default_cache_max_entries() -> u64 {
    10_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2:latest".to_string(),
            base_url: "http://localhost:11434".to_string(),
            temperature: 0.3,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_model: "nomic-embed-text".to_string(),
            expansion_count: default_expansion_count(),
            default_max_results: default_max_results(),
            min_question_chars: default_min_question_chars(),
            max_question_chars: default_max_question_chars(),
            embedding_concurrency: default_embedding_concurrency(),
            scoring_threads: 0,
            source_preview_chars: default_source_preview_chars(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_cache_ttl_secs(),
            query_ttl_secs: default_query_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/sift.sock".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            system_prompt: default_system_prompt(),
            retrieval: RetrievalConfig::default(),
            cache: CacheConfig::default(),
            corpus: CorpusConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_default()
    }

    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "llm.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.embedding_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.embedding_concurrency must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_RESULTS_LIMIT).contains(&self.retrieval.default_max_results) {
            return Err(ConfigError::Invalid(format!(
                "retrieval.default_max_results must be within 1..={}",
                MAX_RESULTS_LIMIT
            )));
        }
        if self.retrieval.min_question_chars > self.retrieval.max_question_chars {
            return Err(ConfigError::Invalid(
                "retrieval.min_question_chars exceeds max_question_chars".to_string(),
            ));
        }
        if self.cache.query_ttl_secs == 0 || self.cache.default_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache lifetimes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
