
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Connection settings for an OpenAI compatible API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,
    /// Falls back to `OPENAI_API_KEY` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimension: u32,
    pub batch_size: u32,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1/".to_string(),
            api_key: None,
            chat_model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            embedding_dimension: 1536,
            batch_size: 50,
            timeout_seconds: 30,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates scoring below this inner-product similarity are dropped
    pub similarity_threshold: f32,
    pub max_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            max_results: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Classifications below this confidence are always escalated
    pub confidence_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResponderConfig {
    /// Character budget communicated to the model
    pub max_response_length: usize,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            max_response_length: 500,
        }
    }
}

/// Where the source documents live. Relative paths resolve against the working directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    pub docs_dir: PathBuf,
    pub knowledge_base_dir: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            knowledge_base_dir: PathBuf::from("knowledge_base"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(u32),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid similarity threshold: {0} (must be between -1.0 and 1.0)")]
    InvalidSimilarityThreshold(f32),
    #[error("Invalid max results: {0} (must be between 1 and 100)")]
    InvalidMaxResults(usize),
    #[error("Invalid confidence threshold: {0} (must be between 0.0 and 1.0)")]
    InvalidConfidenceThreshold(f32),
    #[error("Invalid max response length: {0} (must be between 50 and 10000)")]
    InvalidMaxResponseLength(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default location of the configuration and persisted knowledge state
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".help-desk"))
            .or_else(|| dirs::data_dir().map(|data| data.join("help-desk")))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.openai.validate()?;
        self.retrieval.validate()?;
        self.classifier.validate()?;
        self.responder.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Directory holding the persisted vector index
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.get_base_dir().join("vectors")
    }

    /// JSON record list paired with the vector index
    #[inline]
    pub fn records_path(&self) -> PathBuf {
        self.get_base_dir().join("knowledge_items.json")
    }

    #[inline]
    pub fn categories_path(&self) -> PathBuf {
        self.sources.docs_dir.join("categories.json")
    }

    #[inline]
    pub fn test_requests_path(&self) -> PathBuf {
        self.sources.docs_dir.join("test_requests.json")
    }

    #[inline]
    pub fn knowledge_base_path(&self) -> PathBuf {
        self.sources.knowledge_base_dir.join("knowledge_base.md")
    }

    #[inline]
    pub fn policies_path(&self) -> PathBuf {
        self.sources.knowledge_base_dir.join("company_it_policies.md")
    }

    #[inline]
    pub fn troubleshooting_path(&self) -> PathBuf {
        self.sources
            .knowledge_base_dir
            .join("troubleshooting_database.json")
    }

    #[inline]
    pub fn installation_guides_path(&self) -> PathBuf {
        self.sources
            .knowledge_base_dir
            .join("installation_guides.json")
    }
}

impl OpenAiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_url()?;

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    /// Base URL with a trailing slash so endpoint paths join beneath it
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let mut base = self.api_base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let url = Url::parse(&base).map_err(|_| ConfigError::InvalidUrl(base.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }
        Ok(url)
    }

    /// API key from the config file, or from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_api_base(&mut self, api_base: String) -> Result<(), ConfigError> {
        let candidate = OpenAiConfig {
            api_base: api_base.clone(),
            ..self.clone()
        };
        candidate.api_url()?;
        self.api_base = api_base;
        Ok(())
    }

    pub fn set_chat_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.chat_model = model;
        Ok(())
    }

    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::InvalidSimilarityThreshold(
                self.similarity_threshold,
            ));
        }

        if !(1..=100).contains(&self.max_results) {
            return Err(ConfigError::InvalidMaxResults(self.max_results));
        }

        Ok(())
    }

    pub fn set_similarity_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidSimilarityThreshold(threshold));
        }
        self.similarity_threshold = threshold;
        Ok(())
    }

    pub fn set_max_results(&mut self, max_results: usize) -> Result<(), ConfigError> {
        if !(1..=100).contains(&max_results) {
            return Err(ConfigError::InvalidMaxResults(max_results));
        }
        self.max_results = max_results;
        Ok(())
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                self.confidence_threshold,
            ));
        }
        Ok(())
    }

    pub fn set_confidence_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(threshold));
        }
        self.confidence_threshold = threshold;
        Ok(())
    }
}

impl ResponderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(50..=10_000).contains(&self.max_response_length) {
            return Err(ConfigError::InvalidMaxResponseLength(
                self.max_response_length,
            ));
        }
        Ok(())
    }
}
