//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`,
//! `config.<env>.toml` (env from `RUST_ENV`, default `dev`) and `APP_*`
//! environment variables (`__` separates nested keys, e.g.
//! `APP_CHUNKING__CHUNK_SIZE=500`). Provides helpers to expand `~` and
//! `${VAR}` and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{DistanceMetric, Sentiment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/embeddings` endpoint.
    #[default]
    Openai,
    /// Deterministic offline hashing embedder.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub batch_size: usize,
    /// Embedding requests allowed in flight at once.
    pub max_in_flight: usize,
    /// Only used by the hashing embedder.
    pub dim: usize,
    pub metric: DistanceMetric,
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Openai,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-ada-002".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            batch_size: 64,
            max_in_flight: 4,
            dim: 1024,
            metric: DistanceMetric::L2,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.5,
            max_tokens: 1000,
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// FAQ pairs evaluated concurrently. 1 keeps the run sequential.
    pub max_in_flight: usize,
    /// Pairs not finished by this deadline are reported as cancelled.
    pub run_timeout_secs: Option<u64>,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self { max_in_flight: 1, run_timeout_secs: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplySettings {
    pub sign_off: String,
}

impl Default for ReplySettings {
    fn default() -> Self {
        Self { sign_off: "ABC support".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSettings {
    /// Category recorded when the generator's label cannot be read.
    /// `None` reports the thread as failed instead.
    pub fallback: Option<Sentiment>,
    /// Threads classified more recently than this are skipped.
    pub refresh_after_mins: i64,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self { fallback: None, refresh_after_mins: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { data_dir: "./data".to_string() }
    }
}

/// Largest refresh window a `chrono::Duration` can hold, in minutes.
pub const MAX_REFRESH_AFTER_MINS: i64 = i64::MAX / 60_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub retrieval: RetrievalSettings,
    pub evaluation: EvaluationSettings,
    pub reply: ReplySettings,
    pub sentiment: SentimentSettings,
    pub storage: StorageSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be greater than 0".into()));
        }
        if self.embedding.batch_size == 0 || self.embedding.max_in_flight == 0 {
            return Err(Error::InvalidConfig(
                "embedding.batch_size and embedding.max_in_flight must be greater than 0".into(),
            ));
        }
        if self.evaluation.max_in_flight == 0 {
            return Err(Error::InvalidConfig("evaluation.max_in_flight must be greater than 0".into()));
        }
        if self.embedding.provider == EmbeddingProviderKind::Hash && self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be greater than 0".into()));
        }
        if !(0..=MAX_REFRESH_AFTER_MINS).contains(&self.sentiment.refresh_after_mins) {
            return Err(Error::InvalidConfig(format!(
                "sentiment.refresh_after_mins must be between 0 and {MAX_REFRESH_AFTER_MINS}, got {}",
                self.sentiment.refresh_after_mins
            )));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load from the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Typed, validated settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
