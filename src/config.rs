//! Configuration for store endpoints, models and retrieval knobs
//!
//! Loads configuration from atlas.yml, with `.env` and process environment
//! variables taking precedence over file values.

use serde::Deserialize;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::retriever::RetrievalSettings;
use crate::{Error, Result};

/// Default constants (used when neither atlas.yml nor env provide a value)
pub const CONFIG_FILE: &str = "atlas.yml";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";
pub const DEFAULT_NEO4J_USERNAME: &str = "neo4j";
pub const DEFAULT_NEO4J_PASSWORD: &str = "password";
pub const DEFAULT_NEO4J_DATABASE: &str = "neo4j";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION_NAME: &str = "supply_chain_docs";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_OLLAMA_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_VECTOR_TOP_K: usize = 5;
pub const DEFAULT_GRAPH_MAX_HOPS: u32 = 2;

const REDACTED: &str = "********";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    log_level: Option<String>,
    debug: Option<bool>,
    neo4j: Option<YamlNeo4j>,
    qdrant: Option<YamlQdrant>,
    ollama: Option<YamlOllama>,
    embedding: Option<YamlEmbedding>,
    retrieval: Option<YamlRetrieval>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlNeo4j {
    uri: Option<String>,
    username: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlQdrant {
    url: Option<String>,
    collection_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlOllama {
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlEmbedding {
    provider: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlRetrieval {
    vector_top_k: Option<usize>,
    graph_max_hops: Option<u32>,
}

/// Neo4j connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_NEO4J_URI.to_string(),
            username: DEFAULT_NEO4J_USERNAME.to_string(),
            password: DEFAULT_NEO4J_PASSWORD.to_string(),
            database: DEFAULT_NEO4J_DATABASE.to_string(),
        }
    }
}

/// Qdrant connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdrantConfig {
    pub url: String,
    pub collection_name: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QDRANT_URL.to_string(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
        }
    }
}

/// Ollama settings for the entity extraction model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout_secs: DEFAULT_OLLAMA_TIMEOUT_SECS,
        }
    }
}

/// Which service turns query text into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingProvider {
    #[default]
    Ollama,
    OpenAi,
}

impl FromStr for EmbeddingProvider {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "ollama" => Ok(EmbeddingProvider::Ollama),
            "openai" => Ok(EmbeddingProvider::OpenAi),
            other => Err(Error::ConfigError(format!(
                "unknown embedding provider '{}' (expected ollama or openai)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Ollama,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub vector_top_k: usize,
    pub graph_max_hops: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_top_k: DEFAULT_VECTOR_TOP_K,
            graph_max_hops: DEFAULT_GRAPH_MAX_HOPS,
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: String,
    pub debug: bool,
    pub neo4j: Neo4jConfig,
    pub qdrant: QdrantConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            debug: false,
            neo4j: Neo4jConfig::default(),
            qdrant: QdrantConfig::default(),
            ollama: OllamaConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from atlas.yml (current or parent directory) or defaults.
    /// Environment variables take precedence over file values.
    pub fn load() -> Result<Self> {
        Self::load_dotenv();

        for candidate in [CONFIG_FILE, "../atlas.yml"] {
            if Path::new(candidate).exists() {
                return Self::load_from_file(candidate);
            }
        }

        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML content on top of the defaults. `${VAR}` placeholders are
    /// resolved here; env overrides and validation are not applied.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let yaml: YamlConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

        let mut config = Self::default();

        if let Some(level) = yaml.log_level {
            config.log_level = resolve_placeholder(level)?;
        }
        if let Some(debug) = yaml.debug {
            config.debug = debug;
        }

        let neo4j = yaml.neo4j.unwrap_or_default();
        merge(&mut config.neo4j.uri, neo4j.uri)?;
        merge(&mut config.neo4j.username, neo4j.username)?;
        merge(&mut config.neo4j.password, neo4j.password)?;
        merge(&mut config.neo4j.database, neo4j.database)?;

        let qdrant = yaml.qdrant.unwrap_or_default();
        merge(&mut config.qdrant.url, qdrant.url)?;
        merge(&mut config.qdrant.collection_name, qdrant.collection_name)?;

        let ollama = yaml.ollama.unwrap_or_default();
        merge(&mut config.ollama.base_url, ollama.base_url)?;
        merge(&mut config.ollama.model, ollama.model)?;
        if let Some(timeout) = ollama.timeout_secs {
            config.ollama.timeout_secs = timeout;
        }

        let embedding = yaml.embedding.unwrap_or_default();
        if let Some(provider) = embedding.provider {
            config.embedding.provider = resolve_placeholder(provider)?.parse()?;
        }
        merge(&mut config.embedding.model, embedding.model)?;

        let retrieval = yaml.retrieval.unwrap_or_default();
        if let Some(top_k) = retrieval.vector_top_k {
            config.retrieval.vector_top_k = top_k;
        }
        if let Some(hops) = retrieval.graph_max_hops {
            config.retrieval.graph_max_hops = hops;
        }

        Ok(config)
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        override_from_env(&mut self.log_level, "LOG_LEVEL");
        if let Some(value) = env_value("DEBUG") {
            self.debug = parse_bool(&value);
        }

        override_from_env(&mut self.neo4j.uri, "NEO4J_URI");
        override_from_env(&mut self.neo4j.username, "NEO4J_USERNAME");
        override_from_env(&mut self.neo4j.password, "NEO4J_PASSWORD");
        override_from_env(&mut self.neo4j.database, "NEO4J_DATABASE");

        override_from_env(&mut self.qdrant.url, "QDRANT_URL");
        override_from_env(&mut self.qdrant.collection_name, "VECTOR_COLLECTION_NAME");

        override_from_env(&mut self.ollama.base_url, "OLLAMA_BASE_URL");
        override_from_env(&mut self.ollama.model, "OLLAMA_MODEL");
        if let Some(timeout) = env_parse::<u64>("OLLAMA_TIMEOUT_SECS")? {
            self.ollama.timeout_secs = timeout;
        }

        if let Some(provider) = env_value("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        override_from_env(&mut self.embedding.model, "OLLAMA_EMBEDDING_MODEL");

        if let Some(top_k) = env_parse::<usize>("VECTOR_TOP_K")? {
            self.retrieval.vector_top_k = top_k;
        }
        if let Some(hops) = env_parse::<u32>("GRAPH_MAX_HOPS")? {
            self.retrieval.graph_max_hops = hops;
        }

        Ok(())
    }

    /// Reject settings no retrieval call could succeed with.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("neo4j.uri", &self.neo4j.uri),
            ("qdrant.url", &self.qdrant.url),
            ("ollama.base_url", &self.ollama.base_url),
            ("embedding.model", &self.embedding.model),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::ConfigError(format!("{} must not be empty", name)));
            }
        }

        if self.ollama.timeout_secs == 0 {
            return Err(Error::ConfigError(
                "ollama.timeout_secs must be >= 1".to_string(),
            ));
        }

        self.retrieval_settings().validate()
    }

    /// The flat option set the retriever is constructed from.
    pub fn retrieval_settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            vector_top_k: self.retrieval.vector_top_k,
            graph_max_hops: self.retrieval.graph_max_hops,
            model_name: self.ollama.model.clone(),
            collection_name: self.qdrant.collection_name.clone(),
        }
    }

    pub fn ollama_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama.timeout_secs)
    }

    /// `tracing` filter directive derived from `log_level` / `debug`.
    pub fn log_directive(&self) -> String {
        let level = if self.debug {
            "debug".to_string()
        } else {
            self.log_level.trim().to_lowercase()
        };
        format!("atlas_grag={}", level)
    }

    /// Copy safe to print (credentials masked).
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.neo4j.password.is_empty() {
            copy.neo4j.password = REDACTED.to_string();
        }
        copy
    }
}

/// Parse boolean flags the same way for YAML placeholders and env.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn merge(target: &mut String, value: Option<String>) -> Result<()> {
    if let Some(v) = value {
        *target = resolve_placeholder(v)?;
    }
    Ok(())
}

/// Resolve a `${VAR}` value from the environment; other values pass through.
fn resolve_placeholder(value: String) -> Result<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        return std::env::var(var_name).map_err(|_| {
            Error::ConfigError(format!(
                "Environment variable {} is referenced by the config file but not set",
                var_name
            ))
        });
    }
    Ok(value)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn override_from_env(target: &mut String, key: &str) {
    if let Some(value) = env_value(key) {
        *target = value;
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_value(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::ConfigError(format!("{}='{}' is invalid: {}", key, raw, e))),
    }
}
