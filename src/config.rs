use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed or validated.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docrag server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores chunk embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for document storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding model identifier recorded alongside vectors.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Window size in characters for the chunker.
    pub chunk_size: usize,
    /// Overlap in characters between adjacent chunks.
    pub chunk_overlap: usize,
    /// When enabled, re-uploading identical content for the same owner is refused.
    pub dedup_by_content_hash: bool,
    /// Upper bound in seconds for extraction, embedding, and store calls.
    pub request_timeout_secs: u64,
    /// Default number of search results when the caller does not specify one.
    pub search_default_limit: usize,
    /// Hard ceiling on the number of search results per request.
    pub search_max_limit: usize,
    /// Number of chunks retrieved for RAG context assembly.
    pub context_top_k: usize,
    /// Character budget for the assembled RAG context block.
    pub context_max_chars: usize,
    /// Optional base URL for the Ollama generation runtime.
    pub ollama_url: Option<String>,
    /// Model identifier passed to the chat generator.
    pub generator_model: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SEARCH_LIMIT: usize = 5;
const DEFAULT_SEARCH_MAX_LIMIT: usize = 50;
const DEFAULT_CONTEXT_TOP_K: usize = 3;
const DEFAULT_CONTEXT_MAX_CHARS: usize = 4000;
const DEFAULT_GENERATOR_MODEL: &str = "llama3.2";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chunk_size = load_env_parsed("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = load_env_parsed("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "CHUNK_SIZE must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidValue(
                "CHUNK_OVERLAP must be smaller than CHUNK_SIZE".to_string(),
            ));
        }

        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            chunk_size,
            chunk_overlap,
            dedup_by_content_hash: load_env_flag("DEDUP_BY_CONTENT_HASH"),
            request_timeout_secs: load_env_parsed(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            search_default_limit: load_env_parsed("SEARCH_DEFAULT_LIMIT", DEFAULT_SEARCH_LIMIT)?,
            search_max_limit: load_env_parsed("SEARCH_MAX_LIMIT", DEFAULT_SEARCH_MAX_LIMIT)?,
            context_top_k: load_env_parsed("CONTEXT_TOP_K", DEFAULT_CONTEXT_TOP_K)?,
            context_max_chars: load_env_parsed("CONTEXT_MAX_CHARS", DEFAULT_CONTEXT_MAX_CHARS)?,
            ollama_url: load_env_optional("OLLAMA_URL"),
            generator_model: load_env_optional("GENERATOR_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATOR_MODEL.to_string()),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn load_env_flag(key: &str) -> bool {
    load_env_optional(key)
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
