//! Runtime configuration.
//!
//! Settings are loaded once at startup from declared defaults overlaid with
//! flat environment variables (a `.env` file is honored via `dotenvy` before
//! this runs) and handed to each component at construction time. Nothing in
//! the crate reads the environment after `AppConfig::build` returns.

use std::net::SocketAddr;
use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Application settings. Immutable after construction.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Google Generative Language API key. Required. The sentinel value
    /// `mock` selects the in-process mock providers instead of the hosted
    /// API.
    pub google_api_key: String,

    /// Comma-separated list of allowed CORS origins.
    pub allowed_origins: String,

    /// Log filter handed to `tracing_subscriber::EnvFilter`.
    pub log_level: String,

    pub host: String,
    pub port: u16,

    /// Directory holding the knowledge sources.
    pub data_dir: String,
    pub txt_file: String,
    pub pdf_file: String,

    /// Directory the serialized vector index is persisted to.
    pub index_dir: String,

    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between neighboring chunks in characters.
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question.
    pub retriever_k: usize,

    pub embedding_model: String,
    pub llm_model: String,

    /// Request timeout for embedding and LLM provider calls, in seconds.
    pub provider_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from defaults and environment variables.
    ///
    /// A missing or malformed required value is an error; callers are
    /// expected to abort startup on it.
    pub fn build() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default(
                "allowed_origins",
                "http://localhost:3000,http://127.0.0.1:3000",
            )?
            .set_default("log_level", "info")?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000)?
            .set_default("data_dir", "data")?
            .set_default("txt_file", "knowledge.txt")?
            .set_default("pdf_file", "Knowledge.pdf")?
            .set_default("index_dir", "vector_index")?
            .set_default("chunk_size", 500)?
            .set_default("chunk_overlap", 50)?
            .set_default("retriever_k", 3)?
            .set_default("embedding_model", "models/embedding-001")?
            .set_default("llm_model", "models/gemini-1.5-flash")?
            .set_default("provider_timeout_secs", 30)?
            // Flat environment variables, e.g. GOOGLE_API_KEY, CHUNK_SIZE.
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.google_api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "GOOGLE_API_KEY must not be empty".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Message(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Whether the mock providers were requested instead of the hosted API.
    pub fn use_mock_providers(&self) -> bool {
        self.google_api_key == "mock"
    }

    /// Full path to the plain-text knowledge source.
    pub fn txt_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.txt_file)
    }

    /// Full path to the PDF knowledge source.
    pub fn pdf_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.pdf_file)
    }

    /// Allowed CORS origins, split on commas and trimmed.
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Message(format!("invalid HOST/PORT: {e}")))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_api_key: "mock".to_string(),
            allowed_origins: "http://localhost:3000,http://127.0.0.1:3000".to_string(),
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            data_dir: "data".to_string(),
            txt_file: "knowledge.txt".to_string(),
            pdf_file: "Knowledge.pdf".to_string(),
            index_dir: "vector_index".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
            retriever_k: 3,
            embedding_model: "models/embedding-001".to_string(),
            llm_model: "models/gemini-1.5-flash".to_string(),
            provider_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "GOOGLE_API_KEY",
            "ALLOWED_ORIGINS",
            "LOG_LEVEL",
            "HOST",
            "PORT",
            "DATA_DIR",
            "TXT_FILE",
            "PDF_FILE",
            "INDEX_DIR",
            "CHUNK_SIZE",
            "CHUNK_OVERLAP",
            "RETRIEVER_K",
            "EMBEDDING_MODEL",
            "LLM_MODEL",
            "PROVIDER_TIMEOUT_SECS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn missing_api_key_is_rejected() {
        clear_env();
        assert!(AppConfig::build().is_err());
    }

    #[test]
    #[serial]
    fn blank_api_key_is_rejected() {
        clear_env();
        std::env::set_var("GOOGLE_API_KEY", "   ");
        assert!(AppConfig::build().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn defaults_apply() {
        clear_env();
        std::env::set_var("GOOGLE_API_KEY", "test-key");
        let config = AppConfig::build().unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.retriever_k, 3);
        assert_eq!(config.embedding_model, "models/embedding-001");
        assert_eq!(config.txt_path(), PathBuf::from("data/knowledge.txt"));
        assert_eq!(config.pdf_path(), PathBuf::from("data/Knowledge.pdf"));
        assert!(!config.use_mock_providers());
        clear_env();
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        clear_env();
        std::env::set_var("GOOGLE_API_KEY", "test-key");
        std::env::set_var("CHUNK_SIZE", "800");
        std::env::set_var("PORT", "9001");
        let config = AppConfig::build().unwrap();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.port, 9001);
        clear_env();
    }

    #[test]
    #[serial]
    fn overlap_must_be_smaller_than_chunk_size() {
        clear_env();
        std::env::set_var("GOOGLE_API_KEY", "test-key");
        std::env::set_var("CHUNK_OVERLAP", "500");
        assert!(AppConfig::build().is_err());
        clear_env();
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let config = AppConfig {
            allowed_origins: "http://a.example, http://b.example ,".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.origins(), vec!["http://a.example", "http://b.example"]);
    }

    #[test]
    fn socket_addr_combines_host_and_port() {
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8123,
            ..AppConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8123");
    }
}
