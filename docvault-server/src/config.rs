//! Service settings: YAML file, then `DOCVAULT_*` environment overrides,
//! then command-line flags (applied by the binary).

use std::path::{Path, PathBuf};

use docvault_rag::RagConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default settings file, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "DOCVAULT_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("environment variable {key} has invalid value '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Top-level settings of the `docvault` service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub server: HttpSettings,
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    /// Cross-encoder endpoint; rerank requests fail validation without it.
    pub rerank: Option<RerankSettings>,
    pub rag: RagConfig,
    /// `tokenizer.json` used by `/count-tokens`; the route reports an error
    /// without it.
    pub tokenizer: Option<TokenizerSettings>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub host: String,
    pub port: u16,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store, optionally snapshotted to `store.path`.
    #[default]
    Memory,
    /// Remote Qdrant over gRPC.
    Qdrant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Snapshot file of the memory backend. `None` keeps data in memory only.
    pub path: Option<PathBuf>,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: Some(PathBuf::from("data/docvault.json")),
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Root of an OpenAI-compatible API; `/embeddings` is appended.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Size of the vectors the model returns.
    pub dimensions: usize,
    /// Ask the server to truncate to `dimensions` (Matryoshka models only).
    pub truncate: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            model: "BAAI/bge-m3".to_string(),
            api_key: None,
            dimensions: 1024,
            truncate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankSettings {
    /// Root of a TEI-compatible API; `/rerank` is appended.
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory of the JSON log files. `None` disables file logging.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
    pub rotation: LogRotation,
    /// Number of rotated files to keep; 0 keeps all.
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: Some(PathBuf::from("logs")),
            file_prefix: "docvault.log".to_string(),
            rotation: LogRotation::Daily,
            max_log_files: 14,
        }
    }
}

impl ServerSettings {
    /// Load settings from `path`, or from [`DEFAULT_CONFIG_PATH`] when `None`,
    /// then apply environment overrides and validate.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        let settings = settings.with_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a YAML settings file without applying overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_yaml(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Apply `DOCVAULT_*` overrides read through `lookup`.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                key: format!("{ENV_PREFIX}PORT"),
                value: port,
            })?;
        }
        if let Some(backend) = var("STORE_BACKEND") {
            self.store.backend = match backend.to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "qdrant" => StoreBackend::Qdrant,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: format!("{ENV_PREFIX}STORE_BACKEND"),
                        value: backend,
                    });
                }
            };
        }
        if let Some(path) = var("STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(url) = var("QDRANT_URL") {
            self.store.qdrant_url = url;
        }
        if let Some(url) = var("EMBEDDING_URL") {
            self.embedding.base_url = url;
        }
        if let Some(model) = var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(key) = var("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(url) = var("RERANK_URL") {
            match &mut self.rerank {
                Some(rerank) => rerank.base_url = url,
                None => self.rerank = Some(RerankSettings { base_url: url, api_key: None }),
            }
        }
        if let Some(path) = var("TOKENIZER_PATH") {
            self.tokenizer = Some(TokenizerSettings { path: PathBuf::from(path) });
        }
        if let Some(dir) = var("LOG_DIR") {
            self.logging.directory = Some(PathBuf::from(dir));
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(self)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rag.clone().validated().map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::Invalid(
                "embedding.dimensions must be greater than zero".into(),
            ));
        }
        if self.embedding.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("embedding.base_url must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_the_rest() {
        let settings = ServerSettings::from_yaml(
            "server:\n  port: 9000\nrag:\n  chunk_size: 800\n\
             rerank:\n  base_url: http://rerank:8081\n",
        )
        .unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.rag.chunk_size, 800);
        assert_eq!(settings.rag.chunk_overlap, 100);
        assert_eq!(settings.rerank.unwrap().base_url, "http://rerank:8081");
        assert!(settings.tokenizer.is_none());
    }

    #[test]
    fn example_file_parses_and_validates() {
        let settings = ServerSettings::from_yaml(include_str!("../config.example.yaml")).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.rag, RagConfig::default());
        assert!(settings.tokenizer.is_some());
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(ServerSettings::from_yaml("").unwrap(), ServerSettings::default());
    }

    #[test]
    fn env_overrides_file_values() {
        let settings = ServerSettings::default()
            .with_env(env(&[
                ("DOCVAULT_PORT", "9100"),
                ("DOCVAULT_STORE_BACKEND", "Qdrant"),
                ("DOCVAULT_RERANK_URL", "http://localhost:8081"),
                ("DOCVAULT_TOKENIZER_PATH", "/models/bge-m3/tokenizer.json"),
                ("DOCVAULT_LOG_LEVEL", "debug"),
            ]))
            .unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.store.backend, StoreBackend::Qdrant);
        assert_eq!(settings.rerank.unwrap().base_url, "http://localhost:8081");
        assert_eq!(
            settings.tokenizer.unwrap().path,
            PathBuf::from("/models/bge-m3/tokenizer.json")
        );
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn bad_env_values_are_reported() {
        let err =
            ServerSettings::default().with_env(env(&[("DOCVAULT_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("DOCVAULT_PORT"));
        assert!(
            ServerSettings::default()
                .with_env(env(&[("DOCVAULT_STORE_BACKEND", "redis")]))
                .is_err()
        );
    }

    #[test]
    fn inconsistent_rag_section_fails_validation() {
        let settings =
            ServerSettings::from_yaml("rag:\n  chunk_size: 50\n  chunk_overlap: 60\n").unwrap();
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(ServerSettings::load(Some(&missing)), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn file_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let yaml = "store:\n  backend: memory\n  path: null\nlogging:\n  rotation: hourly\n";
        std::fs::write(&path, yaml).unwrap();
        let settings = ServerSettings::from_file(&path).unwrap();
        assert_eq!(settings.store.path, None);
        assert_eq!(settings.logging.rotation, LogRotation::Hourly);
    }
}
