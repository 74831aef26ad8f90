use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Model preselected when it is installed
pub const DEFAULT_MODEL: &str = "mistral:latest";

/// Longest title the model is asked for
pub const MAX_TITLE_LENGTH: usize = 30;

/// Recognized image extensions, compared case-insensitively
pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".bmp", ".webp", ".tiff"];

/// Name fragments that mark a model as able to read images
pub const VISION_MODEL_FRAGMENTS: &[&str] = &[
    "llava",
    "bakllava",
    "vision",
    "moondream",
    "minicpm-v",
    "qwen2-vl",
    "qwen2.5vl",
    "gemma3",
    "llama4",
    "granite3.2-vision",
    "mistral-small3.1",
];

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for the rename pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Ollama server
    pub ollama_host: String,

    /// Model to preselect when it is installed
    pub default_model: String,

    /// Maximum length of a generated title
    pub max_title_length: usize,

    /// Extensions treated as images (with leading dot)
    pub image_extensions: Vec<String>,

    /// Substrings identifying vision-capable models
    pub vision_model_fragments: Vec<String>,

    /// How many `_N` suffixes to try before giving up on a rename
    pub max_collision_attempts: u32,

    /// Per-request timeout for the model endpoint (None = wait forever)
    pub request_timeout_secs: Option<u64>,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            max_title_length: MAX_TITLE_LENGTH,
            image_extensions: IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            vision_model_fragments: VISION_MODEL_FRAGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_collision_attempts: 10_000,
            request_timeout_secs: None,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply `OLLAMA_HOST` from the environment if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            let host = host.trim();
            if !host.is_empty() {
                self.ollama_host = normalize_host(host);
            }
        }
        self
    }

    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_title_length == 0 || self.max_title_length > 255 {
            return Err(Error::Configuration(
                "Maximum title length must be between 1 and 255".to_string(),
            ));
        }

        if self.ollama_host.trim().is_empty() {
            return Err(Error::Configuration(
                "Ollama host must not be empty".to_string(),
            ));
        }

        if self.image_extensions.is_empty() {
            return Err(Error::Configuration(
                "At least one image extension is required".to_string(),
            ));
        }

        if let Some(ext) = self.image_extensions.iter().find(|e| !e.starts_with('.')) {
            return Err(Error::Configuration(format!(
                "Image extension '{}' must start with a dot",
                ext
            )));
        }

        if self.max_collision_attempts == 0 {
            return Err(Error::Configuration(
                "Collision attempts must be at least 1".to_string(),
            ));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(Error::Configuration(
                "Request timeout must be positive when set".to_string(),
            ));
        }

        Ok(())
    }
}

// `OLLAMA_HOST` is often given as `host:port` without a scheme
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_title_length, 30);
        assert_eq!(config.default_model, "mistral:latest");
        assert_eq!(config.image_extensions.len(), 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.max_title_length = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = Config::default();
        config.image_extensions = vec!["png".to_string()];
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = Config::default();
        config.request_timeout_secs = Some(0);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("renamer.json");

        let mut config = Config::default();
        config.max_title_length = 42;
        config.request_timeout_secs = Some(90);
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.max_title_length, 42);
        assert_eq!(loaded.request_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "default_model": "llava:7b" }"#).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.default_model, "llava:7b");
        assert_eq!(loaded.ollama_host, DEFAULT_OLLAMA_HOST);
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("127.0.0.1:11434"), "http://127.0.0.1:11434");
        assert_eq!(normalize_host("https://ollama.lan/"), "https://ollama.lan");
    }
}
