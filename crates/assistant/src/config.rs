use anyhow::{Context, Result};
use chat::{DEFAULT_BASE_URL, DEFAULT_MODEL, RetryConfig};
use ingest::IngestConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    /// Used when the chat template does not name a model.
    pub model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    /// Read a JSON config file. Missing sections and fields keep their
    /// defaults; no file at all means all defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let json = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read config file: {:?}", path))?;
        let config: Self = serde_json::from_str(&json)
            .context(format!("Failed to parse config file: {:?}", path))?;

        config.ingest.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::UnreadablePolicy;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_no_file_means_defaults() {
        let config = AppConfig::load(None).await.unwrap();

        assert_eq!(config.ingest.chunk_size, 500);
        assert_eq!(config.ingest.chunk_overlap, 50);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.retry.max_retries, 3);
    }

    #[tokio::test]
    async fn test_partial_file_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("assistant.json");
        std::fs::write(
            &path,
            r#"{
                "ingest": {"data_directory": "corpus", "chunk_size": 800, "on_unreadable": "skip"},
                "llm": {"model": "mistral"}
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).await.unwrap();

        assert_eq!(config.ingest.data_directory, Path::new("corpus"));
        assert_eq!(config.ingest.chunk_size, 800);
        assert_eq!(config.ingest.chunk_overlap, 50);
        assert_eq!(config.ingest.on_unreadable, UnreadablePolicy::Skip);
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_bad_chunk_config_fails_at_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("assistant.json");
        std::fs::write(&path, r#"{"ingest": {"chunk_size": 40, "chunk_overlap": 40}}"#).unwrap();

        let err = AppConfig::load(Some(&path)).await.unwrap_err();
        assert!(err.to_string().contains("Invalid chunk config"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(AppConfig::load(Some(&temp_dir.path().join("nope.json"))).await.is_err());
    }
}
