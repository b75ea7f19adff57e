use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::ollama::DEFAULT_OLLAMA_URL;
use crate::ai::{Backend, ClaudeClient, GeminiClient, Generator, OllamaClient, OpenAIClient};
use crate::provider::Provider;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_url: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::default().as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("horizon").join("config.json"))
    }

    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::parse)
            .unwrap_or_default()
    }

    /// Model to start with: the saved one, else the provider's default.
    pub fn model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| self.provider().default_model().to_string())
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    /// API key for a provider. Environment variables win over the file.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let from_env = provider
            .key_env_var()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty());
        from_env.or_else(|| self.stored_key(provider).map(str::to_string))
    }

    /// Where the key for a provider comes from, for display.
    pub fn key_source(&self, provider: Provider) -> Option<&'static str> {
        let var = provider.key_env_var()?;
        if std::env::var(var).is_ok_and(|key| !key.trim().is_empty()) {
            Some("env")
        } else if self.stored_key(provider).is_some() {
            Some("config")
        } else {
            None
        }
    }

    fn stored_key(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::Gemini => self.gemini_api_key.as_deref(),
            Provider::Claude => self.claude_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Ollama => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }

    pub fn backend(&self, provider: Provider) -> Backend {
        let key = self.api_key(provider);
        match provider {
            Provider::Gemini => Backend::Gemini(key.as_deref().map(GeminiClient::new)),
            Provider::Ollama => Backend::Ollama(OllamaClient::new(self.ollama_url())),
            Provider::Claude => Backend::Claude(key.as_deref().map(ClaudeClient::new)),
            Provider::OpenAI => Backend::OpenAI(key.as_deref().map(OpenAIClient::new)),
        }
    }

    /// Build the generator for the configured provider and model.
    pub fn generator(&self) -> Generator {
        Generator::new(self.backend(self.provider()), self.model())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.provider(), Provider::Gemini);
        assert_eq!(config.model(), "gemini-2.5-flash");
        assert_eq!(config.ollama_url(), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            provider: Some("ollama".to_string()),
            default_model: Some("gemma3:latest".to_string()),
            ollama_url: Some("http://10.0.0.2:11434".to_string()),
            ..Config::new()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.provider(), Provider::Ollama);
        assert_eq!(loaded.model(), "gemma3:latest");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "provider": "claude" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider(), Provider::Claude);
        assert_eq!(config.model(), "claude-sonnet-4-20250514");
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_unknown_provider_falls_back() {
        let config = Config {
            provider: Some("bard".to_string()),
            ..Config::default()
        };
        assert_eq!(config.provider(), Provider::Gemini);
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = Config::default();
        assert_eq!(config.key_source(Provider::Ollama), None);
        assert!(matches!(config.backend(Provider::Ollama), Backend::Ollama(_)));
    }
}
