use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use anyhow::{Result, anyhow};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Environment variable overriding `api_base_url`.
pub const API_URL_ENV: &str = "PAPERCHAT_API_URL";
/// Environment variable overriding the token file location.
pub const TOKEN_FILE_ENV: &str = "PAPERCHAT_TOKEN_FILE";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub default_model: Option<String>,
    pub prompt_style: Option<String>,
    /// Program and arguments that write recorded audio to stdout.
    pub recorder_command: Option<Vec<String>>,
    pub download_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            default_model: None,
            prompt_style: None,
            recorder_command: None,
            download_dir: None,
            request_timeout_secs: None,
        }
    }

    /// Loads the config file (or defaults) and applies environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        let mut config = if config_path.exists() {
            let config_content = fs::read_to_string(&config_path)?;
            serde_json::from_str(&config_content)?
        } else {
            Self::new()
        };

        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load_file_only().unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save()
    }

    pub fn save_prompt_style(style: &str) -> Result<()> {
        let mut config = Self::load_file_only().unwrap_or_else(|_| Self::new());
        config.prompt_style = Some(style.to_string());
        config.save()
    }

    /// Where downloaded PDFs and exported summaries go.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Location of the persisted bearer token.
    pub fn token_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(TOKEN_FILE_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::config_dir()?.join("session.json"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("paperchat"))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
    }

    // Saving must not write env overrides back to disk.
    fn load_file_only() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::new());
        }
        let config_content = fs::read_to_string(&config_path)?;
        Ok(serde_json::from_str(&config_content)?)
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"default_model": "anthropic/claude-3-haiku"}"#).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.default_model.as_deref(), Some("anthropic/claude-3-haiku"));
        assert!(config.recorder_command.is_none());
    }

    #[test]
    fn test_download_dir_prefers_configured_path() {
        let mut config = Config::new();
        config.download_dir = Some(PathBuf::from("/tmp/papers"));
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/papers"));
    }
}
