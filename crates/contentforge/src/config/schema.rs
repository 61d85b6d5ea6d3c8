use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// SQLite file. Defaults to `~/.contentforge/data/contentforge.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    /// Root for extracted text and results. Defaults to `~/.contentforge/files`.
    #[serde(default)]
    pub data_directory: Option<String>,
    #[serde(default = "default_language")]
    pub default_output_language: String,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_language() -> String {
    "en".to_string()
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        match &self.database_path {
            Some(path) => expand_home(path),
            None => crate::db::default_database_path()
                .unwrap_or_else(|| PathBuf::from("contentforge.db")),
        }
    }

    pub fn data_directory(&self) -> PathBuf {
        match &self.data_directory {
            Some(path) => expand_home(path),
            None => dirs::home_dir()
                .map(|h| h.join(".contentforge").join("files"))
                .unwrap_or_else(|| PathBuf::from("files")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            data_directory: None,
            default_output_language: default_language(),
            ai: AiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
