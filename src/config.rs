use crate::constants::{
    API_KEY_ENV_VARS, APP_DIR_NAME, CHAT_MODEL, CHAT_SYSTEM_INSTRUCTION, COMPLEX_MODEL,
    DEEP_THINKING_BUDGET, FAST_MODEL, GEMINI_BASE_URL, GROUNDED_MODEL, IMAGE_MODEL,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration persisted as TOML in the platform config directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Gemini API key. Environment variables take precedence.
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub complex_model: String,
    pub fast_model: String,
    pub grounded_model: String,
    pub image_model: String,
    /// Thinking budget used by the deep reasoning tier.
    pub thinking_budget: u32,
    pub system_instruction: String,
    /// Request timeout in seconds. Requests never time out when unset or zero.
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: GEMINI_BASE_URL.to_string(),
            chat_model: CHAT_MODEL.to_string(),
            complex_model: COMPLEX_MODEL.to_string(),
            fast_model: FAST_MODEL.to_string(),
            grounded_model: GROUNDED_MODEL.to_string(),
            image_model: IMAGE_MODEL.to_string(),
            thinking_budget: DEEP_THINKING_BUDGET,
            system_instruction: CHAT_SYSTEM_INSTRUCTION.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl AppConfig {
    pub fn config_dir() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR_NAME);
        path
    }

    pub fn config_file() -> PathBuf {
        let mut path = Self::config_dir();
        path.push("config.toml");
        path
    }

    /// Directory holding the durable key-value store.
    pub fn data_dir() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR_NAME);
        path
    }

    /// Loads the user configuration, writing defaults on first run.
    pub fn load() -> Self {
        let path = Self::config_file();
        if !path.exists() {
            let default = Self::default();
            if let Err(e) = default.save() {
                tracing::warn!("Failed to write default config: {:#}", e);
            }
            return default;
        }
        Self::load_from(&path)
    }

    /// Reads a config file, falling back to defaults when it is missing or malformed.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::debug!("No config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_file())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
        }
        let content = toml::to_string_pretty(self)?;
        crate::utils::write_file_atomic(path, content.as_bytes())
    }

    /// API key from the environment, else from the file. Blank values count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .chain(self.api_key.clone())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
