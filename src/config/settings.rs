//! Configuration settings for Wayfare.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub api: ApiSettings,
    pub generation: GenerationSettings,
    pub synthesis: SynthesisSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory where tour audio (and optional text) is written.
    pub output_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Inference API endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// OpenAI-compatible base URL shared by chat completions and speech.
    pub base_url: String,
    /// API key. Falls back to the environment variable named by `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.netmind.ai/inference-api/openai/v1".to_string(),
            api_key: None,
            api_key_env: "NETMIND_API_KEY".to_string(),
        }
    }
}

/// Text generation settings for the tour pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Chat model used for planning, sections and composition.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Attempts per stage (planner, each section, composer).
    pub max_attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Sections generated concurrently. 1 runs them one after another.
    pub max_concurrent_sections: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "openai/gpt-oss-20b".to_string(),
            temperature: 0.7,
            max_attempts: 3,
            retry_delay_ms: 2000,
            max_concurrent_sections: 4,
        }
    }
}

impl GenerationSettings {
    /// Retry policy shared by every pipeline stage.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// TTS model id sent with every submit request.
    pub model: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Timeout for the submit request in seconds.
    pub read_timeout_secs: u64,
    /// Timeout for the audio download in seconds.
    pub download_timeout_secs: u64,
    /// Application-level attempts (submit + download).
    pub max_attempts: u32,
    /// First backoff delay in milliseconds; doubles per failed attempt.
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
    /// Extra sends of the submit request on retryable HTTP statuses, within one attempt.
    pub transport_retries: u32,
    /// First transport-level backoff in milliseconds; doubles per resend.
    pub transport_backoff_ms: u64,
    /// Emit a download progress event at most once per this many bytes.
    pub progress_chunk_bytes: usize,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            model: "ResembleAI/Chatterbox".to_string(),
            connect_timeout_secs: 30,
            read_timeout_secs: 300,
            download_timeout_secs: 600,
            max_attempts: 5,
            base_delay_ms: 2000,
            max_delay_ms: 300_000,
            transport_retries: 2,
            transport_backoff_ms: 1000,
            progress_chunk_bytes: 8 * 1024,
        }
    }
}

impl SynthesisSettings {
    /// Application-level retry policy for one `synthesize` call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory containing a `tour.toml` that overrides the default prompts.
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// Optional settings that `set` may create when they are not yet present.
const OPTIONAL_KEYS: &[&str] = &["api.api_key", "prompts.custom_dir"];

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TourError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wayfare")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Resolve the API key from the config file or the environment.
    pub fn api_key(&self) -> Option<String> {
        self.api
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }

    /// Like [`api_key`](Self::api_key), but missing keys are a configuration error.
    pub fn require_api_key(&self) -> crate::error::Result<String> {
        self.api_key().ok_or_else(|| {
            crate::error::TourError::Config(format!(
                "No API key configured. Set api.api_key in {} or export {}",
                Self::default_config_path().display(),
                self.api.api_key_env
            ))
        })
    }

    /// Set a value by dotted key (e.g. `generation.model`).
    ///
    /// String fields take the value verbatim; other fields parse it as a TOML
    /// value so numbers and booleans keep their type.
    pub fn set(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        let mut root = toml::Value::try_from(&*self)
            .map_err(|e| crate::error::TourError::Config(e.to_string()))?;

        let parsed = toml::from_str::<toml::Table>(&format!("v = {}", value))
            .ok()
            .and_then(|mut t| t.remove("v"))
            .unwrap_or_else(|| toml::Value::String(value.to_string()));

        let (path, leaf) = match key.rsplit_once('.') {
            Some((path, leaf)) => (Some(path), leaf),
            None => (None, key),
        };

        let mut table = root
            .as_table_mut()
            .ok_or_else(|| crate::error::TourError::Config("Invalid settings root".to_string()))?;
        if let Some(path) = path {
            for part in path.split('.') {
                table = table
                    .get_mut(part)
                    .and_then(|v| v.as_table_mut())
                    .ok_or_else(|| {
                        crate::error::TourError::Config(format!("Unknown configuration key: {}", key))
                    })?;
            }
        }

        match table.get(leaf).map(|existing| existing.is_str()) {
            Some(true) => {
                table.insert(leaf.to_string(), toml::Value::String(value.to_string()));
            }
            Some(false) => {
                table.insert(leaf.to_string(), parsed);
            }
            None if OPTIONAL_KEYS.contains(&key) => {
                // Unset optional fields are absent from the serialized form.
                table.insert(leaf.to_string(), toml::Value::String(value.to_string()));
            }
            None => {
                return Err(crate::error::TourError::Config(format!(
                    "Unknown configuration key: {}",
                    key
                )));
            }
        }

        *self = root
            .try_into()
            .map_err(|e: toml::de::Error| crate::error::TourError::Config(e.to_string()))?;
        Ok(())
    }
}
