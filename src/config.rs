use crate::defaults;
use crate::error::{CloneCtlError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub audio: AudioConfig,
}

/// Inference service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

/// Audio playback configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub safety_margin_ms: u32,
    pub fade_ms: u32,
    pub crossfade_overlap_ms: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_BASE_URL.to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            safety_margin_ms: defaults::SAFETY_MARGIN_MS,
            fade_ms: defaults::FADE_MS,
            crossfade_overlap_ms: defaults::CROSSFADE_OVERLAP_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Only falls back to defaults when the file is missing.
    /// Invalid TOML is still reported as an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(CloneCtlError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Write configuration to a TOML file, creating parent directories as needed.
    ///
    /// This is how the API base URL preference survives across sessions.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| CloneCtlError::ConfigParse {
            message: format!("failed to serialize configuration: {e}"),
        })?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CLONECTL_API_URL → api.base_url
    /// - CLONECTL_AUDIO_DEVICE → audio.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("CLONECTL_API_URL")
            && !url.is_empty()
        {
            self.api.base_url = url;
        }

        if let Ok(device) = std::env::var("CLONECTL_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        self
    }

    /// Look up a config value by dotted key, as used by `clonectl config get`.
    pub fn get_value(&self, key: &str) -> Option<String> {
        match key {
            "api.base_url" => Some(self.api.base_url.clone()),
            "audio.device" => self.audio.device.clone(),
            "audio.safety_margin_ms" => Some(self.audio.safety_margin_ms.to_string()),
            "audio.fade_ms" => Some(self.audio.fade_ms.to_string()),
            "audio.crossfade_overlap_ms" => Some(self.audio.crossfade_overlap_ms.to_string()),
            _ => None,
        }
    }

    /// Set a config value by dotted key, as used by `clonectl config set`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.base_url" => {
                if value.is_empty() {
                    return Err(CloneCtlError::ConfigInvalidValue {
                        key: key.to_string(),
                        message: "must not be empty".to_string(),
                    });
                }
                self.api.base_url = value.trim_end_matches('/').to_string();
            }
            "audio.device" => {
                self.audio.device = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "audio.safety_margin_ms" => {
                self.audio.safety_margin_ms = parse_ms(key, value)?;
            }
            "audio.fade_ms" => {
                self.audio.fade_ms = parse_ms(key, value)?;
            }
            "audio.crossfade_overlap_ms" => {
                self.audio.crossfade_overlap_ms = parse_ms(key, value)?;
            }
            _ => {
                return Err(CloneCtlError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: "unknown configuration key".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/clonectl/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("clonectl")
            .join("config.toml")
    }
}

fn parse_ms(key: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| CloneCtlError::ConfigInvalidValue {
            key: key.to_string(),
            message: format!("'{value}' is not a valid millisecond count"),
        })
}
