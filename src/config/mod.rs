use crate::audio::tone::{DEFAULT_AMPLITUDE, DEFAULT_FREQUENCY_HZ, DEFAULT_STEP_HZ};
use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub playback: PlaybackConfig,
    pub tone: ToneConfig,
    pub raw: RawConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Device buffer length to ask for, in milliseconds
    pub requested_buffer_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub start_frequency_hz: f64,
    /// Change applied per Up/Down key press
    pub step_hz: f64,
    pub amplitude: f64,
}

/// Layout of headerless raw files, which carry no metadata of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub channels: u16,
    pub sample_rate: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            requested_buffer_ms: 100,
        }
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            start_frequency_hz: DEFAULT_FREQUENCY_HZ,
            step_hz: DEFAULT_STEP_HZ,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 48000,
        }
    }
}

impl PlaybackConfig {
    pub fn requested_buffer(&self) -> Duration {
        Duration::from_millis(self.requested_buffer_ms.max(1))
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        let config = Self::load_from(&config_path)?;
        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(path, self.to_toml()?).context("Failed to write config file")?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
