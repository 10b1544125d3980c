//! On-disk configuration.
//!
//! TOML file at `<config_dir>/flexctl/config.toml`. Every table and key
//! is optional; anything missing takes its default, so a minimal file
//! with just `[radio]` and a host works. A missing or unreadable file
//! falls back to full defaults with a logged warning rather than
//! aborting.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use flexctl_client::{DEFAULT_AUDIO_RATE, DEFAULT_PAN_WIDTH, DEFAULT_TCP_PORT, DEFAULT_UDP_PORT};
use flexctl_core::Mode;

use crate::memory::MemoryChannel;

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub radio: RadioConfig,
    pub display: DisplayConfig,
    pub audio: AudioConfig,
    pub memory: MemoryConfig,
}

/// Where the radio lives on the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub host: String,
    pub tcp_port: u16,
    pub udp_port: u16,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            tcp_port: DEFAULT_TCP_PORT,
            udp_port: DEFAULT_UDP_PORT,
        }
    }
}

/// Panadapter display parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub panadapter_width: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            panadapter_width: DEFAULT_PAN_WIDTH,
        }
    }
}

/// Audio stream parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_AUDIO_RATE,
        }
    }
}

/// Stored memory channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_channels: usize,
    pub channels: Vec<MemoryChannel>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_channels: 10,
            channels: vec![
                MemoryChannel {
                    name: "40m SSB".to_string(),
                    frequency: 7_150_000,
                    mode: Mode::Usb,
                    rf_gain: 50,
                    af_gain: 50,
                },
                MemoryChannel {
                    name: "20m Calling".to_string(),
                    frequency: 14_250_000,
                    mode: Mode::Lsb,
                    rf_gain: 50,
                    af_gain: 50,
                },
            ],
        }
    }
}

/// The default config file location, if a config directory exists on
/// this platform.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("flexctl").join("config.toml"))
}

impl Config {
    /// Load from the default location.
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path, falling back to defaults on any
    /// error. A missing file is normal on first run and is not logged.
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read config, using defaults");
                return Self::default();
            }
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config unparsable, using defaults");
                Self::default()
            }
        }
    }

    /// Write to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_radio_conventions() {
        let config = Config::default();
        assert_eq!(config.radio.host, "192.168.1.100");
        assert_eq!(config.radio.tcp_port, 4992);
        assert_eq!(config.radio.udp_port, 4991);
        assert_eq!(config.display.panadapter_width, 1024);
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.memory.max_channels, 10);
        assert_eq!(config.memory.channels.len(), 2);
    }

    #[test]
    fn partial_file_merges_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [radio]
            host = "10.0.0.7"
            "#,
        )
        .unwrap();
        assert_eq!(config.radio.host, "10.0.0.7");
        // Everything not named keeps its default.
        assert_eq!(config.radio.tcp_port, 4992);
        assert_eq!(config.display.panadapter_width, 1024);
        assert_eq!(config.memory.channels.len(), 2);
    }

    #[test]
    fn toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn memory_channel_modes_serialize_lowercase() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("mode = \"usb\""), "got: {text}");
        assert!(text.contains("mode = \"lsb\""), "got: {text}");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/flexctl/config.toml"));
        assert_eq!(config, Config::default());
    }
}
