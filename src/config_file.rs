//! Configuration file support
//!
//! Loads transcoder configuration from TOML files. Every section and key is
//! optional; missing ones take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{EncoderConfig, LogFormat, LoggingConfig, TranscodeConfig};
use crate::error::ConfigError;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Encoder settings
    pub encoder: Option<EncoderSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// FFmpeg encoder name
    pub codec: Option<String>,
    /// Bit rate in bps
    pub bit_rate: Option<u64>,
    /// Output channel count
    pub channels: Option<u16>,
    /// Encoder input sample format
    pub sample_format: Option<String>,
    /// Frame size for encoders without a fixed one
    pub fallback_frame_size: Option<usize>,
    /// Allow experimental encoders
    pub allow_experimental: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
    /// Output format (json, pretty)
    pub format: Option<LogFormat>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::File(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::File(format!("{}: {}", path.display(), e)))
    }

    /// A file spelling out every default
    pub fn default_config() -> Self {
        let defaults = TranscodeConfig::default();
        Self {
            encoder: Some(EncoderSettings {
                codec: Some(defaults.encoder.codec),
                bit_rate: Some(defaults.encoder.bit_rate),
                channels: Some(defaults.encoder.channels),
                sample_format: Some(defaults.encoder.sample_format),
                fallback_frame_size: Some(defaults.encoder.fallback_frame_size),
                allow_experimental: Some(defaults.encoder.allow_experimental),
            }),
            logging: Some(LoggingSettings {
                level: Some(defaults.logging.level),
                format: Some(defaults.logging.format),
            }),
        }
    }

    /// Convert to TranscodeConfig
    pub fn into_transcode_config(self) -> TranscodeConfig {
        let enc = self.encoder.unwrap_or_default();
        let log = self.logging.unwrap_or_default();
        let defaults = TranscodeConfig::default();

        TranscodeConfig {
            encoder: EncoderConfig {
                codec: enc.codec.unwrap_or(defaults.encoder.codec),
                bit_rate: enc.bit_rate.unwrap_or(defaults.encoder.bit_rate),
                channels: enc.channels.unwrap_or(defaults.encoder.channels),
                sample_format: enc.sample_format.unwrap_or(defaults.encoder.sample_format),
                fallback_frame_size: enc
                    .fallback_frame_size
                    .unwrap_or(defaults.encoder.fallback_frame_size),
                allow_experimental: enc
                    .allow_experimental
                    .unwrap_or(defaults.encoder.allow_experimental),
            },
            logging: LoggingConfig {
                level: log.level.unwrap_or(defaults.logging.level),
                format: log.format.unwrap_or(defaults.logging.format),
            },
        }
    }
}
