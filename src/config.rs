//! Transcoder configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::media::SampleFormat;

/// Channel counts with a default layout
pub const SUPPORTED_CHANNELS: &[u16] = &[1, 2, 6, 8];

/// Output encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// FFmpeg encoder name
    pub codec: String,

    /// Bit rate in bps
    pub bit_rate: u64,

    /// Output channel count
    pub channels: u16,

    /// Encoder input sample format (FFmpeg name, e.g. "fltp")
    pub sample_format: String,

    /// Frame size used when the encoder accepts any frame size
    pub fallback_frame_size: usize,

    /// Allow encoders FFmpeg marks as experimental
    pub allow_experimental: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            codec: "aac".to_string(),
            bit_rate: 96_000,
            channels: 2,
            sample_format: "fltp".to_string(),
            fallback_frame_size: 1024,
            allow_experimental: true,
        }
    }
}

impl EncoderConfig {
    pub fn sample_format(&self) -> Result<SampleFormat, ConfigError> {
        self.sample_format.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.codec.is_empty() {
            return Err(ConfigError::EncoderNotFound(String::new()));
        }
        if !SUPPORTED_CHANNELS.contains(&self.channels) {
            return Err(ConfigError::UnsupportedChannels(self.channels));
        }
        if self.fallback_frame_size == 0 {
            return Err(ConfigError::InvalidFrameSize);
        }
        self.sample_format()?;
        Ok(())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> String {
        format!(
            "audio_transcode={level},transcode={level}",
            level = self.level
        )
    }
}

/// Complete transcoder configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscodeConfig {
    pub encoder: EncoderConfig,

    pub logging: LoggingConfig,
}

impl TranscodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.encoder.validate()
    }
}
