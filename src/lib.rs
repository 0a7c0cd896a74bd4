//! Audio transcoder
//!
//! Decodes the single audio stream of an input file, converts its samples to
//! the encoder's format and channel layout, re-frames them through a sample
//! FIFO to the encoder's frame size and writes the encoded stream to an
//! output container.
//!
//! The pipeline core in [`transcode`] drives its collaborators through
//! traits; [`ffmpeg_utils`] implements them on top of FFmpeg.

pub mod config;
pub mod config_file;
pub mod error;
pub mod media;
pub mod transcode;

#[cfg(feature = "ffmpeg")]
pub mod api;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_utils;

#[cfg(test)]
pub(crate) mod tests;

#[cfg(feature = "ffmpeg")]
pub use api::{transcode_file, transcode_memory};
pub use config::TranscodeConfig;
pub use error::{ConfigError, FifoError, Result, TranscodeError};
pub use transcode::{PipelineState, TranscodeStats, Transcoder};
