//! Audio transcoding pipeline
//!
//! This module holds the orchestration core:
//! - Sample FIFO reconciling decoder and encoder frame sizes
//! - Decode, resample and encode stages
//! - The pipeline driver state machine
//! - Traits describing the media library the stages drive

pub mod decoder;
pub mod encoder;
pub mod fifo;
pub mod pipeline;
pub mod resampler;
pub mod traits;

pub use decoder::{DecodeStage, DecodeStep};
pub use encoder::EncodeStage;
pub use fifo::SampleFifo;
pub use pipeline::{PipelineContext, PipelineState, TranscodeStats, Transcoder};
pub use resampler::ResampleStage;
pub use traits::{Decoder, DecoderOutput, Encoder, MediaSink, MediaSource, Resampler};
