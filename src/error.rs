use thiserror::Error;

/// Main error type for the transcoder
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// The input or the requested output cannot be transcoded as configured
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Opening the input, the output or a codec failed
    #[error("Open error: {0}")]
    Open(String),

    /// A buffer or codec structure could not be allocated
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// Reading a packet from the source failed for a reason other than end of stream
    #[error("Read error: {0}")]
    Read(String),

    /// The decoder rejected a packet or failed to produce a frame
    #[error("Decode error: {0}")]
    Decode(String),

    /// A decoded frame arrived at a sample rate the pipeline does not convert
    #[error("Unsupported sample rate: frame is {input} Hz, encoder expects {expected} Hz")]
    UnsupportedRate { input: u32, expected: u32 },

    /// The resampler failed; its state is not trusted afterwards
    #[error("Resample error: {0}")]
    Resample(String),

    /// The encoder rejected a frame or failed to produce a packet
    #[error("Encode error: {0}")]
    Encode(String),

    /// Writing the header, a packet or the trailer of the output failed
    #[error("Write error: {0}")]
    Write(String),

    /// Sample FIFO invariant violation
    #[error("FIFO error: {0}")]
    Fifo(#[from] FifoError),

    /// FFmpeg library initialization failed
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),
}

impl TranscodeError {
    /// Whether this error indicates a bug in the pipeline rather than bad
    /// input or a failing codec.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            TranscodeError::Fifo(
                FifoError::ShortWrite { .. }
                    | FifoError::InsufficientData { .. }
                    | FifoError::FormatMismatch
            )
        )
    }
}

/// Setup-time configuration errors. None of these are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("expected exactly one audio stream in the input, found {0} streams")]
    StreamCount(usize),

    #[error("the input stream is not an audio stream")]
    NotAudio,

    #[error("input sample rate {source_rate} Hz does not match encoder sample rate {encoder_rate} Hz")]
    SampleRateMismatch { source_rate: u32, encoder_rate: u32 },

    #[error("resampler output ({resampler}) does not match encoder input ({encoder})")]
    SpecMismatch { resampler: String, encoder: String },

    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u16),

    #[error("unknown sample format: {0}")]
    UnknownSampleFormat(String),

    #[error("encoder not found: {0}")]
    EncoderNotFound(String),

    #[error("encoder frame size must be non-zero")]
    InvalidFrameSize,

    #[error("invalid configuration file: {0}")]
    File(String),
}

/// Sample FIFO errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FifoError {
    #[error("failed to grow FIFO by {requested} samples")]
    Allocation { requested: usize },

    #[error("short write: {accepted} of {requested} samples accepted")]
    ShortWrite { requested: usize, accepted: usize },

    #[error("insufficient data: {requested} samples requested, {available} available")]
    InsufficientData { requested: usize, available: usize },

    #[error("frame sample format does not match FIFO sample format")]
    FormatMismatch,
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TranscodeError>;
