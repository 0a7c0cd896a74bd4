//! FFmpeg backend
//!
//! Concrete pipeline collaborators backed by `ffmpeg-next`:
//! - `FfmpegSource`: demuxer reading the single audio stream from a file or
//!   from memory
//! - `FfmpegDecoder`, `FfmpegResampler`, `FfmpegEncoder`: codec contexts
//! - `FfmpegSink`: muxer writing the encoded stream
//!
//! plus library initialization and log filtering.

pub mod decoder;
pub mod encoder;
pub mod helpers;
pub mod input;
pub mod io;
pub mod output;
pub mod resampler;

pub use decoder::FfmpegDecoder;
pub use encoder::FfmpegEncoder;
pub use ffmpeg_next as ffmpeg;
pub use input::FfmpegSource;
pub use output::FfmpegSink;
pub use resampler::FfmpegResampler;

use crate::error::TranscodeError;

/// Initialize the FFmpeg library.
///
/// Call once at startup before opening any input or output.
pub fn init() -> Result<(), TranscodeError> {
    ffmpeg::init()
        .map_err(|e| TranscodeError::Ffmpeg(format!("ffmpeg::init() failed: {}", e)))?;

    tracing::debug!("FFmpeg initialized");

    Ok(())
}

/// Route FFmpeg's own log output through `tracing`, limited to warnings and
/// with known-benign messages dropped.
///
/// Must be called after `init()` and before any other thread uses FFmpeg;
/// the log callback is global state.
pub fn install_log_filter() {
    // SAFETY: both calls modify global FFmpeg state and run once at startup,
    // before any codec work begins.
    unsafe {
        ffmpeg::ffi::av_log_set_level(ffmpeg::ffi::AV_LOG_WARNING as i32);
        ffmpeg::ffi::av_log_set_callback(Some(ffmpeg_log_callback));
    }
}

/// Messages that are expected while transcoding plain audio files.
const SUPPRESSED_MESSAGES: &[&str] = &[
    "Estimating duration from bitrate",
    "Could not update timestamps for skipped samples",
    "Could not update timestamps for discarded samples",
    "Guessed Channel Layout",
];

unsafe extern "C" fn ffmpeg_log_callback(
    avcl: *mut std::ffi::c_void,
    level: std::ffi::c_int,
    fmt: *const std::ffi::c_char,
    vl: ffmpeg::ffi::va_list,
) {
    use std::ffi::CStr;

    if level > unsafe { ffmpeg::ffi::av_log_get_level() } {
        return;
    }

    let mut buf = [0 as std::ffi::c_char; 1024];
    let mut print_prefix: std::ffi::c_int = 1;
    ffmpeg::ffi::av_log_format_line(
        avcl,
        level,
        fmt,
        vl,
        buf.as_mut_ptr(),
        buf.len() as std::ffi::c_int,
        &mut print_prefix,
    );

    let msg = CStr::from_ptr(buf.as_ptr()).to_string_lossy();
    let msg = msg.trim_end();
    if msg.is_empty() || SUPPRESSED_MESSAGES.iter().any(|s| msg.contains(s)) {
        return;
    }

    if level <= ffmpeg::ffi::AV_LOG_ERROR as std::ffi::c_int {
        tracing::error!(target: "ffmpeg", "{}", msg);
    } else {
        tracing::warn!(target: "ffmpeg", "{}", msg);
    }
}

/// Version string of the linked FFmpeg libraries.
pub fn version_info() -> String {
    let version = ffmpeg::util::version();
    format!(
        "libavutil {}.{}.{}",
        version >> 16,
        (version >> 8) & 0xff,
        version & 0xff
    )
}

/// Whether this FFmpeg build can encode with `name`.
pub fn encoder_available(name: &str) -> bool {
    ffmpeg::codec::encoder::find_by_name(name).is_some()
}
