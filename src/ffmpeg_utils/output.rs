//! Muxer-backed packet sink

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;

use crate::error::{Result, TranscodeError};
use crate::media::Packet;
use crate::transcode::MediaSink;

use super::helpers::{encoder_codec_parameters, stream_reset_codec_tag};
use super::input::packet_to_ffmpeg;

/// Output file whose container is guessed from the file name
pub struct FfmpegSink {
    output: ffmpeg::format::context::Output,
    path: PathBuf,
    stream_index: Option<usize>,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
}

impl FfmpegSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let output = ffmpeg::format::output(&path).map_err(|e| {
            TranscodeError::Open(format!("failed to open output {:?}: {}", path, e))
        })?;
        tracing::debug!(
            path = %path.display(),
            format = output.format().name(),
            "opened output"
        );

        Ok(Self {
            output,
            path,
            stream_index: None,
            encoder_time_base: ffmpeg::Rational::new(1, 1),
            stream_time_base: ffmpeg::Rational::new(1, 1),
        })
    }

    /// Whether the container wants codec extradata in the stream header
    /// rather than in-band.
    pub fn needs_global_header(&self) -> bool {
        self.output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER)
    }

    /// Add the output audio stream, described by an opened encoder.
    pub fn add_stream(
        &mut self,
        codec: ffmpeg::Codec,
        encoder: &ffmpeg::codec::encoder::Audio,
        time_base: ffmpeg::Rational,
    ) -> Result<usize> {
        if self.stream_index.is_some() {
            return Err(TranscodeError::Open(
                "output already has an audio stream".into(),
            ));
        }
        let params = encoder_codec_parameters(encoder)?;

        let mut stream = self.output.add_stream(codec).map_err(|e| {
            TranscodeError::Open(format!("failed to add output stream: {}", e))
        })?;
        stream.set_time_base(time_base);
        stream.set_parameters(params);
        stream_reset_codec_tag(&mut stream);
        let index = stream.index();

        self.stream_index = Some(index);
        self.encoder_time_base = time_base;
        self.stream_time_base = time_base;
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MediaSink for FfmpegSink {
    fn write_header(&mut self) -> Result<()> {
        let index = self
            .stream_index
            .ok_or_else(|| TranscodeError::Write("no output stream configured".into()))?;
        self.output.write_header().map_err(|e| {
            TranscodeError::Write(format!("failed to write header to {:?}: {}", self.path, e))
        })?;

        // the muxer may pick its own time base
        if let Some(stream) = self.output.stream(index) {
            self.stream_time_base = stream.time_base();
        }
        tracing::debug!(
            stream_time_base = %self.stream_time_base,
            "output header written"
        );
        Ok(())
    }

    fn write_packet(&mut self, packet: Packet) -> Result<()> {
        let index = self
            .stream_index
            .ok_or_else(|| TranscodeError::Write("no output stream configured".into()))?;
        let mut out = packet_to_ffmpeg(&packet);
        out.set_stream(index);
        out.set_position(-1);
        out.rescale_ts(self.encoder_time_base, self.stream_time_base);
        out.write_interleaved(&mut self.output)
            .map_err(|e| TranscodeError::Write(format!("failed to write packet: {}", e)))
    }

    fn write_trailer(&mut self) -> Result<()> {
        self.output.write_trailer().map_err(|e| {
            TranscodeError::Write(format!("failed to write trailer to {:?}: {}", self.path, e))
        })
    }
}
