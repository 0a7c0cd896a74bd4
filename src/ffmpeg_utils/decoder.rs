//! FFmpeg audio decoder

use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::channel_layout::ChannelLayout;

use crate::error::{Result, TranscodeError};
use crate::media::{Packet, SampleFormat};
use crate::transcode::{Decoder, DecoderOutput, MediaSource};

use super::helpers::{frame_from_ffmpeg, from_sample, input_layout};
use super::input::{packet_to_ffmpeg, FfmpegSource};

/// Decoder for the source's audio stream
pub struct FfmpegDecoder {
    decoder: ffmpeg::decoder::Audio,
    stream_index: usize,
}

impl FfmpegDecoder {
    /// Open a decoder from the stream's own codec parameters.
    pub fn open(source: &FfmpegSource) -> Result<Self> {
        let stream_index = source.stream_info().stream_index;

        let context = ffmpeg::codec::Context::from_parameters(source.parameters()?).map_err(|e| {
            TranscodeError::Open(format!(
                "failed to create codec context for stream {}: {}",
                stream_index, e
            ))
        })?;
        let decoder = context.decoder().audio().map_err(|e| {
            TranscodeError::Open(format!(
                "failed to open audio decoder for stream {}: {}",
                stream_index, e
            ))
        })?;

        Ok(Self {
            decoder,
            stream_index,
        })
    }

    /// Sample format of decoded frames, if the decoder announced one.
    pub fn sample_format(&self) -> Option<SampleFormat> {
        from_sample(self.decoder.format())
    }

    /// Layout of decoded frames with `channels` channels.
    pub fn channel_layout(&self, channels: u16) -> ChannelLayout {
        input_layout(self.decoder.channel_layout(), channels)
    }
}

impl Decoder for FfmpegDecoder {
    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        self.decoder
            .send_packet(&packet_to_ffmpeg(packet))
            .map_err(|e| {
                TranscodeError::Decode(format!(
                    "send_packet error on stream {}: {}",
                    self.stream_index, e
                ))
            })
    }

    fn send_eof(&mut self) -> Result<()> {
        match self.decoder.send_eof() {
            Ok(()) => Ok(()),
            // already drained
            Err(ffmpeg::Error::Eof) => Ok(()),
            Err(e) => Err(TranscodeError::Decode(format!(
                "send_eof error on stream {}: {}",
                self.stream_index, e
            ))),
        }
    }

    fn receive_frame(&mut self) -> Result<DecoderOutput> {
        let mut frame = ffmpeg::util::frame::Audio::empty();
        match self.decoder.receive_frame(&mut frame) {
            Ok(()) => {
                if frame.channel_layout().bits() == 0 {
                    tracing::warn!(
                        channels = frame.channels(),
                        "decoded frame has no channel layout"
                    );
                }
                Ok(DecoderOutput::Frame(frame_from_ffmpeg(&frame)?))
            }
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {
                Ok(DecoderOutput::NeedMoreInput)
            }
            Err(ffmpeg::Error::Eof) => Ok(DecoderOutput::EndOfStream),
            Err(e) => Err(TranscodeError::Decode(format!(
                "receive_frame error on stream {}: {}",
                self.stream_index, e
            ))),
        }
    }
}
