//! FFmpeg audio encoder
//!
//! `encode` hands back at most one packet per call. Anything else the codec
//! produced stays queued and comes out on later calls, so a flush call that
//! returns `None` means the codec is really empty.

use std::collections::VecDeque;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec;
use ffmpeg_next::util::channel_layout::ChannelLayout;

use crate::config::EncoderConfig;
use crate::error::{ConfigError, Result, TranscodeError};
use crate::media::{AudioFrame, Packet, SampleFormat, SampleSpec};
use crate::transcode::Encoder;

use super::helpers::{frame_to_ffmpeg, layout_for_channels, to_sample};
use super::input::packet_from_ffmpeg;
use super::output::FfmpegSink;

/// Encoder feeding the sink's single audio stream
pub struct FfmpegEncoder {
    encoder: ffmpeg::encoder::Audio,
    spec: SampleSpec,
    layout: ChannelLayout,
    frame_size: usize,
    stream_index: usize,
    pending: VecDeque<Packet>,
    eof_sent: bool,
}

impl FfmpegEncoder {
    /// Open the configured encoder at `rate` and add its stream to `sink`.
    pub fn open(sink: &mut FfmpegSink, config: &EncoderConfig, rate: u32) -> Result<Self> {
        let codec = codec::encoder::find_by_name(&config.codec)
            .ok_or_else(|| ConfigError::EncoderNotFound(config.codec.clone()))?;
        let format: SampleFormat = config.sample_format.parse()?;
        let layout = layout_for_channels(config.channels)?;
        let spec = SampleSpec::new(format, config.channels, rate);
        let time_base = ffmpeg::Rational::new(1, rate as i32);

        // Configure the context BEFORE opening
        let mut context = codec::Context::new_with_codec(codec);
        context.set_time_base(time_base);
        if config.allow_experimental {
            context.compliance(codec::Compliance::Experimental);
        }
        if sink.needs_global_header() {
            context.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut audio_enc = context.encoder().audio().map_err(|e| {
            TranscodeError::Open(format!("cannot get audio encoder handle: {}", e))
        })?;
        audio_enc.set_rate(rate as i32);
        audio_enc.set_format(to_sample(format));
        audio_enc.set_channel_layout(layout);
        audio_enc.set_bit_rate(config.bit_rate as usize);

        let encoder = audio_enc.open_as(codec).map_err(|e| {
            TranscodeError::Open(format!(
                "failed to open encoder {} for {}: {}",
                config.codec, spec, e
            ))
        })?;

        let frame_size = match encoder.frame_size() as usize {
            0 => config.fallback_frame_size,
            n => n,
        };
        let stream_index = sink.add_stream(codec, &encoder, time_base)?;

        tracing::debug!(
            codec = %config.codec,
            spec = %spec,
            bit_rate = config.bit_rate,
            frame_size,
            "encoder opened"
        );

        Ok(Self {
            encoder,
            spec,
            layout,
            frame_size,
            stream_index,
            pending: VecDeque::new(),
            eof_sent: false,
        })
    }

    /// Move every packet the codec has ready into the queue.
    fn drain(&mut self) -> Result<()> {
        loop {
            let mut packet = ffmpeg::Packet::empty();
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {
                    let mut packet = packet_from_ffmpeg(&packet);
                    packet.stream_index = self.stream_index;
                    self.pending.push_back(packet);
                }
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {
                    return Ok(())
                }
                Err(ffmpeg::Error::Eof) => return Ok(()),
                Err(e) => {
                    return Err(TranscodeError::Encode(format!(
                        "receive_packet error: {}",
                        e
                    )))
                }
            }
        }
    }
}

impl Encoder for FfmpegEncoder {
    fn input_spec(&self) -> SampleSpec {
        self.spec
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn encode(&mut self, frame: Option<&AudioFrame>) -> Result<Option<Packet>> {
        match frame {
            Some(frame) => {
                if frame.spec() != self.spec {
                    return Err(TranscodeError::Encode(format!(
                        "frame is {}, encoder expects {}",
                        frame.spec(),
                        self.spec
                    )));
                }
                let av = frame_to_ffmpeg(frame, self.layout)?;
                self.encoder
                    .send_frame(&av)
                    .map_err(|e| TranscodeError::Encode(format!("send_frame error: {}", e)))?;
            }
            None if !self.eof_sent => {
                self.encoder
                    .send_eof()
                    .map_err(|e| TranscodeError::Encode(format!("send_eof error: {}", e)))?;
                self.eof_sent = true;
            }
            None => {}
        }

        self.drain()?;
        Ok(self.pending.pop_front())
    }
}
