//! Demuxer-backed packet source

use std::path::Path;

use bytes::Bytes;
use ffmpeg_next as ffmpeg;

use crate::error::{ConfigError, Result, TranscodeError};
use crate::media::{AudioStreamInfo, Packet, SampleFormat};
use crate::transcode::MediaSource;

use super::helpers::{codec_params_bit_rate, codec_params_channels, codec_params_sample_rate};
use super::io::{open_memory_input, MemoryIo};

/// Input container holding exactly one audio stream
pub struct FfmpegSource {
    input: ffmpeg::format::context::Input,
    info: AudioStreamInfo,
    // must outlive `input`, which reads through it
    memory: Option<MemoryIo>,
}

impl FfmpegSource {
    /// Open `path`, letting FFmpeg probe the container, and check that it
    /// holds a single audio stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let input = ffmpeg::format::input(&path).map_err(|e| {
            TranscodeError::Open(format!("failed to open input {:?}: {}", path, e))
        })?;
        let info = probe_audio_stream(&input)?;

        tracing::debug!(
            path = %path.display(),
            codec = %info.codec_name,
            sample_rate = info.sample_rate,
            channels = info.channels,
            "opened input"
        );

        Ok(Self {
            input,
            info,
            memory: None,
        })
    }

    /// Open a container held in memory. Probing and the one-audio-stream
    /// check work as for files.
    pub fn from_memory(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let len = data.len();
        let mut memory = MemoryIo::new(data)?;
        let input = open_memory_input(&mut memory)?;
        let info = probe_audio_stream(&input)?;

        tracing::debug!(
            bytes = len,
            codec = %info.codec_name,
            sample_rate = info.sample_rate,
            channels = info.channels,
            "opened in-memory input"
        );

        Ok(Self {
            input,
            info,
            memory: Some(memory),
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.memory.is_some()
    }

    /// Codec parameters of the audio stream, for opening its decoder.
    pub fn parameters(&self) -> Result<ffmpeg::codec::Parameters> {
        self.input
            .stream(self.info.stream_index)
            .map(|s| s.parameters())
            .ok_or_else(|| ConfigError::StreamCount(0).into())
    }

    /// Record the sample format once the decoder has reported it.
    pub fn set_sample_format(&mut self, format: Option<SampleFormat>) {
        self.info.sample_format = format;
    }
}

impl MediaSource for FfmpegSource {
    fn stream_info(&self) -> &AudioStreamInfo {
        &self.info
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        let mut packet = ffmpeg::Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(Some(packet_from_ffmpeg(&packet))),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(TranscodeError::Read(format!(
                "failed to read packet: {}",
                e
            ))),
        }
    }
}

/// Check that `input` holds a single audio stream and describe it.
fn probe_audio_stream(input: &ffmpeg::format::context::Input) -> Result<AudioStreamInfo> {
    let count = input.streams().count();
    if count != 1 {
        return Err(ConfigError::StreamCount(count).into());
    }
    let stream = input.stream(0).ok_or(ConfigError::StreamCount(0))?;
    let params = stream.parameters();
    if params.medium() != ffmpeg::media::Type::Audio {
        return Err(ConfigError::NotAudio.into());
    }

    let codec_name = ffmpeg::codec::decoder::find(params.id())
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| format!("{:?}", params.id()));
    let time_base = stream.time_base();

    Ok(AudioStreamInfo {
        stream_index: stream.index(),
        codec_name,
        sample_rate: codec_params_sample_rate(&params),
        channels: codec_params_channels(&params),
        sample_format: None,
        bit_rate: codec_params_bit_rate(&params),
        time_base: (time_base.numerator(), time_base.denominator()),
    })
}

pub(crate) fn packet_from_ffmpeg(packet: &ffmpeg::Packet) -> Packet {
    let data = packet
        .data()
        .map(Bytes::copy_from_slice)
        .unwrap_or_default();
    Packet {
        data,
        stream_index: packet.stream(),
        pts: packet.pts(),
        dts: packet.dts(),
        duration: packet.duration(),
    }
}

pub(crate) fn packet_to_ffmpeg(packet: &Packet) -> ffmpeg::Packet {
    let mut out = ffmpeg::Packet::copy(&packet.data);
    out.set_pts(packet.pts);
    out.set_dts(packet.dts);
    out.set_duration(packet.duration);
    out.set_stream(packet.stream_index);
    out
}
