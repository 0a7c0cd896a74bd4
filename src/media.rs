//! Media data types shared by the pipeline stages
//!
//! These types describe audio the way the stages reason about it: sample
//! formats and specs, raw sample frames, and compressed packets. They carry
//! no codec-library handles, so the pipeline can be driven by any backend.

use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Sample memory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// All channels interleaved in a single plane
    Packed,
    /// One plane per channel
    Planar,
}

/// Audio sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8(Layout),
    I16(Layout),
    I32(Layout),
    I64(Layout),
    F32(Layout),
    F64(Layout),
}

impl SampleFormat {
    /// Size of one sample of one channel in bytes.
    pub fn bytes(&self) -> usize {
        match self {
            SampleFormat::U8(_) => 1,
            SampleFormat::I16(_) => 2,
            SampleFormat::I32(_) | SampleFormat::F32(_) => 4,
            SampleFormat::I64(_) | SampleFormat::F64(_) => 8,
        }
    }

    pub fn layout(&self) -> Layout {
        match *self {
            SampleFormat::U8(l)
            | SampleFormat::I16(l)
            | SampleFormat::I32(l)
            | SampleFormat::I64(l)
            | SampleFormat::F32(l)
            | SampleFormat::F64(l) => l,
        }
    }

    pub fn is_planar(&self) -> bool {
        self.layout() == Layout::Planar
    }

    /// The FFmpeg short name of this format (`fltp`, `s16`, ...).
    pub fn name(&self) -> &'static str {
        use Layout::*;
        match self {
            SampleFormat::U8(Packed) => "u8",
            SampleFormat::U8(Planar) => "u8p",
            SampleFormat::I16(Packed) => "s16",
            SampleFormat::I16(Planar) => "s16p",
            SampleFormat::I32(Packed) => "s32",
            SampleFormat::I32(Planar) => "s32p",
            SampleFormat::I64(Packed) => "s64",
            SampleFormat::I64(Planar) => "s64p",
            SampleFormat::F32(Packed) => "flt",
            SampleFormat::F32(Planar) => "fltp",
            SampleFormat::F64(Packed) => "dbl",
            SampleFormat::F64(Planar) => "dblp",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Layout::*;
        let format = match s.to_ascii_lowercase().as_str() {
            "u8" => SampleFormat::U8(Packed),
            "u8p" => SampleFormat::U8(Planar),
            "s16" => SampleFormat::I16(Packed),
            "s16p" => SampleFormat::I16(Planar),
            "s32" => SampleFormat::I32(Packed),
            "s32p" => SampleFormat::I32(Planar),
            "s64" => SampleFormat::I64(Packed),
            "s64p" => SampleFormat::I64(Planar),
            "flt" => SampleFormat::F32(Packed),
            "fltp" => SampleFormat::F32(Planar),
            "dbl" => SampleFormat::F64(Packed),
            "dblp" => SampleFormat::F64(Planar),
            _ => return Err(ConfigError::UnknownSampleFormat(s.to_string())),
        };
        Ok(format)
    }
}

/// Sample format, channel count and sample rate of a stream of raw audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleSpec {
    pub format: SampleFormat,
    pub channels: u16,
    pub rate: u32,
}

impl SampleSpec {
    pub fn new(format: SampleFormat, channels: u16, rate: u32) -> Self {
        Self {
            format,
            channels,
            rate,
        }
    }

    /// Number of data planes a frame in this spec carries.
    pub fn planes(&self) -> usize {
        if self.format.is_planar() {
            self.channels as usize
        } else {
            1
        }
    }

    /// Bytes one sample (all channels of one time instant) occupies in a
    /// single plane.
    pub fn plane_stride(&self) -> usize {
        if self.format.is_planar() {
            self.format.bytes()
        } else {
            self.format.bytes() * self.channels as usize
        }
    }

    /// Bytes `samples` samples occupy in a single plane.
    pub fn plane_len(&self, samples: usize) -> usize {
        samples * self.plane_stride()
    }
}

impl fmt::Display for SampleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz, {} ch, {}", self.rate, self.channels, self.format)
    }
}

/// A block of raw audio samples
///
/// `samples` counts samples per channel. Each plane holds at least
/// `spec.plane_len(samples)` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    spec: SampleSpec,
    samples: usize,
    planes: Vec<Vec<u8>>,
    pts: Option<i64>,
}

impl AudioFrame {
    /// Allocate a zero-filled frame of `samples` samples.
    pub fn alloc(spec: SampleSpec, samples: usize) -> Self {
        let planes = (0..spec.planes())
            .map(|_| vec![0u8; spec.plane_len(samples)])
            .collect();
        Self {
            spec,
            samples,
            planes,
            pts: None,
        }
    }

    /// Build a frame from existing plane buffers.
    ///
    /// Returns `None` if the plane count does not match the spec or a plane
    /// is too short to hold `samples` samples.
    pub fn from_planes(spec: SampleSpec, samples: usize, planes: Vec<Vec<u8>>) -> Option<Self> {
        let needed = spec.plane_len(samples);
        if planes.len() != spec.planes() || planes.iter().any(|p| p.len() < needed) {
            return None;
        }
        Some(Self {
            spec,
            samples,
            planes,
            pts: None,
        })
    }

    pub fn spec(&self) -> SampleSpec {
        self.spec
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }

    pub fn planes(&self) -> usize {
        self.planes.len()
    }

    /// Sample bytes of plane `index`, exactly `spec.plane_len(samples)` long.
    pub fn plane(&self, index: usize) -> &[u8] {
        let len = self.spec.plane_len(self.samples);
        &self.planes[index][..len]
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut [u8] {
        let len = self.spec.plane_len(self.samples);
        &mut self.planes[index][..len]
    }

    /// Shrink the frame to its first `samples` samples. Growing is not
    /// possible; larger values are ignored.
    pub fn truncate(&mut self, samples: usize) {
        if samples < self.samples {
            self.samples = samples;
            let len = self.spec.plane_len(samples);
            for plane in &mut self.planes {
                plane.truncate(len);
            }
        }
    }
}

/// A compressed data unit, as read from a demuxer or produced by an encoder
///
/// Timestamps are in the time base of whoever produced the packet: the source
/// stream for demuxed packets, `1/sample_rate` for encoded packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data: Bytes,
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
}

impl Packet {
    pub fn new(data: impl Into<Bytes>, stream_index: usize) -> Self {
        Self {
            data: data.into(),
            stream_index,
            pts: None,
            dts: None,
            duration: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Audio stream information probed from the source
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStreamInfo {
    /// Stream index in the source file
    pub stream_index: usize,
    /// Codec short name (e.g. "mp3", "flac")
    pub codec_name: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Decoded sample format, when the demuxer knows it
    pub sample_format: Option<SampleFormat>,
    /// Bitrate in bits per second (0 if unknown)
    pub bit_rate: u64,
    /// Stream time base as (numerator, denominator)
    pub time_base: (i32, i32),
}
