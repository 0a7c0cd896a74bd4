//! Capabilities the pipeline needs from a media library
//!
//! The demuxer, codecs, resampler and muxer are not implemented here. The
//! pipeline drives whatever implements these traits: the FFmpeg backend in
//! `ffmpeg_utils`, or scripted fakes in tests. Every call is blocking and
//! returns synchronously.

use crate::error::Result;
use crate::media::{AudioFrame, AudioStreamInfo, Packet, SampleSpec};

/// Source container: yields compressed packets of the single audio stream.
pub trait MediaSource {
    /// Stream parameters probed when the source was opened.
    fn stream_info(&self) -> &AudioStreamInfo;

    /// Read the next packet, or `None` at a clean end of stream.
    ///
    /// Any other failure is a `Read` error.
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

/// What the decoder has to offer after a packet (or flush) was submitted.
#[derive(Debug)]
pub enum DecoderOutput {
    /// One decoded frame.
    Frame(AudioFrame),
    /// Nothing buffered; submit another packet.
    NeedMoreInput,
    /// Flushed and fully drained.
    EndOfStream,
}

/// Audio decoder.
pub trait Decoder {
    /// Submit one compressed packet.
    fn send_packet(&mut self, packet: &Packet) -> Result<()>;

    /// Submit the empty flush packet. Frames delayed inside the decoder are
    /// still returned by [`Decoder::receive_frame`] afterwards.
    fn send_eof(&mut self) -> Result<()>;

    /// Take the next decoded frame.
    fn receive_frame(&mut self) -> Result<DecoderOutput>;
}

/// Sample format/layout converter. Sample rates of input and output are equal.
pub trait Resampler {
    /// Spec of the converted samples.
    fn output_spec(&self) -> SampleSpec;

    /// Convert `input` into `output`, which has room for `input.samples()`
    /// samples. Returns the number of samples produced.
    fn convert(&mut self, input: &AudioFrame, output: &mut AudioFrame) -> Result<usize>;
}

/// Audio encoder.
pub trait Encoder {
    /// Spec frames must be in when submitted.
    fn input_spec(&self) -> SampleSpec;

    /// Samples per frame the encoder wants. Only the last frame may be shorter.
    fn frame_size(&self) -> usize;

    /// Encode one frame, or flush with `None`.
    ///
    /// Returns a packet if one is ready. With `None`, a `None` result means
    /// the encoder holds no more delayed packets.
    fn encode(&mut self, frame: Option<&AudioFrame>) -> Result<Option<Packet>>;
}

/// Output container.
pub trait MediaSink {
    fn write_header(&mut self) -> Result<()>;

    /// Write one encoded packet. The packet is consumed.
    fn write_packet(&mut self, packet: Packet) -> Result<()>;

    fn write_trailer(&mut self) -> Result<()>;
}
