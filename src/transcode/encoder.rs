//! Encode stage
//!
//! Takes one encoder frame's worth of samples out of the FIFO, stamps it with
//! the running presentation timestamp, encodes it and writes whatever packet
//! comes out. The final frame of a run may be short; after it, the encoder is
//! flushed one empty call at a time until it has nothing left.

use crate::error::{ConfigError, Result};
use crate::media::{AudioFrame, SampleSpec};

use super::pipeline::PipelineContext;
use super::traits::{Encoder, MediaSink};

/// Encoder plus its frame-size contract
pub struct EncodeStage<E> {
    encoder: E,
    frame_size: usize,
}

impl<E: Encoder> EncodeStage<E> {
    pub fn new(encoder: E) -> Result<Self> {
        let frame_size = encoder.frame_size();
        if frame_size == 0 {
            return Err(ConfigError::InvalidFrameSize.into());
        }
        Ok(Self {
            encoder,
            frame_size,
        })
    }

    /// Samples per frame the encoder expects.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn input_spec(&self) -> SampleSpec {
        self.encoder.input_spec()
    }

    /// Encode `min(fifo occupancy, frame size)` samples and write the
    /// resulting packet, if any. Returns the number of samples encoded.
    pub fn load_encode_write<K: MediaSink>(
        &mut self,
        ctx: &mut PipelineContext,
        sink: &mut K,
    ) -> Result<usize> {
        let frame_size = ctx.fifo.occupancy().min(self.frame_size);

        let mut frame = AudioFrame::alloc(ctx.fifo.spec(), frame_size);
        ctx.fifo.read_into(&mut frame, frame_size)?;
        let pts = ctx.take_pts(frame_size);
        frame.set_pts(Some(pts));

        ctx.stats.frames_encoded += 1;
        ctx.stats.samples_encoded += frame_size as u64;
        tracing::trace!(pts, samples = frame_size, "encoding frame");

        if let Some(packet) = self.encoder.encode(Some(&frame))? {
            sink.write_packet(packet)?;
            ctx.stats.packets_written += 1;
        }
        Ok(frame_size)
    }

    /// Make one flush call. Returns `false` once the encoder reports that no
    /// delayed packets remain.
    pub fn flush_step<K: MediaSink>(
        &mut self,
        ctx: &mut PipelineContext,
        sink: &mut K,
    ) -> Result<bool> {
        match self.encoder.encode(None)? {
            Some(packet) => {
                sink.write_packet(packet)?;
                ctx.stats.packets_written += 1;
                ctx.stats.packets_flushed += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
