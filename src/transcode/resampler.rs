//! Resample stage
//!
//! Converts decoded frames to the encoder's sample format and channel layout
//! and appends the result to the sample FIFO. Sample rates must already match.

use crate::error::{Result, TranscodeError};
use crate::media::{AudioFrame, SampleSpec};

use super::pipeline::PipelineContext;
use super::traits::Resampler;

/// Resampler feeding the sample FIFO
pub struct ResampleStage<R> {
    resampler: R,
}

impl<R: Resampler> ResampleStage<R> {
    pub fn new(resampler: R) -> Self {
        Self { resampler }
    }

    pub fn output_spec(&self) -> SampleSpec {
        self.resampler.output_spec()
    }

    /// Convert `frame` and store the converted samples in the FIFO.
    ///
    /// Returns the number of samples stored. The scratch buffer holding the
    /// converted samples lives only for the duration of this call.
    pub fn convert_and_store(
        &mut self,
        frame: &AudioFrame,
        ctx: &mut PipelineContext,
    ) -> Result<usize> {
        let spec = self.resampler.output_spec();
        if frame.spec().rate != spec.rate {
            return Err(TranscodeError::UnsupportedRate {
                input: frame.spec().rate,
                expected: spec.rate,
            });
        }

        let mut converted = AudioFrame::alloc(spec, frame.samples());
        let produced = self.resampler.convert(frame, &mut converted)?;
        if produced > frame.samples() {
            return Err(TranscodeError::Resample(format!(
                "resampler produced {} samples from {}",
                produced,
                frame.samples()
            )));
        }
        converted.truncate(produced);

        ctx.fifo.reserve(produced)?;
        ctx.fifo.write(&converted, produced)?;
        ctx.stats.samples_buffered += produced as u64;

        tracing::trace!(
            samples = produced,
            fifo = ctx.fifo.occupancy(),
            "stored converted samples"
        );
        Ok(produced)
    }
}
