//! Transcoding pipeline driver
//!
//! Decoder and encoder frame sizes are generally unrelated: one encoder frame
//! may need samples from several decoded frames, and one decoded frame may
//! feed several encoder frames. The driver therefore alternates between
//! filling the sample FIFO until it holds a full encoder frame and draining
//! it while it does. Once the input is exhausted, the leftover samples go out
//! as one short frame and the encoder is flushed of its delayed packets.
//!
//! ```text
//!   Filling ──(fifo >= frame size, or input exhausted)──> Draining
//!   Draining ──(fifo < frame size, input left)──────────> Filling
//!   Draining ──(fifo empty, input exhausted)────────────> Flushing
//!   Flushing ──(encoder has no more packets)────────────> Done
//! ```

use crate::error::{ConfigError, Result};
use crate::media::SampleSpec;

use super::decoder::{DecodeStage, DecodeStep};
use super::encoder::EncodeStage;
use super::fifo::SampleFifo;
use super::resampler::ResampleStage;
use super::traits::{Decoder, Encoder, MediaSink, MediaSource, Resampler};

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Decoding into the FIFO until it holds one encoder frame.
    Filling,
    /// Encoding full frames, or the final short frame once input is exhausted.
    Draining,
    /// Emptying the encoder's delay buffer.
    Flushing,
    Done,
}

/// Counters collected over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    pub packets_read: u64,
    pub frames_decoded: u64,
    pub samples_decoded: u64,
    /// Samples produced by the resampler and stored in the FIFO
    pub samples_buffered: u64,
    pub frames_encoded: u64,
    pub samples_encoded: u64,
    pub packets_written: u64,
    /// Packets written during the encoder flush (included in `packets_written`)
    pub packets_flushed: u64,
}

/// State shared by the stages for the lifetime of one run
#[derive(Debug)]
pub struct PipelineContext {
    pub fifo: SampleFifo,
    pub stats: TranscodeStats,
    pts: i64,
    input_exhausted: bool,
}

impl PipelineContext {
    /// Fresh context whose FIFO holds samples in `spec`.
    pub fn new(spec: SampleSpec) -> Self {
        Self {
            fifo: SampleFifo::new(spec),
            stats: TranscodeStats::default(),
            pts: 0,
            input_exhausted: false,
        }
    }

    /// Timestamp the next encoded frame will carry.
    pub fn next_pts(&self) -> i64 {
        self.pts
    }

    /// Return the current timestamp and advance it by `samples`.
    pub fn take_pts(&mut self, samples: usize) -> i64 {
        let pts = self.pts;
        self.pts += samples as i64;
        pts
    }

    pub fn input_exhausted(&self) -> bool {
        self.input_exhausted
    }

    pub fn mark_input_exhausted(&mut self) {
        self.input_exhausted = true;
    }
}

/// Decode → resample → FIFO → encode → sink, for one audio stream
pub struct Transcoder<S, D, R, E, K> {
    decode: DecodeStage<S, D>,
    resample: ResampleStage<R>,
    encode: EncodeStage<E>,
    sink: K,
    ctx: PipelineContext,
    state: PipelineState,
}

impl<S, D, R, E, K> Transcoder<S, D, R, E, K>
where
    S: MediaSource,
    D: Decoder,
    R: Resampler,
    E: Encoder,
    K: MediaSink,
{
    /// Assemble a pipeline, checking that the collaborators agree on the
    /// sample spec before any packet is read.
    pub fn new(source: S, decoder: D, resampler: R, encoder: E, sink: K) -> Result<Self> {
        let source_rate = source.stream_info().sample_rate;
        let encoder_spec = encoder.input_spec();
        if source_rate != encoder_spec.rate {
            return Err(ConfigError::SampleRateMismatch {
                source_rate,
                encoder_rate: encoder_spec.rate,
            }
            .into());
        }

        let resampler_spec = resampler.output_spec();
        if resampler_spec != encoder_spec {
            return Err(ConfigError::SpecMismatch {
                resampler: resampler_spec.to_string(),
                encoder: encoder_spec.to_string(),
            }
            .into());
        }

        let encode = EncodeStage::new(encoder)?;
        tracing::debug!(
            spec = %encoder_spec,
            frame_size = encode.frame_size(),
            "pipeline assembled"
        );

        Ok(Self {
            decode: DecodeStage::new(source, decoder),
            resample: ResampleStage::new(resampler),
            encode,
            sink,
            ctx: PipelineContext::new(encoder_spec),
            state: PipelineState::Filling,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Encoder frame size in samples.
    pub fn frame_size(&self) -> usize {
        self.encode.frame_size()
    }

    /// Run to completion: header, every state until `Done`, trailer.
    pub fn run(mut self) -> Result<TranscodeStats> {
        self.sink.write_header()?;
        while self.state != PipelineState::Done {
            self.step()?;
        }
        self.sink.write_trailer()?;

        tracing::debug!(stats = ?self.ctx.stats, "pipeline finished");
        Ok(self.ctx.stats)
    }

    /// Perform one unit of work and move to the next state.
    pub fn step(&mut self) -> Result<PipelineState> {
        let frame_size = self.encode.frame_size();
        let next = match self.state {
            PipelineState::Filling => {
                if self.ctx.fifo.occupancy() >= frame_size || self.ctx.input_exhausted() {
                    PipelineState::Draining
                } else {
                    self.fill_once()?;
                    PipelineState::Filling
                }
            }
            PipelineState::Draining => {
                let occupancy = self.ctx.fifo.occupancy();
                if occupancy >= frame_size || (self.ctx.input_exhausted() && occupancy > 0) {
                    self.encode.load_encode_write(&mut self.ctx, &mut self.sink)?;
                    PipelineState::Draining
                } else if self.ctx.input_exhausted() {
                    PipelineState::Flushing
                } else {
                    PipelineState::Filling
                }
            }
            PipelineState::Flushing => {
                if self.encode.flush_step(&mut self.ctx, &mut self.sink)? {
                    PipelineState::Flushing
                } else {
                    PipelineState::Done
                }
            }
            PipelineState::Done => PipelineState::Done,
        };

        if next != self.state {
            tracing::trace!(
                from = ?self.state,
                to = ?next,
                fifo = self.ctx.fifo.occupancy(),
                "state change"
            );
        }
        self.state = next;
        Ok(next)
    }

    /// One decode attempt; a decoded frame goes straight through the
    /// resampler into the FIFO and is dropped here.
    fn fill_once(&mut self) -> Result<()> {
        match self.decode.decode_next_frame(&mut self.ctx)? {
            DecodeStep::Frame(frame) => {
                self.resample.convert_and_store(&frame, &mut self.ctx)?;
            }
            DecodeStep::NeedMoreInput => {}
            DecodeStep::EndOfInput => {
                tracing::debug!(fifo = self.ctx.fifo.occupancy(), "input exhausted");
                self.ctx.mark_input_exhausted();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranscodeError;
    use crate::tests::fixtures::{
        fltp_stereo, s16p_stereo, Harness, MemorySink, RecordingEncoder, ScriptedDecoder,
        ScriptedSource, TestResampler,
    };

    #[test]
    fn test_take_pts_is_monotonic() {
        let mut ctx = PipelineContext::new(s16p_stereo(48000));
        assert_eq!(ctx.take_pts(1024), 0);
        assert_eq!(ctx.take_pts(1024), 1024);
        assert_eq!(ctx.take_pts(300), 2048);
        assert_eq!(ctx.next_pts(), 2348);
    }

    #[test]
    fn test_resampler_encoder_spec_mismatch() {
        let spec = s16p_stereo(48000);
        let result = Transcoder::new(
            ScriptedSource::from_frames(spec, &[&[1024]]),
            ScriptedDecoder::new(spec),
            TestResampler::new(spec, spec),
            RecordingEncoder::new(fltp_stereo(48000), 1024),
            MemorySink::new(),
        );
        assert!(matches!(
            result,
            Err(TranscodeError::Config(ConfigError::SpecMismatch { .. }))
        ));
    }

    #[test]
    fn test_state_sequence_for_short_input() {
        let mut harness = Harness::new(&[&[300]], 1024).build();
        let mut states = vec![harness.state()];
        while harness.state() != PipelineState::Done {
            states.push(harness.step().unwrap());
        }
        states.dedup();
        assert_eq!(
            states,
            vec![
                PipelineState::Filling,
                PipelineState::Draining,
                PipelineState::Flushing,
                PipelineState::Done
            ]
        );
    }

    #[test]
    fn test_refill_between_frames() {
        // 1500-sample decoder frames against a 1024-sample encoder
        let mut harness = Harness::new(&[&[1500], &[1500], &[1500]], 1024).build();
        let mut states = vec![harness.state()];
        while harness.state() != PipelineState::Done {
            states.push(harness.step().unwrap());
        }
        states.dedup();
        assert_eq!(
            states,
            vec![
                PipelineState::Filling,
                PipelineState::Draining,
                PipelineState::Filling,
                PipelineState::Draining,
                PipelineState::Filling,
                PipelineState::Draining,
                PipelineState::Filling,
                PipelineState::Draining,
                PipelineState::Flushing,
                PipelineState::Done
            ]
        );
    }

    #[test]
    fn test_done_is_terminal() {
        let mut harness = Harness::new(&[&[10]], 1024).build();
        while harness.step().unwrap() != PipelineState::Done {}
        let stats = harness.context().stats.clone();
        assert_eq!(harness.step().unwrap(), PipelineState::Done);
        assert_eq!(harness.context().stats, stats);
    }
}
