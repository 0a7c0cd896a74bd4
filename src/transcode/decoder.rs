//! Decode stage
//!
//! Pulls compressed packets from the source and turns them into raw audio
//! frames, one packet per call. At the end of the input the decoder is
//! flushed and its delayed frames are still handed out; only the decoder's
//! own end-of-stream ends the input.

use crate::error::Result;
use crate::media::{AudioFrame, AudioStreamInfo};

use super::pipeline::PipelineContext;
use super::traits::{Decoder, DecoderOutput, MediaSource};

/// Result of one decode attempt
#[derive(Debug)]
pub enum DecodeStep {
    /// A decoded frame, owned by the caller until it has been converted.
    Frame(AudioFrame),
    /// The packet read in this step did not complete a frame; try again.
    NeedMoreInput,
    /// Source exhausted and decoder drained.
    EndOfInput,
}

/// Source reader plus decoder for the single audio stream
pub struct DecodeStage<S, D> {
    source: S,
    decoder: D,
    stream_index: usize,
    flushing: bool,
}

impl<S: MediaSource, D: Decoder> DecodeStage<S, D> {
    pub fn new(source: S, decoder: D) -> Self {
        let stream_index = source.stream_info().stream_index;
        Self {
            source,
            decoder,
            stream_index,
            flushing: false,
        }
    }

    pub fn stream_info(&self) -> &AudioStreamInfo {
        self.source.stream_info()
    }

    /// Whether the source hit end of stream and the decoder is being flushed.
    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// Produce the next decoded frame, reading at most one packet.
    pub fn decode_next_frame(&mut self, ctx: &mut PipelineContext) -> Result<DecodeStep> {
        // Frames left over from the previous packet come first; a decoder may
        // refuse new input while it still holds output.
        match self.receive(ctx)? {
            DecodeStep::NeedMoreInput => {}
            step => return Ok(step),
        }

        if self.flushing {
            tracing::warn!(
                stream_index = self.stream_index,
                "decoder asked for input after flush; treating as end of stream"
            );
            return Ok(DecodeStep::EndOfInput);
        }

        match self.source.read_packet()? {
            Some(packet) if packet.stream_index != self.stream_index => {
                tracing::debug!(
                    stream_index = packet.stream_index,
                    "skipping packet from foreign stream"
                );
                return Ok(DecodeStep::NeedMoreInput);
            }
            Some(packet) => {
                ctx.stats.packets_read += 1;
                self.decoder.send_packet(&packet)?;
            }
            None => {
                tracing::debug!(
                    stream_index = self.stream_index,
                    packets = ctx.stats.packets_read,
                    "end of input, flushing decoder"
                );
                self.decoder.send_eof()?;
                self.flushing = true;
            }
        }

        self.receive(ctx)
    }

    fn receive(&mut self, ctx: &mut PipelineContext) -> Result<DecodeStep> {
        match self.decoder.receive_frame()? {
            DecoderOutput::Frame(frame) => {
                ctx.stats.frames_decoded += 1;
                ctx.stats.samples_decoded += frame.samples() as u64;
                Ok(DecodeStep::Frame(frame))
            }
            DecoderOutput::NeedMoreInput => Ok(DecodeStep::NeedMoreInput),
            DecoderOutput::EndOfStream => Ok(DecodeStep::EndOfInput),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranscodeError;
    use crate::tests::fixtures::{s16p_stereo, ScriptedDecoder, ScriptedSource};

    fn context() -> PipelineContext {
        PipelineContext::new(s16p_stereo(48000))
    }

    #[test]
    fn test_frames_then_end_of_input() {
        let source = ScriptedSource::from_frames(s16p_stereo(48000), &[&[1152], &[1152]]);
        let mut stage = DecodeStage::new(source, ScriptedDecoder::new(s16p_stereo(48000)));
        let mut ctx = context();

        let mut sizes = Vec::new();
        loop {
            match stage.decode_next_frame(&mut ctx).unwrap() {
                DecodeStep::Frame(f) => sizes.push(f.samples()),
                DecodeStep::NeedMoreInput => {}
                DecodeStep::EndOfInput => break,
            }
        }
        assert_eq!(sizes, vec![1152, 1152]);
        assert_eq!(ctx.stats.packets_read, 2);
        assert_eq!(ctx.stats.samples_decoded, 2304);
        assert!(stage.is_flushing());
    }

    #[test]
    fn test_delayed_frames_survive_flush() {
        let spec = s16p_stereo(48000);
        let source = ScriptedSource::from_frames(spec, &[&[100], &[200], &[300]]);
        let decoder = ScriptedDecoder::new(spec).with_delay(2);
        let mut stage = DecodeStage::new(source, decoder);
        let mut ctx = context();

        let mut steps = Vec::new();
        loop {
            match stage.decode_next_frame(&mut ctx).unwrap() {
                DecodeStep::Frame(f) => steps.push(Some(f.samples())),
                DecodeStep::NeedMoreInput => steps.push(None),
                DecodeStep::EndOfInput => break,
            }
        }
        // two packets held back, then the flush releases everything
        assert_eq!(
            steps,
            vec![None, None, Some(100), Some(200), Some(300)]
        );
    }

    #[test]
    fn test_input_request_after_flush_ends_input() {
        let spec = s16p_stereo(48000);
        let source = ScriptedSource::from_frames(spec, &[&[64]]);
        let decoder = ScriptedDecoder::new(spec).starve_after_flush();
        let mut stage = DecodeStage::new(source, decoder);
        let mut ctx = context();

        assert!(matches!(
            stage.decode_next_frame(&mut ctx).unwrap(),
            DecodeStep::Frame(_)
        ));
        // the flushed decoder answers with a request for more input
        assert!(matches!(
            stage.decode_next_frame(&mut ctx).unwrap(),
            DecodeStep::NeedMoreInput
        ));
        assert!(stage.is_flushing());
        assert!(matches!(
            stage.decode_next_frame(&mut ctx).unwrap(),
            DecodeStep::EndOfInput
        ));
        assert_eq!(ctx.stats.packets_read, 1);
    }

    #[test]
    fn test_foreign_stream_packets_are_skipped() {
        let spec = s16p_stereo(48000);
        let mut source = ScriptedSource::from_frames(spec, &[&[64]]);
        source.push_foreign_packet_front(3);
        let mut stage = DecodeStage::new(source, ScriptedDecoder::new(spec));
        let mut ctx = context();

        assert!(matches!(
            stage.decode_next_frame(&mut ctx).unwrap(),
            DecodeStep::NeedMoreInput
        ));
        assert!(matches!(
            stage.decode_next_frame(&mut ctx).unwrap(),
            DecodeStep::Frame(_)
        ));
        assert_eq!(ctx.stats.packets_read, 1);
    }

    #[test]
    fn test_read_error_is_fatal() {
        let spec = s16p_stereo(48000);
        let source = ScriptedSource::from_frames(spec, &[&[64], &[64]]).fail_after(1);
        let mut stage = DecodeStage::new(source, ScriptedDecoder::new(spec));
        let mut ctx = context();

        assert!(matches!(
            stage.decode_next_frame(&mut ctx).unwrap(),
            DecodeStep::Frame(_)
        ));
        let err = stage.decode_next_frame(&mut ctx).unwrap_err();
        assert!(matches!(err, TranscodeError::Read(_)));
    }

    #[test]
    fn test_decode_error_is_fatal() {
        let spec = s16p_stereo(48000);
        let source = ScriptedSource::from_frames(spec, &[&[64]]);
        let decoder = ScriptedDecoder::new(spec).fail_on_packet(0);
        let mut stage = DecodeStage::new(source, decoder);
        let mut ctx = context();

        let err = stage.decode_next_frame(&mut ctx).unwrap_err();
        assert!(matches!(err, TranscodeError::Decode(_)));
    }
}
