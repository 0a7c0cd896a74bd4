//! swresample-backed sample format and channel layout converter

use ffmpeg_next as ffmpeg;
use ffmpeg_next::software::resampling;
use ffmpeg_next::util::channel_layout::ChannelLayout;

use crate::error::{Result, TranscodeError};
use crate::media::{AudioFrame, SampleSpec};
use crate::transcode::Resampler;

use super::helpers::{audio_plane_data, frame_to_ffmpeg, layout_for_channels, to_sample};

/// Audio resampler wrapping FFmpeg's `SwrContext`
///
/// Sample rates on both sides are equal; only format and layout change. The
/// input may have any channel count, the output one of the configurable
/// ones. When the specs match entirely no context is created and samples are
/// copied.
pub struct FfmpegResampler {
    context: Option<resampling::Context>,
    input: SampleSpec,
    input_layout: ChannelLayout,
    output: SampleSpec,
}

impl FfmpegResampler {
    pub fn new(
        input: SampleSpec,
        input_layout: ChannelLayout,
        output: SampleSpec,
    ) -> Result<Self> {
        if input.rate != output.rate {
            return Err(TranscodeError::UnsupportedRate {
                input: input.rate,
                expected: output.rate,
            });
        }
        if input_layout.channels() != input.channels as i32 {
            return Err(TranscodeError::Resample(format!(
                "input layout has {} channels, frames have {}",
                input_layout.channels(),
                input.channels
            )));
        }

        let context = if input == output {
            tracing::debug!(spec = %input, "resampler passthrough");
            None
        } else {
            let output_layout = layout_for_channels(output.channels)?;
            let context = resampling::Context::get(
                to_sample(input.format),
                input_layout,
                input.rate,
                to_sample(output.format),
                output_layout,
                output.rate,
            )
            .map_err(|e| {
                TranscodeError::Allocation(format!(
                    "failed to create resampling context: {}",
                    e
                ))
            })?;
            tracing::debug!(from = %input, to = %output, "resampler opened");
            Some(context)
        };

        Ok(Self {
            context,
            input,
            input_layout,
            output,
        })
    }
}

impl Resampler for FfmpegResampler {
    fn output_spec(&self) -> SampleSpec {
        self.output
    }

    fn convert(&mut self, input: &AudioFrame, output: &mut AudioFrame) -> Result<usize> {
        if input.spec() != self.input {
            return Err(TranscodeError::Resample(format!(
                "frame is {}, resampler was opened for {}",
                input.spec(),
                self.input
            )));
        }

        let Some(context) = self.context.as_mut() else {
            for p in 0..input.planes() {
                output.plane_mut(p).copy_from_slice(input.plane(p));
            }
            return Ok(input.samples());
        };

        let src = frame_to_ffmpeg(input, self.input_layout)?;
        // swr allocates the output buffers itself from the context config
        let mut converted = ffmpeg::util::frame::Audio::empty();
        context
            .run(&src, &mut converted)
            .map_err(|e| TranscodeError::Resample(format!("resampling error: {}", e)))?;

        let produced = converted.samples();
        if produced > output.samples() {
            return Err(TranscodeError::Resample(format!(
                "resampler produced {} samples into a {} sample buffer",
                produced,
                output.samples()
            )));
        }

        let len = self.output.plane_len(produced);
        for p in 0..output.planes() {
            let data = audio_plane_data(&converted, p);
            if data.len() < len {
                return Err(TranscodeError::Resample(format!(
                    "converted plane {} holds {} bytes, expected {}",
                    p,
                    data.len(),
                    len
                )));
            }
            output.plane_mut(p)[..len].copy_from_slice(&data[..len]);
        }
        Ok(produced)
    }
}
