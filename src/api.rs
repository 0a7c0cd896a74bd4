//! File-to-file transcoding on top of the FFmpeg backend

use std::path::Path;

use bytes::Bytes;

use crate::config::TranscodeConfig;
use crate::error::{ConfigError, Result};
use crate::ffmpeg_utils::{
    self, FfmpegDecoder, FfmpegEncoder, FfmpegResampler, FfmpegSink, FfmpegSource,
};
use crate::media::SampleSpec;
use crate::transcode::{Encoder, MediaSource, TranscodeStats, Transcoder};

type FfmpegTranscoder =
    Transcoder<FfmpegSource, FfmpegDecoder, FfmpegResampler, FfmpegEncoder, FfmpegSink>;

/// Transcode the single audio stream of `input` into `output`.
///
/// The output container is chosen from the output file name. The output
/// keeps the input's sample rate; format and channel layout follow `config`.
/// If setup fails after the output file was created, the file is removed. A
/// run that fails later leaves the partial output without a trailer.
pub fn transcode_file<P, Q>(input: P, output: Q, config: &TranscodeConfig) -> Result<TranscodeStats>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    config.validate()?;
    ffmpeg_utils::init()?;

    let source = FfmpegSource::open(input.as_ref())?;
    tracing::info!(input = %input.as_ref().display(), "transcoding file");
    transcode_source(source, output.as_ref(), config)
}

/// Like [`transcode_file`], for an input container already held in memory.
pub fn transcode_memory<Q>(
    input: impl Into<Bytes>,
    output: Q,
    config: &TranscodeConfig,
) -> Result<TranscodeStats>
where
    Q: AsRef<Path>,
{
    config.validate()?;
    ffmpeg_utils::init()?;

    let source = FfmpegSource::from_memory(input)?;
    tracing::info!("transcoding in-memory input");
    transcode_source(source, output.as_ref(), config)
}

fn transcode_source(
    mut source: FfmpegSource,
    output: &Path,
    config: &TranscodeConfig,
) -> Result<TranscodeStats> {
    let decoder = FfmpegDecoder::open(&source)?;
    let format = decoder
        .sample_format()
        .ok_or_else(|| ConfigError::UnknownSampleFormat("none".to_string()))?;
    source.set_sample_format(Some(format));

    let sink = FfmpegSink::create(output)?;
    let transcoder = match assemble(source, decoder, sink, config) {
        Ok(transcoder) => transcoder,
        Err(e) => {
            discard_output(output);
            return Err(e);
        }
    };

    let stats = transcoder.run()?;

    tracing::info!(
        output = %output.display(),
        frames_encoded = stats.frames_encoded,
        samples_encoded = stats.samples_encoded,
        packets_written = stats.packets_written,
        "transcode finished"
    );
    Ok(stats)
}

/// Open the encoder and resampler and check the pipeline fits together.
/// The sink is dropped, closing the output file, when this fails.
fn assemble(
    source: FfmpegSource,
    decoder: FfmpegDecoder,
    mut sink: FfmpegSink,
    config: &TranscodeConfig,
) -> Result<FfmpegTranscoder> {
    let info = source.stream_info();
    let format = info
        .sample_format
        .ok_or_else(|| ConfigError::UnknownSampleFormat("none".to_string()))?;
    let input_spec = SampleSpec::new(format, info.channels, info.sample_rate);
    let input_layout = decoder.channel_layout(info.channels);

    let encoder = FfmpegEncoder::open(&mut sink, &config.encoder, info.sample_rate)?;
    let resampler = FfmpegResampler::new(input_spec, input_layout, encoder.input_spec())?;

    tracing::info!(
        output = %sink.path().display(),
        codec = %info.codec_name,
        from = %input_spec,
        to = %encoder.input_spec(),
        "pipeline assembled"
    );

    Transcoder::new(source, decoder, resampler, encoder, sink)
}

fn discard_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed output after failed setup"),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove output after failed setup"
        ),
    }
}
