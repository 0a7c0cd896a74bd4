//! Safe wrappers around FFmpeg FFI calls and conversions between FFmpeg's
//! audio types and the crate's own.
//!
//! All `unsafe` blocks live here. Callers outside this module never need to
//! touch raw `AVFrame`/`AVCodecParameters` fields.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::sample::{Sample, Type};

use crate::error::{ConfigError, Result, TranscodeError};
use crate::media::{AudioFrame, Layout, SampleFormat, SampleSpec};

// ── Codec-parameter field accessors ─────────────────────────────────────────

/// Read `sample_rate` from an `AVCodecParameters` struct.
///
/// `ffmpeg-next` does not expose this field through a safe accessor.
pub fn codec_params_sample_rate(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    // SAFETY: `params.as_ptr()` is valid and non-null for the lifetime of
    // `params`; `sample_rate` is a plain integer field.
    unsafe { (*params.as_ptr()).sample_rate as u32 }
}

/// Read `ch_layout.nb_channels` from an `AVCodecParameters` struct.
pub fn codec_params_channels(params: &ffmpeg::codec::parameters::Parameters) -> u16 {
    // SAFETY: same as `codec_params_sample_rate`.
    unsafe { (*params.as_ptr()).ch_layout.nb_channels as u16 }
}

pub fn codec_params_bit_rate(params: &ffmpeg::codec::parameters::Parameters) -> u64 {
    // SAFETY: same as `codec_params_sample_rate`.
    unsafe { (*params.as_ptr()).bit_rate.max(0) as u64 }
}

/// Zero out `codec_tag` on an output stream so the muxer picks the tag for
/// its own container.
///
/// Must be called after `set_parameters` and before `write_header`.
pub fn stream_reset_codec_tag(out_stream: &mut ffmpeg::format::stream::StreamMut) {
    // SAFETY: `as_mut_ptr()` is valid for the lifetime of the stream and
    // `codecpar` is allocated together with the stream.
    unsafe {
        (*(*out_stream.as_mut_ptr()).codecpar).codec_tag = 0;
    }
}

/// Copy an opened encoder's context into a fresh `AVCodecParameters` for
/// muxer stream setup.
pub fn encoder_codec_parameters(
    encoder: &ffmpeg::codec::encoder::Audio,
) -> Result<ffmpeg::codec::Parameters> {
    use std::ops::Deref;
    use std::rc::Rc;
    let ctx: &ffmpeg::codec::Context = encoder.deref();
    // SAFETY: the allocation is checked for null before use, and
    // `avcodec_parameters_from_context` reads from a live, opened context.
    unsafe {
        let params = ffmpeg::ffi::avcodec_parameters_alloc();
        if params.is_null() {
            return Err(TranscodeError::Allocation(
                "failed to allocate codec parameters".into(),
            ));
        }
        let ret = ffmpeg::ffi::avcodec_parameters_from_context(params, ctx.as_ptr());
        if ret < 0 {
            let mut params = params;
            ffmpeg::ffi::avcodec_parameters_free(&mut params);
            return Err(TranscodeError::Open(format!(
                "failed to copy encoder parameters: {}",
                ffmpeg::Error::from(ret)
            )));
        }
        Ok(ffmpeg::codec::Parameters::wrap(
            params,
            None::<Rc<dyn std::any::Any>>,
        ))
    }
}

// ── Audio plane access ──────────────────────────────────────────────────────

/// Extract an audio plane slice from an `AVFrame`.
///
/// Works around `ffmpeg-next`'s `Audio::data(index)`, which stops counting
/// planes when `linesize[1] == 0`. Planar audio frames often only populate
/// `linesize[0]`, which then describes every plane.
pub fn audio_plane_data(frame: &ffmpeg::util::frame::Audio, index: usize) -> &[u8] {
    // SAFETY: the plane index is bounds-checked against the channel count
    // (planar) or 0 (packed), and every plane of an allocated audio frame
    // spans `linesize[0]` bytes.
    unsafe {
        let f = frame.as_ptr();
        let channels = (*f).ch_layout.nb_channels as usize;

        if frame.format().is_planar() {
            if index >= channels {
                return &[];
            }
        } else if index > 0 {
            return &[];
        }

        let ptrs = (*f).extended_data;
        if ptrs.is_null() {
            return &[];
        }
        let plane_ptr = *ptrs.add(index);
        if plane_ptr.is_null() {
            return &[];
        }

        let size = (*f).linesize[0] as usize;
        std::slice::from_raw_parts(plane_ptr, size)
    }
}

/// Mutable counterpart of [`audio_plane_data`].
pub fn audio_plane_data_mut(frame: &mut ffmpeg::util::frame::Audio, index: usize) -> &mut [u8] {
    // SAFETY: see `audio_plane_data`; the frame is borrowed mutably.
    unsafe {
        let f = frame.as_mut_ptr();
        let channels = (*f).ch_layout.nb_channels as usize;

        if frame.format().is_planar() {
            if index >= channels {
                return &mut [];
            }
        } else if index > 0 {
            return &mut [];
        }

        let ptrs = (*f).extended_data;
        if ptrs.is_null() {
            return &mut [];
        }
        let plane_ptr = *ptrs.add(index);
        if plane_ptr.is_null() {
            return &mut [];
        }

        let size = (*f).linesize[0] as usize;
        std::slice::from_raw_parts_mut(plane_ptr, size)
    }
}

// ── Format conversions ──────────────────────────────────────────────────────

pub fn to_sample(format: SampleFormat) -> Sample {
    fn ty(layout: Layout) -> Type {
        match layout {
            Layout::Packed => Type::Packed,
            Layout::Planar => Type::Planar,
        }
    }
    match format {
        SampleFormat::U8(l) => Sample::U8(ty(l)),
        SampleFormat::I16(l) => Sample::I16(ty(l)),
        SampleFormat::I32(l) => Sample::I32(ty(l)),
        SampleFormat::I64(l) => Sample::I64(ty(l)),
        SampleFormat::F32(l) => Sample::F32(ty(l)),
        SampleFormat::F64(l) => Sample::F64(ty(l)),
    }
}

/// `None` for `Sample::None`.
pub fn from_sample(sample: Sample) -> Option<SampleFormat> {
    fn layout(ty: Type) -> Layout {
        match ty {
            Type::Packed => Layout::Packed,
            Type::Planar => Layout::Planar,
        }
    }
    match sample {
        Sample::None => None,
        Sample::U8(t) => Some(SampleFormat::U8(layout(t))),
        Sample::I16(t) => Some(SampleFormat::I16(layout(t))),
        Sample::I32(t) => Some(SampleFormat::I32(layout(t))),
        Sample::I64(t) => Some(SampleFormat::I64(layout(t))),
        Sample::F32(t) => Some(SampleFormat::F32(layout(t))),
        Sample::F64(t) => Some(SampleFormat::F64(layout(t))),
    }
}

/// Channel layout for a configured output channel count.
pub fn layout_for_channels(channels: u16) -> std::result::Result<ChannelLayout, ConfigError> {
    match channels {
        1 => Ok(ChannelLayout::MONO),
        2 => Ok(ChannelLayout::STEREO),
        6 => Ok(ChannelLayout::_5POINT1),
        8 => Ok(ChannelLayout::_7POINT1),
        n => Err(ConfigError::UnsupportedChannels(n)),
    }
}

/// Channel layout of decoded input: the one the decoder announced when it
/// covers every channel, otherwise FFmpeg's default for the channel count.
pub fn input_layout(announced: ChannelLayout, channels: u16) -> ChannelLayout {
    if !announced.is_empty() && announced.channels() == channels as i32 {
        return announced;
    }
    layout_for_channels(channels).unwrap_or_else(|_| ChannelLayout::default(channels as i32))
}

/// Copy a decoded FFmpeg frame into an owned [`AudioFrame`].
pub fn frame_from_ffmpeg(frame: &ffmpeg::util::frame::Audio) -> Result<AudioFrame> {
    let format = from_sample(frame.format()).ok_or_else(|| {
        TranscodeError::Decode("decoded frame has no sample format".into())
    })?;
    let spec = SampleSpec::new(format, frame.channels() as u16, frame.rate());
    let samples = frame.samples();
    let len = spec.plane_len(samples);

    let mut planes = Vec::with_capacity(spec.planes());
    for p in 0..spec.planes() {
        let data = audio_plane_data(frame, p);
        if data.len() < len {
            return Err(TranscodeError::Decode(format!(
                "decoded plane {} holds {} bytes, expected {}",
                p,
                data.len(),
                len
            )));
        }
        planes.push(data[..len].to_vec());
    }

    let mut out = AudioFrame::from_planes(spec, samples, planes)
        .ok_or_else(|| TranscodeError::Decode("decoded frame has inconsistent planes".into()))?;
    out.set_pts(frame.pts());
    Ok(out)
}

/// Copy an [`AudioFrame`] into a freshly allocated FFmpeg frame.
pub fn frame_to_ffmpeg(
    frame: &AudioFrame,
    layout: ChannelLayout,
) -> Result<ffmpeg::util::frame::Audio> {
    let spec = frame.spec();
    let mut out =
        ffmpeg::util::frame::Audio::new(to_sample(spec.format), frame.samples(), layout);
    out.set_rate(spec.rate);
    out.set_pts(frame.pts());

    for p in 0..frame.planes() {
        let src = frame.plane(p);
        let dst = audio_plane_data_mut(&mut out, p);
        if dst.len() < src.len() {
            return Err(TranscodeError::Allocation(format!(
                "frame plane {} holds {} bytes, need {}",
                p,
                dst.len(),
                src.len()
            )));
        }
        dst[..src.len()].copy_from_slice(src);
    }
    Ok(out)
}
