//! Custom AVIOContext for in-memory reading
//!
//! Lets the demuxer probe and read a container held in a `Bytes` buffer
//! instead of a file.
//!
//! # Thread safety
//! `MemoryIo` is not `Send`: FFmpeg calls back into the reader through a raw
//! pointer, and the demuxer owning the context is used on one thread only.

use std::ffi::c_void;
use std::ptr;

use bytes::Bytes;
use ffmpeg_next as ffmpeg;

use crate::error::{Result, TranscodeError};

const BUFFER_SIZE: usize = 4096;

// whence flags FFmpeg may pass to the seek callback
const AVSEEK_SIZE: i32 = 0x10000;
const AVSEEK_FORCE: i32 = 0x20000;

/// Read cursor over an in-memory container
pub struct MemoryReader {
    data: Bytes,
    position: usize,
}

impl MemoryReader {
    pub fn new(data: Bytes) -> Self {
        Self { data, position: 0 }
    }

    /// Copy up to `buf.len()` bytes from the cursor. Returns 0 at the end.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let remaining = &self.data[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        n
    }

    /// Move the cursor (`whence` as for `lseek`). `None` when the target
    /// lies outside the buffer.
    pub fn seek(&mut self, offset: i64, whence: i32) -> Option<u64> {
        let base = match whence {
            0 => 0,
            1 => self.position as i64,
            2 => self.data.len() as i64,
            _ => return None,
        };
        let target = base.checked_add(offset)?;
        if target < 0 || target as usize > self.data.len() {
            return None;
        }
        self.position = target as usize;
        Some(target as u64)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// C-compatible callbacks for FFmpeg

unsafe extern "C" fn read_packet(opaque: *mut c_void, buf: *mut u8, buf_size: i32) -> i32 {
    let reader = &mut *(opaque as *mut MemoryReader);
    if buf_size <= 0 {
        return 0;
    }
    let out = std::slice::from_raw_parts_mut(buf, buf_size as usize);
    match reader.read(out) {
        0 => ffmpeg::ffi::AVERROR_EOF,
        n => n as i32,
    }
}

unsafe extern "C" fn seek_packet(opaque: *mut c_void, offset: i64, whence: i32) -> i64 {
    let reader = &mut *(opaque as *mut MemoryReader);

    if whence & AVSEEK_SIZE != 0 {
        return reader.len() as i64;
    }
    match reader.seek(offset, whence & !AVSEEK_FORCE) {
        Some(pos) => pos as i64,
        None => -1,
    }
}

/// Read-only AVIO context over a [`MemoryReader`]
///
/// Frees the context, its buffer and the reader on drop. Any demuxer reading
/// through it must be closed first.
pub struct MemoryIo {
    avio: *mut ffmpeg::ffi::AVIOContext,
    reader: *mut MemoryReader,
}

impl MemoryIo {
    pub fn new(data: Bytes) -> Result<Self> {
        // SAFETY: every allocation is checked for null, and on each failure
        // path the pieces allocated so far are released exactly once.
        unsafe {
            let reader = Box::into_raw(Box::new(MemoryReader::new(data)));

            let buffer = ffmpeg::ffi::av_malloc(BUFFER_SIZE) as *mut u8;
            if buffer.is_null() {
                drop(Box::from_raw(reader));
                return Err(TranscodeError::Allocation(
                    "failed to allocate AVIO buffer".into(),
                ));
            }

            let avio = ffmpeg::ffi::avio_alloc_context(
                buffer,
                BUFFER_SIZE as i32,
                0,
                reader as *mut c_void,
                Some(read_packet),
                None,
                Some(seek_packet),
            );
            if avio.is_null() {
                ffmpeg::ffi::av_free(buffer as *mut c_void);
                drop(Box::from_raw(reader));
                return Err(TranscodeError::Allocation(
                    "failed to allocate AVIO context".into(),
                ));
            }

            Ok(Self { avio, reader })
        }
    }
}

impl Drop for MemoryIo {
    fn drop(&mut self) {
        // SAFETY: `avio` and `reader` were allocated in `new` and are freed
        // only here. FFmpeg may have swapped the IO buffer, so the current
        // one is freed rather than the one passed in.
        unsafe {
            ffmpeg::ffi::av_freep(&mut (*self.avio).buffer as *mut *mut u8 as *mut c_void);
            ffmpeg::ffi::avio_context_free(&mut self.avio);
            drop(Box::from_raw(self.reader));
        }
    }
}

/// Open a demuxer reading through `io` and probe its streams.
///
/// The context is flagged as using custom IO, so closing it leaves `io` to
/// be freed by its owner.
pub fn open_memory_input(io: &mut MemoryIo) -> Result<ffmpeg::format::context::Input> {
    // SAFETY: `avformat_open_input` frees the context itself when it fails;
    // after it succeeds the context is closed on every path, either here or
    // by the returned `Input`.
    unsafe {
        let mut ctx = ffmpeg::ffi::avformat_alloc_context();
        if ctx.is_null() {
            return Err(TranscodeError::Allocation(
                "failed to allocate format context".into(),
            ));
        }
        (*ctx).pb = io.avio;
        (*ctx).flags |= ffmpeg::ffi::AVFMT_FLAG_CUSTOM_IO as i32;

        let ret = ffmpeg::ffi::avformat_open_input(
            &mut ctx,
            ptr::null(),
            ptr::null(),
            ptr::null_mut(),
        );
        if ret < 0 {
            return Err(TranscodeError::Open(format!(
                "failed to open in-memory input: {}",
                ffmpeg::Error::from(ret)
            )));
        }

        let ret = ffmpeg::ffi::avformat_find_stream_info(ctx, ptr::null_mut());
        if ret < 0 {
            ffmpeg::ffi::avformat_close_input(&mut ctx);
            return Err(TranscodeError::Open(format!(
                "failed to probe in-memory input: {}",
                ffmpeg::Error::from(ret)
            )));
        }

        Ok(ffmpeg::format::context::Input::wrap(ctx))
    }
}
