//! Sample FIFO
//!
//! Elastic queue of raw samples in the encoder's sample spec. It absorbs the
//! difference between decoder frame sizes and encoder frame sizes. Sizes are
//! always counted in samples (per channel), never bytes.
//!
//! Each data plane is a ring buffer (`VecDeque<u8>`), so reading from the
//! front never shifts the remaining samples. Capacity only grows through
//! [`SampleFifo::reserve`]; [`SampleFifo::write`] never allocates, which makes
//! a write into an under-reserved FIFO a detectable bug instead of a silent
//! reallocation.

use std::collections::VecDeque;

use crate::error::FifoError;
use crate::media::{AudioFrame, SampleSpec};

/// FIFO of raw audio samples addressed in sample counts
#[derive(Debug)]
pub struct SampleFifo {
    spec: SampleSpec,
    planes: Vec<VecDeque<u8>>,
    occupancy: usize,
}

impl SampleFifo {
    /// Create an empty FIFO holding samples in `spec`.
    pub fn new(spec: SampleSpec) -> Self {
        Self {
            spec,
            planes: (0..spec.planes()).map(|_| VecDeque::new()).collect(),
            occupancy: 0,
        }
    }

    pub fn spec(&self) -> SampleSpec {
        self.spec
    }

    /// Number of buffered samples.
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    /// Number of samples the FIFO can hold without growing.
    pub fn capacity(&self) -> usize {
        let stride = self.spec.plane_stride();
        if stride == 0 {
            return 0;
        }
        self.planes
            .iter()
            .map(|p| p.capacity() / stride)
            .min()
            .unwrap_or(0)
    }

    /// Grow capacity to hold at least `occupancy + additional` samples.
    ///
    /// Buffered samples are kept.
    pub fn reserve(&mut self, additional: usize) -> Result<(), FifoError> {
        let bytes = self.spec.plane_len(additional);
        for plane in &mut self.planes {
            plane
                .try_reserve(bytes)
                .map_err(|_| FifoError::Allocation {
                    requested: additional,
                })?;
        }
        Ok(())
    }

    /// Append the first `count` samples of `frame`.
    ///
    /// Either all `count` samples are stored or none are: if the frame holds
    /// fewer samples, or the reserved capacity cannot take them, the FIFO is
    /// left untouched and `ShortWrite` reports how many would have fit.
    pub fn write(&mut self, frame: &AudioFrame, count: usize) -> Result<(), FifoError> {
        if frame.spec() != self.spec {
            return Err(FifoError::FormatMismatch);
        }

        let room = self.capacity().saturating_sub(self.occupancy);
        let accepted = count.min(frame.samples()).min(room);
        if accepted < count {
            return Err(FifoError::ShortWrite {
                requested: count,
                accepted,
            });
        }

        let len = self.spec.plane_len(count);
        for (index, plane) in self.planes.iter_mut().enumerate() {
            plane.extend(&frame.plane(index)[..len]);
        }
        self.occupancy += count;
        Ok(())
    }

    /// Remove `count` samples from the front into the start of `frame`.
    ///
    /// Fails without consuming anything if fewer than `count` samples are
    /// buffered.
    pub fn read_into(&mut self, frame: &mut AudioFrame, count: usize) -> Result<(), FifoError> {
        if frame.spec() != self.spec {
            return Err(FifoError::FormatMismatch);
        }
        if count > self.occupancy {
            return Err(FifoError::InsufficientData {
                requested: count,
                available: self.occupancy,
            });
        }
        if count > frame.samples() {
            return Err(FifoError::ShortWrite {
                requested: count,
                accepted: frame.samples(),
            });
        }

        let len = self.spec.plane_len(count);
        for (index, plane) in self.planes.iter_mut().enumerate() {
            let dst = &mut frame.plane_mut(index)[..len];
            let (head, tail) = plane.as_slices();
            if head.len() >= len {
                dst.copy_from_slice(&head[..len]);
            } else {
                let split = head.len();
                dst[..split].copy_from_slice(head);
                dst[split..].copy_from_slice(&tail[..len - split]);
            }
            plane.drain(..len);
        }
        self.occupancy -= count;
        Ok(())
    }

    /// Remove and return exactly `count` samples as a new frame.
    pub fn read(&mut self, count: usize) -> Result<AudioFrame, FifoError> {
        if count > self.occupancy {
            return Err(FifoError::InsufficientData {
                requested: count,
                available: self.occupancy,
            });
        }
        let mut frame = AudioFrame::alloc(self.spec, count);
        self.read_into(&mut frame, count)?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{Layout, SampleFormat};

    fn stereo_s16p() -> SampleSpec {
        SampleSpec::new(SampleFormat::I16(Layout::Planar), 2, 48000)
    }

    /// Frame whose sample `i` on channel `ch` holds the value `start + i`
    /// (channel 1 negated), so order and plane separation can be checked.
    fn counting_frame(spec: SampleSpec, start: i16, samples: usize) -> AudioFrame {
        let mut frame = AudioFrame::alloc(spec, samples);
        for ch in 0..spec.planes() {
            let plane = frame.plane_mut(ch);
            for i in 0..samples {
                let mut v = start.wrapping_add(i as i16);
                if ch == 1 {
                    v = v.wrapping_neg();
                }
                plane[i * 2..i * 2 + 2].copy_from_slice(&v.to_ne_bytes());
            }
        }
        frame
    }

    fn sample_at(frame: &AudioFrame, ch: usize, i: usize) -> i16 {
        let p = frame.plane(ch);
        i16::from_ne_bytes([p[i * 2], p[i * 2 + 1]])
    }

    #[test]
    fn test_write_requires_reserve() {
        let spec = stereo_s16p();
        let mut fifo = SampleFifo::new(spec);
        let frame = counting_frame(spec, 0, 10);

        let err = fifo.write(&frame, 10).unwrap_err();
        assert!(matches!(err, FifoError::ShortWrite { requested: 10, .. }));
        assert_eq!(fifo.occupancy(), 0);

        fifo.reserve(10).unwrap();
        fifo.write(&frame, 10).unwrap();
        assert_eq!(fifo.occupancy(), 10);
    }

    #[test]
    fn test_write_more_than_frame_holds() {
        let spec = stereo_s16p();
        let mut fifo = SampleFifo::new(spec);
        fifo.reserve(100).unwrap();
        let frame = counting_frame(spec, 0, 10);

        assert_eq!(
            fifo.write(&frame, 20),
            Err(FifoError::ShortWrite {
                requested: 20,
                accepted: 10
            })
        );
        assert_eq!(fifo.occupancy(), 0);
    }

    #[test]
    fn test_reserve_keeps_content() {
        let spec = stereo_s16p();
        let mut fifo = SampleFifo::new(spec);
        fifo.reserve(4).unwrap();
        fifo.write(&counting_frame(spec, 100, 4), 4).unwrap();

        fifo.reserve(10_000).unwrap();
        assert!(fifo.capacity() >= 10_004);
        assert_eq!(fifo.occupancy(), 4);

        let out = fifo.read(4).unwrap();
        assert_eq!(sample_at(&out, 0, 0), 100);
        assert_eq!(sample_at(&out, 0, 3), 103);
        assert_eq!(sample_at(&out, 1, 3), -103);
    }

    #[test]
    fn test_read_preserves_order_across_writes() {
        let spec = stereo_s16p();
        let mut fifo = SampleFifo::new(spec);

        fifo.reserve(1500).unwrap();
        fifo.write(&counting_frame(spec, 0, 1500), 1500).unwrap();

        let first = fifo.read(1024).unwrap();
        assert_eq!(first.samples(), 1024);
        assert_eq!(sample_at(&first, 0, 1023), 1023);
        assert_eq!(fifo.occupancy(), 476);

        fifo.reserve(1500).unwrap();
        fifo.write(&counting_frame(spec, 1500, 1500), 1500).unwrap();

        let second = fifo.read(1024).unwrap();
        assert_eq!(sample_at(&second, 0, 0), 1024);
        assert_eq!(sample_at(&second, 0, 475), 1499);
        assert_eq!(sample_at(&second, 0, 476), 1500);
        assert_eq!(sample_at(&second, 1, 476), -1500);
        assert_eq!(fifo.occupancy(), 952);
    }

    #[test]
    fn test_insufficient_read_is_noop() {
        let spec = stereo_s16p();
        let mut fifo = SampleFifo::new(spec);
        fifo.reserve(300).unwrap();
        fifo.write(&counting_frame(spec, 7, 300), 300).unwrap();

        assert_eq!(
            fifo.read(1024).unwrap_err(),
            FifoError::InsufficientData {
                requested: 1024,
                available: 300
            }
        );
        assert_eq!(fifo.occupancy(), 300);

        let out = fifo.read(300).unwrap();
        assert_eq!(sample_at(&out, 0, 0), 7);
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_format_mismatch() {
        let mut fifo = SampleFifo::new(stereo_s16p());
        fifo.reserve(10).unwrap();
        let other = SampleSpec::new(SampleFormat::F32(Layout::Planar), 2, 48000);
        let frame = AudioFrame::alloc(other, 10);
        assert_eq!(fifo.write(&frame, 10), Err(FifoError::FormatMismatch));
    }

    #[test]
    fn test_packed_layout_single_plane() {
        let spec = SampleSpec::new(SampleFormat::I16(Layout::Packed), 2, 44100);
        let mut fifo = SampleFifo::new(spec);
        let mut frame = AudioFrame::alloc(spec, 3);
        frame.plane_mut(0).copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);

        fifo.reserve(3).unwrap();
        fifo.write(&frame, 3).unwrap();
        let out = fifo.read(2).unwrap();
        assert_eq!(out.plane(0), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(fifo.occupancy(), 1);
    }

    #[test]
    fn test_occupancy_tracks_writes_minus_reads() {
        let spec = stereo_s16p();
        let mut fifo = SampleFifo::new(spec);
        let mut written = 0usize;
        let mut read = 0usize;
        let mut next = 0i16;
        let mut seed: u32 = 0x2545_f491;

        for _ in 0..200 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let n = (seed >> 16) as usize % 700;
            fifo.reserve(n).unwrap();
            fifo.write(&counting_frame(spec, written as i16, n), n).unwrap();
            written += n;

            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let m = (seed >> 16) as usize % 900;
            match fifo.read(m) {
                Ok(out) => {
                    if m > 0 {
                        assert_eq!(sample_at(&out, 0, 0), next);
                    }
                    read += m;
                    next = read as i16;
                }
                Err(FifoError::InsufficientData { available, .. }) => {
                    assert!(m > available);
                    assert_eq!(available, written - read);
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
            assert_eq!(fifo.occupancy(), written - read);
        }
    }
}
