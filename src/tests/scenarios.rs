//! Whole-pipeline runs over scripted collaborators

use crate::error::{ConfigError, TranscodeError};
use crate::tests::fixtures::{fltp_stereo, EncoderLog, Harness};
use crate::transcode::PipelineState;

/// Every frame is full except possibly the last one.
fn assert_frame_contract(log: &EncoderLog, frame_size: usize) {
    let sizes = log.frame_sizes();
    if let Some((last, full)) = sizes.split_last() {
        assert!(full.iter().all(|&s| s == frame_size), "sizes: {:?}", sizes);
        assert!(*last > 0 && *last <= frame_size, "sizes: {:?}", sizes);
    }
}

/// Frame timestamps start at zero and advance by the previous frame's size.
fn assert_contiguous_pts(log: &EncoderLog) {
    let mut expected = 0i64;
    for frame in &log.frames {
        assert_eq!(frame.pts, expected);
        expected += frame.samples as i64;
    }
}

#[test]
fn test_exact_multiple_of_frame_size() {
    // one 4096-sample decoded frame against a 1024-sample encoder
    let harness = Harness::new(&[&[4096]], 1024);
    let stats = harness.build().run().unwrap();

    let log = harness.encoder_log();
    let log = log.borrow();
    assert_eq!(log.frame_sizes(), vec![1024; 4]);
    assert_eq!(log.frame_pts(), vec![0, 1024, 2048, 3072]);
    // the single flush call comes back empty
    assert_eq!(log.flush_calls, 1);
    assert_eq!(stats.packets_flushed, 0);

    let sink = harness.sink_log();
    let sink = sink.borrow();
    assert!(sink.header && sink.trailer);
    assert_eq!(sink.packet_pts(), vec![0, 1024, 2048, 3072]);
}

#[test]
fn test_short_final_frame() {
    let harness = Harness::new(&[&[1024], &[1024], &[300]], 1024);
    let stats = harness.build().run().unwrap();

    let log = harness.encoder_log();
    let log = log.borrow();
    assert_eq!(log.frame_sizes(), vec![1024, 1024, 300]);
    assert_eq!(log.frame_pts(), vec![0, 1024, 2048]);
    assert_eq!(stats.samples_encoded, 2348);
}

#[test]
fn test_decoder_frames_larger_than_encoder_frames() {
    let mut transcoder = Harness::new(&[&[1500], &[1500]], 1024).build();

    // first decode fills the FIFO past one frame
    assert_eq!(transcoder.step().unwrap(), PipelineState::Filling);
    assert_eq!(transcoder.context().fifo.occupancy(), 1500);
    assert_eq!(transcoder.step().unwrap(), PipelineState::Draining);

    // one frame goes out, the remainder is too short
    assert_eq!(transcoder.step().unwrap(), PipelineState::Draining);
    assert_eq!(transcoder.context().fifo.occupancy(), 476);
    assert_eq!(transcoder.context().stats.frames_decoded, 1);
    assert_eq!(transcoder.step().unwrap(), PipelineState::Filling);

    // so the second decoded frame is appended before encoding again
    assert_eq!(transcoder.step().unwrap(), PipelineState::Filling);
    assert_eq!(transcoder.context().stats.frames_decoded, 2);
    assert_eq!(transcoder.context().stats.frames_encoded, 1);
    assert_eq!(transcoder.context().fifo.occupancy(), 1976);
}

#[test]
fn test_sample_rate_mismatch_rejected_up_front() {
    let harness = Harness::new(&[&[1024]], 1024).source_rate(44100);
    let err = harness.try_build().err().expect("rate mismatch must fail");
    assert!(matches!(
        err,
        TranscodeError::Config(ConfigError::SampleRateMismatch {
            source_rate: 44100,
            encoder_rate: 48000
        })
    ));
    assert!(harness.encoder_log().borrow().frames.is_empty());
    assert!(!harness.sink_log().borrow().header);
}

#[test]
fn test_irregular_frames_keep_timestamps_contiguous() {
    let packets: Vec<Vec<u32>> = (0..12).map(|i| vec![700 + (i * 137) % 900]).collect();
    let refs: Vec<&[u32]> = packets.iter().map(|p| p.as_slice()).collect();
    let harness = Harness::new(&refs, 1024).encoder_delay(3).decoder_delay(1);
    let stats = harness.build().run().unwrap();

    let log = harness.encoder_log();
    let log = log.borrow();
    assert_frame_contract(&log, 1024);
    assert_contiguous_pts(&log);

    let pts = harness.sink_log().borrow().packet_pts();
    assert!(pts.windows(2).all(|w| w[0] < w[1]), "pts: {:?}", pts);
    assert_eq!(stats.samples_encoded, harness.input_samples());
}

#[test]
fn test_every_sample_encoded_once_in_order() {
    let harness = Harness::new(&[&[480, 480, 480], &[2000], &[17]], 1024);
    let stats = harness.build().run().unwrap();

    assert_eq!(stats.samples_decoded, harness.input_samples());
    assert_eq!(stats.samples_buffered, stats.samples_encoded);
    assert_eq!(stats.samples_encoded, 3457);

    // counting samples: each frame starts where the previous one ended
    let log = harness.encoder_log();
    let log = log.borrow();
    for frame in &log.frames {
        assert_eq!(frame.first, Some(frame.pts as i16));
    }
}

#[test]
fn test_flush_drains_delayed_packets() {
    let packets = vec![&[1024u32][..]; 8];
    let harness = Harness::new(&packets, 1024).encoder_delay(5);
    let stats = harness.build().run().unwrap();

    assert_eq!(stats.frames_encoded, 8);
    assert_eq!(stats.packets_written, 8);
    assert_eq!(stats.packets_flushed, 5);
    // five packets, then the empty answer
    assert_eq!(harness.encoder_log().borrow().flush_calls, 6);

    let sink = harness.sink_log();
    let sink = sink.borrow();
    assert_eq!(sink.packets.len(), 8);
    assert!(sink.trailer);
}

#[test]
fn test_empty_input() {
    let harness = Harness::new(&[], 1024);
    let stats = harness.build().run().unwrap();

    assert_eq!(stats.frames_encoded, 0);
    assert_eq!(stats.packets_written, 0);
    assert_eq!(harness.encoder_log().borrow().flush_calls, 1);
    let sink = harness.sink_log();
    let sink = sink.borrow();
    assert!(sink.header && sink.trailer);
}

#[test]
fn test_format_conversion_preserves_sample_count() {
    let harness = Harness::new(&[&[1152], &[1152], &[1152]], 1024).encoder_spec(fltp_stereo(48000));
    let stats = harness.build().run().unwrap();

    assert_eq!(stats.samples_encoded, 3456);
    let log = harness.encoder_log();
    let log = log.borrow();
    assert_eq!(log.frame_sizes(), vec![1024, 1024, 1024, 384]);
    assert_contiguous_pts(&log);
}

#[test]
fn test_read_failure_aborts_without_trailer() {
    let harness = Harness::new(&[&[1024], &[1024], &[1024]], 1024).fail_reads_after(2);
    let err = harness.build().run().unwrap_err();

    assert!(matches!(err, TranscodeError::Read(_)));
    let sink = harness.sink_log();
    let sink = sink.borrow();
    assert!(sink.header);
    assert!(!sink.trailer);
}

#[test]
fn test_resampler_failure_aborts_run() {
    let harness = Harness::new(&[&[1024], &[1024]], 1024).fail_resample_after(1);
    let err = harness.build().run().unwrap_err();

    assert!(matches!(err, TranscodeError::Resample(_)));
    assert!(!err.is_internal());
    assert!(!harness.sink_log().borrow().trailer);
}

#[test]
fn test_encoder_failure_aborts_without_trailer() {
    let harness = Harness::new(&[&[1024], &[1024], &[1024]], 1024).fail_encode_after(1);
    let err = harness.build().run().unwrap_err();

    assert!(matches!(err, TranscodeError::Encode(_)));
    assert!(!err.is_internal());
    assert_eq!(harness.encoder_log().borrow().frames.len(), 1);

    let sink = harness.sink_log();
    let sink = sink.borrow();
    assert!(sink.header);
    assert_eq!(sink.packets.len(), 1);
    assert!(!sink.trailer);
}

#[test]
fn test_decoder_starving_after_flush_still_finishes() {
    let harness = Harness::new(&[&[1024], &[300]], 1024).starve_decoder_after_flush();
    let stats = harness.build().run().unwrap();

    assert_eq!(stats.samples_encoded, 1324);
    assert_eq!(
        harness.encoder_log().borrow().frame_sizes(),
        vec![1024, 300]
    );
    assert!(harness.sink_log().borrow().trailer);
}
