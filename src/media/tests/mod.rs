use std::f32::consts::PI;

use super::*;
use crate::config::ResamplerKind;
use crate::error::DubSyncError;

fn sine(freq: f32, seconds: f64, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let n = (seconds * sample_rate as f64).round() as usize;
    (0..n)
        .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * amplitude)
        .collect()
}

#[test]
fn test_short_clip_fills_slot_after_resampling() {
    // 0.5 с на 44.1 кГц в слот 1.0 с на 24 кГц
    let config = MixConfig::default();
    let raw = RawSegmentAudio::mono(sine(220.0, 0.5, 44_100, 0.4), 44_100);
    let segment = TimedSegment::new("Hola", 3.0, 4.0);

    let resampler = SegmentResampler::from_config(&config);
    let fitter = TimeFitter::new(&config).unwrap();
    let fitted = prepare_segment(&resampler, &fitter, &segment, &raw).unwrap();
    assert_eq!(fitted.len(), 24_000);
}

#[test]
fn test_overlapping_segments_normalized() {
    let config = MixConfig {
        sample_rate: 16_000,
        ..MixConfig::default()
    };
    let items = vec![
        (
            TimedSegment::new("first", 0.0, 1.0),
            Some(RawSegmentAudio::mono(vec![0.8; 16_000], 16_000)),
        ),
        (
            TimedSegment::new("second", 0.9, 2.0),
            Some(RawSegmentAudio::mono(vec![0.8; 17_600], 16_000)),
        ),
    ];

    let placements = prepare_segments(&config, items.clone()).unwrap();
    let raw_track = TimelineAssembler::new(&config).assemble(&placements);
    // Перекрытие [0.9, 1.0] суммируется
    assert!((raw_track.samples[15_000] - 1.6).abs() < 1e-6);
    assert!((raw_track.samples[10_000] - 0.8).abs() < 1e-6);

    let track = build_speech_track(&config, items).unwrap();
    assert_eq!(track.len(), raw_track.len());
    assert!(track.peak() <= 1.0);
    assert!((track.samples[15_000] - 1.0).abs() < 1e-6);
}

#[test]
fn test_placement_covers_last_segment() {
    let config = MixConfig::default();
    let segments = [
        TimedSegment::new("uno", 0.2, 1.1),
        TimedSegment::new("dos", 1.5, 2.9),
        TimedSegment::new("tres", 3.0, 4.25),
    ];
    let items = segments
        .iter()
        .map(|segment| {
            let audio = RawSegmentAudio::mono(sine(180.0, 1.0, 22_050, 0.5), 22_050);
            (segment.clone(), Some(audio))
        })
        .collect();

    let track = build_speech_track(&config, items).unwrap();
    assert!(track.len() >= (4.25 * 24_000.0f64).round() as usize);
    assert!(track.peak() <= 1.0);
}

#[test]
fn test_missing_audio_becomes_silence() {
    let config = MixConfig {
        sample_rate: 8_000,
        resampler: ResamplerKind::Linear,
        ..MixConfig::default()
    };
    let items = vec![
        (TimedSegment::new("lost", 0.0, 1.0), None),
        (
            TimedSegment::new("kept", 1.0, 2.0),
            Some(RawSegmentAudio::mono(vec![0.3; 8_000], 8_000)),
        ),
    ];

    let track = build_speech_track(&config, items).unwrap();
    assert_eq!(track.len(), 24_000);
    assert!(track.samples[..8_000].iter().all(|&s| s == 0.0));
    assert!((track.samples[12_000] - 0.3).abs() < 1e-6);
}

#[test]
fn test_full_chain_with_background() {
    let config = MixConfig {
        sample_rate: 16_000,
        ..MixConfig::default()
    };
    let items = vec![(
        TimedSegment::new("speech", 0.0, 2.0),
        Some(RawSegmentAudio::mono(sine(200.0, 2.0, 16_000, 0.9), 16_000)),
    )];
    let speech = build_speech_track(&config, items).unwrap();

    let stem = BackgroundStem::from_raw(&RawSegmentAudio {
        samples: sine(90.0, 5.0, 32_000, 0.3)
            .into_iter()
            .flat_map(|s| [s, s])
            .collect(),
        channels: 2,
        sample_rate: 32_000,
    });
    let mixed = BackgroundMixer::new(&config).mix(&speech, Some(&stem)).unwrap();

    assert_eq!(mixed.len(), speech.len());
    assert_eq!(mixed.sample_rate, 16_000);
    assert!(mixed.peak() <= 1.0);
}

#[test]
fn test_empty_segment_list_gives_silence() {
    let config = MixConfig::default();
    let track = build_speech_track(&config, Vec::new()).unwrap();
    assert_eq!(track.len(), 24_000);
    assert_eq!(track.peak(), 0.0);
}

#[test]
fn test_inverted_clamp_bounds_fail_without_panic() {
    let config = MixConfig {
        stretch_clamp_min: 1.5,
        stretch_clamp_max: 1.2,
        ..MixConfig::default()
    };
    let items = vec![(
        TimedSegment::new("too long", 0.0, 1.0),
        Some(RawSegmentAudio::mono(sine(200.0, 3.0, 24_000, 0.5), 24_000)),
    )];
    let result = build_speech_track(&config, items);
    assert!(matches!(result, Err(DubSyncError::Configuration(_))));
}
