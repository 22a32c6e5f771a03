//! Модуль обработки аудио
//!
//! Цепочка сборки: передискретизация сегмента, подгонка длительности,
//! размещение на таймлайне, ограничение пика и смешивание с фоном.

use log::{debug, warn};
use rayon::prelude::*;

use crate::config::MixConfig;
use crate::error::Result;
use crate::segment::{RawSegmentAudio, TimedSegment};

pub mod audio;
pub mod mixer;
pub mod normalize;
pub mod resample;
pub mod stretch;
pub mod timeline;

#[cfg(test)]
mod tests;

pub use audio::{read_audio_file, read_wav, write_wav, AudioBuffer};
pub use mixer::{BackgroundMixer, BackgroundStem};
pub use normalize::TrackNormalizer;
pub use resample::SegmentResampler;
pub use stretch::{PhaseVocoder, TimeFitter};
pub use timeline::TimelineAssembler;

/// Подготовить один сегмент: моно, рабочая частота, длительность слота
pub fn prepare_segment(
    resampler: &SegmentResampler,
    fitter: &TimeFitter,
    segment: &TimedSegment,
    audio: &RawSegmentAudio,
) -> Result<Vec<f32>> {
    let mono = resampler.process(audio)?;
    fitter.fit(mono, segment.duration())
}

/// Подготовить все сегменты параллельно.
///
/// Сегменты без аудио и сегменты, которые не удалось обработать,
/// становятся тишиной. Порядок результата совпадает с порядком входа.
pub fn prepare_segments(
    config: &MixConfig,
    items: Vec<(TimedSegment, Option<RawSegmentAudio>)>,
) -> Result<Vec<(TimedSegment, Vec<f32>)>> {
    let resampler = SegmentResampler::from_config(config);
    let fitter = TimeFitter::new(config)?;

    let prepared = items
        .into_par_iter()
        .enumerate()
        .map(|(index, (segment, audio))| {
            let samples = match audio {
                Some(audio) => match prepare_segment(&resampler, &fitter, &segment, &audio) {
                    Ok(samples) => {
                        debug!("Segment {} fitted to {} samples", index, samples.len());
                        samples
                    }
                    Err(e) => {
                        warn!("Failed to fit segment {}: {}, using silence", index, e);
                        Vec::new()
                    }
                },
                None => Vec::new(),
            };
            (segment, samples)
        })
        .collect();

    Ok(prepared)
}

/// Собрать дорожку речи из синтезированных сегментов и ограничить пик до 1.0
pub fn build_speech_track(
    config: &MixConfig,
    items: Vec<(TimedSegment, Option<RawSegmentAudio>)>,
) -> Result<AudioBuffer> {
    let placements = prepare_segments(config, items)?;
    let mut track = TimelineAssembler::new(config).assemble(&placements);
    TrackNormalizer::default().apply(&mut track.samples);
    Ok(track)
}
