//! Сборка дорожки речи из подогнанных сегментов

use log::{debug, info};

use crate::config::MixConfig;
use crate::media::audio::{seconds_to_samples, AudioBuffer};
use crate::segment::TimedSegment;

/// Размещает сегменты на общем таймлайне по времени начала
#[derive(Debug, Clone)]
pub struct TimelineAssembler {
    sample_rate: u32,
    margin_secs: f64,
    empty_track_secs: f64,
}

impl TimelineAssembler {
    pub fn new(config: &MixConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            margin_secs: config.timeline_margin_secs,
            empty_track_secs: config.empty_track_secs,
        }
    }

    /// Собрать дорожку.
    ///
    /// Каждый сегмент прибавляется к буферу начиная с `round(start * sample_rate)`.
    /// Буфер растет, если сегмент выходит за его конец, поэтому ни один
    /// сегмент не обрезается. Перекрытия суммируются.
    pub fn assemble(&self, placements: &[(TimedSegment, Vec<f32>)]) -> AudioBuffer {
        if placements.is_empty() {
            info!("No segments to assemble, returning {:.1}s of silence", self.empty_track_secs);
            return AudioBuffer::silence(self.empty_track_secs, self.sample_rate);
        }

        let max_end = placements
            .iter()
            .map(|(segment, _)| segment.end)
            .fold(0.0f64, f64::max);
        let mut track = vec![0.0f32; seconds_to_samples(max_end + self.margin_secs, self.sample_rate)];

        let mut placed = 0usize;
        for (index, (segment, audio)) in placements.iter().enumerate() {
            if segment.is_silent() || audio.is_empty() {
                debug!("Segment {} is silent, skipping", index);
                continue;
            }

            let start_sample = seconds_to_samples(segment.start, self.sample_rate);
            let end_sample = start_sample + audio.len();
            if end_sample > track.len() {
                debug!(
                    "Segment {} overruns the track by {} samples, growing",
                    index,
                    end_sample - track.len()
                );
                track.resize(end_sample, 0.0);
            }

            for (slot, sample) in track[start_sample..end_sample].iter_mut().zip(audio) {
                *slot += *sample;
            }
            placed += 1;
        }

        info!(
            "Assembled {} of {} segments into {:.2}s track",
            placed,
            placements.len(),
            track.len() as f64 / self.sample_rate as f64
        );
        AudioBuffer::new(track, self.sample_rate)
    }
}
