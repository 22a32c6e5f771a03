//! Модуль для смешивания речи с фоновой дорожкой
//!
//! Фон (музыка, шумы окружения) необязателен: если файл отсутствует,
//! речь возвращается без изменений.

use std::path::Path;

use log::{info, warn};

use crate::config::{MixConfig, ResamplerKind};
use crate::error::Result;
use crate::media::audio::{fold_to_mono, read_audio_file, AudioBuffer};
use crate::media::normalize::TrackNormalizer;
use crate::media::resample::SegmentResampler;
use crate::segment::RawSegmentAudio;

/// Фоновая дорожка, готовая к смешиванию
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundStem {
    /// Моно-семплы
    pub samples: Vec<f32>,
    /// Исходная частота дискретизации
    pub sample_rate: u32,
}

impl BackgroundStem {
    /// Создать фон из сырого аудио, сведя каналы в моно
    pub fn from_raw(audio: &RawSegmentAudio) -> Self {
        Self {
            samples: fold_to_mono(&audio.samples, audio.channels.max(1)),
            sample_rate: audio.sample_rate,
        }
    }

    /// Найти фон по пути.
    ///
    /// Отсутствующий путь или файл дает `None`; ошибка декодирования
    /// существующего файла возвращается как ошибка.
    pub fn detect(path: Option<&Path>) -> Result<Option<Self>> {
        let path = match path {
            Some(path) if path.exists() => path,
            Some(path) => {
                warn!("Background file {} not found, mixing speech only", path.display());
                return Ok(None);
            }
            None => return Ok(None),
        };

        let raw = read_audio_file(path)?;
        Ok(Some(Self::from_raw(&raw)))
    }
}

/// Смешивает дорожку речи с фоном
#[derive(Debug, Clone)]
pub struct BackgroundMixer {
    background_gain: f32,
    speech_peak: TrackNormalizer,
    output_limit: TrackNormalizer,
    resampler: ResamplerKind,
}

impl BackgroundMixer {
    pub fn new(config: &MixConfig) -> Self {
        Self {
            background_gain: config.background_gain,
            speech_peak: TrackNormalizer::new(config.speech_target_peak),
            output_limit: TrackNormalizer::default(),
            resampler: config.resampler,
        }
    }

    /// Смешать речь с фоном.
    ///
    /// Длина результата всегда равна длине речи. Без фона речь
    /// возвращается без изменений.
    pub fn mix(&self, speech: &AudioBuffer, background: Option<&BackgroundStem>) -> Result<AudioBuffer> {
        let background = match background {
            Some(stem) => stem,
            None => {
                info!("No background stem, keeping speech track as is");
                return Ok(speech.clone());
            }
        };

        let resampler = SegmentResampler::new(speech.sample_rate, self.resampler);
        let mut stem = if background.sample_rate == 0 {
            warn!("Background stem has zero sample rate, treating as silence");
            Vec::new()
        } else {
            resampler.resample_mono(background.samples.clone(), background.sample_rate)?
        };
        // Фон обрезается или дополняется тишиной до длины речи
        stem.resize(speech.len(), 0.0);

        let mut voice = speech.samples.clone();
        self.speech_peak.apply(&mut voice);

        let mut mixed: Vec<f32> = voice
            .iter()
            .zip(stem.iter())
            .map(|(v, b)| v + b * self.background_gain)
            .collect();
        self.output_limit.apply(&mut mixed);

        info!(
            "Mixed {:.2}s speech with background (gain {:.2}), peak {:.3}",
            speech.duration(),
            self.background_gain,
            crate::media::audio::peak(&mixed)
        );
        Ok(AudioBuffer::new(mixed, speech.sample_rate))
    }

    /// Смешать речь с фоном из файла, если он существует
    pub fn mix_with_file(&self, speech: &AudioBuffer, background_path: Option<&Path>) -> Result<AudioBuffer> {
        let stem = BackgroundStem::detect(background_path)?;
        self.mix(speech, stem.as_ref())
    }
}
