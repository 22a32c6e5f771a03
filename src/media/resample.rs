//! Приведение аудио сегмента к рабочей частоте и моно.
//!
//! Sinc-интерполяция выполняется через rubato, линейная доступна как
//! упрощенный вариант. В обоих случаях длина результата равна
//! `round(len * target_rate / source_rate)`.

use log::debug;
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use crate::config::{MixConfig, ResamplerKind};
use crate::error::{DubSyncError, Result};
use crate::media::audio::fold_to_mono;
use crate::segment::RawSegmentAudio;

/// Размер блока, подаваемого в rubato
const CHUNK_SIZE: usize = 1024;

/// Приводит сырое аудио синтезатора к моно с рабочей частотой дискретизации
#[derive(Debug, Clone)]
pub struct SegmentResampler {
    sample_rate: u32,
    kind: ResamplerKind,
}

impl SegmentResampler {
    /// Создать ресемплер для рабочей частоты `sample_rate`
    pub fn new(sample_rate: u32, kind: ResamplerKind) -> Self {
        Self { sample_rate, kind }
    }

    /// Создать ресемплер из конфигурации
    pub fn from_config(config: &MixConfig) -> Self {
        Self::new(config.sample_rate, config.resampler)
    }

    /// Рабочая частота дискретизации
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Свести каналы и передискретизировать.
    ///
    /// Пустой вход возвращается как пустой буфер. Если частоты совпадают,
    /// семплы после сведения каналов не изменяются.
    pub fn process(&self, audio: &RawSegmentAudio) -> Result<Vec<f32>> {
        if audio.channels == 0 {
            return Err(DubSyncError::InvalidFormat("audio has zero channels".to_string()));
        }
        if audio.samples.is_empty() {
            return Ok(Vec::new());
        }
        if audio.sample_rate == 0 {
            return Err(DubSyncError::InvalidFormat("audio has zero sample rate".to_string()));
        }

        let mono = fold_to_mono(&audio.samples, audio.channels);
        self.resample_mono(mono, audio.sample_rate)
    }

    /// Передискретизировать моно-сигнал с частоты `source_rate`
    pub fn resample_mono(&self, mono: Vec<f32>, source_rate: u32) -> Result<Vec<f32>> {
        if source_rate == self.sample_rate || mono.is_empty() {
            return Ok(mono);
        }

        let expected = expected_len(mono.len(), source_rate, self.sample_rate);
        let mut output = match self.kind {
            ResamplerKind::Linear => resample_linear(&mono, expected),
            ResamplerKind::Sinc => resample_sinc(&mono, source_rate, self.sample_rate, expected)?,
        };
        output.resize(expected, 0.0);

        debug!(
            "Resampled {} -> {} samples ({} Hz -> {} Hz, {:?})",
            mono.len(),
            output.len(),
            source_rate,
            self.sample_rate,
            self.kind
        );
        Ok(output)
    }
}

/// Ожидаемая длина после передискретизации
pub fn expected_len(len: usize, source_rate: u32, target_rate: u32) -> usize {
    (len as f64 * target_rate as f64 / source_rate as f64).round() as usize
}

/// Линейная интерполяция к длине `output_len`
pub fn resample_linear(input: &[f32], output_len: usize) -> Vec<f32> {
    if input.is_empty() || output_len == 0 {
        return vec![0.0; output_len];
    }
    if input.len() == 1 {
        return vec![input[0]; output_len];
    }

    // Шаг по входу сохраняет длительность сигнала
    let step = input.len() as f64 / output_len as f64;
    let last = input.len() - 1;

    (0..output_len)
        .map(|i| {
            let position = i as f64 * step;
            let index = position.floor() as usize;
            if index >= last {
                return input[last];
            }
            let fraction = (position - index as f64) as f32;
            input[index] + (input[index + 1] - input[index]) * fraction
        })
        .collect()
}

fn resample_sinc(input: &[f32], source_rate: u32, target_rate: u32, expected: usize) -> Result<Vec<f32>> {
    // Параметры sinc-интерполяции для высокого качества
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
        .map_err(|e| DubSyncError::Resampling(format!("Failed to initialize resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    let mut position = 0;
    while position < input.len() {
        let needed = resampler.input_frames_next();
        let remaining = input.len() - position;

        let frames = if remaining >= needed {
            let chunk = [&input[position..position + needed]];
            position += needed;
            resampler.process(&chunk[..], None)
        } else {
            let chunk = [&input[position..]];
            position = input.len();
            resampler.process_partial(Some(&chunk[..]), None)
        }
        .map_err(|e| DubSyncError::Resampling(format!("Resampling failed: {}", e)))?;

        output.extend_from_slice(&frames[0]);
    }

    // Выталкиваем хвост, задержанный фильтром
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| DubSyncError::Resampling(format!("Resampling failed: {}", e)))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    let start = delay.min(output.len());
    Ok(output.split_off(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_same_rate_is_passthrough() {
        let samples = sine(440.0, 0.2, 24_000);
        let resampler = SegmentResampler::new(24_000, ResamplerKind::Sinc);
        let result = resampler.process(&RawSegmentAudio::mono(samples.clone(), 24_000)).unwrap();
        assert_eq!(result, samples);
    }

    #[test]
    fn test_empty_input_passes_through() {
        let resampler = SegmentResampler::new(24_000, ResamplerKind::Sinc);
        let result = resampler.process(&RawSegmentAudio::mono(Vec::new(), 44_100)).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_zero_channels_rejected() {
        let resampler = SegmentResampler::new(24_000, ResamplerKind::Linear);
        let audio = RawSegmentAudio { samples: vec![0.1; 10], channels: 0, sample_rate: 24_000 };
        assert!(matches!(resampler.process(&audio), Err(DubSyncError::InvalidFormat(_))));
    }

    #[test]
    fn test_stereo_is_averaged() {
        let resampler = SegmentResampler::new(16_000, ResamplerKind::Linear);
        let audio = RawSegmentAudio {
            samples: vec![0.2, 0.4, 0.6, 0.8],
            channels: 2,
            sample_rate: 16_000,
        };
        let result = resampler.process(&audio).unwrap();
        assert_eq!(result.len(), 2);
        assert!((result[0] - 0.3).abs() < 1e-6);
        assert!((result[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_linear_length_contract() {
        let resampler = SegmentResampler::new(24_000, ResamplerKind::Linear);
        let samples = sine(440.0, 1.0, 44_100);
        let result = resampler.process(&RawSegmentAudio::mono(samples, 44_100)).unwrap();
        assert_eq!(result.len(), 24_000);

        // Некруглое соотношение: 1001 * 16000 / 44100 = 363.17 -> 363
        let resampler = SegmentResampler::new(16_000, ResamplerKind::Linear);
        let result = resampler.resample_mono(vec![0.0; 1001], 44_100).unwrap();
        assert_eq!(result.len(), 363);
    }

    #[test]
    fn test_sinc_length_and_level() {
        let resampler = SegmentResampler::new(24_000, ResamplerKind::Sinc);
        let samples = sine(440.0, 0.5, 48_000);
        let result = resampler.process(&RawSegmentAudio::mono(samples, 48_000)).unwrap();
        assert_eq!(result.len(), 12_000);

        // Амплитуда синусоиды сохраняется в середине сигнала
        let middle = &result[3_000..9_000];
        let max = middle.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert!((max - 0.5).abs() < 0.05, "peak after resampling: {}", max);
    }

    #[test]
    fn test_sinc_upsampling_short_clip() {
        let resampler = SegmentResampler::new(24_000, ResamplerKind::Sinc);
        let result = resampler.resample_mono(vec![0.25; 100], 16_000).unwrap();
        assert_eq!(result.len(), 150);
    }
}
