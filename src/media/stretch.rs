//! Модуль подгонки длительности сегмента под слот
//!
//! Растяжение и сжатие выполняются фазовым вокодером, поэтому высота
//! голоса не меняется. Результат всегда имеет длину ровно
//! `round(target_duration * sample_rate)` семплов.

use std::f32::consts::PI;
use std::sync::Arc;

use log::debug;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::MixConfig;
use crate::error::{DubSyncError, Result};
use crate::media::audio::{duration_in_seconds, seconds_to_samples};

/// Фазовый вокодер с постоянной высотой тона
pub struct PhaseVocoder {
    fft_size: usize,
    hop_size: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for PhaseVocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseVocoder")
            .field("fft_size", &self.fft_size)
            .field("hop_size", &self.hop_size)
            .finish()
    }
}

impl PhaseVocoder {
    /// Создать вокодер с размером окна `fft_size` и шагом `hop_size`
    pub fn new(fft_size: usize, hop_size: usize) -> Result<Self> {
        if fft_size < 4 || hop_size == 0 || hop_size > fft_size / 2 {
            return Err(DubSyncError::TimeStretching(format!(
                "Invalid vocoder geometry: fft_size={}, hop_size={}",
                fft_size, hop_size
            )));
        }

        // Периодическое окно Ханна
        let window = (0..fft_size)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / fft_size as f32).cos())
            .collect();

        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        Ok(Self {
            fft_size,
            hop_size,
            window,
            forward,
            inverse,
        })
    }

    /// Изменить темп сигнала.
    ///
    /// `rate > 1` ускоряет, `rate < 1` замедляет. Длина результата
    /// `round(len / rate)`.
    pub fn stretch(&self, input: &[f32], rate: f64) -> Result<Vec<f32>> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(DubSyncError::TimeStretching(format!("Invalid stretch rate: {}", rate)));
        }
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let n = self.fft_size;
        let hop = self.hop_size;
        let bins = n / 2 + 1;
        let pad = n / 2;

        // Центрированный STFT: дополняем нулями с обеих сторон
        let mut padded = vec![0.0f32; pad];
        padded.extend_from_slice(input);
        padded.resize(pad + input.len() + pad + n, 0.0);

        let frame_count = 1 + input.len() / hop;
        let mut spectra = Vec::with_capacity(frame_count + 1);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
        for frame in 0..frame_count {
            let offset = frame * hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[offset + i] * self.window[i], 0.0);
            }
            self.forward.process(&mut buffer);
            spectra.push(buffer[..bins].to_vec());
        }
        // Нулевой кадр для интерполяции последнего шага
        spectra.push(vec![Complex::new(0.0, 0.0); bins]);

        // Ожидаемый прирост фазы за один шаг для каждого бина
        let advance: Vec<f32> = (0..bins)
            .map(|k| 2.0 * PI * k as f32 * hop as f32 / n as f32)
            .collect();
        let mut phase: Vec<f32> = spectra[0].iter().map(|c| c.arg()).collect();

        let mut frames_out: Vec<Vec<Complex<f32>>> = Vec::new();
        let mut time = 0.0f64;
        while time < frame_count as f64 {
            let index = time.floor() as usize;
            let fraction = (time - index as f64) as f32;
            let current = &spectra[index];
            let next = &spectra[index + 1];

            let mut frame = Vec::with_capacity(bins);
            for k in 0..bins {
                let magnitude = (1.0 - fraction) * current[k].norm() + fraction * next[k].norm();
                frame.push(Complex::from_polar(magnitude, phase[k]));

                let delta = next[k].arg() - current[k].arg() - advance[k];
                phase[k] = wrap_phase(phase[k] + advance[k] + wrap_phase(delta));
            }
            frames_out.push(frame);
            time += rate;
        }

        // Обратное преобразование с перекрытием и нормировкой по сумме окон
        let total = n + hop * frames_out.len();
        let mut output = vec![0.0f32; total];
        let mut window_sum = vec![0.0f32; total];
        let scale = 1.0 / n as f32;

        for (frame_index, frame) in frames_out.iter().enumerate() {
            buffer[..bins].copy_from_slice(frame);
            for k in bins..n {
                buffer[k] = buffer[n - k].conj();
            }
            self.inverse.process(&mut buffer);

            let offset = frame_index * hop;
            for i in 0..n {
                output[offset + i] += buffer[i].re * scale * self.window[i];
                window_sum[offset + i] += self.window[i] * self.window[i];
            }
        }

        for (sample, sum) in output.iter_mut().zip(window_sum.iter()) {
            if *sum > 1e-6 {
                *sample /= *sum;
            }
        }

        let expected = (input.len() as f64 / rate).round() as usize;
        let mut result: Vec<f32> = output.into_iter().skip(pad).take(expected).collect();
        result.resize(expected, 0.0);
        Ok(result)
    }
}

/// Привести фазу в диапазон [-π, π]
fn wrap_phase(phase: f32) -> f32 {
    phase - 2.0 * PI * (phase / (2.0 * PI)).round()
}

/// Обрезать или дополнить тишиной до точной длины
pub fn fit_length(mut audio: Vec<f32>, length: usize) -> Vec<f32> {
    audio.resize(length, 0.0);
    audio
}

/// Подгоняет длительность синтезированного сегмента под его слот
#[derive(Debug)]
pub struct TimeFitter {
    sample_rate: u32,
    tolerance: f64,
    clamp_min: f64,
    clamp_max: f64,
    vocoder: PhaseVocoder,
}

impl TimeFitter {
    /// Создать подгонщик из конфигурации.
    ///
    /// Некорректные границы растяжения отклоняются как ошибка конфигурации.
    pub fn new(config: &MixConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sample_rate: config.sample_rate,
            tolerance: config.stretch_tolerance,
            clamp_min: config.stretch_clamp_min,
            clamp_max: config.stretch_clamp_max,
            vocoder: PhaseVocoder::new(config.vocoder_fft_size, config.vocoder_hop_size)?,
        })
    }

    /// Подогнать аудио под `target_duration` секунд.
    ///
    /// Пустое аудио или неположительная целевая длительность возвращают
    /// вход без изменений. В пределах допуска семплы не растягиваются,
    /// а только обрезаются или дополняются тишиной.
    pub fn fit(&self, audio: Vec<f32>, target_duration: f64) -> Result<Vec<f32>> {
        let current_duration = duration_in_seconds(audio.len(), self.sample_rate);
        if current_duration <= 0.0 || target_duration <= 0.0 {
            return Ok(audio);
        }

        let target_len = seconds_to_samples(target_duration, self.sample_rate);
        let rate = current_duration / target_duration;

        if (rate - 1.0).abs() <= self.tolerance {
            debug!(
                "Duration {:.3}s within tolerance of {:.3}s, trimming only",
                current_duration, target_duration
            );
            return Ok(fit_length(audio, target_len));
        }

        let clamped = rate.clamp(self.clamp_min, self.clamp_max);
        if clamped != rate {
            debug!("Stretch rate {:.3} clamped to {:.3}", rate, clamped);
        }

        debug!(
            "Stretching {:.3}s -> {:.3}s (rate {:.3})",
            current_duration, target_duration, clamped
        );
        let stretched = self.vocoder.stretch(&audio, clamped)?;
        Ok(fit_length(stretched, target_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::audio::peak;

    const SR: u32 = 24_000;

    fn tone(seconds: f64, freq: f32) -> Vec<f32> {
        let n = (seconds * SR as f64).round() as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / SR as f32).sin() * 0.5)
            .collect()
    }

    fn fitter() -> TimeFitter {
        TimeFitter::new(&MixConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_vocoder_geometry() {
        assert!(PhaseVocoder::new(2048, 0).is_err());
        assert!(PhaseVocoder::new(2048, 2048).is_err());
        assert!(PhaseVocoder::new(2048, 512).is_ok());
    }

    #[test]
    fn test_vocoder_output_length() {
        let vocoder = PhaseVocoder::new(2048, 512).unwrap();
        let input = tone(1.0, 220.0);
        assert_eq!(vocoder.stretch(&input, 2.0).unwrap().len(), 12_000);
        assert_eq!(vocoder.stretch(&input, 0.5).unwrap().len(), 48_000);
        assert!(vocoder.stretch(&input, 0.0).is_err());
    }

    #[test]
    fn test_vocoder_unit_rate_reconstructs() {
        let vocoder = PhaseVocoder::new(1024, 256).unwrap();
        let input = tone(0.5, 300.0);
        let output = vocoder.stretch(&input, 1.0).unwrap();
        assert_eq!(output.len(), input.len());

        let max_error = input[2_000..10_000]
            .iter()
            .zip(&output[2_000..10_000])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_error < 1e-3, "reconstruction error {}", max_error);
    }

    #[test]
    fn test_slowdown_fills_slot() {
        // 0.5 с речи в слоте 1.0 с: rate 0.5, ровно 24000 семплов
        let result = fitter().fit(tone(0.5, 220.0), 1.0).unwrap();
        assert_eq!(result.len(), 24_000);

        // Сигнал присутствует во второй половине, а не только тишина
        assert!(peak(&result[14_000..22_000]) > 0.1);
    }

    #[test]
    fn test_exact_length_for_any_rate() {
        let fitter = fitter();
        for &(input_secs, target) in &[(1.0, 0.7), (1.0, 1.37), (0.3, 2.0), (2.5, 0.4)] {
            let result = fitter.fit(tone(input_secs, 180.0), target).unwrap();
            assert_eq!(result.len(), seconds_to_samples(target, SR));
        }
    }

    #[test]
    fn test_tolerance_band_only_trims() {
        // 1.0 с в слот 0.97 с: rate ≈ 1.031, в пределах 5%
        let input = tone(1.0, 220.0);
        let result = fitter().fit(input.clone(), 0.97).unwrap();
        assert_eq!(result.len(), 23_280);
        assert_eq!(&result[..], &input[..23_280]);

        // 1.0 с в слот 1.04 с: дополнение тишиной
        let result = fitter().fit(input.clone(), 1.04).unwrap();
        assert_eq!(result.len(), 24_960);
        assert_eq!(&result[..24_000], &input[..]);
        assert!(result[24_000..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_rate_is_clamped() {
        // 4.0 с в слот 1.0 с требует rate 4, ограничено 2.0; длина все равно точная
        let result = fitter().fit(tone(4.0, 200.0), 1.0).unwrap();
        assert_eq!(result.len(), 24_000);
        assert!(peak(&result) > 0.1);
    }

    #[test]
    fn test_invalid_clamp_bounds_rejected() {
        let inverted = MixConfig {
            stretch_clamp_min: 1.5,
            stretch_clamp_max: 1.2,
            ..MixConfig::default()
        };
        assert!(matches!(TimeFitter::new(&inverted), Err(DubSyncError::Configuration(_))));

        let nan = MixConfig {
            stretch_clamp_max: f64::NAN,
            ..MixConfig::default()
        };
        assert!(matches!(TimeFitter::new(&nan), Err(DubSyncError::Configuration(_))));
    }

    #[test]
    fn test_degenerate_inputs_unchanged() {
        let fitter = fitter();
        assert!(fitter.fit(Vec::new(), 1.0).unwrap().is_empty());

        let input = tone(0.2, 440.0);
        assert_eq!(fitter.fit(input.clone(), 0.0).unwrap(), input);
        assert_eq!(fitter.fit(input.clone(), -1.0).unwrap(), input);
    }
}
