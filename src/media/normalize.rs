//! Ограничение пикового уровня дорожки

use log::debug;

use crate::media::audio::peak;

/// Ограничитель пика: одно линейное усиление на всю дорожку
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackNormalizer {
    ceiling: f32,
}

impl Default for TrackNormalizer {
    fn default() -> Self {
        Self { ceiling: 1.0 }
    }
}

impl TrackNormalizer {
    pub fn new(ceiling: f32) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Масштабировать семплы, если пик превышает потолок.
    ///
    /// Возвращает `true`, если усиление было применено. Тишина и
    /// дорожки ниже потолка не изменяются.
    pub fn apply(&self, samples: &mut [f32]) -> bool {
        let current_peak = peak(samples);
        if current_peak <= self.ceiling || current_peak == 0.0 {
            return false;
        }

        let gain = self.ceiling / current_peak;
        // clamp гасит ошибку округления на самом пике
        for sample in samples.iter_mut() {
            *sample = (*sample * gain).clamp(-self.ceiling, self.ceiling);
        }
        debug!("Peak {:.3} limited to {:.3} (gain {:.3})", current_peak, self.ceiling, gain);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loud_track_is_limited() {
        let mut samples = vec![0.5, -2.0, 1.5, 0.0];
        assert!(TrackNormalizer::default().apply(&mut samples));
        assert!(peak(&samples) <= 1.0);
        assert!((samples[1] + 1.0).abs() < 1e-6);
        // Соотношения между семплами сохраняются
        assert!((samples[2] / samples[0] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_quiet_track_untouched() {
        let original = vec![0.1, -0.4, 0.3];
        let mut samples = original.clone();
        assert!(!TrackNormalizer::default().apply(&mut samples));
        assert_eq!(samples, original);
    }

    #[test]
    fn test_silence_untouched() {
        let mut samples = vec![0.0; 16];
        assert!(!TrackNormalizer::new(0.5).apply(&mut samples));
        assert!(samples.iter().all(|&s| s == 0.0));

        let mut empty: Vec<f32> = Vec::new();
        assert!(!TrackNormalizer::default().apply(&mut empty));
    }

    #[test]
    fn test_custom_ceiling() {
        let mut samples = vec![0.8, -0.2];
        assert!(TrackNormalizer::new(0.5).apply(&mut samples));
        assert!((peak(&samples) - 0.5).abs() < 1e-6);
    }
}
