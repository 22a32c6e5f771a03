//! Модуль конфигурации библиотеки dub-sync
//!
//! Этот модуль содержит структуры и перечисления для настройки сборки
//! и микширования дорожки.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DubSyncError, Result};

/// Алгоритм передискретизации сегментов
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResamplerKind {
    /// Линейная интерполяция
    Linear,
    /// Sinc-интерполяция (rubato)
    Sinc,
}

impl Default for ResamplerKind {
    fn default() -> Self {
        Self::Sinc
    }
}

/// Формат сэмплов итогового WAV
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WavEncoding {
    /// 32-бит с плавающей точкой
    Float32,
    /// 16-бит целочисленный PCM
    Int16,
}

impl Default for WavEncoding {
    fn default() -> Self {
        Self::Float32
    }
}

/// Параметры сборки и микширования дорожки
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MixConfig {
    /// Рабочая частота дискретизации (должна совпадать с частотой синтезатора)
    pub sample_rate: u32,
    /// Допустимое отклонение коэффициента растяжения от 1.0, при котором растяжение не выполняется
    pub stretch_tolerance: f64,
    /// Нижняя граница коэффициента растяжения
    pub stretch_clamp_min: f64,
    /// Верхняя граница коэффициента растяжения
    pub stretch_clamp_max: f64,
    /// Линейное усиление фоновой дорожки относительно речи
    pub background_gain: f32,
    /// Пиковый уровень речи перед микшированием
    pub speech_target_peak: f32,
    /// Запас в конце таймлайна (секунды)
    pub timeline_margin_secs: f64,
    /// Длительность тишины для пустого списка сегментов (секунды)
    pub empty_track_secs: f64,
    /// Алгоритм передискретизации
    pub resampler: ResamplerKind,
    /// Размер окна FFT фазового вокодера
    pub vocoder_fft_size: usize,
    /// Шаг анализа фазового вокодера
    pub vocoder_hop_size: usize,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            stretch_tolerance: 0.05,
            stretch_clamp_min: 0.5,
            stretch_clamp_max: 2.0,
            background_gain: 0.7, // ≈ -3 dB
            speech_target_peak: 0.5,
            timeline_margin_secs: 1.0,
            empty_track_secs: 1.0,
            resampler: ResamplerKind::default(),
            vocoder_fft_size: 2048,
            vocoder_hop_size: 512,
        }
    }
}

impl MixConfig {
    /// Проверить корректность параметров
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(DubSyncError::Configuration("sample_rate must be positive".to_string()));
        }
        if !(self.stretch_tolerance >= 0.0) {
            return Err(DubSyncError::Configuration(format!(
                "stretch_tolerance must be non-negative, got {}",
                self.stretch_tolerance
            )));
        }
        if !(self.stretch_clamp_min > 0.0 && self.stretch_clamp_min <= 1.0) {
            return Err(DubSyncError::Configuration(format!(
                "stretch_clamp_min must be in (0, 1], got {}",
                self.stretch_clamp_min
            )));
        }
        if !(self.stretch_clamp_max >= 1.0 && self.stretch_clamp_max.is_finite()) {
            return Err(DubSyncError::Configuration(format!(
                "stretch_clamp_max must be a finite value >= 1, got {}",
                self.stretch_clamp_max
            )));
        }
        if !(self.background_gain >= 0.0) {
            return Err(DubSyncError::Configuration(format!(
                "background_gain must be non-negative, got {}",
                self.background_gain
            )));
        }
        if !(self.speech_target_peak > 0.0 && self.speech_target_peak <= 1.0) {
            return Err(DubSyncError::Configuration(format!(
                "speech_target_peak must be in (0, 1], got {}",
                self.speech_target_peak
            )));
        }
        if !(self.timeline_margin_secs >= 0.0) || !(self.empty_track_secs >= 0.0) {
            return Err(DubSyncError::Configuration(
                "timeline_margin_secs and empty_track_secs must be non-negative".to_string(),
            ));
        }
        if self.vocoder_fft_size < 4 || self.vocoder_hop_size == 0 || self.vocoder_hop_size > self.vocoder_fft_size / 2 {
            return Err(DubSyncError::Configuration(format!(
                "invalid vocoder frame: fft_size={}, hop_size={}",
                self.vocoder_fft_size, self.vocoder_hop_size
            )));
        }
        Ok(())
    }
}

/// Конфигурация конвейера
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DubSyncConfig {
    /// Параметры сборки и микширования
    pub mix: MixConfig,
    /// Максимальное количество одновременных запросов к синтезатору
    pub max_concurrent_synthesis: usize,
    /// Сохранять промежуточные файлы после завершения
    pub keep_temp_files: bool,
    /// Директория для промежуточных файлов
    pub temp_dir: Option<String>,
    /// Формат сэмплов итогового WAV
    pub wav_encoding: WavEncoding,
}

impl Default for DubSyncConfig {
    fn default() -> Self {
        Self {
            mix: MixConfig::default(),
            max_concurrent_synthesis: 4,
            keep_temp_files: false,
            temp_dir: None,
            wav_encoding: WavEncoding::default(),
        }
    }
}

impl DubSyncConfig {
    /// Загрузить конфигурацию из JSON-файла
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DubSyncError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Проверить корректность параметров
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_synthesis == 0 {
            return Err(DubSyncError::Configuration(
                "max_concurrent_synthesis must be at least 1".to_string(),
            ));
        }
        self.mix.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DubSyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mix.sample_rate, 24_000);
        assert_eq!(config.mix.stretch_clamp_min, 0.5);
        assert_eq!(config.mix.stretch_clamp_max, 2.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut mix = MixConfig::default();
        mix.stretch_clamp_min = 1.5;
        assert!(matches!(mix.validate(), Err(DubSyncError::Configuration(_))));

        let mut mix = MixConfig::default();
        mix.speech_target_peak = 0.0;
        assert!(mix.validate().is_err());

        let mut mix = MixConfig::default();
        mix.vocoder_hop_size = 2048;
        assert!(mix.validate().is_err());

        let config = DubSyncConfig {
            max_concurrent_synthesis: 0,
            ..DubSyncConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "mix": { "sample_rate": 16000, "resampler": "linear" }, "wav_encoding": "int16" }"#,
        )
        .unwrap();

        let config = DubSyncConfig::from_json_file(&path).unwrap();
        assert_eq!(config.mix.sample_rate, 16_000);
        assert_eq!(config.mix.resampler, ResamplerKind::Linear);
        assert_eq!(config.wav_encoding, WavEncoding::Int16);
        // Незаданные поля берутся из значений по умолчанию
        assert_eq!(config.mix.background_gain, 0.7);
        assert_eq!(config.max_concurrent_synthesis, 4);
    }

    #[test]
    fn test_missing_file() {
        let result = DubSyncConfig::from_json_file("/nonexistent/dub-sync.json");
        assert!(matches!(result, Err(DubSyncError::FileNotFound(_))));
    }
}
