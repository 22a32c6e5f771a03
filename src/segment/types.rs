//! Типы данных сегментов речи
//!
//! Сегмент хранит только текст и временные метки. Аудио синтезатора
//! передается отдельно в [`RawSegmentAudio`] и не несет информации о размещении.

use serde::{Deserialize, Serialize};

/// Временная метка отдельного слова
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    /// Текст слова
    pub text: String,
    /// Время начала в секундах
    pub start: f64,
    /// Время окончания в секундах
    pub end: f64,
}

/// Одна реплика, которую нужно разместить на таймлайне
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    /// Текст реплики (уже переведенный)
    pub text: String,
    /// Время начала в секундах
    pub start: f64,
    /// Время окончания в секундах
    pub end: f64,
    /// Пословные метки времени (передаются без изменений)
    #[serde(default)]
    pub words: Vec<WordTiming>,
}

impl TimedSegment {
    /// Создать новый сегмент без пословных меток
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            words: Vec::new(),
        }
    }

    /// Длительность слота в секундах
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Сегмент без речи (пустой текст или только пробелы)
    pub fn is_silent(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Новый сегмент с тем же таймингом и другим текстом.
    ///
    /// Исходный сегмент не изменяется, поэтому перевод никогда не
    /// затрагивает список сегментов, полученный от распознавания.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start: self.start,
            end: self.end,
            words: self.words.clone(),
        }
    }
}

/// Аудио, синтезированное для одного сегмента
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegmentAudio {
    /// Семплы PCM (f32), каналы чередуются
    pub samples: Vec<f32>,
    /// Количество каналов
    pub channels: u16,
    /// Исходная частота дискретизации
    pub sample_rate: u32,
}

impl RawSegmentAudio {
    /// Моно-аудио
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: 1,
            sample_rate,
        }
    }

    /// Количество кадров (семплов на канал)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Длительность в секундах
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_duration_and_silence() {
        let segment = TimedSegment::new("Hola", 1.5, 3.0);
        assert_eq!(segment.duration(), 1.5);
        assert!(!segment.is_silent());
        assert!(TimedSegment::new("  \n\t", 0.0, 1.0).is_silent());
    }

    #[test]
    fn test_with_text_keeps_original() {
        let mut original = TimedSegment::new("Hello there", 0.0, 2.0);
        original.words.push(WordTiming { text: "Hello".into(), start: 0.0, end: 0.8 });

        let translated = original.with_text("Hola");
        assert_eq!(original.text, "Hello there");
        assert_eq!(translated.text, "Hola");
        assert_eq!(translated.start, original.start);
        assert_eq!(translated.end, original.end);
        assert_eq!(translated.words, original.words);
    }

    #[test]
    fn test_raw_audio_frames() {
        let audio = RawSegmentAudio {
            samples: vec![0.0; 48_000],
            channels: 2,
            sample_rate: 24_000,
        };
        assert_eq!(audio.frames(), 24_000);
        assert_eq!(audio.duration(), 1.0);
    }
}
