//! Модуль для подключения внешнего синтезатора речи
//!
//! Синтезатор передается в конвейер явно, поэтому модель загружается
//! один раз вызывающим кодом и переиспользуется для всех сегментов.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::error::{DubSyncError, Result};
use crate::media::audio::read_wav_bytes;
use crate::segment::{RawSegmentAudio, TimedSegment};

/// Внешний движок синтеза речи (TTS, клонирование голоса)
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Синтезировать речь для сегмента с индексом `index`
    async fn synthesize(&self, index: usize, segment: &TimedSegment) -> Result<RawSegmentAudio>;
}

/// Имя файла сегмента: `seg_0000.wav`
pub fn segment_file_name(index: usize) -> String {
    format!("seg_{:04}.wav", index)
}

/// Синтезатор, читающий заранее подготовленные WAV-файлы сегментов
#[derive(Debug, Clone)]
pub struct PrerenderedSynthesizer {
    dir: PathBuf,
}

impl PrerenderedSynthesizer {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Путь к файлу сегмента
    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.dir.join(segment_file_name(index))
    }
}

#[async_trait]
impl SpeechSynthesizer for PrerenderedSynthesizer {
    async fn synthesize(&self, index: usize, segment: &TimedSegment) -> Result<RawSegmentAudio> {
        let path = self.segment_path(index);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            DubSyncError::Synthesis(format!("No audio for segment {} ({}): {}", index, path.display(), e))
        })?;

        let audio = read_wav_bytes(&bytes)?;
        debug!(
            "Loaded {} for \"{}\" ({:.2}s)",
            path.display(),
            segment.text,
            audio.duration()
        );
        Ok(audio)
    }
}
