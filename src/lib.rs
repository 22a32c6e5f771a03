//! Основной файл библиотеки dub-sync
//!
//! Библиотека собирает дублированную дорожку из независимо синтезированных
//! реплик: подгоняет каждую под ее слот, размещает на таймлайне,
//! ограничивает уровень и смешивает с фоном. Ход работы можно отслеживать
//! через систему прогресса и уведомлений.

pub mod config;
pub mod error;
pub mod media;
pub mod notification;
pub mod progress;
pub mod segment;
pub mod synth;
pub mod utils;

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use log::{info, warn};

pub use crate::config::{DubSyncConfig, MixConfig, ResamplerKind, WavEncoding};
pub use crate::error::{DubSyncError, Result};
pub use crate::media::{AudioBuffer, BackgroundMixer, BackgroundStem};
pub use crate::segment::{RawSegmentAudio, TimedSegment, WordTiming};
pub use crate::synth::{PrerenderedSynthesizer, SpeechSynthesizer};

use crate::media::{write_wav, TimelineAssembler, TrackNormalizer};
use crate::progress::{ProcessStep, ProgressObserver, ProgressReporter, ProgressTracker};
use crate::utils::TempFileManager;

/// Дорожки, полученные за один прогон
struct RenderedTracks {
    speech: AudioBuffer,
    mixed: AudioBuffer,
}

/// Конвейер сборки дублированной дорожки
pub struct DubSync {
    config: DubSyncConfig,
    progress_tracker: Option<ProgressTracker>,
}

impl DubSync {
    pub fn new(config: DubSyncConfig) -> Self {
        Self {
            config,
            progress_tracker: None,
        }
    }

    /// Создать конвейер с репортером прогресса
    pub fn with_progress_reporter(config: DubSyncConfig, reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            config,
            progress_tracker: Some(ProgressTracker::with_reporter(reporter)),
        }
    }

    pub fn config(&self) -> &DubSyncConfig {
        &self.config
    }

    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        match &mut self.progress_tracker {
            Some(tracker) => tracker.set_reporter(reporter),
            None => self.progress_tracker = Some(ProgressTracker::with_reporter(reporter)),
        }
    }

    /// Добавить наблюдателя прогресса.
    ///
    /// Если репортер еще не задан, создается [`DefaultProgressReporter`].
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        self.progress_tracker
            .get_or_insert_with(ProgressTracker::new)
            .add_observer(observer)
    }

    fn reset_progress(&self) {
        if let Some(tracker) = &self.progress_tracker {
            tracker.reset();
        }
    }

    fn step(&self, step: ProcessStep, details: &str) {
        if let Some(tracker) = &self.progress_tracker {
            tracker.set_step(step);
            tracker.update_step_progress(0.0, Some(details.to_string()));
        }
    }

    fn step_progress(&self, progress: f32, details: impl Into<String>) {
        if let Some(tracker) = &self.progress_tracker {
            tracker.update_step_progress(progress, Some(details.into()));
        }
    }

    fn complete(&self) {
        if let Some(tracker) = &self.progress_tracker {
            tracker.complete();
        }
    }

    /// Синтезировать речь для всех сегментов.
    ///
    /// Запросы выполняются параллельно, не более `max_concurrent_synthesis`
    /// одновременно. Результат упорядочен как вход. Сегменты без текста не
    /// синтезируются, а ошибка синтеза превращает сегмент в тишину.
    pub async fn synthesize_segments(
        &self,
        segments: &[TimedSegment],
        synthesizer: &dyn SpeechSynthesizer,
    ) -> Vec<(TimedSegment, Option<RawSegmentAudio>)> {
        let total = segments.iter().filter(|segment| !segment.is_silent()).count();
        let mut results: Vec<Option<RawSegmentAudio>> = vec![None; segments.len()];

        let requests = segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| !segment.is_silent())
            .map(|(index, segment)| async move { (index, synthesizer.synthesize(index, segment).await) });
        let mut responses = stream::iter(requests).buffer_unordered(self.config.max_concurrent_synthesis.max(1));

        let mut finished = 0usize;
        while let Some((index, result)) = responses.next().await {
            finished += 1;
            match result {
                Ok(audio) => results[index] = Some(audio),
                Err(e) => warn!("Synthesis failed for segment {}: {}, substituting silence", index, e),
            }
            self.step_progress(
                finished as f32 / total.max(1) as f32 * 100.0,
                format!("Сегмент {} готов ({}/{})", index, finished, total),
            );
        }

        segments.iter().cloned().zip(results).collect()
    }

    async fn render_tracks(
        &self,
        segments: &[TimedSegment],
        synthesizer: &dyn SpeechSynthesizer,
        background: Option<&Path>,
    ) -> Result<RenderedTracks> {
        self.config.validate()?;
        self.reset_progress();
        let mix = self.config.mix.clone();
        info!("Rendering dubbed track from {} segments", segments.len());

        // 1. Синтез речи
        self.step(ProcessStep::Synthesis, "Синтез речи для сегментов");
        let synthesized = self.synthesize_segments(segments, synthesizer).await;
        let voiced = synthesized.iter().filter(|(_, audio)| audio.is_some()).count();
        info!("Synthesized {} of {} segments", voiced, segments.len());

        // 2. Передискретизация и подгонка длительности
        self.step(ProcessStep::Fitting, "Подгонка длительности сегментов");
        let fit_config = mix.clone();
        let placements =
            tokio::task::spawn_blocking(move || media::prepare_segments(&fit_config, synthesized)).await??;
        self.step_progress(100.0, "Подгонка завершена");

        // 3. Сборка таймлайна
        self.step(ProcessStep::Assembly, "Сборка дорожки речи");
        let mut speech = TimelineAssembler::new(&mix).assemble(&placements);
        TrackNormalizer::default().apply(&mut speech.samples);
        self.step_progress(100.0, format!("Дорожка речи: {:.2} с", speech.duration()));

        // 4. Смешивание с фоном
        self.step(ProcessStep::Mixing, "Смешивание с фоном");
        let background = background.map(Path::to_path_buf);
        let mix_speech = speech.clone();
        let mixed = tokio::task::spawn_blocking(move || {
            BackgroundMixer::new(&mix).mix_with_file(&mix_speech, background.as_deref())
        })
        .await??;
        self.step_progress(100.0, "Смешивание завершено");

        Ok(RenderedTracks { speech, mixed })
    }

    /// Собрать итоговую дорожку в памяти
    pub async fn render(
        &self,
        segments: &[TimedSegment],
        synthesizer: &dyn SpeechSynthesizer,
        background: Option<&Path>,
    ) -> Result<AudioBuffer> {
        let tracks = self.render_tracks(segments, synthesizer, background).await?;
        self.complete();
        Ok(tracks.mixed)
    }

    /// Собрать итоговую дорожку и записать ее в WAV.
    ///
    /// Дорожка речи до смешивания сохраняется как промежуточный файл
    /// (удаляется, если не включен `keep_temp_files`).
    pub async fn render_to_file<P: AsRef<Path>>(
        &self,
        segments: &[TimedSegment],
        synthesizer: &dyn SpeechSynthesizer,
        background: Option<&Path>,
        output_path: P,
    ) -> Result<PathBuf> {
        let output_path = output_path.as_ref().to_path_buf();
        let mut temp_files = TempFileManager::from_config(&self.config)?;
        let tracks = self.render_tracks(segments, synthesizer, background).await?;

        // 5. Запись файлов
        self.step(ProcessStep::Encoding, "Запись аудио");
        let speech_path = temp_files.create_temp_file("speech", "wav")?;
        let encoding = self.config.wav_encoding;
        let target = output_path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            write_wav(&speech_path, &tracks.speech, encoding)?;
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            write_wav(&target, &tracks.mixed, encoding)
        })
        .await??;
        temp_files.cleanup()?;

        self.complete();
        info!("Dubbed track written to {}", output_path.display());
        Ok(output_path)
    }
}

impl Default for DubSync {
    fn default() -> Self {
        Self::new(DubSyncConfig::default())
    }
}

/// Собрать дублированную дорожку с настройками по умолчанию
pub async fn dub_track<P: AsRef<Path>>(
    segments: &[TimedSegment],
    synthesizer: &dyn SpeechSynthesizer,
    background: Option<&Path>,
    output_path: P,
) -> Result<PathBuf> {
    DubSync::default()
        .render_to_file(segments, synthesizer, background, output_path)
        .await
}

/// Собрать дублированную дорожку с отслеживанием прогресса
pub async fn dub_track_with_progress<P: AsRef<Path>>(
    segments: &[TimedSegment],
    synthesizer: &dyn SpeechSynthesizer,
    background: Option<&Path>,
    output_path: P,
    config: DubSyncConfig,
    reporter: Box<dyn ProgressReporter>,
) -> Result<PathBuf> {
    DubSync::with_progress_reporter(config, reporter)
        .render_to_file(segments, synthesizer, background, output_path)
        .await
}
