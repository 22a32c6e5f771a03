//! Модуль обработки ошибок библиотеки dub-sync
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при сборке
//! и микшировании дублированной дорожки.

use thiserror::Error;

/// Ошибки библиотеки dub-sync
#[derive(Debug, Error)]
pub enum DubSyncError {
    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка чтения или записи WAV
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Ошибка декодирования сжатого аудио
    #[error("Audio decoding error: {0}")]
    Decoding(String),

    /// Ошибка передискретизации
    #[error("Resampling error: {0}")]
    Resampling(String),

    /// Ошибка изменения длительности
    #[error("Time stretching error: {0}")]
    TimeStretching(String),

    /// Ошибка внешнего синтезатора речи
    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Файл не найден
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Неверный формат
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Ошибка фоновой задачи
    #[error("Background task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl From<&str> for DubSyncError {
    fn from(s: &str) -> Self {
        DubSyncError::Other(s.to_string())
    }
}

impl From<String> for DubSyncError {
    fn from(s: String) -> Self {
        DubSyncError::Other(s)
    }
}

impl From<anyhow::Error> for DubSyncError {
    fn from(e: anyhow::Error) -> Self {
        DubSyncError::Synthesis(format!("{:#}", e))
    }
}

/// Тип Result для библиотеки dub-sync
pub type Result<T> = std::result::Result<T, DubSyncError>;
