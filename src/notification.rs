//! Наблюдатели прогресса
//!
//! Готовые реализации [`ProgressObserver`]: запись в лог, история в памяти,
//! файл, канал tokio, функция обратного вызова и их комбинация.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::progress::{ProgressInfo, ProgressObserver};

fn describe(progress: &ProgressInfo) -> String {
    let mut line = format!(
        "Шаг: {}, Прогресс шага: {:.1}%, Общий прогресс: {:.1}%",
        progress.step, progress.step_progress, progress.total_progress
    );
    if let Some(details) = progress.details.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(", Детали: ");
        line.push_str(details);
    }
    line
}

/// Наблюдатель, пишущий прогресс в лог
#[derive(Debug, Default, Clone)]
pub struct LogProgressObserver {
    prefix: Option<String>,
}

impl LogProgressObserver {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl ProgressObserver for LogProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        info!("{}{}", self.prefix.as_deref().unwrap_or(""), describe(&progress));
    }
}

/// Наблюдатель, сохраняющий историю прогресса в памяти.
///
/// Клоны разделяют одну историю.
#[derive(Debug, Default, Clone)]
pub struct MemoryProgressObserver {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl MemoryProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<ProgressInfo> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Последнее полученное обновление
    pub fn last(&self) -> Option<ProgressInfo> {
        self.history.lock().ok().and_then(|h| h.last().cloned())
    }

    pub fn clear_history(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }
}

impl ProgressObserver for MemoryProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        if let Ok(mut history) = self.history.lock() {
            history.push(progress);
        }
    }
}

/// Наблюдатель, дописывающий прогресс в файл с отметкой времени
#[derive(Debug, Clone)]
pub struct FileProgressObserver {
    file_path: PathBuf,
}

impl FileProgressObserver {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

impl ProgressObserver for FileProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        let entry = format!(
            "[{}] {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            describe(&progress)
        );

        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));
        if let Err(e) = result {
            warn!("Failed to write progress to {}: {}", self.file_path.display(), e);
        }
    }
}

/// Наблюдатель, отправляющий прогресс в канал tokio.
///
/// Отправка не блокирует: если канал заполнен, обновление пропускается.
#[derive(Debug, Clone)]
pub struct ChannelProgressObserver {
    sender: mpsc::Sender<ProgressInfo>,
}

impl ChannelProgressObserver {
    pub fn new(sender: mpsc::Sender<ProgressInfo>) -> Self {
        Self { sender }
    }
}

impl ProgressObserver for ChannelProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        if let Err(e) = self.sender.try_send(progress) {
            debug!("Progress update dropped: {}", e);
        }
    }
}

/// Наблюдатель, вызывающий функцию при каждом обновлении
pub struct CallbackProgressObserver<F>
where
    F: Fn(ProgressInfo) + Send + Sync + 'static,
{
    callback: F,
}

impl<F> CallbackProgressObserver<F>
where
    F: Fn(ProgressInfo) + Send + Sync + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressObserver for CallbackProgressObserver<F>
where
    F: Fn(ProgressInfo) + Send + Sync + 'static,
{
    fn on_progress_update(&self, progress: ProgressInfo) {
        (self.callback)(progress);
    }
}

/// Наблюдатель, рассылающий обновления нескольким наблюдателям
#[derive(Default)]
pub struct CompositeProgressObserver {
    observers: Vec<Box<dyn ProgressObserver>>,
}

impl CompositeProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl ProgressObserver for CompositeProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        for observer in &self.observers {
            observer.on_progress_update(progress.clone());
        }
    }
}
