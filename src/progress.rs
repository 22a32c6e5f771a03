//! Модуль для отслеживания прогресса сборки дорожки
//!
//! Реализация паттерна Observer: трекер считает взвешенный общий прогресс
//! по этапам конвейера и рассылает его наблюдателям через репортер.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};

/// Информация о прогрессе выполнения операции
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Текущий этап операции
    pub step: String,
    /// Процент выполнения текущего этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Общий процент выполнения (0.0 - 100.0)
    pub total_progress: f32,
    /// Дополнительная информация о текущем этапе
    pub details: Option<String>,
}

impl ProgressInfo {
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            details,
        }
    }
}

/// Наблюдатель, получающий уведомления о прогрессе
pub trait ProgressObserver: Send + Sync {
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Объект, рассылающий уведомления о прогрессе
pub trait ProgressReporter: Send + Sync {
    /// Добавить наблюдателя, возвращает его идентификатор
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize;

    /// Удалить наблюдателя по идентификатору
    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>>;

    /// Уведомить всех наблюдателей
    fn notify_progress(&self, progress: ProgressInfo);
}

/// Репортер, хранящий наблюдателей в памяти
pub struct DefaultProgressReporter {
    observers: RwLock<HashMap<usize, Box<dyn ProgressObserver>>>,
    next_id: AtomicUsize,
}

impl DefaultProgressReporter {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Количество подписанных наблюдателей
    pub fn observer_count(&self) -> usize {
        self.observers.read().map(|o| o.len()).unwrap_or(0)
    }
}

impl Default for DefaultProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let observers = self.observers.get_mut().unwrap_or_else(|e| e.into_inner());
        observers.insert(id, observer);
        id
    }

    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        let observers = self.observers.get_mut().unwrap_or_else(|e| e.into_inner());
        observers.remove(&id)
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner());
        for observer in observers.values() {
            observer.on_progress_update(progress.clone());
        }
    }
}

/// Этапы конвейера дубляжа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStep {
    /// Синтез речи для сегментов
    Synthesis,
    /// Передискретизация и подгонка длительности
    Fitting,
    /// Сборка таймлайна
    Assembly,
    /// Смешивание с фоном
    Mixing,
    /// Запись итогового файла
    Encoding,
}

impl ProcessStep {
    /// Все этапы в порядке выполнения
    pub const ALL: [ProcessStep; 5] = [
        ProcessStep::Synthesis,
        ProcessStep::Fitting,
        ProcessStep::Assembly,
        ProcessStep::Mixing,
        ProcessStep::Encoding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synthesis => "Синтез речи",
            Self::Fitting => "Подгонка длительности сегментов",
            Self::Assembly => "Сборка дорожки",
            Self::Mixing => "Смешивание с фоном",
            Self::Encoding => "Запись аудио",
        }
    }

    /// Вес этапа в процентах от всего процесса
    pub fn weight(&self) -> f32 {
        match self {
            Self::Synthesis => 50.0,
            Self::Fitting => 25.0,
            Self::Assembly => 10.0,
            Self::Mixing => 10.0,
            Self::Encoding => 5.0,
        }
    }
}

#[derive(Debug)]
struct TrackerState {
    current_step: ProcessStep,
    step_progress: f32,
    total_progress: f32,
    completed_steps: HashMap<ProcessStep, f32>,
}

impl TrackerState {
    fn new() -> Self {
        Self {
            current_step: ProcessStep::Synthesis,
            step_progress: 0.0,
            total_progress: 0.0,
            completed_steps: HashMap::new(),
        }
    }

    fn recompute_total(&mut self) {
        let all_weight: f32 = ProcessStep::ALL.iter().map(|s| s.weight()).sum();
        let mut done = 0.0;
        for (step, progress) in &self.completed_steps {
            if *step != self.current_step {
                done += step.weight() * progress / 100.0;
            }
        }
        done += self.current_step.weight() * self.step_progress / 100.0;
        self.total_progress = (done / all_weight * 100.0).clamp(0.0, 100.0);
    }

    fn snapshot(&self, details: Option<String>) -> ProgressInfo {
        ProgressInfo::new(
            self.current_step.as_str(),
            self.step_progress,
            self.total_progress,
            details,
        )
    }
}

/// Трекер прогресса конвейера
pub struct ProgressTracker {
    reporter: Option<Box<dyn ProgressReporter>>,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            reporter: None,
            state: Mutex::new(TrackerState::new()),
        }
    }

    pub fn with_reporter(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter: Some(reporter),
            state: Mutex::new(TrackerState::new()),
        }
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.reporter = Some(reporter);
    }

    /// Добавить наблюдателя. Без репортера создается [`DefaultProgressReporter`]
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        self.reporter
            .get_or_insert_with(|| Box::new(DefaultProgressReporter::new()) as Box<dyn ProgressReporter>)
            .add_observer(observer)
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Текущий общий прогресс
    pub fn total_progress(&self) -> f32 {
        self.state().total_progress
    }

    /// Перейти к этапу. Предыдущий этап считается завершенным
    pub fn set_step(&self, step: ProcessStep) {
        let info = {
            let mut state = self.state();
            if state.current_step == step {
                return;
            }
            let previous = state.current_step;
            state.completed_steps.insert(previous, 100.0);
            state.current_step = step;
            state.step_progress = 0.0;
            state.recompute_total();
            state.snapshot(None)
        };
        self.report(info);
    }

    /// Обновить прогресс текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        let info = {
            let mut state = self.state();
            state.step_progress = progress.clamp(0.0, 100.0);
            state.recompute_total();
            state.snapshot(details)
        };
        self.report(info);
    }

    /// Вернуть трекер в начальное состояние перед новым прогоном
    pub fn reset(&self) {
        *self.state() = TrackerState::new();
    }

    /// Отметить завершение всего процесса
    pub fn complete(&self) {
        let info = {
            let mut state = self.state();
            for step in ProcessStep::ALL {
                state.completed_steps.insert(step, 100.0);
            }
            state.step_progress = 100.0;
            state.total_progress = 100.0;
            state.snapshot(Some("Процесс завершен".to_string()))
        };
        self.report(info);
    }

    fn report(&self, info: ProgressInfo) {
        if let Some(reporter) = &self.reporter {
            reporter.notify_progress(info);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
