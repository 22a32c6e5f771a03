//! Инициализация логирования

use std::io::Write;

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Фильтр по умолчанию, если `RUST_LOG` не задан
pub const DEFAULT_FILTER: &str = "warn,dub_sync=info";

/// Инициализировать env_logger.
///
/// Формат `[LEVEL] target: message`, вывод в stderr. Повторный вызов
/// ничего не делает и возвращает `false`.
pub fn init_logger() -> bool {
    init_logger_with_filter(DEFAULT_FILTER)
}

/// Инициализировать логирование с собственным фильтром по умолчанию
pub fn init_logger_with_filter(default_filter: &str) -> bool {
    let env = Env::default().filter_or("RUST_LOG", default_filter);

    Builder::from_env(env)
        // Декодер печатает служебные сообщения на каждый пакет
        .filter_module("symphonia_core", LevelFilter::Warn)
        .filter_module("symphonia_format_wav", LevelFilter::Warn)
        .format(|buf, record| writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args()))
        .target(env_logger::Target::Stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_logger();
        assert!(!init_logger());
    }
}
