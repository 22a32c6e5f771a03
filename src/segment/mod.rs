//! Модуль сегментов речи
//!
//! Содержит модель сегмента и загрузчики списков сегментов.

pub mod parser;
pub mod types;

pub use parser::{load_segments_json, load_segments_vtt, parse_segments_json, parse_vtt_str};
pub use types::{RawSegmentAudio, TimedSegment, WordTiming};
