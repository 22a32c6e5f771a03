//! Модуль для загрузки сегментов
//!
//! Поддерживаются два источника: JSON-вывод распознавания (с пословными
//! метками) и файлы субтитров WebVTT.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{DubSyncError, Result};
use crate::segment::types::TimedSegment;

lazy_static! {
    /// Строка таймингов вида `00:00:01.000 --> 00:00:02.500 align:start`
    static ref TIMING_LINE: Regex =
        Regex::new(r"^\s*(\S+)\s+-->\s+(\S+)").expect("valid timing regex");
    /// Теги внутри текста реплики (`<c.yellow>`, `<00:00:01.000>`, `</i>`)
    static ref CUE_TAG: Regex = Regex::new(r"<[^>]*>").expect("valid tag regex");
}

/// Загрузить сегменты из JSON-файла
pub fn load_segments_json<P: AsRef<Path>>(path: P) -> Result<Vec<TimedSegment>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| DubSyncError::FileNotFound(format!("Failed to open segments file {}: {}", path.display(), e)))?;
    let segments = parse_segments_json(&content)?;
    log::info!("Loaded {} segments from {}", segments.len(), path.display());
    Ok(segments)
}

/// Разобрать сегменты из JSON-строки.
///
/// Принимается как массив сегментов, так и объект с полем `segments`
/// (формат вывода Whisper).
pub fn parse_segments_json(content: &str) -> Result<Vec<TimedSegment>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Document {
        List(Vec<TimedSegment>),
        Wrapped { segments: Vec<TimedSegment> },
    }

    let segments = match serde_json::from_str::<Document>(content)? {
        Document::List(segments) => segments,
        Document::Wrapped { segments } => segments,
    };
    warn_on_malformed_timing(&segments);
    Ok(segments)
}

/// Загрузить сегменты из VTT-файла
pub fn load_segments_vtt<P: AsRef<Path>>(vtt_file_path: P) -> Result<Vec<TimedSegment>> {
    let path = vtt_file_path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| DubSyncError::FileNotFound(format!("Failed to open VTT file: {}", e)))?;
    let segments = parse_vtt_str(&content)?;
    log::info!("Loaded {} segments from {}", segments.len(), path.display());
    Ok(segments)
}

/// Разобрать содержимое VTT
pub fn parse_vtt_str(content: &str) -> Result<Vec<TimedSegment>> {
    let mut lines = content.lines();

    // Проверяем заголовок WebVTT (с учетом BOM)
    let header = lines.next().unwrap_or("").trim_start_matches('\u{feff}');
    if !header.starts_with("WEBVTT") {
        return Err(DubSyncError::InvalidFormat(
            "Invalid VTT file format: missing WEBVTT header".to_string(),
        ));
    }

    let mut segments = Vec::new();
    let mut current_block: Vec<&str> = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            if !current_block.is_empty() {
                if let Some(segment) = parse_cue_block(&current_block) {
                    segments.push(segment);
                }
                current_block.clear();
            }
        } else {
            current_block.push(line);
        }
    }

    // Обрабатываем последний блок, если он есть
    if !current_block.is_empty() {
        if let Some(segment) = parse_cue_block(&current_block) {
            segments.push(segment);
        }
    }

    warn_on_malformed_timing(&segments);
    Ok(segments)
}

/// Парсинг блока субтитра. Блоки NOTE/STYLE и блоки без таймингов пропускаются.
fn parse_cue_block(lines: &[&str]) -> Option<TimedSegment> {
    let timing_index = lines.iter().position(|line| line.contains("-->"))?;
    let captures = TIMING_LINE.captures(lines[timing_index])?;

    let start = parse_timestamp(captures.get(1)?.as_str())?;
    let end = parse_timestamp(captures.get(2)?.as_str())?;

    let text = lines[timing_index + 1..]
        .iter()
        .map(|line| CUE_TAG.replace_all(line.trim(), ""))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Some(TimedSegment::new(text, start, end))
}

/// Парсинг строки времени в формате `HH:MM:SS.mmm` или `MM:SS.mmm` (секунды)
pub fn parse_timestamp(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };

    // Допускаем запятую как разделитель (формат SRT)
    let seconds: f64 = seconds.replace(',', ".").parse().ok()?;
    if !(0.0..60.0).contains(&seconds) || minutes >= 60 {
        return None;
    }

    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

fn warn_on_malformed_timing(segments: &[TimedSegment]) {
    for (index, segment) in segments.iter().enumerate() {
        if segment.duration() <= 0.0 {
            log::warn!(
                "Segment {} has non-positive duration ({:.3}s -> {:.3}s)",
                index,
                segment.start,
                segment.end
            );
        }
    }
    for (index, pair) in segments.windows(2).enumerate() {
        if pair[1].start < pair[0].start {
            log::warn!("Segment {} starts before segment {}", index + 1, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vtt() {
        let vtt_content = r#"WEBVTT

00:00:00.000 --> 00:00:05.000
First subtitle

NOTE this block is ignored

2
00:00:06.000 --> 00:00:10.500 align:start
<c.yellow>Second</c> subtitle
continues here
"#;

        let segments = parse_vtt_str(vtt_content).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "First subtitle");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 5.0);

        assert_eq!(segments[1].text, "Second subtitle continues here");
        assert_eq!(segments[1].start, 6.0);
        assert_eq!(segments[1].end, 10.5);
        assert!(segments[1].words.is_empty());
    }

    #[test]
    fn test_missing_header() {
        let result = parse_vtt_str("00:00:00.000 --> 00:00:01.000\nText\n");
        assert!(matches!(result, Err(DubSyncError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:01:02.500"), Some(62.5));
        assert_eq!(parse_timestamp("01:00:00.000"), Some(3600.0));
        assert_eq!(parse_timestamp("02:03.25"), Some(123.25));
        assert_eq!(parse_timestamp("00:00:01,200"), Some(1.2));
        assert_eq!(parse_timestamp("garbage"), None);
        assert_eq!(parse_timestamp("00:75:00.000"), None);
    }

    #[test]
    fn test_parse_json_with_words() {
        let json = r#"[
            {"text": "Bonjour", "start": 0.0, "end": 1.2,
             "words": [{"text": "Bonjour", "start": 0.1, "end": 1.0}]},
            {"text": "le monde", "start": 1.5, "end": 2.5}
        ]"#;

        let segments = parse_segments_json(json).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].words.len(), 1);
        assert_eq!(segments[0].words[0].end, 1.0);
        assert!(segments[1].words.is_empty());
    }

    #[test]
    fn test_parse_wrapped_json_and_malformed_timing() {
        // Сегмент с отрицательной длительностью принимается без ошибки
        let json = r#"{"segments": [{"text": "odd", "start": 2.0, "end": 1.0}]}"#;
        let segments = parse_segments_json(json).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].duration() < 0.0);
    }

    #[test]
    fn test_load_vtt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.vtt");
        std::fs::write(&path, "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHi\n").unwrap();

        let segments = load_segments_vtt(&path).unwrap();
        assert_eq!(segments, vec![TimedSegment::new("Hi", 1.0, 2.0)]);

        let missing = load_segments_vtt(dir.path().join("missing.vtt"));
        assert!(matches!(missing, Err(DubSyncError::FileNotFound(_))));
    }
}
