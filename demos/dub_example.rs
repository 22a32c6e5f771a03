//! Пример сборки дублированной дорожки
//!
//! Сегменты читаются из JSON или VTT, аудио сегментов берется из директории
//! с заранее синтезированными файлами `seg_0000.wav`, `seg_0001.wav`, ...
//!
//! Запуск:
//! `cargo run --example dub_example -- segments.json clips/ out.wav [background.wav]`

use std::path::Path;

use anyhow::{bail, Context};
use dub_sync::notification::{ChannelProgressObserver, CompositeProgressObserver, FileProgressObserver, LogProgressObserver};
use dub_sync::progress::{DefaultProgressReporter, ProgressReporter};
use dub_sync::segment::{load_segments_json, load_segments_vtt};
use dub_sync::{DubSync, DubSyncConfig, PrerenderedSynthesizer};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dub_sync::utils::init_logger();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: dub_example <segments.json|segments.vtt> <clips_dir> <output.wav> [background]");
    }
    let segments_path = Path::new(&args[0]);
    let clips_dir = Path::new(&args[1]);
    let output_path = Path::new(&args[2]);
    let background = args.get(3).map(Path::new);

    let segments = match segments_path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => load_segments_vtt(segments_path),
        _ => load_segments_json(segments_path),
    }
    .with_context(|| format!("loading segments from {}", segments_path.display()))?;

    let config = match std::env::var("DUB_SYNC_CONFIG") {
        Ok(path) => DubSyncConfig::from_json_file(&path).with_context(|| format!("loading config {}", path))?,
        Err(_) => DubSyncConfig::default(),
    };

    // Лог, файл и канал получают одни и те же обновления
    let (tx, mut rx) = mpsc::channel(64);
    let mut composite = CompositeProgressObserver::new();
    composite.add_observer(Box::new(LogProgressObserver::with_prefix("[dub] ")));
    composite.add_observer(Box::new(FileProgressObserver::new("dub_progress.log")));
    composite.add_observer(Box::new(ChannelProgressObserver::new(tx)));

    let mut reporter = DefaultProgressReporter::new();
    reporter.add_observer(Box::new(composite));

    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            println!("{:5.1}% {}", progress.total_progress, progress.step);
        }
    });

    let dub = DubSync::with_progress_reporter(config, Box::new(reporter));
    let synthesizer = PrerenderedSynthesizer::new(clips_dir);
    let written = dub
        .render_to_file(&segments, &synthesizer, background, output_path)
        .await?;

    // Закрываем канал, чтобы печать завершилась
    drop(dub);
    printer.await?;

    println!("Готово: {}", written.display());
    Ok(())
}
