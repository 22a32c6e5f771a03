//! Модуль для работы с аудио
//!
//! Буфер моно-дорожки, чтение WAV (hound) и сжатых форматов (symphonia),
//! запись промежуточных и итоговых WAV-файлов.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::WavEncoding;
use crate::error::{DubSyncError, Result};
use crate::segment::RawSegmentAudio;

/// Моно-дорожка с фиксированной частотой дискретизации
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioBuffer {
    /// Семплы PCM (f32), ожидаемый диапазон [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Частота дискретизации
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Создать буфер из семплов
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Тишина заданной длительности
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let len = seconds_to_samples(duration_secs, sample_rate);
        Self::new(vec![0.0; len], sample_rate)
    }

    /// Количество семплов
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Пустой ли буфер
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Длительность в секундах
    pub fn duration(&self) -> f64 {
        duration_in_seconds(self.samples.len(), self.sample_rate)
    }

    /// Максимальная абсолютная амплитуда
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }
}

/// Перевести секунды в количество семплов с округлением до ближайшего.
/// Отрицательные значения дают ноль.
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    let samples = (seconds * sample_rate as f64).round();
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}

/// Длительность в секундах по количеству семплов
pub fn duration_in_seconds(sample_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    sample_count as f64 / sample_rate as f64
}

/// Максимальная абсолютная амплитуда
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Свести чередующиеся каналы в моно усреднением
pub fn fold_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 | 1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Прочитать аудиофайл.
///
/// WAV читается через hound, остальные форматы (MP3, AAC, FLAC, OGG)
/// декодируются через symphonia. Каналы не сводятся.
pub fn read_audio_file<P: AsRef<Path>>(path: P) -> Result<RawSegmentAudio> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DubSyncError::FileNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    let audio = match extension.as_str() {
        "wav" => read_wav(path)?,
        _ => decode_with_symphonia(path, &extension)?,
    };

    info!(
        "Read {} ({} frames, {} ch, {} Hz)",
        path.display(),
        audio.frames(),
        audio.channels,
        audio.sample_rate
    );
    Ok(audio)
}

/// Прочитать WAV-файл
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<RawSegmentAudio> {
    let reader = WavReader::open(path.as_ref())?;
    decode_wav(reader)
}

/// Прочитать WAV из памяти
pub fn read_wav_bytes(bytes: &[u8]) -> Result<RawSegmentAudio> {
    let reader = WavReader::new(std::io::Cursor::new(bytes))?;
    decode_wav(reader)
}

fn decode_wav<R: Read + Seek>(mut reader: WavReader<R>) -> Result<RawSegmentAudio> {
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|s| s as f32 / 128.0))
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / 32768.0))
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|s| s as f32 / 8_388_608.0))
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|s| s as f32 / 2_147_483_648.0))
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        (format, bits) => {
            return Err(DubSyncError::InvalidFormat(format!(
                "Unsupported WAV format: {:?}, {} bits",
                format, bits
            )));
        }
    };

    Ok(RawSegmentAudio {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

fn decode_with_symphonia(path: &Path, extension: &str) -> Result<RawSegmentAudio> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if !extension.is_empty() {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DubSyncError::Decoding(format!("Unrecognized audio format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DubSyncError::Decoding("No audio track found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DubSyncError::Decoding(format!("Failed to create decoder: {}", e)))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DubSyncError::Decoding(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(sample_buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Пропускаем поврежденный пакет и продолжаем
                warn!("Skipping undecodable packet in {}: {}", path.display(), e);
            }
            Err(e) => return Err(DubSyncError::Decoding(e.to_string())),
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(DubSyncError::Decoding(format!(
            "Could not determine stream parameters of {}",
            path.display()
        )));
    }

    Ok(RawSegmentAudio {
        samples,
        channels,
        sample_rate,
    })
}

/// Записать моно-дорожку в WAV
pub fn write_wav<P: AsRef<Path>>(path: P, buffer: &AudioBuffer, encoding: WavEncoding) -> Result<()> {
    let path = path.as_ref();
    let spec = match encoding {
        WavEncoding::Float32 => WavSpec {
            channels: 1,
            sample_rate: buffer.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
        WavEncoding::Int16 => WavSpec {
            channels: 1,
            sample_rate: buffer.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    };

    let mut writer = WavWriter::create(path, spec)?;
    match encoding {
        WavEncoding::Float32 => {
            for &sample in &buffer.samples {
                writer.write_sample(sample)?;
            }
        }
        WavEncoding::Int16 => {
            for &sample in &buffer.samples {
                let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
                writer.write_sample(quantized)?;
            }
        }
    }
    writer.finalize()?;

    debug!(
        "Wrote {} ({} samples, {} Hz, {:?})",
        path.display(),
        buffer.len(),
        buffer.sample_rate,
        encoding
    );
    Ok(())
}
