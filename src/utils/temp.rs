//! Модуль для работы с временными файлами
//!
//! Промежуточные артефакты (например, дорожка речи до смешивания)
//! складываются во временную директорию и удаляются вместе с ней,
//! если не включено их сохранение.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::TempDir;

use crate::config::DubSyncConfig;
use crate::error::Result;

/// Менеджер временных файлов
pub struct TempFileManager {
    temp_dir: TempDir,
    files: Vec<PathBuf>,
    keep_files: bool,
}

impl TempFileManager {
    /// Создать менеджер в `base_dir` (или в системной временной директории)
    pub fn new(base_dir: Option<&Path>, keep_files: bool) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("dub-sync-").keep(keep_files);

        let temp_dir = match base_dir {
            Some(base) => {
                fs::create_dir_all(base)?;
                builder.tempdir_in(base)?
            }
            None => builder.tempdir()?,
        };
        debug!("Temporary directory: {}", temp_dir.path().display());

        Ok(Self {
            temp_dir,
            files: Vec::new(),
            keep_files,
        })
    }

    /// Создать менеджер по настройкам конвейера
    pub fn from_config(config: &DubSyncConfig) -> Result<Self> {
        Self::new(config.temp_dir.as_deref().map(Path::new), config.keep_temp_files)
    }

    /// Зарезервировать путь для нового временного файла
    pub fn create_temp_file(&mut self, prefix: &str, extension: &str) -> Result<PathBuf> {
        let file_name = format!("{}_{}.{}", prefix, uuid::Uuid::new_v4(), extension);
        let file_path = self.temp_dir.path().join(file_name);
        self.files.push(file_path.clone());
        Ok(file_path)
    }

    pub fn temp_dir_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Зарегистрированные файлы
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Удалить временные файлы, если сохранение не включено
    pub fn cleanup(&mut self) -> Result<()> {
        if self.keep_files {
            info!("Keeping temporary files in {}", self.temp_dir.path().display());
            return Ok(());
        }

        for file in self.files.drain(..) {
            if file.exists() {
                fs::remove_file(&file)?;
            }
        }
        Ok(())
    }
}

impl Drop for TempFileManager {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
