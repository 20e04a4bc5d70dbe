//! Модуль конфигурации библиотеки narration-sync
//!
//! Этот модуль содержит структуры для настройки чтения текста и генерации субтитров.
//! Все поля имеют значения по умолчанию, поэтому JSON-файл может задавать только часть из них.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{NarrationError, Result};

/// Настройки блочного чтения
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderConfig {
    /// Директория для файлов состояния
    pub state_dir: PathBuf,
    /// Целевой размер блока в символах
    pub chunk_size: usize,
    /// Дополнительные символы, читаемые сверх размера блока для поиска границы предложения
    pub lookahead_margin: usize,
    /// Количество предложений перекрытия по умолчанию
    pub overlap_sentences: usize,
    /// Сколько последних предложений хранить в состоянии для перекрытия
    pub overlap_history: usize,
    /// Размер окна (в байтах) для обратного поиска предложений перекрытия
    pub overlap_window_bytes: usize,
    /// Сколько байт читать для определения кодировки
    pub sniff_bytes: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".cache"),
            chunk_size: 500,
            lookahead_margin: 200,
            overlap_sentences: 1,
            overlap_history: 3,
            overlap_window_bytes: 300,
            sniff_bytes: 4096,
        }
    }
}

/// Настройки выравнивания субтитров
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Зазор между соседними репликами при сдвиге начала, мс
    pub sentence_gap_ms: u64,
    /// Минимальная длительность на символ, мс
    pub per_char_floor_ms: u64,
    /// Абсолютная минимальная длительность реплики, мс
    pub min_duration_ms: u64,
    /// Длительность единицы, если сервис синтеза её не передал (в тиках по 100 нс)
    pub default_unit_duration_ticks: u64,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            sentence_gap_ms: 50,
            per_char_floor_ms: 80,
            min_duration_ms: 1000,
            default_unit_duration_ticks: 1_000_000,
        }
    }
}

impl SubtitleConfig {
    pub fn sentence_gap(&self) -> Duration {
        Duration::from_millis(self.sentence_gap_ms)
    }

    pub fn per_char_floor(&self) -> Duration {
        Duration::from_millis(self.per_char_floor_ms)
    }

    pub fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms)
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NarrationConfig {
    /// Настройки чтения
    pub reader: ReaderConfig,
    /// Настройки субтитров
    pub subtitles: SubtitleConfig,
}

impl NarrationConfig {
    /// Загрузить конфигурацию из JSON-файла
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            NarrationError::Configuration(format!(
                "failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: NarrationConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Проверить значения конфигурации
    pub fn validate(&self) -> Result<()> {
        if self.reader.chunk_size == 0 {
            return Err(NarrationError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.reader.sniff_bytes == 0 {
            return Err(NarrationError::Configuration(
                "sniff_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
