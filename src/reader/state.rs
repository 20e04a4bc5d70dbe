//! Состояние чтения источника

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use chrono::{DateTime, Utc};
use path_clean::PathClean;
use serde::{Deserialize, Deserializer, Serialize};
use crate::text::encoding::TextEncoding;

/// Стабильный идентификатор источника: md5 от нормализованного пути
pub fn source_id<P: AsRef<Path>>(path: P) -> String {
    let cleaned = path.as_ref().to_path_buf().clean();
    format!("{:x}", md5::compute(cleaned.to_string_lossy().as_bytes()))
}

/// Отпечаток файла (размер и время изменения) для обнаружения изменений
pub fn fingerprint(metadata: &std::fs::Metadata) -> String {
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let content = format!("{}_{}", metadata.len(), mtime);
    format!("{:x}", md5::compute(content.as_bytes()))
}

/// Запись о позиции чтения одного источника.
///
/// Все поля кроме пути имеют значения по умолчанию, чтобы старые записи
/// без новых полей продолжали читаться.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingState {
    /// Путь к источнику
    #[serde(alias = "file_path")]
    pub source_path: PathBuf,
    /// Идентификатор источника
    #[serde(default)]
    pub source_id: String,
    /// Текущая позиция в байтах исходной кодировки
    #[serde(default, alias = "current_position")]
    pub offset: u64,
    /// Размер файла в байтах на момент инициализации
    #[serde(default)]
    pub total_size: u64,
    /// Целевой размер блока в символах
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Кодировка, определённая при инициализации
    #[serde(default)]
    pub encoding: TextEncoding,
    /// Отпечаток файла
    #[serde(default, alias = "file_hash")]
    pub fingerprint: String,
    /// Время последнего сохранения
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_read_time: Option<DateTime<Utc>>,
    /// Последние прочитанные предложения (для перекрытия)
    #[serde(default)]
    pub recent_sentences: Vec<String>,
}

fn default_chunk_size() -> usize {
    500
}

/// Нечитаемая метка времени не должна делать запись непригодной
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc)))
}

impl ReadingState {
    /// Создать новое состояние с нулевой позицией
    pub fn new(
        source_path: impl Into<PathBuf>,
        total_size: u64,
        chunk_size: usize,
        encoding: TextEncoding,
        fingerprint: String,
    ) -> Self {
        let source_path = source_path.into();
        Self {
            source_id: source_id(&source_path),
            source_path,
            offset: 0,
            total_size,
            chunk_size,
            encoding,
            fingerprint,
            last_read_time: None,
            recent_sentences: Vec::new(),
        }
    }

    /// Процент прочитанного. Пустой файл считается прочитанным полностью.
    pub fn progress_percent(&self) -> f64 {
        if self.total_size == 0 {
            100.0
        } else {
            self.offset as f64 / self.total_size as f64 * 100.0
        }
    }

    /// Достигнут ли конец источника
    pub fn is_finished(&self) -> bool {
        self.offset >= self.total_size
    }

    /// Установить позицию с ограничением `[0, total_size]`.
    /// Сохранённые предложения перекрытия после этого недействительны.
    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset.min(self.total_size);
        self.recent_sentences.clear();
    }

    /// Снимок состояния для вызывающей стороны
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            source_path: self.source_path.clone(),
            offset: self.offset,
            total_size: self.total_size,
            progress_percent: self.progress_percent(),
            chunk_size: self.chunk_size,
            encoding: self.encoding,
            last_read_time: self.last_read_time,
        }
    }
}

/// Информация о прогрессе чтения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub source_path: PathBuf,
    pub offset: u64,
    pub total_size: u64,
    pub progress_percent: f64,
    pub chunk_size: usize,
    pub encoding: TextEncoding,
    pub last_read_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_is_stable_for_equivalent_paths() {
        assert_eq!(source_id("novels/a.txt"), source_id("novels/./a.txt"));
        assert_ne!(source_id("novels/a.txt"), source_id("novels/b.txt"));
        assert_eq!(source_id("x").len(), 32);
    }

    #[test]
    fn test_set_offset_is_clamped() {
        let mut state = ReadingState::new("a.txt", 100, 500, TextEncoding::Utf8, String::new());
        state.recent_sentences.push("旧句子。".to_string());
        state.set_offset(250);
        assert_eq!(state.offset, 100);
        assert!(state.recent_sentences.is_empty());
        assert!(state.is_finished());
    }

    #[test]
    fn test_progress_percent() {
        let mut state = ReadingState::new("a.txt", 200, 500, TextEncoding::Utf8, String::new());
        state.offset = 50;
        assert_eq!(state.progress_percent(), 25.0);
        state.total_size = 0;
        assert_eq!(state.progress_percent(), 100.0);
    }

    #[test]
    fn test_old_record_without_new_fields() {
        let json = r#"{
            "file_path": "novel.txt",
            "current_position": 42,
            "total_size": 100,
            "chunk_size": 300,
            "encoding": "gb2312",
            "file_hash": "abc",
            "last_read_time": ""
        }"#;
        let state: ReadingState = serde_json::from_str(json).unwrap();
        assert_eq!(state.offset, 42);
        assert_eq!(state.encoding, TextEncoding::Gbk);
        assert_eq!(state.fingerprint, "abc");
        assert!(state.recent_sentences.is_empty());
        assert!(state.last_read_time.is_none());
    }

    #[test]
    fn test_timestamp_survives_roundtrip() {
        let mut state = ReadingState::new("a.txt", 10, 500, TextEncoding::Gbk, "fp".to_string());
        state.last_read_time = Some(Utc::now());
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"encoding\":\"gbk\""));
        let restored: ReadingState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
