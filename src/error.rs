//! Модуль обработки ошибок библиотеки narration-sync
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при работе библиотеки.
//! Восстановимые ситуации (неоднозначная кодировка, пустой ввод, промах выравнивания)
//! ошибками не являются и только логируются.

use std::path::PathBuf;
use thiserror::Error;

/// Ошибки библиотеки narration-sync
#[derive(Debug, Error)]
pub enum NarrationError {
    /// Исходный файл не найден
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Не удалось сохранить состояние чтения
    #[error("failed to persist reading state to {}: {source}", path.display())]
    StatePersistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Запись состояния повреждена
    #[error("reading state record {} is corrupted: {source}", path.display())]
    StateCorrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка внешнего сервиса синтеза речи
    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    /// Неверный формат
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

/// Тип Result для библиотеки narration-sync
pub type Result<T> = std::result::Result<T, NarrationError>;
