//! Основной файл библиотеки narration-sync
//!
//! Библиотека читает большие тексты (романы) порциями, которые всегда
//! заканчиваются на границе предложения, и запоминает позицию чтения между
//! запусками. Для озвученной порции строятся субтитры SRT по предложениям,
//! выровненные по временным меткам сервиса синтеза речи.

pub mod config;
pub mod error;
pub mod reader;
pub mod subtitle;
pub mod text;
pub mod tts;
pub mod utils;

pub use config::{NarrationConfig, ReaderConfig, SubtitleConfig};
pub use error::{NarrationError, Result};
pub use reader::{Chunk, ChunkStats, ChunkedReader, JsonFileStore, MemoryStore, ProgressSnapshot, ReadingState, StateStore};
pub use subtitle::{SubtitleAligner, SubtitleCue};
pub use tts::{narrate_to_files, SpeechSynthesizer, SynthesisEvent, TimingUnit};
