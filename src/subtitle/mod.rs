//! Модуль для работы с субтитрами
//!
//! Построение реплик по предложениям озвученного текста и чтение/запись SRT.

pub mod aligner;
pub mod srt;
pub mod types;

pub use aligner::SubtitleAligner;
pub use srt::{format_srt_timestamp, parse_srt, read_srt_file, to_srt_string, write_srt_file};
pub use types::SubtitleCue;
