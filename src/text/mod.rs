//! Работа с текстом: определение кодировки и разбиение на предложения

pub mod encoding;
pub mod segmenter;

pub use encoding::{detect_encoding, DecodedText, TextEncoding};
pub use segmenter::{split_sentences, Sentence, Sentences};
