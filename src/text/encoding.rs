//! Определение кодировки и декодирование окон текста
//!
//! Позиция чтения хранится в байтах исходной кодировки файла, поэтому при
//! декодировании для каждого символа запоминается его смещение в исходных байтах.

use std::fmt;
use encoding_rs::{DecoderResult, EncoderResult, Encoding, GB18030, GBK, UTF_16BE, UTF_16LE, UTF_8};
use serde::{Deserialize, Serialize};

/// Поддерживаемые кодировки исходных текстов
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TextEncoding {
    Utf8,
    /// GBK / GB2312 / GB18030
    Gbk,
    Utf16Le,
    Utf16Be,
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::Utf8
    }
}

/// Порядок проверки кодировок без BOM
const CANDIDATES: [TextEncoding; 2] = [TextEncoding::Utf8, TextEncoding::Gbk];

impl TextEncoding {
    /// Метка кодировки для файла состояния
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Gbk => "gbk",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
        }
    }

    /// Найти кодировку по метке (`"gb2312"`, `"UTF-8"`, `"utf-16"` и т.п.)
    pub fn from_label(label: &str) -> Option<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())?;
        Self::from_encoding(encoding)
    }

    fn from_encoding(encoding: &'static Encoding) -> Option<Self> {
        if encoding == UTF_8 {
            Some(Self::Utf8)
        } else if encoding == GBK || encoding == GB18030 {
            Some(Self::Gbk)
        } else if encoding == UTF_16LE {
            Some(Self::Utf16Le)
        } else if encoding == UTF_16BE {
            Some(Self::Utf16Be)
        } else {
            None
        }
    }

    fn encoding(&self) -> &'static Encoding {
        match self {
            Self::Utf8 => UTF_8,
            Self::Gbk => GBK,
            Self::Utf16Le => UTF_16LE,
            Self::Utf16Be => UTF_16BE,
        }
    }

    /// Максимальная длина одного символа в байтах этой кодировки
    pub fn max_char_width(&self) -> usize {
        4
    }

    /// Длина BOM в начале `bytes`, если он соответствует этой кодировке
    pub fn bom_len(&self, bytes: &[u8]) -> usize {
        match Encoding::for_bom(bytes) {
            Some((encoding, len)) if encoding == self.encoding() => len,
            _ => 0,
        }
    }

    /// Длина символа в байтах исходной кодировки
    pub fn char_width(&self, c: char) -> usize {
        match self {
            Self::Utf8 => c.len_utf8(),
            Self::Utf16Le | Self::Utf16Be => c.len_utf16() * 2,
            Self::Gbk => {
                if c.is_ascii() {
                    return 1;
                }
                let mut utf8 = [0u8; 4];
                let mut out = [0u8; 8];
                let mut encoder = GBK.new_encoder();
                let (result, _, written) =
                    encoder.encode_from_utf8_without_replacement(c.encode_utf8(&mut utf8), &mut out, true);
                match result {
                    EncoderResult::InputEmpty => written,
                    // За пределами GBK остаются только четырёхбайтовые последовательности GB18030
                    _ => 4,
                }
            }
        }
    }

    /// Декодировать байты, запоминая исходное смещение каждого символа.
    ///
    /// При `last == false` неполная последовательность в конце буфера не считается
    /// ошибкой и не попадает в результат. Некорректные байты заменяются на U+FFFD.
    pub fn decode(&self, bytes: &[u8], last: bool) -> DecodedText {
        let mut decoder = self.encoding().new_decoder_without_bom_handling();
        let mut text = String::new();
        let mut offsets = vec![0usize];
        let mut consumed = 0usize;
        let mut had_errors = false;
        let mut input = bytes;

        loop {
            let needed = decoder
                .max_utf8_buffer_length_without_replacement(input.len())
                .unwrap_or(input.len() * 3 + 16);
            text.reserve(needed);

            let segment_start = text.len();
            let (result, read) = decoder.decode_to_string_without_replacement(input, &mut text, last);
            for c in text[segment_start..].chars() {
                consumed += self.char_width(c);
                offsets.push(consumed);
            }
            input = &input[read..];

            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(bad, _) => {
                    had_errors = true;
                    text.push(char::REPLACEMENT_CHARACTER);
                    consumed += bad as usize;
                    offsets.push(consumed);
                }
            }
        }

        if had_errors {
            log::debug!("Replaced malformed {} sequences while decoding", self);
        }

        DecodedText {
            text,
            offsets,
            had_errors,
        }
    }

    /// Декодировать без учёта смещений, с заменой некорректных байтов
    pub fn decode_lossy(&self, bytes: &[u8]) -> String {
        let (text, _) = self.encoding().decode_without_bom_handling(bytes);
        text.into_owned()
    }

    /// Проверить, декодируется ли префикс без ошибок
    fn decodes_cleanly(&self, prefix: &[u8]) -> bool {
        let mut decoder = self.encoding().new_decoder_without_bom_handling();
        let mut scratch = String::new();
        let mut input = prefix;
        loop {
            let needed = decoder
                .max_utf8_buffer_length_without_replacement(input.len())
                .unwrap_or(input.len() * 3 + 16);
            scratch.reserve(needed);
            // Префикс может обрываться посреди символа
            let (result, read) = decoder.decode_to_string_without_replacement(input, &mut scratch, false);
            input = &input[read..];
            match result {
                DecoderResult::InputEmpty => return true,
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(..) => return false,
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TextEncoding {
    fn from(label: String) -> Self {
        Self::from_label(&label).unwrap_or_else(|| {
            log::warn!("Unknown encoding label '{}', falling back to utf-8", label);
            Self::Utf8
        })
    }
}

impl From<TextEncoding> for String {
    fn from(encoding: TextEncoding) -> Self {
        encoding.as_str().to_string()
    }
}

/// Определить кодировку по префиксу файла.
///
/// Сначала проверяется BOM, затем кандидаты по убыванию вероятности;
/// если ни один не подошёл, возвращается UTF-8.
pub fn detect_encoding(prefix: &[u8]) -> TextEncoding {
    if let Some((encoding, _)) = Encoding::for_bom(prefix) {
        if let Some(detected) = TextEncoding::from_encoding(encoding) {
            return detected;
        }
    }

    for candidate in CANDIDATES {
        if candidate.decodes_cleanly(prefix) {
            return candidate;
        }
    }

    log::debug!("No candidate encoding decodes the prefix cleanly, using utf-8");
    TextEncoding::Utf8
}

/// Декодированный текст с таблицей исходных смещений символов
#[derive(Debug, Clone)]
pub struct DecodedText {
    /// Текст в UTF-8
    pub text: String,
    /// `offsets[i]` - смещение начала i-го символа в исходных байтах; последний элемент - конец
    offsets: Vec<usize>,
    /// Были ли заменены некорректные последовательности
    pub had_errors: bool,
}

impl DecodedText {
    /// Количество символов
    pub fn char_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Сколько исходных байт занимает весь текст
    pub fn native_len(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    /// Сколько исходных байт занимают первые `chars` символов
    pub fn native_len_of_chars(&self, chars: usize) -> usize {
        self.offsets[chars.min(self.char_count())]
    }

    /// Оставить только первые `chars` символов
    pub fn truncate_chars(&mut self, chars: usize) {
        if chars >= self.char_count() {
            return;
        }
        let byte_end = self
            .text
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        self.text.truncate(byte_end);
        self.offsets.truncate(chars + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8() {
        assert_eq!(detect_encoding("你好，世界。".as_bytes()), TextEncoding::Utf8);
        assert_eq!(detect_encoding(b"plain ascii"), TextEncoding::Utf8);
        assert_eq!(detect_encoding(b""), TextEncoding::Utf8);
    }

    #[test]
    fn test_detect_gbk() {
        let (bytes, _, _) = GBK.encode("第一章 少年。他走进了山门！");
        assert_eq!(detect_encoding(&bytes), TextEncoding::Gbk);
    }

    #[test]
    fn test_detect_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend_from_slice(&[b'h', 0, b'i', 0]);
        assert_eq!(detect_encoding(&bytes), TextEncoding::Utf16Le);
        assert_eq!(TextEncoding::Utf16Le.bom_len(&bytes), 2);
        assert_eq!(TextEncoding::Utf8.bom_len(&bytes), 0);
    }

    #[test]
    fn test_truncated_prefix_is_not_an_error() {
        let bytes = "你好".as_bytes();
        // Обрезаем посреди второго символа
        assert_eq!(detect_encoding(&bytes[..4]), TextEncoding::Utf8);
    }

    #[test]
    fn test_garbage_falls_back_to_utf8() {
        assert_eq!(detect_encoding(&[0xFF, 0xFF, 0xFF, 0x80]), TextEncoding::Utf8);
    }

    #[test]
    fn test_decode_offsets_utf8() {
        let decoded = TextEncoding::Utf8.decode("a你b".as_bytes(), true);
        assert_eq!(decoded.text, "a你b");
        assert_eq!(decoded.char_count(), 3);
        assert_eq!(decoded.native_len_of_chars(1), 1);
        assert_eq!(decoded.native_len_of_chars(2), 4);
        assert_eq!(decoded.native_len(), 5);
    }

    #[test]
    fn test_decode_offsets_gbk() {
        let (bytes, _, _) = GBK.encode("a你b");
        let decoded = TextEncoding::Gbk.decode(&bytes, true);
        assert_eq!(decoded.text, "a你b");
        assert_eq!(decoded.native_len_of_chars(2), 3);
        assert_eq!(decoded.native_len(), bytes.len());
    }

    #[test]
    fn test_decode_incomplete_tail_is_held_back() {
        let bytes = "你好".as_bytes();
        let decoded = TextEncoding::Utf8.decode(&bytes[..5], false);
        assert_eq!(decoded.text, "你");
        assert_eq!(decoded.native_len(), 3);
        assert!(!decoded.had_errors);
    }

    #[test]
    fn test_decode_malformed_is_replaced() {
        let decoded = TextEncoding::Utf8.decode(&[b'a', 0xFF, b'b'], true);
        assert_eq!(decoded.text, "a\u{FFFD}b");
        assert!(decoded.had_errors);
        assert_eq!(decoded.native_len(), 3);
    }

    #[test]
    fn test_truncate_chars() {
        let mut decoded = TextEncoding::Utf8.decode("你好世界".as_bytes(), true);
        decoded.truncate_chars(2);
        assert_eq!(decoded.text, "你好");
        assert_eq!(decoded.native_len(), 6);
    }

    #[test]
    fn test_legacy_labels() {
        assert_eq!(TextEncoding::from_label("gb2312"), Some(TextEncoding::Gbk));
        assert_eq!(TextEncoding::from_label("UTF-8"), Some(TextEncoding::Utf8));
        assert_eq!(TextEncoding::from_label("utf-16"), Some(TextEncoding::Utf16Le));
        assert_eq!(TextEncoding::from("koi8-r".to_string()), TextEncoding::Utf8);
    }
}
