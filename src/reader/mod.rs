//! # Блочное чтение больших текстов
//!
//! Читает источник порциями примерно по `chunk_size` символов, всегда обрывая
//! порцию на границе предложения. Позиция чтения сохраняется в [`StateStore`],
//! поэтому повторный запуск продолжает с того же места.
//!
//! Позиция хранится в байтах исходной кодировки файла. Перекрытие (последние
//! предложения предыдущей порции) добавляется в начало текста и не сдвигает позицию.

pub mod state;
pub mod store;

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use chrono::Utc;
use serde::Serialize;

use crate::config::ReaderConfig;
use crate::error::{NarrationError, Result};
use crate::text::encoding::{detect_encoding, TextEncoding};
use crate::text::segmenter::split_sentences;

pub use state::{fingerprint, source_id, ProgressSnapshot, ReadingState};
pub use store::{JsonFileStore, MemoryStore, StateStore};

/// Статистика одного чтения
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkStats {
    /// Позиция после чтения, в байтах
    pub offset: u64,
    /// Размер источника в байтах
    pub total_size: u64,
    /// Процент прочитанного
    pub progress_percent: f64,
    /// Длина возвращённого текста в символах (вместе с перекрытием)
    pub chunk_char_count: usize,
    /// Добавлено ли перекрытие
    pub has_overlap: bool,
    /// Длина перекрытия в символах
    pub overlap_char_count: usize,
}

/// Результат одного вызова [`ChunkedReader::read_next_chunk`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// Текст: перекрытие, затем новая порция
    pub text: String,
    /// Достигнут ли конец источника
    pub is_end: bool,
    pub stats: ChunkStats,
}

impl Chunk {
    /// Текст без перекрытия
    pub fn fresh_text(&self) -> &str {
        let skip = self
            .text
            .char_indices()
            .nth(self.stats.overlap_char_count)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        &self.text[skip..]
    }
}

/// Читатель, сохраняющий позицию в хранилище `S`
pub struct ChunkedReader<S: StateStore = JsonFileStore> {
    store: S,
    config: ReaderConfig,
}

impl ChunkedReader<JsonFileStore> {
    /// Читатель с JSON-хранилищем в `config.state_dir`
    pub fn new(config: ReaderConfig) -> Self {
        let store = JsonFileStore::new(config.state_dir.clone());
        Self { store, config }
    }
}

impl<S: StateStore> ChunkedReader<S> {
    pub fn with_store(store: S, config: ReaderConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Инициализировать (или обновить) состояние источника и сохранить его
    pub fn init_source<P: AsRef<Path>>(&self, path: P, chunk_size: usize) -> Result<ReadingState> {
        let state = self.prepare_state(path.as_ref(), chunk_size)?;
        self.persist(state)
    }

    /// Прочитать следующую порцию.
    ///
    /// Если источник уже прочитан, возвращает пустой текст и `is_end = true`,
    /// не изменяя позицию.
    pub fn read_next_chunk<P: AsRef<Path>>(
        &self,
        path: P,
        chunk_size: usize,
        overlap_sentence_count: usize,
    ) -> Result<Chunk> {
        let path = path.as_ref();
        if chunk_size == 0 {
            return Err(NarrationError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        let mut state = self.prepare_state(path, chunk_size)?;
        let limit = chunk_size + self.config.lookahead_margin;
        let max_bytes = limit * state.encoding.max_char_width();

        let bytes = read_range(path, state.offset, max_bytes)?;
        let reached_eof =
            bytes.len() < max_bytes || state.offset + bytes.len() as u64 >= state.total_size;
        let skip = if state.offset == 0 {
            state.encoding.bom_len(&bytes)
        } else {
            0
        };

        let mut window = state.encoding.decode(&bytes[skip..], reached_eof);
        if window.had_errors {
            log::warn!(
                "Malformed {} bytes near offset {} of {}, substituted",
                state.encoding,
                state.offset,
                path.display()
            );
        }

        if window.char_count() == 0 && skip == 0 {
            log::debug!("{} is fully read", path.display());
            let state = self.persist(state)?;
            return Ok(Chunk {
                text: String::new(),
                is_end: true,
                stats: ChunkStats {
                    offset: state.offset,
                    total_size: state.total_size,
                    progress_percent: state.progress_percent(),
                    chunk_char_count: 0,
                    has_overlap: false,
                    overlap_char_count: 0,
                },
            });
        }

        let more_follows = !reached_eof || window.char_count() > limit;
        window.truncate_chars(limit);
        let cut = if more_follows {
            find_sentence_cut(&window.text, chunk_size)
        } else {
            window.char_count()
        };

        let chunk_text = char_prefix(&window.text, cut);
        let consumed = (skip + window.native_len_of_chars(cut)) as u64;

        let overlap = if state.offset > 0 && overlap_sentence_count > 0 {
            self.overlap_text(path, &state, overlap_sentence_count)?
        } else {
            String::new()
        };

        let text = format!("{}{}", overlap, chunk_text).trim().to_string();
        let overlap_char_count = overlap.chars().count();

        let keep = self.config.overlap_history.max(overlap_sentence_count);
        remember_sentences(&mut state.recent_sentences, chunk_text, keep);
        state.offset = (state.offset + consumed).min(state.total_size);
        let state = self.persist(state)?;

        log::debug!(
            "Read {} chars from {} (consumed {} bytes, offset {}/{})",
            cut,
            path.display(),
            consumed,
            state.offset,
            state.total_size
        );

        Ok(Chunk {
            is_end: state.is_finished(),
            stats: ChunkStats {
                offset: state.offset,
                total_size: state.total_size,
                progress_percent: state.progress_percent(),
                chunk_char_count: text.chars().count(),
                has_overlap: overlap_char_count > 0,
                overlap_char_count,
            },
            text,
        })
    }

    /// Вернуть позицию в начало. `false`, если источник не инициализирован.
    pub fn reset_position<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        self.set_position(path, 0)
    }

    /// Установить позицию (в байтах) с ограничением `[0, total_size]`.
    /// `false`, если источник не инициализирован.
    pub fn set_position<P: AsRef<Path>>(&self, path: P, position: u64) -> Result<bool> {
        match self.load_existing(path.as_ref())? {
            Some(mut state) => {
                state.set_offset(position);
                self.persist(state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Прогресс чтения источника, если он инициализирован
    pub fn get_progress<P: AsRef<Path>>(&self, path: P) -> Result<Option<ProgressSnapshot>> {
        Ok(self.load_existing(path.as_ref())?.map(|state| state.snapshot()))
    }

    /// Прогресс всех сохранённых источников, которые ещё существуют
    pub fn list_states(&self) -> Result<Vec<ProgressSnapshot>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|state| state.source_path.exists())
            .map(|state| state.snapshot())
            .collect())
    }

    fn persist(&self, mut state: ReadingState) -> Result<ReadingState> {
        state.last_read_time = Some(Utc::now());
        self.store.save(&state)?;
        Ok(state)
    }

    /// Загрузить состояние, сбросив позицию, если файл изменился
    fn load_existing(&self, path: &Path) -> Result<Option<ReadingState>> {
        let Some(mut state) = self.store.load(&source_id(path))? else {
            return Ok(None);
        };
        if let Ok(metadata) = fs::metadata(path) {
            self.refresh_if_changed(path, &mut state, &metadata)?;
        }
        Ok(Some(state))
    }

    /// Загрузить или создать состояние для чтения. Ничего не сохраняет.
    fn prepare_state(&self, path: &Path, chunk_size: usize) -> Result<ReadingState> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(NarrationError::SourceNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let existing = match self.store.load(&source_id(path)) {
            Ok(state) => state,
            Err(e @ NarrationError::StateCorrupted { .. }) => {
                log::warn!("{}; starting {} from the beginning", e, path.display());
                None
            }
            Err(e) => return Err(e),
        };

        let mut state = match existing {
            Some(mut state) => {
                self.refresh_if_changed(path, &mut state, &metadata)?;
                state
            }
            None => {
                let encoding = self.sniff_encoding(path)?;
                log::info!(
                    "New source {} ({} bytes, {})",
                    path.display(),
                    metadata.len(),
                    encoding
                );
                ReadingState::new(path, metadata.len(), chunk_size, encoding, fingerprint(&metadata))
            }
        };
        state.chunk_size = chunk_size;
        Ok(state)
    }

    fn refresh_if_changed(
        &self,
        path: &Path,
        state: &mut ReadingState,
        metadata: &fs::Metadata,
    ) -> Result<()> {
        let current = fingerprint(metadata);
        if state.fingerprint != current {
            log::info!("{} changed on disk, reading from the beginning", path.display());
            state.fingerprint = current;
            state.total_size = metadata.len();
            state.encoding = self.sniff_encoding(path)?;
            state.set_offset(0);
        }
        Ok(())
    }

    fn sniff_encoding(&self, path: &Path) -> Result<TextEncoding> {
        let prefix = read_range(path, 0, self.config.sniff_bytes)?;
        Ok(detect_encoding(&prefix))
    }

    /// Текст перекрытия: последние предложения, прочитанные до текущей позиции
    fn overlap_text(&self, path: &Path, state: &ReadingState, count: usize) -> Result<String> {
        if !state.recent_sentences.is_empty() {
            let from = state.recent_sentences.len().saturating_sub(count);
            return Ok(state.recent_sentences[from..].concat());
        }

        // Истории нет (например, после set_position) - читаем окно перед позицией
        let window = self.config.overlap_window_bytes as u64;
        let start = state.offset.saturating_sub(window);
        let bytes = read_range(path, start, (state.offset - start) as usize)?;
        let previous = state.encoding.decode_lossy(&bytes);
        let sentences: Vec<_> = split_sentences(&previous).collect();

        // Первое предложение окна может быть обрезано
        if sentences.len() <= count {
            return Ok(String::new());
        }
        Ok(sentences[sentences.len() - count..]
            .iter()
            .map(|s| previous[s.span.clone()].trim_start())
            .collect())
    }
}

/// Прочитать до `len` байт начиная с `start`
fn read_range(path: &Path, start: u64, len: usize) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => NarrationError::SourceNotFound(path.to_path_buf()),
        _ => e.into(),
    })?;
    file.seek(SeekFrom::Start(start))?;
    let mut bytes = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Позиция (в символах) конца последнего законченного предложения, не выходящего
/// за `chunk_size`. Если первое же предложение длиннее, берётся его конец; если
/// в окне нет ни одного знака конца предложения, текст режется по `chunk_size`.
fn find_sentence_cut(text: &str, chunk_size: usize) -> usize {
    let mut best = None;
    let mut chars_before = 0;
    let mut counted_to = 0;

    for sentence in split_sentences(text) {
        if !sentence.terminated {
            break;
        }
        let raw = &text[sentence.span.clone()];
        let content_end = sentence.span.start + raw.trim_end().len();
        let content_chars = chars_before + text[counted_to..content_end].chars().count();
        chars_before += text[counted_to..sentence.span.end].chars().count();
        counted_to = sentence.span.end;

        if content_chars <= chunk_size {
            best = Some(chars_before);
        } else {
            return best.unwrap_or(chars_before);
        }
    }

    best.unwrap_or_else(|| {
        log::warn!("No sentence boundary within the lookahead window, cutting at {} chars", chunk_size);
        chunk_size.min(text.chars().count())
    })
}

fn char_prefix(text: &str, chars: usize) -> &str {
    let end = text
        .char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}

fn remember_sentences(history: &mut Vec<String>, chunk_text: &str, keep: usize) {
    history.extend(
        split_sentences(chunk_text).map(|s| chunk_text[s.span.clone()].trim_start().to_string()),
    );
    if history.len() > keep {
        history.drain(..history.len() - keep);
    }
}

#[cfg(test)]
mod tests {
    mod test_chunked_reader;
    mod test_sentence_cut;
}
