//! Хранилище состояний чтения
//!
//! Состояние каждого источника хранится отдельной записью по его идентификатору.
//! Операции load-изменить-save не атомарны между процессами: один источник
//! должен читаться из одного потока.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use crate::error::{NarrationError, Result};
use super::state::ReadingState;

const RECORD_PREFIX: &str = "novel_state_";
const RECORD_SUFFIX: &str = ".json";

/// Хранилище состояний чтения, адресуемых идентификатором источника
pub trait StateStore: Send + Sync {
    /// Загрузить состояние; `None`, если записи нет
    fn load(&self, source_id: &str) -> Result<Option<ReadingState>>;

    /// Сохранить состояние под его `source_id`
    fn save(&self, state: &ReadingState) -> Result<()>;

    /// Все сохранённые состояния
    fn list(&self) -> Result<Vec<ReadingState>>;
}

/// Хранилище в виде JSON-файлов в директории
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Путь к файлу записи
    pub fn record_path(&self, source_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}{}", RECORD_PREFIX, source_id, RECORD_SUFFIX))
    }

    fn read_record(path: &Path) -> Result<ReadingState> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|source| NarrationError::StateCorrupted {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, source_id: &str) -> Result<Option<ReadingState>> {
        let path = self.record_path(source_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn save(&self, state: &ReadingState) -> Result<()> {
        let path = self.record_path(&state.source_id);
        let persistence = |source: std::io::Error| NarrationError::StatePersistence {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(persistence)?;
        let json = serde_json::to_vec_pretty(state)?;

        // Запись через временный файл, чтобы не оставить половину JSON при сбое
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(persistence)?;
        tmp.write_all(&json).map_err(persistence)?;
        tmp.as_file().sync_all().map_err(persistence)?;
        tmp.persist(&path).map_err(|e| persistence(e.error))?;

        log::debug!("Saved reading state {} (offset {})", path.display(), state.offset);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ReadingState>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut states = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| NarrationError::Other(e.to_string()))?;
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file()
                || !name.starts_with(RECORD_PREFIX)
                || !name.ends_with(RECORD_SUFFIX)
            {
                continue;
            }
            match Self::read_record(entry.path()) {
                Ok(state) => states.push(state),
                Err(e) => log::warn!("Skipping unreadable state record: {}", e),
            }
        }
        states.sort_by(|a, b| a.source_path.cmp(&b.source_path));
        Ok(states)
    }
}

/// Хранилище в памяти
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: Mutex<HashMap<String, ReadingState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, source_id: &str) -> Result<Option<ReadingState>> {
        Ok(self.states.lock().get(source_id).cloned())
    }

    fn save(&self, state: &ReadingState) -> Result<()> {
        self.states
            .lock()
            .insert(state.source_id.clone(), state.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ReadingState>> {
        let mut states: Vec<_> = self.states.lock().values().cloned().collect();
        states.sort_by(|a, b| a.source_path.cmp(&b.source_path));
        Ok(states)
    }
}
