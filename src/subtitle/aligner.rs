//! Выравнивание предложений по временным меткам синтеза
//!
//! Каждое предложение ищется в склеенном тексте границ слов. Поиск идёт
//! вперёд от предыдущего совпадения, затем с начала. Если предложение так и
//! не найдено, ему достаётся равная доля общей длительности по его номеру.
//! После этого начало сдвигается за конец предыдущей реплики, а слишком
//! короткие реплики растягиваются.

use std::time::Duration;
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::SubtitleConfig;
use crate::text::segmenter::split_sentences;
use crate::tts::timing::TimingUnit;
use super::types::SubtitleCue;

lazy_static! {
    static ref DISALLOWED_CHARS: Regex = Regex::new(r"[^\p{L}\p{N}\s，。！？,.!?]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Убрать из текста всё, кроме букв, цифр, пробелов и основных знаков конца
/// предложения и запятых; схлопнуть пробелы
pub fn normalize_text(text: &str) -> String {
    let cleaned = DISALLOWED_CHARS.replace_all(text, "");
    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

/// Ключ для поиска: только буквы и цифры
fn matching_key(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Предложения для реплик. Предложения из одного значимого символа отбрасываются.
pub fn cue_sentences(normalized: &str) -> Vec<&str> {
    split_sentences(normalized)
        .map(|s| s.text)
        .filter(|text| text.chars().filter(|c| c.is_alphanumeric()).count() > 1)
        .collect()
}

/// Найденное предложение: байтовый диапазон в склеенном тексте
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    start: usize,
    end: usize,
}

/// Склеенный текст границ слов с привязкой позиций к единицам
struct UnitIndex<'a> {
    units: &'a [TimingUnit],
    joined: String,
    /// (начало вклада единицы в `joined`, индекс единицы); только непустые вклады
    owners: Vec<(usize, usize)>,
}

impl<'a> UnitIndex<'a> {
    fn new(units: &'a [TimingUnit]) -> Self {
        let mut joined = String::new();
        let mut owners = Vec::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            let key = matching_key(&unit.text);
            if !key.is_empty() {
                owners.push((joined.len(), i));
                joined.push_str(&key);
            }
        }
        Self { units, joined, owners }
    }

    /// Найти ключ: сначала от `from`, затем с начала
    fn find_match(&self, key: &str, from: usize) -> Option<Match> {
        if key.is_empty() {
            return None;
        }
        let start = self
            .joined
            .get(from..)
            .and_then(|rest| rest.find(key))
            .map(|pos| from + pos)
            .or_else(|| self.joined.find(key))?;
        Some(Match {
            start,
            end: start + key.len(),
        })
    }

    /// Единица, чей вклад содержит байт `pos`
    fn owner_of(&self, pos: usize) -> usize {
        let slot = self.owners.partition_point(|&(start, _)| start <= pos);
        self.owners[slot.saturating_sub(1)].1
    }

    fn time_span(&self, found: Match, default_ticks: u64) -> (Duration, Duration) {
        let first = &self.units[self.owner_of(found.start)];
        let last = &self.units[self.owner_of(found.end - 1)];
        (first.start(), last.end(default_ticks))
    }
}

/// Построитель реплик по предложениям
#[derive(Debug, Clone, Default)]
pub struct SubtitleAligner {
    config: SubtitleConfig,
}

impl SubtitleAligner {
    pub fn new(config: SubtitleConfig) -> Self {
        Self { config }
    }

    /// Построить реплики для `narration_text` по границам слов `units`.
    ///
    /// Результат всегда упорядочен: каждая реплика начинается не раньше конца
    /// предыдущей и имеет ненулевую длительность.
    pub fn align(&self, units: &[TimingUnit], narration_text: &str) -> Vec<SubtitleCue> {
        if units.is_empty() {
            log::warn!("No word boundaries received, subtitles will be empty");
            return Vec::new();
        }

        let normalized = normalize_text(narration_text);
        let sentences = cue_sentences(&normalized);
        if sentences.is_empty() {
            log::debug!("Narration text has no sentences to subtitle");
            return Vec::new();
        }

        let default_ticks = self.config.default_unit_duration_ticks;
        let index = UnitIndex::new(units);
        let total = units
            .last()
            .map(|unit| unit.end(default_ticks))
            .unwrap_or_default();

        let mut cues: Vec<SubtitleCue> = Vec::with_capacity(sentences.len());
        let mut search_from = 0;

        for (i, sentence) in sentences.iter().enumerate() {
            let (mut start, mut end) = match index.find_match(&matching_key(sentence), search_from) {
                Some(found) => {
                    search_from = found.end;
                    index.time_span(found, default_ticks)
                }
                None => {
                    log::warn!(
                        "Sentence {} not found in word boundaries, using proportional timing: {}",
                        i + 1,
                        sentence
                    );
                    proportional_span(total, i, sentences.len())
                }
            };

            if let Some(previous) = cues.last() {
                if start < previous.end {
                    start = previous.end + self.config.sentence_gap();
                }
            }
            if end <= start {
                end = start + self.min_duration_for(sentence);
            }

            cues.push(SubtitleCue::new(i + 1, start, end, *sentence));
        }

        cues
    }

    fn min_duration_for(&self, sentence: &str) -> Duration {
        let chars = sentence.chars().count() as u32;
        (self.config.per_char_floor() * chars).max(self.config.min_duration())
    }
}

/// Равная доля общей длительности для предложения `i` из `n`
fn proportional_span(total: Duration, i: usize, n: usize) -> (Duration, Duration) {
    let total = total.as_nanos();
    let n = n as u128;
    let at = |k: u128| Duration::from_nanos((total * k / n) as u64);
    (at(i as u128), at(i as u128 + 1))
}
