//! Временные метки синтеза речи
//!
//! Сервис синтеза отдаёт поток событий: куски аудио и границы слов.
//! Время в событиях задаётся в тиках по 100 нс.

use std::time::Duration;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use crate::error::Result;

/// Тиков в секунде
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Перевести тики (100 нс) в `Duration`
pub fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::from_nanos(ticks.saturating_mul(100))
}

/// Граница слова (или части слова) в синтезированной речи
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingUnit {
    /// Озвученный фрагмент текста
    #[serde(default)]
    pub text: String,
    /// Начало фрагмента, тики
    #[serde(default)]
    pub offset: u64,
    /// Длительность фрагмента, тики. Некоторые сервисы её не передают.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl TimingUnit {
    pub fn new(text: impl Into<String>, offset: u64, duration: u64) -> Self {
        Self {
            text: text.into(),
            offset,
            duration: Some(duration),
        }
    }

    /// Длительность в тиках с подстановкой значения по умолчанию
    pub fn duration_or(&self, default_ticks: u64) -> u64 {
        self.duration.unwrap_or(default_ticks)
    }

    pub fn start(&self) -> Duration {
        ticks_to_duration(self.offset)
    }

    /// Конец фрагмента
    pub fn end(&self, default_ticks: u64) -> Duration {
        ticks_to_duration(self.offset.saturating_add(self.duration_or(default_ticks)))
    }
}

/// Событие потока синтеза
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    /// Очередной кусок аудиоданных
    Audio(Bytes),
    /// Граница слова
    WordBoundary(TimingUnit),
}

/// Собирает границы слов из потока синтеза, пропуская аудио дальше
#[derive(Debug, Default)]
pub struct TimingCollector {
    units: Vec<TimingUnit>,
    audio_bytes: u64,
}

impl TimingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Обработать событие. Возвращает аудиоданные, если событие их содержит.
    pub fn accept(&mut self, event: SynthesisEvent) -> Option<Bytes> {
        match event {
            SynthesisEvent::Audio(data) => {
                self.audio_bytes += data.len() as u64;
                Some(data)
            }
            SynthesisEvent::WordBoundary(mut unit) => {
                unit.text = unit.text.trim().to_string();
                self.units.push(unit);
                None
            }
        }
    }

    /// Прочитать поток до конца, записывая аудио в `sink`
    pub async fn drain<S, W>(&mut self, mut events: S, sink: &mut W) -> Result<()>
    where
        S: Stream<Item = Result<SynthesisEvent>> + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(event) = events.next().await {
            if let Some(data) = self.accept(event?) {
                sink.write_all(&data).await?;
            }
        }
        sink.flush().await?;
        log::debug!(
            "Synthesis stream finished: {} audio bytes, {} word boundaries",
            self.audio_bytes,
            self.units.len()
        );
        Ok(())
    }

    pub fn units(&self) -> &[TimingUnit] {
        &self.units
    }

    pub fn audio_bytes(&self) -> u64 {
        self.audio_bytes
    }

    pub fn into_units(self) -> Vec<TimingUnit> {
        self.units
    }
}
