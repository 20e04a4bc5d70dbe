use std::time::Duration;

/// Одна реплика субтитров
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCue {
    /// Порядковый номер, начиная с 1
    pub index: usize,
    /// Время начала
    pub start: Duration,
    /// Время окончания
    pub end: Duration,
    /// Текст реплики
    pub text: String,
}

impl SubtitleCue {
    pub fn new(index: usize, start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    /// Длительность реплики
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}
