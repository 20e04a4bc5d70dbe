//! Модуль для работы с TTS
//!
//! Озвучивание текста через внешний сервис синтеза и построение субтитров
//! по границам слов, которые сервис присылает вместе с аудио.

pub mod timing;

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use futures::stream::BoxStream;
use tempfile::NamedTempFile;
use tokio::io::BufWriter;

use crate::config::SubtitleConfig;
use crate::error::{NarrationError, Result};
use crate::subtitle::{srt, SubtitleAligner, SubtitleCue};

pub use timing::{ticks_to_duration, SynthesisEvent, TimingCollector, TimingUnit, TICKS_PER_SECOND};

/// Поток событий синтеза
pub type SynthesisStream = BoxStream<'static, Result<SynthesisEvent>>;

/// Сервис синтеза речи
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Начать синтез текста. События приходят в порядке воспроизведения.
    async fn synthesize(&self, text: &str) -> Result<SynthesisStream>;
}

/// Результат озвучивания
#[derive(Debug, Clone)]
pub struct NarrationOutput {
    pub audio_path: PathBuf,
    pub srt_path: PathBuf,
    /// Размер записанного аудио в байтах
    pub audio_bytes: u64,
    pub cues: Vec<SubtitleCue>,
}

/// Озвучить текст: аудио пишется в `audio_path`, субтитры по предложениям в `srt_path`
pub async fn narrate_to_files<S>(
    synthesizer: &S,
    text: &str,
    audio_path: impl AsRef<Path>,
    srt_path: impl AsRef<Path>,
    config: &SubtitleConfig,
) -> Result<NarrationOutput>
where
    S: SpeechSynthesizer + ?Sized,
{
    let audio_path = audio_path.as_ref();
    let srt_path = srt_path.as_ref();

    if text.trim().is_empty() {
        return Err(NarrationError::Configuration(
            "narration text is empty".to_string(),
        ));
    }

    for path in [audio_path, srt_path] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    log::info!(
        "Synthesizing {} chars into {}",
        text.chars().count(),
        audio_path.display()
    );
    let events = synthesizer.synthesize(text).await?;

    // Аудио появляется по итоговому пути только после успешного синтеза
    let audio_dir = match audio_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(audio_dir)?;
    let mut sink = BufWriter::new(tokio::fs::File::from_std(staged.as_file().try_clone()?));
    let mut collector = TimingCollector::new();
    collector.drain(events, &mut sink).await?;
    sink.into_inner().sync_all().await?;
    staged
        .persist(audio_path)
        .map_err(|e| NarrationError::Io(e.error))?;

    let audio_bytes = collector.audio_bytes();
    let cues = SubtitleAligner::new(config.clone()).align(collector.units(), text);
    tokio::fs::write(srt_path, srt::to_srt_string(&cues)).await?;

    log::info!(
        "Wrote {} cues to {} ({} audio bytes)",
        cues.len(),
        srt_path.display(),
        audio_bytes
    );

    Ok(NarrationOutput {
        audio_path: audio_path.to_path_buf(),
        srt_path: srt_path.to_path_buf(),
        audio_bytes,
        cues,
    })
}

#[cfg(test)]
mod tests {
    mod test_narrate;
}
