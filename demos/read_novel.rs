//! Пример чтения романа порциями с построением субтитров
//!
//! Запуск: `cargo run --example read_novel -- <novel.txt> [chunks] [config.json]`
//!
//! Каждая порция "озвучивается" оценочным синтезатором без звука (250 мс на
//! символ), результат пишется в `output/chunk_<позиция>.srt`.

use std::path::PathBuf;
use anyhow::{bail, Context};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use narration_sync::text::split_sentences;
use narration_sync::tts::SynthesisStream;
use narration_sync::utils::init_logger;
use narration_sync::{narrate_to_files, ChunkedReader, NarrationConfig, SpeechSynthesizer, SynthesisEvent, TimingUnit};

const TICKS_PER_CHAR: u64 = 2_500_000;

/// Синтезатор, который только оценивает длительность предложений
struct EstimatingSynthesizer;

#[async_trait]
impl SpeechSynthesizer for EstimatingSynthesizer {
    async fn synthesize(&self, text: &str) -> narration_sync::Result<SynthesisStream> {
        let mut offset = 0;
        let mut events = Vec::new();
        for sentence in split_sentences(text) {
            let duration = sentence.char_len() as u64 * TICKS_PER_CHAR;
            events.push(Ok(SynthesisEvent::WordBoundary(TimingUnit::new(
                sentence.text,
                offset,
                duration,
            ))));
            offset += duration;
        }
        Ok(stream::iter(events).boxed())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let mut args = std::env::args().skip(1);
    let Some(novel) = args.next().map(PathBuf::from) else {
        bail!("usage: read_novel <novel.txt> [chunks] [config.json]");
    };
    let chunks: usize = match args.next() {
        Some(n) => n.parse().context("chunks must be a number")?,
        None => 3,
    };
    let config = match args.next() {
        Some(path) => NarrationConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path))?,
        None => NarrationConfig::default(),
    };

    let reader = ChunkedReader::new(config.reader);
    let output_dir = PathBuf::from("output");

    for _ in 0..chunks {
        let chunk = reader.read_next_chunk(
            &novel,
            reader.config().chunk_size,
            reader.config().overlap_sentences,
        )?;
        if chunk.text.is_empty() {
            println!("Конец файла");
            break;
        }

        println!(
            "Прочитано {:.1}% ({} / {} байт), {} символов, перекрытие: {}",
            chunk.stats.progress_percent,
            chunk.stats.offset,
            chunk.stats.total_size,
            chunk.stats.chunk_char_count,
            chunk.stats.overlap_char_count
        );

        let name = format!("chunk_{}", chunk.stats.offset);
        let result = narrate_to_files(
            &EstimatingSynthesizer,
            &chunk.text,
            output_dir.join(format!("{}.raw", name)),
            output_dir.join(format!("{}.srt", name)),
            &config.subtitles,
        )
        .await?;
        println!("  {} реплик -> {}", result.cues.len(), result.srt_path.display());

        if chunk.is_end {
            println!("Конец файла");
            break;
        }
    }

    if let Some(progress) = reader.get_progress(&novel)? {
        println!("{}", serde_json::to_string_pretty(&progress)?);
    }

    Ok(())
}
