//! Модуль для чтения и записи SRT
//!
//! Формат: номер, строка `HH:MM:SS,mmm --> HH:MM:SS,mmm`, текст, пустая строка.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use crate::error::{NarrationError, Result};
use super::types::SubtitleCue;

/// Время в формате `HH:MM:SS,mmm` (миллисекунды отбрасываются, не округляются)
pub fn format_srt_timestamp(time: Duration) -> String {
    let total_ms = time.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Сериализовать реплики в SRT
pub fn to_srt_string(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            cue.index,
            format_srt_timestamp(cue.start),
            format_srt_timestamp(cue.end),
            cue.text
        );
    }
    out
}

/// Записать реплики в файл SRT (UTF-8)
pub fn write_srt_file<P: AsRef<Path>>(path: P, cues: &[SubtitleCue]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_srt_string(cues))?;
    log::debug!("Wrote {} cues to {}", cues.len(), path.display());
    Ok(())
}

/// Прочитать файл SRT
pub fn read_srt_file<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleCue>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_srt(&content)
}

/// Разобрать содержимое SRT
pub fn parse_srt(content: &str) -> Result<Vec<SubtitleCue>> {
    let content = content.trim_start_matches('\u{feff}');
    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                cues.push(parse_cue_block(&block, cues.len() + 1)?);
                block.clear();
            }
        } else {
            block.push(line);
        }
    }

    // Последний блок без завершающей пустой строки
    if !block.is_empty() {
        cues.push(parse_cue_block(&block, cues.len() + 1)?);
    }

    Ok(cues)
}

fn parse_cue_block(lines: &[&str], position: usize) -> Result<SubtitleCue> {
    let invalid = |what: &str| {
        NarrationError::InvalidFormat(format!("cue #{}: {}", position, what))
    };

    if lines.len() < 2 {
        return Err(invalid("expected index and timing lines"));
    }

    let index = lines[0]
        .trim()
        .parse::<usize>()
        .map_err(|_| invalid("index is not a number"))?;

    let (start, end) = lines[1]
        .split_once("-->")
        .ok_or_else(|| invalid("missing '-->' in timing line"))?;
    let start = parse_timestamp(start).ok_or_else(|| invalid("bad start time"))?;
    let end = parse_timestamp(end).ok_or_else(|| invalid("bad end time"))?;

    let text = lines[2..]
        .iter()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(SubtitleCue::new(index, start, end, text))
}

/// Разбор времени `HH:MM:SS,mmm`; точка вместо запятой тоже принимается
fn parse_timestamp(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (clock, fraction) = value
        .split_once(',')
        .or_else(|| value.split_once('.'))
        .unwrap_or((value, "0"));

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours = parts[0].parse::<u64>().ok()?;
    let minutes = parts[1].parse::<u64>().ok()?;
    let seconds = parts[2].parse::<u64>().ok()?;

    let ms = fraction.parse::<u64>().ok()?;
    let millis = match fraction.len() {
        1 => ms * 100,
        2 => ms * 10,
        3 => ms,
        n => ms / 10_u64.pow(n as u32 - 3),
    };

    Some(Duration::from_millis(
        hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis,
    ))
}
