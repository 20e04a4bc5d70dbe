//! Тесты выравнивания реплик

use std::time::Duration;
use crate::config::SubtitleConfig;
use crate::subtitle::aligner::{cue_sentences, normalize_text};
use crate::subtitle::{SubtitleAligner, SubtitleCue};
use crate::tts::TimingUnit;

const SECOND: u64 = 10_000_000;

fn aligner() -> SubtitleAligner {
    SubtitleAligner::new(SubtitleConfig::default())
}

fn span(cue: &SubtitleCue) -> (Duration, Duration) {
    (cue.start, cue.end)
}

fn assert_well_formed(cues: &[SubtitleCue]) {
    for (i, cue) in cues.iter().enumerate() {
        assert_eq!(cue.index, i + 1);
        assert!(cue.end > cue.start, "cue {} has no duration", cue.index);
    }
    for pair in cues.windows(2) {
        assert!(
            pair[1].start >= pair[0].end,
            "cue {} starts before cue {} ends",
            pair[1].index,
            pair[0].index
        );
    }
}

#[test]
fn test_two_sentences_two_units() {
    let units = vec![
        TimingUnit::new("你好", 0, 2 * SECOND),
        TimingUnit::new("今天天气很好", 2 * SECOND, 2 * SECOND),
    ];
    let cues = aligner().align(&units, "你好。今天天气很好！");

    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0], SubtitleCue::new(1, Duration::ZERO, Duration::from_secs(2), "你好。"));
    assert_eq!(
        cues[1],
        SubtitleCue::new(2, Duration::from_secs(2), Duration::from_secs(4), "今天天气很好！")
    );
}

#[test]
fn test_sentence_spanning_several_units() {
    let units = vec![
        TimingUnit::new("今天", 0, 5_000_000),
        TimingUnit::new("天气", 5_000_000, 5_000_000),
        TimingUnit::new("很好", 10_000_000, 5_000_000),
        TimingUnit::new("再见", 20_000_000, 5_000_000),
    ];
    let cues = aligner().align(&units, "今天天气很好。再见！");

    assert_eq!(span(&cues[0]), (Duration::ZERO, Duration::from_millis(1500)));
    assert_eq!(span(&cues[1]), (Duration::from_secs(2), Duration::from_millis(2500)));
}

#[test]
fn test_unmatched_sentences_use_proportional_timing() {
    let units = vec![TimingUnit::new("完全不同的文字", 0, 3 * SECOND)];
    let cues = aligner().align(&units, "第一句话。第二句话。第三句话。");

    assert_eq!(cues.len(), 3);
    assert_eq!(span(&cues[0]), (Duration::ZERO, Duration::from_secs(1)));
    assert_eq!(span(&cues[1]), (Duration::from_secs(1), Duration::from_secs(2)));
    assert_eq!(span(&cues[2]), (Duration::from_secs(2), Duration::from_secs(3)));
    assert_well_formed(&cues);
}

#[test]
fn test_one_missing_sentence_between_matches() {
    let units = vec![
        TimingUnit::new("你好", 0, SECOND),
        TimingUnit::new("再见了", 2 * SECOND, SECOND),
    ];
    let cues = aligner().align(&units, "你好。这句找不到。再见了。");

    assert_eq!(span(&cues[0]), (Duration::ZERO, Duration::from_secs(1)));
    assert_eq!(span(&cues[1]), (Duration::from_secs(1), Duration::from_secs(2)));
    assert_eq!(span(&cues[2]), (Duration::from_secs(2), Duration::from_secs(3)));
    assert_well_formed(&cues);
}

#[test]
fn test_repeated_sentence_is_pushed_after_previous() {
    // Второе "你好" находится только поиском с начала и попадает на ту же единицу
    let units = vec![TimingUnit::new("你好", 0, SECOND)];
    let cues = aligner().align(&units, "你好。你好。");

    assert_eq!(span(&cues[0]), (Duration::ZERO, Duration::from_secs(1)));
    assert_eq!(cues[1].start, Duration::from_millis(1050));
    assert_eq!(cues[1].end, Duration::from_millis(2050));
    assert_well_formed(&cues);
}

#[test]
fn test_long_sentence_floor_uses_per_char_duration() {
    let config = SubtitleConfig {
        min_duration_ms: 100,
        ..SubtitleConfig::default()
    };
    let units = vec![TimingUnit::new("一二三四五", 0, SECOND)];
    let cues = SubtitleAligner::new(config).align(&units, "一二三四五。一二三四五。");

    // 6 символов по 80 мс
    assert_eq!(cues[1].start, Duration::from_millis(1050));
    assert_eq!(cues[1].duration(), Duration::from_millis(480));
}

#[test]
fn test_missing_unit_duration_uses_default() {
    let mut unit = TimingUnit::new("你好", 0, 0);
    unit.duration = None;
    let cues = aligner().align(&[unit], "你好。");
    assert_eq!(span(&cues[0]), (Duration::ZERO, Duration::from_millis(100)));
}

#[test]
fn test_unit_text_punctuation_is_ignored_for_matching() {
    let units = vec![
        TimingUnit::new("Hello,", 0, SECOND),
        TimingUnit::new("world!", SECOND, SECOND),
        TimingUnit::new("Bye.", 3 * SECOND, SECOND),
    ];
    let cues = aligner().align(&units, "Hello, world! Bye now? Bye.");

    assert_eq!(cues.len(), 3);
    assert_eq!(cues[0].text, "Hello, world!");
    assert_eq!(span(&cues[0]), (Duration::ZERO, Duration::from_secs(2)));
    assert_eq!(cues[1].text, "Bye now?");
    assert_eq!(span(&cues[2]), (Duration::from_secs(3), Duration::from_secs(4)));
    assert_well_formed(&cues);
}

#[test]
fn test_no_units_gives_no_cues() {
    assert!(aligner().align(&[], "你好。今天天气很好！").is_empty());
}

#[test]
fn test_text_without_sentences_gives_no_cues() {
    let units = vec![TimingUnit::new("你好", 0, SECOND)];
    assert!(aligner().align(&units, "……！！").is_empty());
}

#[test]
fn test_normalize_text() {
    assert_eq!(
        normalize_text("“你好”，世界！  (test)\n\n  ok"),
        "你好，世界！ test ok"
    );
    assert_eq!(normalize_text("《书名》：内容；"), "书名内容");
}

#[test]
fn test_cue_sentences_drop_degenerate_and_split_questions() {
    assert_eq!(cue_sentences("嗯。你好。"), vec!["你好。"]);
    assert_eq!(cue_sentences("你是谁？我是小明。"), vec!["你是谁？", "我是小明。"]);
    assert!(cue_sentences("").is_empty());
}

#[test]
fn test_generated_narration_stays_ordered() {
    let mut text = String::new();
    let mut units = Vec::new();
    let mut offset = 0;
    for i in 0..40 {
        let sentence = format!("第{}段{}", i, "话".repeat(1 + i % 5));
        text.push_str(&sentence);
        text.push('。');
        // Каждую пятую фразу сервис "теряет"
        if i % 5 != 0 {
            units.push(TimingUnit::new(sentence, offset, 3_000_000));
        }
        offset += 4_000_000;
    }

    let cues = aligner().align(&units, &text);
    assert_eq!(cues.len(), 40);
    assert_well_formed(&cues);
}
