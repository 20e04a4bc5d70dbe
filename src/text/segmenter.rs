//! Разбиение текста на предложения
//!
//! Эвристика по знакам препинания: китайские и английские знаки конца
//! предложения, точка с запятой, многоточие и переводы строк. Вопросительный
//! знак завершает предложение даже внутри длинной фразы. Знаки препинания и
//! закрывающие кавычки остаются в конце своего предложения.

use std::ops::Range;

/// Предложение - срез исходного буфера
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence<'a> {
    /// Текст предложения без пробелов по краям
    pub text: &'a str,
    /// Байтовый диапазон в исходном буфере, включая пробелы после предложения.
    /// Диапазоны соседних предложений идут встык.
    pub span: Range<usize>,
    /// Заканчивается ли предложение знаком конца (а не концом буфера)
    pub terminated: bool,
}

impl<'a> Sentence<'a> {
    /// Длина предложения в символах
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Ленивый итератор предложений
#[derive(Debug, Clone)]
pub struct Sentences<'a> {
    text: &'a str,
    pos: usize,
}

/// Разбить текст на предложения.
///
/// Пустой ввод, а также ввод только из пробелов или знаков препинания
/// не даёт ни одного предложения.
pub fn split_sentences(text: &str) -> Sentences<'_> {
    Sentences { text, pos: 0 }
}

fn is_boundary(c: char, prev: Option<char>, next: Option<char>) -> bool {
    match c {
        '。' | '！' | '？' | '；' | '…' | '．' | '!' | '?' | ';' | '\n' | '\r' => true,
        // 3.14 - не конец предложения
        '.' => !matches!(
            (prev, next),
            (Some(p), Some(n)) if p.is_ascii_digit() && n.is_ascii_digit()
        ),
        _ => false,
    }
}

fn is_terminal_mark(c: char) -> bool {
    matches!(c, '。' | '！' | '？' | '；' | '…' | '．' | '!' | '?' | ';' | '.')
}

fn is_closer(c: char) -> bool {
    matches!(c, '”' | '’' | '」' | '』' | '）' | '】' | '》' | ')' | ']')
}

impl<'a> Sentences<'a> {
    /// Найти конец очередного фрагмента, начиная с `from`
    fn scan_piece(&self, from: usize) -> (usize, bool) {
        let rest = &self.text[from..];
        let mut chars = rest.char_indices().peekable();
        let mut prev = None;
        // Прямые кавычки закрывают только открытые в этом же фрагменте
        let mut open_double = false;
        let mut open_single = false;

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => open_double = !open_double,
                '\'' => open_single = !open_single,
                _ => {}
            }
            let next = chars.peek().map(|&(_, n)| n);
            if is_boundary(c, prev, next) {
                let mut end = from + i + c.len_utf8();
                let mut in_closers = true;
                for t in self.text[end..].chars() {
                    let absorb = match t {
                        '"' => std::mem::replace(&mut open_double, false),
                        '\'' => std::mem::replace(&mut open_single, false),
                        _ => is_terminal_mark(t) || is_closer(t),
                    };
                    if in_closers && absorb {
                        end += t.len_utf8();
                    } else if t.is_whitespace() {
                        in_closers = false;
                        end += t.len_utf8();
                    } else {
                        break;
                    }
                }
                return (end, true);
            }
            prev = Some(c);
        }

        (self.text.len(), false)
    }
}

impl<'a> Iterator for Sentences<'a> {
    type Item = Sentence<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        // Фрагменты без букв и цифр присоединяются к следующему предложению
        let start = self.pos;
        while self.pos < self.text.len() {
            let (end, terminated) = self.scan_piece(self.pos);
            self.pos = end;
            let raw = &self.text[start..end];
            if raw.chars().any(char::is_alphanumeric) {
                // Хвост текста без букв и цифр достаётся последнему предложению
                let tail = &self.text[end..];
                let end = if tail.chars().any(char::is_alphanumeric) {
                    end
                } else {
                    self.pos = self.text.len();
                    self.text.len()
                };
                return Some(Sentence {
                    text: self.text[start..end].trim(),
                    span: start..end,
                    terminated,
                });
            }
        }
        None
    }
}

impl std::iter::FusedIterator for Sentences<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        split_sentences(input).map(|s| s.text).collect()
    }

    #[test]
    fn test_chinese_sentences() {
        assert_eq!(texts("你好。今天天气很好！"), vec!["你好。", "今天天气很好！"]);
    }

    #[test]
    fn test_english_sentences() {
        assert_eq!(
            texts("It rained. Then it stopped! Why? Nobody knows"),
            vec!["It rained.", "Then it stopped!", "Why?", "Nobody knows"]
        );
    }

    #[test]
    fn test_embedded_question_is_split_out() {
        assert_eq!(
            texts("他问你去哪里？我说回家。"),
            vec!["他问你去哪里？", "我说回家。"]
        );
    }

    #[test]
    fn test_punctuation_runs_and_closing_quotes_stay_attached() {
        assert_eq!(
            texts("他说：“走吧！”她没有回答……天黑了。"),
            vec!["他说：“走吧！”", "她没有回答……", "天黑了。"]
        );
    }

    #[test]
    fn test_decimal_point_is_not_a_boundary() {
        assert_eq!(texts("Pi is 3.14 roughly. Yes."), vec!["Pi is 3.14 roughly.", "Yes."]);
    }

    #[test]
    fn test_newlines_are_boundaries() {
        let sentences: Vec<_> = split_sentences("第一章\n\n少年出门").collect();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].text, "第一章");
        assert!(sentences[0].terminated);
        assert_eq!(sentences[1].text, "少年出门");
        assert!(!sentences[1].terminated);
    }

    #[test]
    fn test_degenerate_inputs_yield_nothing() {
        assert!(texts("").is_empty());
        assert!(texts("   \n\t").is_empty());
        assert!(texts("。！？...").is_empty());
    }

    #[test]
    fn test_leading_punctuation_joins_first_sentence() {
        let sentences: Vec<_> = split_sentences("。。你好。").collect();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].span, 0.."。。你好。".len());
    }

    #[test]
    fn test_trailing_punctuation_joins_last_sentence() {
        let sentences: Vec<_> = split_sentences("你好。 ……").collect();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].text, "你好。 ……");
        assert_eq!(sentences[0].span, 0.."你好。 ……".len());
        assert_eq!(texts("Done. )"), vec!["Done. )"]);
    }

    #[test]
    fn test_opening_straight_quote_starts_next_sentence() {
        assert_eq!(
            texts("他说。\"走吧。\"她点头。"),
            vec!["他说。", "\"走吧。\"", "她点头。"]
        );
        assert_eq!(texts("第一章\n\"你好。\""), vec!["第一章", "\"你好。\""]);
        assert_eq!(texts("He said 'go.' Then left."), vec!["He said 'go.'", "Then left."]);
    }

    #[test]
    fn test_spans_cover_input() {
        let inputs = [
            "你好。今天天气很好！",
            "  Leading space. And trailing  ",
            "第一章 开端\n\n天亮了。他醒来，看见窗外的雪？还是雾！“不知道。”\n",
            "no terminator at all",
            "A.B.C. 3.5 apples; two pears…",
            "你好。 ……",
            "Done. )",
            "他走了。 ”",
            "他说。\"走吧。\"她点头。",
        ];
        for input in inputs {
            let sentences: Vec<_> = split_sentences(input).collect();
            let mut expected_start = 0;
            for sentence in &sentences {
                assert_eq!(sentence.span.start, expected_start);
                expected_start = sentence.span.end;
            }
            assert_eq!(expected_start, input.len(), "input: {:?}", input);

            let rebuilt: String = sentences.iter().map(|s| s.text).collect::<Vec<_>>().join("");
            let squash = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
            assert_eq!(squash(&rebuilt), squash(input));
        }
    }
}
