//! Turns free-form provider output into a [`Quiz`].
//!
//! Parsing happens in two passes. [`scan`] classifies each line by its marker
//! and collects the raw fields without judging them. [`finalize`] then fills
//! in defaults, replaces unusable option lists and clamps the answer index.
//! Neither pass can fail: any input, however garbled, yields a well-formed
//! quiz.

use crate::prompt::{ANSWER_MARKER, EXPLANATION_MARKER, OPTION_MARKERS, QUESTION_MARKER};
use crate::quiz::{OPTION_COUNT, Quiz};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashSet;

pub const DEFAULT_QUESTION: &str = "この場所について正しいものはどれでしょう？";
pub const DEFAULT_OPTIONS: [&str; 4] = [
    "歴史的に重要な場所である",
    "最近建設された建物である",
    "海外にある場所である",
    "架空の場所である",
];
pub const DEFAULT_EXPLANATION: &str = "歴史的に重要な場所として知られています。";

/// Line marker recognised by [`scan`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Marker {
    Question,
    Option,
    Answer,
    Explanation,
}

/// Splits a trimmed line into its marker and the remainder.
///
/// Question, answer and explanation markers are removed wherever they recur
/// in the line; option markers only at the start.
pub fn classify_line(line: &str) -> Option<(Marker, Cow<'_, str>)> {
    if let Some(rest) = line.strip_prefix(QUESTION_MARKER) {
        return Some((Marker::Question, without_marker(rest, QUESTION_MARKER)));
    }
    if let Some(rest) = OPTION_MARKERS
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
    {
        return Some((Marker::Option, Cow::Borrowed(rest.trim())));
    }
    if let Some(rest) = line.strip_prefix(ANSWER_MARKER) {
        return Some((Marker::Answer, without_marker(rest, ANSWER_MARKER)));
    }
    if let Some(rest) = line.strip_prefix(EXPLANATION_MARKER) {
        return Some((Marker::Explanation, without_marker(rest, EXPLANATION_MARKER)));
    }
    None
}

fn without_marker<'a>(rest: &'a str, marker: &str) -> Cow<'a, str> {
    if rest.contains(marker) {
        Cow::Owned(rest.replace(marker, "").trim().to_string())
    } else {
        Cow::Borrowed(rest.trim())
    }
}

/// Raw fields collected from the text, before any defaulting.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ScannedQuiz {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based; may be out of range or negative.
    pub answer: i64,
    pub explanation: String,
}

pub fn scan(raw_text: &str) -> ScannedQuiz {
    let mut scanned = ScannedQuiz::default();
    let lines = raw_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());
    for line in lines {
        match classify_line(line) {
            Some((Marker::Question, rest)) => scanned.question = rest.into_owned(),
            Some((Marker::Option, rest)) => scanned.options.push(rest.into_owned()),
            Some((Marker::Answer, rest)) => {
                scanned.answer = parse_answer_number(&rest).map_or(0, |n| n.saturating_sub(1));
            }
            Some((Marker::Explanation, rest)) => scanned.explanation = rest.into_owned(),
            None => {}
        }
    }
    scanned
}

/// Parses an optionally signed integer, accepting full-width digits.
///
/// Integers too large for `i64` saturate so they clamp like any other
/// out-of-range answer.
fn parse_answer_number(text: &str) -> Option<i64> {
    let normalized: String = text
        .chars()
        .map(|ch| match ch {
            '０'..='９' => char::from(b'0' + (ch as u32 - '０' as u32) as u8),
            '＋' => '+',
            '－' => '-',
            other => other,
        })
        .collect();
    let normalized = normalized.trim();
    if let Ok(number) = normalized.parse() {
        return Some(number);
    }
    let (negative, digits) = match normalized.as_bytes().first() {
        Some(b'-') => (true, &normalized[1..]),
        Some(b'+') => (false, &normalized[1..]),
        _ => (false, normalized),
    };
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

/// Which fields [`finalize`] had to patch.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct Patches {
    pub question_defaulted: bool,
    pub options_replaced: bool,
    pub answer_clamped: bool,
    pub explanation_defaulted: bool,
}

impl Patches {
    pub fn any(&self) -> bool {
        self.question_defaulted
            || self.options_replaced
            || self.answer_clamped
            || self.explanation_defaulted
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsedQuiz {
    pub quiz: Quiz,
    pub patches: Patches,
}

pub fn finalize(scanned: ScannedQuiz, points: u32) -> ParsedQuiz {
    let mut patches = Patches::default();

    let question = if scanned.question.is_empty() {
        patches.question_defaulted = true;
        DEFAULT_QUESTION.to_string()
    } else {
        scanned.question
    };

    let options = if usable_options(&scanned.options) {
        scanned.options
    } else {
        patches.options_replaced = true;
        DEFAULT_OPTIONS.iter().map(|option| option.to_string()).collect()
    };

    let max_index = (OPTION_COUNT - 1) as i64;
    let clamped = scanned.answer.clamp(0, max_index);
    patches.answer_clamped = clamped != scanned.answer;

    let explanation = if scanned.explanation.is_empty() {
        patches.explanation_defaulted = true;
        DEFAULT_EXPLANATION.to_string()
    } else {
        scanned.explanation
    };

    ParsedQuiz {
        quiz: Quiz {
            question,
            options,
            correct_answer: clamped as usize,
            explanation,
            points,
        },
        patches,
    }
}

fn usable_options(options: &[String]) -> bool {
    if options.len() != OPTION_COUNT || options.iter().any(String::is_empty) {
        return false;
    }
    let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
    distinct.len() == OPTION_COUNT
}

/// Parses `raw_text` and reports which fields were patched.
pub fn parse_quiz_report(raw_text: &str, points: u32) -> ParsedQuiz {
    finalize(scan(raw_text), points)
}

pub fn parse_quiz_text(raw_text: &str, points: u32) -> Quiz {
    parse_quiz_report(raw_text, points).quiz
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "問題: Q\n1. A\n2. B\n3. C\n4. D\n正解: 2\n解説: E";

    #[test]
    fn parses_the_canonical_format() {
        let parsed = parse_quiz_report(WELL_FORMED, 15);
        assert_eq!(
            parsed.quiz,
            Quiz {
                question: "Q".into(),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_answer: 1,
                explanation: "E".into(),
                points: 15,
            }
        );
        assert!(!parsed.patches.any());
    }

    #[test]
    fn tolerates_indentation_noise_and_blank_lines() {
        let raw = "はい、作成しました。\n\n   問題:  Q  \n1.A\n 2. B\n3. C\n4. D\n\n正解: 4\n解説: E\n以上です。";
        let quiz = parse_quiz_text(raw, 10);
        assert_eq!(quiz.question, "Q");
        assert_eq!(quiz.options, vec!["A", "B", "C", "D"]);
        assert_eq!(quiz.correct_answer, 3);
        assert_eq!(quiz.points, 10);
    }

    #[test]
    fn two_options_are_replaced_wholesale() {
        let raw = "問題: Q\n1. A\n2. B\n正解: 1\n解説: E";
        let parsed = parse_quiz_report(raw, 15);
        assert_eq!(parsed.quiz.options, DEFAULT_OPTIONS.to_vec());
        assert!(parsed.patches.options_replaced);
        assert_eq!(parsed.quiz.question, "Q");
    }

    #[test]
    fn five_options_are_replaced_wholesale() {
        let raw = "問題: Q\n1. A\n2. B\n3. C\n4. D\n1. F\n正解: 1\n解説: E";
        assert_eq!(parse_quiz_text(raw, 15).options, DEFAULT_OPTIONS.to_vec());
    }

    #[test]
    fn duplicate_or_blank_options_are_replaced() {
        let raw = "問題: Q\n1. A\n2. A\n3. C\n4. D";
        assert_eq!(parse_quiz_text(raw, 15).options, DEFAULT_OPTIONS.to_vec());
        let raw = "問題: Q\n1. A\n2.\n3. C\n4. D";
        assert_eq!(parse_quiz_text(raw, 15).options, DEFAULT_OPTIONS.to_vec());
    }

    #[test]
    fn out_of_range_answer_is_clamped() {
        let raw = WELL_FORMED.replace("正解: 2", "正解: 9");
        let parsed = parse_quiz_report(&raw, 15);
        assert_eq!(parsed.quiz.correct_answer, 3);
        assert!(parsed.patches.answer_clamped);

        let raw = WELL_FORMED.replace("正解: 2", "正解: 0");
        assert_eq!(parse_quiz_text(&raw, 15).correct_answer, 0);
        let raw = WELL_FORMED.replace("正解: 2", "正解: -7");
        assert_eq!(parse_quiz_text(&raw, 15).correct_answer, 0);
    }

    #[test]
    fn non_numeric_answer_defaults_to_first_option() {
        let raw = WELL_FORMED.replace("正解: 2", "正解: B");
        let parsed = parse_quiz_report(&raw, 15);
        assert_eq!(parsed.quiz.correct_answer, 0);
        assert!(!parsed.patches.answer_clamped);
    }

    #[test]
    fn full_width_answer_digits_are_read() {
        let raw = WELL_FORMED.replace("正解: 2", "正解: ３");
        assert_eq!(parse_quiz_text(&raw, 15).correct_answer, 2);
    }

    #[test]
    fn oversized_answer_saturates_and_clamps() {
        let raw = WELL_FORMED.replace("正解: 2", "正解: 99999999999999999999");
        let parsed = parse_quiz_report(&raw, 15);
        assert_eq!(parsed.quiz.correct_answer, 3);
        assert!(parsed.patches.answer_clamped);

        let raw = WELL_FORMED.replace("正解: 2", "正解: -99999999999999999999");
        assert_eq!(parse_quiz_text(&raw, 15).correct_answer, 0);
        let raw = WELL_FORMED.replace("正解: 2", "正解: 9999999999999999999x");
        assert!(!parse_quiz_report(&raw, 15).patches.answer_clamped);
    }

    #[test]
    fn repeated_markers_are_removed_from_the_line() {
        let raw = "問題: 問題: X\n1. A\n2. B\n3. C\n4. D\n正解: 正解: 3\n解説: 解説: E";
        let quiz = parse_quiz_text(raw, 15);
        assert_eq!(quiz.question, "X");
        assert_eq!(quiz.correct_answer, 2);
        assert_eq!(quiz.explanation, "E");
    }

    #[test]
    fn option_text_keeps_later_numbering() {
        let quiz = parse_quiz_text("問題: Q\n1. 1. A\n2. B\n3. C\n4. D", 15);
        assert_eq!(quiz.options[0], "1. A");
    }

    #[test]
    fn later_question_line_overwrites_earlier() {
        let raw = format!("問題: first\n{WELL_FORMED}");
        assert_eq!(parse_quiz_text(&raw, 15).question, "Q");
    }

    #[test]
    fn empty_text_is_fully_defaulted() {
        let parsed = parse_quiz_report("", 20);
        assert_eq!(parsed.quiz.question, DEFAULT_QUESTION);
        assert_eq!(parsed.quiz.explanation, DEFAULT_EXPLANATION);
        assert_eq!(parsed.quiz.correct_answer, 0);
        assert_eq!(parsed.quiz.points, 20);
        assert!(parsed.patches.question_defaulted);
        assert!(parsed.patches.options_replaced);
        assert!(parsed.patches.explanation_defaulted);
    }

    #[test]
    fn question_only_text_keeps_question() {
        let quiz = parse_quiz_text("問題: 鎌倉幕府を開いたのは誰？", 15);
        assert_eq!(quiz.question, "鎌倉幕府を開いたのは誰？");
        assert_eq!(quiz.options, DEFAULT_OPTIONS.to_vec());
        assert!(quiz.is_well_formed());
    }

    #[test]
    fn scan_ignores_unmarked_lines() {
        let scanned = scan("Question: Q\n- A\n答え: 2");
        assert_eq!(scanned, ScannedQuiz::default());
    }

    #[test]
    fn finalize_passes_points_through() {
        let parsed = finalize(ScannedQuiz::default(), 42);
        assert_eq!(parsed.quiz.points, 42);
    }

    #[test]
    fn garbled_text_always_yields_well_formed_quiz() {
        let fragments = [
            "問題:", "問題: Q", "1.", "1. A", "2. B", "3. C", "4. D", "4. D", "正解:",
            "正解: 2", "正解: 99999999999999999999", "正解: ４", "解説:", "解説: E", "\n",
            "   ", "5. X", "🙂", "問題", "1", "\r\n",
        ];
        // Deterministic xorshift so failures are reproducible.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..500 {
            let mut raw = String::new();
            let count = (state % 12) as usize;
            for _ in 0..count {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                raw.push_str(fragments[(state % fragments.len() as u64) as usize]);
                if state & 1 == 0 {
                    raw.push('\n');
                }
            }
            let quiz = parse_quiz_text(&raw, 15);
            assert!(quiz.is_well_formed(), "{raw:?} -> {quiz:?}");
            assert_eq!(quiz.points, 15);
        }
    }
}
