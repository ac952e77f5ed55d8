use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Number of choices every quiz carries.
pub const OPTION_COUNT: usize = 4;

/// Grade level a quiz is pitched at. Only the awarded points depend on it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Elementary,
    #[default]
    Middle,
    High,
}

impl Difficulty {
    /// Recognises the ASCII labels and the Japanese grade names.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        match label.to_ascii_lowercase().as_str() {
            "elementary" => return Some(Difficulty::Elementary),
            "middle" => return Some(Difficulty::Middle),
            "high" => return Some(Difficulty::High),
            _ => {}
        }
        match label {
            "小学生" => Some(Difficulty::Elementary),
            "中学生" => Some(Difficulty::Middle),
            "高校生" => Some(Difficulty::High),
            _ => None,
        }
    }

    /// Unrecognised labels score as [`Difficulty::Middle`].
    pub fn from_label(label: &str) -> Self {
        Self::parse(label).unwrap_or_default()
    }

    pub fn points(self) -> u32 {
        match self {
            Difficulty::Elementary => 10,
            Difficulty::Middle => 15,
            Difficulty::High => 20,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Elementary => "elementary",
            Difficulty::Middle => "middle",
            Difficulty::High => "high",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points awarded for a raw difficulty label.
pub fn points_for(label: &str) -> u32 {
    Difficulty::from_label(label).points()
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
    pub points: u32,
}

impl Quiz {
    /// Four distinct non-empty options, an in-range answer, and non-empty text.
    pub fn is_well_formed(&self) -> bool {
        let distinct: HashSet<&str> = self.options.iter().map(String::as_str).collect();
        !self.question.is_empty()
            && !self.explanation.is_empty()
            && self.options.len() == OPTION_COUNT
            && distinct.len() == OPTION_COUNT
            && self.options.iter().all(|option| !option.is_empty())
            && self.correct_answer < OPTION_COUNT
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer).map(String::as_str)
    }
}

fn default_difficulty() -> String {
    Difficulty::Middle.as_str().to_string()
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub spot_name: String,
    pub spot_description: String,
    /// Kept verbatim so the prompt echoes what the caller asked for.
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

impl QuizRequest {
    pub fn new(
        spot_name: impl Into<String>,
        spot_description: impl Into<String>,
        difficulty: impl Into<String>,
    ) -> Self {
        Self {
            spot_name: spot_name.into(),
            spot_description: spot_description.into(),
            difficulty: difficulty.into(),
        }
    }

    pub fn level(&self) -> Difficulty {
        Difficulty::from_label(&self.difficulty)
    }

    pub fn points(&self) -> u32 {
        self.level().points()
    }
}

/// Which path produced a quiz.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum QuizSource {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "fallback")]
    Fallback,
}

impl QuizSource {
    pub fn as_str(self) -> &'static str {
        match self {
            QuizSource::OpenAi => "openai",
            QuizSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for QuizSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResponse {
    pub success: bool,
    pub quiz: Option<Quiz>,
    pub generated_by: QuizSource,
}

impl QuizResponse {
    pub fn new(quiz: Quiz, generated_by: QuizSource) -> Self {
        Self {
            success: true,
            quiz: Some(quiz),
            generated_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_lookup_matches_points_table() {
        assert_eq!(points_for("elementary"), 10);
        assert_eq!(points_for("middle"), 15);
        assert_eq!(points_for("high"), 20);
        assert_eq!(points_for("graduate"), 15);
        assert_eq!(points_for(""), 15);
    }

    #[test]
    fn japanese_grade_labels_are_recognised() {
        assert_eq!(Difficulty::parse("小学生"), Some(Difficulty::Elementary));
        assert_eq!(Difficulty::parse(" 中学生 "), Some(Difficulty::Middle));
        assert_eq!(Difficulty::parse("高校生"), Some(Difficulty::High));
        assert_eq!(Difficulty::parse("HIGH"), Some(Difficulty::High));
        assert_eq!(Difficulty::parse("大学生"), None);
    }

    #[test]
    fn request_defaults_difficulty_to_middle() {
        let request: QuizRequest =
            serde_json::from_str(r#"{"spot_name":"鎌倉","spot_description":""}"#).unwrap();
        assert_eq!(request.difficulty, "middle");
        assert_eq!(request.points(), 15);
    }

    #[test]
    fn well_formed_rejects_duplicates_and_bad_index() {
        let mut quiz = Quiz {
            question: "Q".into(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: 3,
            explanation: "E".into(),
            points: 15,
        };
        assert!(quiz.is_well_formed());
        assert_eq!(quiz.correct_option(), Some("D"));

        quiz.correct_answer = 4;
        assert!(!quiz.is_well_formed());

        quiz.correct_answer = 0;
        quiz.options[1] = "A".into();
        assert!(!quiz.is_well_formed());
    }

    #[test]
    fn source_serializes_as_lowercase_tags() {
        let value = serde_json::to_value(QuizSource::OpenAi).unwrap();
        assert_eq!(value, serde_json::json!("openai"));
        let value = serde_json::to_value(QuizSource::Fallback).unwrap();
        assert_eq!(value, serde_json::json!("fallback"));
    }
}
