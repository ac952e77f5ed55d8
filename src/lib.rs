//! Single-question quizzes about a named spot.
//!
//! A quiz is either generated by a language model and parsed from its text
//! reply, or taken from a small hand-written catalog when no model is
//! configured or the call fails. Both paths yield a [`Quiz`] with four
//! distinct options and an in-range answer index.

pub mod fallback;
pub mod parser;
pub mod prompt;
pub mod quiz;

#[cfg(feature = "web")]
pub mod config;
#[cfg(feature = "web")]
pub mod generator;
#[cfg(feature = "web")]
pub mod provider;
#[cfg(feature = "web")]
pub mod web;

pub use fallback::{fallback_quiz, fallback_rule_name};
pub use parser::{ParsedQuiz, Patches, parse_quiz_report, parse_quiz_text};
pub use prompt::build_prompt;
pub use quiz::{Difficulty, Quiz, QuizRequest, QuizResponse, QuizSource, points_for};

#[cfg(feature = "web")]
pub use config::{SamplingParams, Settings};
#[cfg(feature = "web")]
pub use generator::{GeneratedQuiz, QuizGenerator};
#[cfg(feature = "web")]
pub use provider::{OpenAiProvider, ProviderError, TextProvider};
