pub mod bank;
pub mod controller;
pub mod event;
pub mod keyboard;
pub mod logic;
pub mod session;

use std::collections::BTreeSet;

/// One entry of the quiz bank.
///
/// The answer payload is tagged by `answerType`, so an entry whose `correct`
/// field does not match its declared type fails to deserialize instead of
/// reaching the evaluation logic with a mismatched shape.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Grading override: every submission counts as correct.
    #[serde(default, rename = "allAnswersCorrect")]
    pub all_answers_correct: bool,
    #[serde(flatten)]
    pub answer: AnswerSpec,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "answerType", rename_all = "lowercase")]
pub enum AnswerSpec {
    Single {
        answers: Vec<String>,
        correct: usize,
    },
    Multiple {
        answers: Vec<String>,
        correct: BTreeSet<usize>,
    },
    Text {
        correct: String,
    },
}
