use std::path::Path;

use thiserror::Error;

use super::{AnswerSpec, QuizQuestion};

#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read quiz bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("quiz bank is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question {number}: {reason}")]
    Invalid { number: usize, reason: String },
}

/// Loads the question bank, failing closed: any unreadable, unparsable or
/// structurally invalid entry rejects the whole file and yields an empty bank.
pub async fn load_bank(path: &Path) -> Vec<QuizQuestion> {
    match try_load(path).await {
        Ok(questions) => questions,
        Err(err) => {
            log::error!("quiz bank rejected: {err}");
            Vec::new()
        }
    }
}

async fn try_load(path: &Path) -> Result<Vec<QuizQuestion>, BankError> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_bank(&raw)
}

pub fn parse_bank(raw: &str) -> Result<Vec<QuizQuestion>, BankError> {
    let questions: Vec<QuizQuestion> = serde_json::from_str(raw)?;
    validate(&questions)?;
    Ok(questions)
}

fn validate(questions: &[QuizQuestion]) -> Result<(), BankError> {
    for (index, question) in questions.iter().enumerate() {
        check_question(question).map_err(|reason| BankError::Invalid {
            number: index + 1,
            reason,
        })?;
    }
    Ok(())
}

fn check_question(question: &QuizQuestion) -> Result<(), String> {
    if question.question.trim().is_empty() {
        return Err("empty question text".to_string());
    }
    match &question.answer {
        AnswerSpec::Single { answers, correct } => {
            if answers.is_empty() {
                return Err("single choice question without answer options".to_string());
            }
            if *correct >= answers.len() {
                return Err(format!(
                    "correct index {correct} out of range for {} options",
                    answers.len()
                ));
            }
        }
        AnswerSpec::Multiple { answers, correct } => {
            if answers.is_empty() {
                return Err("multiple choice question without answer options".to_string());
            }
            if correct.is_empty() {
                return Err("multiple choice question without correct indices".to_string());
            }
            if let Some(out_of_range) = correct.iter().find(|&&i| i >= answers.len()) {
                return Err(format!(
                    "correct index {out_of_range} out of range for {} options",
                    answers.len()
                ));
            }
        }
        AnswerSpec::Text { correct } => {
            if correct.trim().is_empty() {
                return Err("text question with an empty correct answer".to_string());
            }
        }
    }
    Ok(())
}
