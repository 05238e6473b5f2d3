use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::thread_rng;

use super::session::Selection;
use super::{AnswerSpec, QuizQuestion};

/// Location of the correct answer(s) in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectKey {
    Single(usize),
    Multiple(BTreeSet<usize>),
    Text(String),
}

/// A question as shown to the user: options in presentation order plus the
/// correctness key remapped into that same order.
#[derive(Debug, Clone)]
pub struct QuestionView {
    pub answers: Vec<String>,
    pub correct: CorrectKey,
}

/// Per-session question order: the bank as authored, or a uniform shuffle.
pub fn sequence_questions(bank: Vec<QuizQuestion>, randomize: bool) -> Vec<QuizQuestion> {
    if !randomize {
        return bank;
    }
    let mut questions = bank;
    questions.shuffle(&mut thread_rng());
    questions
}

/// Prepares the presentation order of a question's options and remaps the
/// correct index/indices into it.
///
/// The shuffle is applied to an index permutation rather than to the option
/// strings, so the remapping stays exact even when two options share the
/// same text.
pub fn prepare_answers(question: &QuizQuestion, randomize: bool) -> QuestionView {
    match &question.answer {
        AnswerSpec::Text { correct } => QuestionView {
            answers: Vec::new(),
            correct: CorrectKey::Text(correct.clone()),
        },
        AnswerSpec::Single { answers, correct } => {
            let order = presentation_order(answers.len(), randomize);
            QuestionView {
                answers: order.iter().map(|&i| answers[i].clone()).collect(),
                correct: CorrectKey::Single(position_of(&order, *correct)),
            }
        }
        AnswerSpec::Multiple { answers, correct } => {
            let order = presentation_order(answers.len(), randomize);
            QuestionView {
                answers: order.iter().map(|&i| answers[i].clone()).collect(),
                correct: CorrectKey::Multiple(
                    correct.iter().map(|&c| position_of(&order, c)).collect(),
                ),
            }
        }
    }
}

fn presentation_order(len: usize, randomize: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    if randomize {
        order.shuffle(&mut thread_rng());
    }
    order
}

fn position_of(order: &[usize], original: usize) -> usize {
    order
        .iter()
        .position(|&i| i == original)
        .expect("presentation order is a permutation of the option indices")
}

/// Grades a buffered selection against the remapped correctness key.
pub fn is_selection_correct(
    question: &QuizQuestion,
    selection: &Selection,
    correct: &CorrectKey,
) -> bool {
    if question.all_answers_correct {
        return true;
    }
    match (selection, correct) {
        (Selection::Single(picked), CorrectKey::Single(correct)) => picked == correct,
        (Selection::Multiple(picked), CorrectKey::Multiple(correct)) => picked == correct,
        _ => false,
    }
}

/// Grades a free-text submission, ignoring case and whitespace.
pub fn is_text_correct(question: &QuizQuestion, submitted: &str, correct: &str) -> bool {
    if question.all_answers_correct {
        return true;
    }
    normalize_text(submitted) == normalize_text(correct)
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Final score as a percentage with two decimals, "0" for an empty quiz.
pub fn percentage(score: u32, total: usize) -> String {
    if total == 0 {
        return "0".to_string();
    }
    format!("{:.2}", f64::from(score) * 100.0 / total as f64)
}
