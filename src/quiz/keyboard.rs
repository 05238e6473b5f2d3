use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, UserId};

use super::event::{QuizAction, EXIT_PHRASE};
use super::session::Selection;
use super::{AnswerSpec, QuizQuestion};

pub const MAX_BUTTONS_PER_ROW: usize = 3;
pub const MAX_BUTTON_WIDTH: usize = 20;

const SUBMIT_LABEL: &str = "Подтвердить выбор";

/// Inline keyboard for the current question: option buttons reflecting the
/// selection buffer, then the submit row, then the exit row. Text questions
/// get the exit row only.
pub fn quiz_keyboard(
    question: &QuizQuestion,
    answers: &[String],
    user: UserId,
    selection: &Selection,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    if !matches!(question.answer, AnswerSpec::Text { .. }) {
        rows.extend(answer_rows(question, answers, user, selection));
        rows.push(vec![InlineKeyboardButton::callback(
            SUBMIT_LABEL,
            QuizAction::Submit.encode(user),
        )]);
    }

    rows.push(vec![InlineKeyboardButton::callback(
        EXIT_PHRASE,
        QuizAction::Exit.encode(user),
    )]);
    InlineKeyboardMarkup::new(rows)
}

fn answer_rows(
    question: &QuizQuestion,
    answers: &[String],
    user: UserId,
    selection: &Selection,
) -> Vec<Vec<InlineKeyboardButton>> {
    let mut rows = Vec::new();
    let mut row: Vec<InlineKeyboardButton> = Vec::new();

    for (index, answer) in answers.iter().enumerate() {
        let selected = match selection {
            Selection::Single(picked) => *picked == index,
            Selection::Multiple(picked) => picked.contains(&index),
            Selection::None => false,
        };
        let label = format_answer_label(answer, selected);
        let action = match question.answer {
            AnswerSpec::Multiple { .. } => QuizAction::ToggleMultiple(index),
            _ => QuizAction::ToggleSingle(index),
        };

        let needs_new_row =
            label.chars().count() > MAX_BUTTON_WIDTH || row.len() >= MAX_BUTTONS_PER_ROW;
        if needs_new_row && !row.is_empty() {
            rows.push(std::mem::take(&mut row));
        }
        row.push(InlineKeyboardButton::callback(label, action.encode(user)));
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

/// Button caption with the selection mark, truncated to the button width.
fn format_answer_label(answer: &str, selected: bool) -> String {
    let label = if selected {
        format!("✅ {answer}")
    } else {
        answer.to_string()
    };
    if label.chars().count() > MAX_BUTTON_WIDTH {
        let mut truncated: String = label.chars().take(MAX_BUTTON_WIDTH - 3).collect();
        truncated.push_str("...");
        truncated
    } else {
        label
    }
}

/// The Да/Нет prompt shown before the questions start.
pub fn consent_keyboard(user: UserId) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("Да", QuizAction::ConsentYes.encode(user)),
        InlineKeyboardButton::callback("Нет", QuizAction::ConsentNo.encode(user)),
    ]])
}
