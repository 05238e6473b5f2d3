use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, Utc};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId, ParseMode, ReplyMarkup, User, UserId};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::datefmt;
use crate::menu;
use crate::results::{render_username, QuizResult, ResultStore};
use crate::settings::Settings;

use super::bank;
use super::event::QuizAction;
use super::keyboard;
use super::logic::{self, CorrectKey};
use super::session::{Phase, Selection, Session, SessionRegistry};
use super::{AnswerSpec, QuizQuestion};

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type Handled = Result<bool, Box<dyn std::error::Error + Send + Sync>>;

/// Shared handles every quiz handler needs.
#[derive(Clone)]
pub struct QuizContext {
    pub settings: Arc<Settings>,
    pub sessions: SessionRegistry,
    pub results: Arc<ResultStore>,
}

/// Why a start request was refused. The display text is what the user sees.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartRejected {
    #[error("Викторина ещё не началась. Начало: {0}.")]
    NotStarted(String),
    #[error("Викторина уже закончилась. Конец: {0}.")]
    Ended(String),
    #[error("Вы уже прошли викторину.")]
    AlreadyTaken,
    #[error("Ошибка: вопросы не загружены.")]
    EmptyBank,
}

/// How a session terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCause {
    Completed,
    Timeout,
    ManualExit,
}

const CONSENT_PROMPT: &str = "Есть ли у вас ник на форуме?";
const NICKNAME_PROMPT: &str = "Пожалуйста, введите ваш ник на форуме:";
const PICK_ONE_PROMPT: &str = "Выберите один вариант перед подтверждением.";
const PICK_SOME_PROMPT: &str = "Выберите хотя бы один вариант перед подтверждением.";
const CORRECT_NOTICE: &str = "Правильно! 👋";
const IMAGE_UNAVAILABLE: &str = "⚠️ Изображение для вопроса недоступно";

const REDIRECT_ATTEMPTS: u32 = 3;
const REDIRECT_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(2);

// ---------------------------- Start ----------------------------

/// Handles the quiz menu phrase. `Some(rejection)` means no session was
/// created and the caller should show the reason over the menu keyboard.
pub async fn start_quiz(
    bot: &Bot,
    ctx: &QuizContext,
    user: &User,
    chat_id: ChatId,
) -> Result<Option<StartRejected>, Box<dyn std::error::Error + Send + Sync>> {
    match check_start(ctx, user).await {
        Err(rejection) => Ok(Some(rejection)),
        Ok(bank) => {
            // Replaces any session the user already had, including its timer.
            ctx.sessions
                .insert(user.id, Session::new(chat_id, user.username.clone(), bank));
            bot.send_message(chat_id, CONSENT_PROMPT)
                .reply_markup(keyboard::consent_keyboard(user.id))
                .await?;
            Ok(None)
        }
    }
}

async fn check_start(ctx: &QuizContext, user: &User) -> Result<Vec<QuizQuestion>, StartRejected> {
    let (start, end) = ctx
        .settings
        .quiz_window()
        .ok_or_else(|| StartRejected::NotStarted(ctx.settings.quiz_start.clone()))?;
    let now = Utc::now();
    if now < start {
        return Err(StartRejected::NotStarted(ctx.settings.quiz_start.clone()));
    }
    if now > end {
        return Err(StartRejected::Ended(ctx.settings.quiz_end.clone()));
    }
    if ctx.results.has_user_taken(user.username.as_deref()).await {
        return Err(StartRejected::AlreadyTaken);
    }
    let bank = bank::load_bank(&ctx.settings.bank_path).await;
    if bank.is_empty() {
        return Err(StartRejected::EmptyBank);
    }
    Ok(bank)
}

// ---------------------------- Callback actions ----------------------------

/// Feeds a decoded callback action into the state machine. `false` means the
/// action does not apply to the user's current state.
pub async fn handle_action(
    bot: &Bot,
    ctx: &QuizContext,
    user: &User,
    chat_id: ChatId,
    action: QuizAction,
) -> Handled {
    let Some((phase, expired)) = ctx
        .sessions
        .with(user.id, |s| (s.phase, s.expired(Instant::now())))
    else {
        return Ok(false);
    };

    match phase {
        Phase::AwaitingConsent => match action {
            QuizAction::ConsentYes => {
                ctx.sessions
                    .with(user.id, |s| s.phase = Phase::AwaitingNickname);
                bot.send_message(chat_id, NICKNAME_PROMPT).await?;
                Ok(true)
            }
            QuizAction::ConsentNo => {
                begin_quiz(bot, ctx, user.id, chat_id, None).await?;
                Ok(true)
            }
            _ => Ok(false),
        },
        Phase::AwaitingNickname => Ok(false),
        Phase::InProgress => {
            // A lingering event after the deadline never gets graded.
            if expired {
                end_quiz(bot, ctx, user.id, EndCause::Timeout).await?;
                return Ok(true);
            }
            match action {
                QuizAction::Exit => {
                    end_quiz(bot, ctx, user.id, EndCause::ManualExit).await?;
                    Ok(true)
                }
                QuizAction::ToggleSingle(index) => {
                    toggle(bot, ctx, user.id, chat_id, index, false).await
                }
                QuizAction::ToggleMultiple(index) => {
                    toggle(bot, ctx, user.id, chat_id, index, true).await
                }
                QuizAction::Submit => submit(bot, ctx, user.id, chat_id).await,
                QuizAction::ConsentYes | QuizAction::ConsentNo => Ok(false),
            }
        }
    }
}

// ---------------------------- Free text ----------------------------

/// Feeds a free-text message into the state machine. `false` means the text
/// is not part of the quiz dialogue and the caller may treat it as menu
/// navigation.
pub async fn handle_text(
    bot: &Bot,
    ctx: &QuizContext,
    user: &User,
    chat_id: ChatId,
    text: &str,
) -> Handled {
    let Some((phase, expired)) = ctx
        .sessions
        .with(user.id, |s| (s.phase, s.expired(Instant::now())))
    else {
        return Ok(false);
    };

    match phase {
        Phase::AwaitingConsent => Ok(false),
        Phase::AwaitingNickname => {
            let nickname = Some(text.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string);
            begin_quiz(bot, ctx, user.id, chat_id, nickname).await?;
            Ok(true)
        }
        Phase::InProgress => {
            if expired {
                end_quiz(bot, ctx, user.id, EndCause::Timeout).await?;
                return Ok(true);
            }
            answer_text_question(bot, ctx, user.id, chat_id, text).await
        }
    }
}

// ---------------------------- Question flow ----------------------------

async fn begin_quiz(
    bot: &Bot,
    ctx: &QuizContext,
    user: UserId,
    chat_id: ChatId,
    forum_nickname: Option<String>,
) -> HandlerResult {
    let time_limit = ctx.settings.time_limit;
    let (cancel_tx, cancel_rx) = oneshot::channel();

    let armed = ctx.sessions.with(user, |s| {
        let questions = logic::sequence_questions(
            std::mem::take(&mut s.bank),
            ctx.settings.randomize_questions,
        );
        s.begin(
            questions,
            forum_nickname,
            Local::now(),
            Instant::now() + time_limit,
            cancel_tx,
        );
    });
    if armed.is_none() {
        return Ok(());
    }

    // The timer loses the race against any termination path: dropping the
    // session resolves the cancellation branch, and a late firing finds the
    // registry slot empty and does nothing.
    let timer_bot = bot.clone();
    let timer_ctx = ctx.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(time_limit) => {
                if let Err(err) = end_quiz(&timer_bot, &timer_ctx, user, EndCause::Timeout).await {
                    log::error!("timeout termination failed for user {user}: {err}");
                }
            }
            _ = cancel_rx => {}
        }
    });

    bot.send_message(
        chat_id,
        format!(
            "Викторина началась! У вас есть {} на прохождение.",
            datefmt::format_duration(time_limit.as_secs())
        ),
    )
    .reply_markup(ReplyMarkup::kb_remove())
    .await?;

    send_question(bot, ctx, user, chat_id).await
}

async fn send_question(bot: &Bot, ctx: &QuizContext, user: UserId, chat_id: ChatId) -> HandlerResult {
    let prepared = ctx
        .sessions
        .with(user, |s| {
            let question = s.current_question()?.clone();
            let view = logic::prepare_answers(&question, ctx.settings.randomize_answers);
            let header = question_header(&question, s.current, s.total());
            s.view = Some(view.clone());
            s.reset_selection_for_current();
            s.quiz_message = None;
            Some((question, view.answers, header, s.selection.clone()))
        })
        .flatten();

    let Some((question, answers, header, selection)) = prepared else {
        return end_quiz(bot, ctx, user, EndCause::Completed).await;
    };

    if let Some(image) = &question.image {
        let path = ctx.settings.images_dir.join(image);
        if tokio::fs::metadata(&path).await.is_ok() {
            bot.send_photo(chat_id, InputFile::file(path)).await?;
        } else {
            bot.send_message(chat_id, IMAGE_UNAVAILABLE).await?;
        }
    }

    let markup = keyboard::quiz_keyboard(&question, &answers, user, &selection);
    let sent = bot
        .send_message(chat_id, header)
        .parse_mode(ParseMode::Html)
        .disable_web_page_preview(true)
        .reply_markup(markup)
        .await?;
    ctx.sessions.with(user, |s| s.quiz_message = Some(sent.id));
    Ok(())
}

async fn toggle(
    bot: &Bot,
    ctx: &QuizContext,
    user: UserId,
    chat_id: ChatId,
    index: usize,
    multiple: bool,
) -> Handled {
    let prepared = ctx
        .sessions
        .with(user, |s| {
            let question = s.current_question()?.clone();
            let matches_type = match question.answer {
                AnswerSpec::Single { .. } => !multiple,
                AnswerSpec::Multiple { .. } => multiple,
                AnswerSpec::Text { .. } => false,
            };
            if !matches_type {
                return None;
            }
            let view = s.view.as_ref()?;
            if index >= view.answers.len() {
                return None;
            }
            let answers = view.answers.clone();
            if multiple {
                s.toggle_multiple(index);
            } else {
                s.toggle_single(index);
            }
            let header = question_header(&question, s.current, s.total());
            Some((question, answers, header, s.selection.clone(), s.quiz_message))
        })
        .flatten();

    let Some((question, answers, header, selection, message_id)) = prepared else {
        return Ok(false);
    };

    let markup = keyboard::quiz_keyboard(&question, &answers, user, &selection);
    update_quiz_keyboard(bot, ctx, user, chat_id, message_id, &header, markup).await?;
    Ok(true)
}

/// Re-renders the selection state in place. Falls back to a fresh message
/// (adopting its id) when there is nothing to edit or the edit fails.
async fn update_quiz_keyboard(
    bot: &Bot,
    ctx: &QuizContext,
    user: UserId,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    header: &str,
    markup: teloxide::types::InlineKeyboardMarkup,
) -> HandlerResult {
    if let Some(message_id) = message_id {
        match bot
            .edit_message_reply_markup(chat_id, message_id)
            .reply_markup(markup.clone())
            .await
        {
            Ok(_) => return Ok(()),
            Err(err) => log::warn!("keyboard edit failed for user {user}: {err}"),
        }
    }
    let sent = bot
        .send_message(chat_id, header)
        .parse_mode(ParseMode::Html)
        .reply_markup(markup)
        .await?;
    ctx.sessions.with(user, |s| s.quiz_message = Some(sent.id));
    Ok(())
}

enum SubmitOutcome {
    NeedSingle,
    NeedSome,
    Answered {
        is_correct: bool,
        correct_answer: String,
        finished: bool,
    },
}

async fn submit(bot: &Bot, ctx: &QuizContext, user: UserId, chat_id: ChatId) -> Handled {
    let outcome = ctx
        .sessions
        .with(user, |s| {
            let question = s.current_question()?.clone();
            let view = s.view.as_ref()?;
            match (&question.answer, &s.selection) {
                (AnswerSpec::Single { .. }, Selection::None) => Some(SubmitOutcome::NeedSingle),
                (AnswerSpec::Multiple { .. }, Selection::None) => Some(SubmitOutcome::NeedSome),
                (AnswerSpec::Multiple { .. }, Selection::Multiple(picked)) if picked.is_empty() => {
                    Some(SubmitOutcome::NeedSome)
                }
                (AnswerSpec::Single { .. }, Selection::Single(picked)) => {
                    let selected_answer = view.answers.get(*picked)?.clone();
                    let correct_answer = render_correct(view);
                    let is_correct =
                        logic::is_selection_correct(&question, &s.selection, &view.correct);
                    s.record_answer(
                        selected_answer,
                        correct_answer.clone(),
                        is_correct,
                        datefmt::format_date_time(&Local::now()),
                    );
                    Some(SubmitOutcome::Answered {
                        is_correct,
                        correct_answer,
                        finished: s.current >= s.total(),
                    })
                }
                (AnswerSpec::Multiple { .. }, Selection::Multiple(picked)) => {
                    let selected_answer = picked
                        .iter()
                        .filter_map(|&i| view.answers.get(i).cloned())
                        .collect::<Vec<_>>()
                        .join(", ");
                    let correct_answer = render_correct(view);
                    let is_correct =
                        logic::is_selection_correct(&question, &s.selection, &view.correct);
                    s.record_answer(
                        selected_answer,
                        correct_answer.clone(),
                        is_correct,
                        datefmt::format_date_time(&Local::now()),
                    );
                    Some(SubmitOutcome::Answered {
                        is_correct,
                        correct_answer,
                        finished: s.current >= s.total(),
                    })
                }
                _ => None,
            }
        })
        .flatten();

    match outcome {
        None => Ok(false),
        Some(SubmitOutcome::NeedSingle) => {
            bot.send_message(chat_id, PICK_ONE_PROMPT).await?;
            Ok(true)
        }
        Some(SubmitOutcome::NeedSome) => {
            bot.send_message(chat_id, PICK_SOME_PROMPT).await?;
            Ok(true)
        }
        Some(SubmitOutcome::Answered {
            is_correct,
            correct_answer,
            finished,
        }) => {
            notify_graded(bot, chat_id, is_correct, &correct_answer).await?;
            if finished {
                end_quiz(bot, ctx, user, EndCause::Completed).await?;
            } else {
                send_question(bot, ctx, user, chat_id).await?;
            }
            Ok(true)
        }
    }
}

async fn answer_text_question(
    bot: &Bot,
    ctx: &QuizContext,
    user: UserId,
    chat_id: ChatId,
    text: &str,
) -> Handled {
    let outcome = ctx
        .sessions
        .with(user, |s| {
            let question = s.current_question()?.clone();
            let CorrectKey::Text(correct) = &s.view.as_ref()?.correct else {
                return None;
            };
            let correct_answer = correct.clone();
            let is_correct = logic::is_text_correct(&question, text, &correct_answer);
            s.record_answer(
                text.to_string(),
                correct_answer.clone(),
                is_correct,
                datefmt::format_date_time(&Local::now()),
            );
            Some(SubmitOutcome::Answered {
                is_correct,
                correct_answer,
                finished: s.current >= s.total(),
            })
        })
        .flatten();

    let Some(SubmitOutcome::Answered {
        is_correct,
        correct_answer,
        finished,
    }) = outcome
    else {
        return Ok(false);
    };

    notify_graded(bot, chat_id, is_correct, &correct_answer).await?;
    if finished {
        end_quiz(bot, ctx, user, EndCause::Completed).await?;
    } else {
        send_question(bot, ctx, user, chat_id).await?;
    }
    Ok(true)
}

async fn notify_graded(
    bot: &Bot,
    chat_id: ChatId,
    is_correct: bool,
    correct_answer: &str,
) -> HandlerResult {
    if is_correct {
        bot.send_message(chat_id, CORRECT_NOTICE).await?;
    } else {
        bot.send_message(
            chat_id,
            format!("Неправильно ❌. Правильный ответ: {correct_answer}"),
        )
        .await?;
    }
    Ok(())
}

// ---------------------------- Termination ----------------------------

/// Terminates the user's session. Safe to call from any path at any time:
/// the registry removal is atomic, so between the timer task and a
/// user-driven event exactly one caller performs the teardown.
pub async fn end_quiz(bot: &Bot, ctx: &QuizContext, user: UserId, cause: EndCause) -> HandlerResult {
    let Some(mut session) = ctx.sessions.remove(user) else {
        return Ok(());
    };
    session.cancel_timeout();
    let chat_id = session.chat_id;

    // Best-effort: leave no live option buttons behind. Text questions carry
    // no selection state worth stripping.
    if let Some(message_id) = session.quiz_message {
        let is_text = session
            .current_question()
            .is_some_and(|q| matches!(q.answer, AnswerSpec::Text { .. }));
        if !is_text {
            if let Err(err) = bot.edit_message_reply_markup(chat_id, message_id).await {
                log::debug!("failed to strip quiz keyboard for user {user}: {err}");
            }
        }
    }

    let ended_at = Local::now();
    let elapsed = session
        .started_at
        .map(|started| (ended_at - started).num_seconds().max(0) as u64)
        .unwrap_or(0);
    let percent = logic::percentage(session.score, session.total());
    let message = end_message(cause, session.score, session.total(), &percent);

    if cause == EndCause::Completed {
        let result = QuizResult {
            date: datefmt::format_date(&ended_at),
            score: session.score,
            total_questions: session.total(),
            percentage_correct: percent,
            time_spent: datefmt::format_duration(elapsed),
            start_time: session
                .started_at
                .map(|started| datefmt::format_date_time(&started))
                .unwrap_or_default(),
            end_time: datefmt::format_date_time(&ended_at),
            answers: session.records.clone(),
            username: render_username(session.username.as_deref()),
            forum_nickname: session.forum_nickname.clone().unwrap_or_default(),
        };
        ctx.results.save(user, result).await;
    }

    bot.send_message(
        chat_id,
        format!("{message}\nДля возврата в меню выполните команду /start"),
    )
    .await?;

    redirect_to_menu(bot, ctx, user, chat_id).await;
    Ok(())
}

fn end_message(cause: EndCause, score: u32, total: usize, percent: &str) -> String {
    match cause {
        EndCause::ManualExit => "Вы вышли из викторины.".to_string(),
        EndCause::Timeout => {
            format!("Время вышло.\nВаш результат: {score} из {total} ({percent}%)")
        }
        EndCause::Completed => {
            format!("Викторина завершена! 🎉\nВаш результат: {score} из {total} ({percent}%)")
        }
    }
}

/// Nudges the user back towards the menu with bounded retries, then falls
/// back to rendering the menu keyboard directly.
async fn redirect_to_menu(bot: &Bot, ctx: &QuizContext, user: UserId, chat_id: ChatId) {
    for attempt in 1..=REDIRECT_ATTEMPTS {
        match bot.send_message(chat_id, "/start").await {
            Ok(_) => return,
            Err(err) => {
                log::warn!(
                    "menu redirect failed for user {user} (attempt {attempt}/{REDIRECT_ATTEMPTS}): {err}"
                );
                if attempt < REDIRECT_ATTEMPTS {
                    tokio::time::sleep(REDIRECT_RETRY_DELAY).await;
                }
            }
        }
    }

    let tree = menu::load_navigation(&ctx.settings.navigation_path).await;
    let markup = menu::adaptive_keyboard(
        &menu::first_level_items(&tree),
        false,
        ctx.settings.show_quiz_button,
    );
    if let Err(err) = bot
        .send_message(chat_id, "Не удалось отобразить меню. Отправьте /start вручную.")
        .reply_markup(markup)
        .await
    {
        log::error!("fallback menu render failed for user {user}: {err}");
    }
}

// ---------------------------- Rendering ----------------------------

fn question_header(question: &QuizQuestion, index: usize, total: usize) -> String {
    format!(
        "Вопрос {}/{}:\n{}{}",
        index + 1,
        total,
        question.question,
        instructions(&question.answer)
    )
}

fn instructions(answer: &AnswerSpec) -> &'static str {
    match answer {
        AnswerSpec::Single { .. } => {
            "\nВыберите <b>ОДИН</b> вариант и нажмите \"Подтвердить выбор\"."
        }
        AnswerSpec::Multiple { .. } => {
            "\nВыберите <b>ОДИН или НЕСКОЛЬКО</b> вариантов и нажмите \"Подтвердить выбор\"."
        }
        AnswerSpec::Text { .. } => "\nВведите ответ текстом.",
    }
}

fn render_correct(view: &logic::QuestionView) -> String {
    match &view.correct {
        CorrectKey::Single(index) => view.answers.get(*index).cloned().unwrap_or_default(),
        CorrectKey::Multiple(indices) => indices
            .iter()
            .filter_map(|&i| view.answers.get(i).cloned())
            .collect::<Vec<_>>()
            .join(", "),
        CorrectKey::Text(correct) => correct.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn single(answers: &[&str], correct: usize) -> QuizQuestion {
        QuizQuestion {
            question: "Столица Франции?".to_string(),
            image: None,
            all_answers_correct: false,
            answer: AnswerSpec::Single {
                answers: answers.iter().map(|s| s.to_string()).collect(),
                correct,
            },
        }
    }

    #[test]
    fn headers_number_questions_from_one() {
        let header = question_header(&single(&["a", "b"], 0), 0, 5);
        assert!(header.starts_with("Вопрос 1/5:\nСтолица Франции?"));
        assert!(header.contains("ОДИН"));
    }

    #[test]
    fn end_messages_differ_by_cause() {
        assert_eq!(
            end_message(EndCause::ManualExit, 3, 5, "60.00"),
            "Вы вышли из викторины."
        );
        let timeout = end_message(EndCause::Timeout, 3, 5, "60.00");
        assert!(timeout.starts_with("Время вышло."));
        assert!(timeout.contains("3 из 5 (60.00%)"));
        let done = end_message(EndCause::Completed, 5, 5, "100.00");
        assert!(done.contains("🎉"));
        assert!(done.contains("5 из 5 (100.00%)"));
    }

    // Walks the grading flow the way submit() drives it, without transport.
    fn answer_current(session: &mut Session, selection: Selection) -> (bool, String) {
        let question = session.current_question().unwrap().clone();
        let view = session.view.clone().unwrap();
        session.selection = selection;
        let is_correct = logic::is_selection_correct(&question, &session.selection, &view.correct);
        let selected = match &session.selection {
            Selection::Single(picked) => view.answers[*picked].clone(),
            Selection::Multiple(picked) => picked
                .iter()
                .map(|&i| view.answers[i].clone())
                .collect::<Vec<_>>()
                .join(", "),
            Selection::None => String::new(),
        };
        let correct = render_correct(&view);
        session.record_answer(selected, correct.clone(), is_correct, "t".to_string());
        (is_correct, correct)
    }

    fn start_session(questions: Vec<QuizQuestion>) -> Session {
        let mut session = Session::new(ChatId(1), Some("tester".to_string()), Vec::new());
        let (cancel, _rx) = oneshot::channel();
        session.begin(
            questions,
            None,
            Local::now(),
            Instant::now() + std::time::Duration::from_secs(600),
            cancel,
        );
        let view = logic::prepare_answers(session.current_question().unwrap(), false);
        session.view = Some(view);
        session.reset_selection_for_current();
        session
    }

    #[test]
    fn single_question_quiz_scores_full_marks_on_the_right_index() {
        let mut session = start_session(vec![single(&["A", "B", "C"], 1)]);
        let (is_correct, _) = answer_current(&mut session, Selection::Single(1));
        assert!(is_correct);
        assert_eq!(session.score, 1);
        assert_eq!(session.records.len(), 1);
        assert!(session.current_question().is_none());
        assert_eq!(logic::percentage(session.score, session.total()), "100.00");
    }

    #[test]
    fn single_question_quiz_scores_zero_and_names_the_right_answer() {
        let mut session = start_session(vec![single(&["A", "B", "C"], 1)]);
        let (is_correct, correct) = answer_current(&mut session, Selection::Single(0));
        assert!(!is_correct);
        assert_eq!(correct, "B");
        assert_eq!(session.score, 0);
        assert_eq!(logic::percentage(session.score, session.total()), "0.00");
    }

    #[test]
    fn multiple_choice_submission_order_does_not_matter() {
        let question = QuizQuestion {
            question: "?".to_string(),
            image: None,
            all_answers_correct: false,
            answer: AnswerSpec::Multiple {
                answers: ["a", "b", "c"].iter().map(|s| s.to_string()).collect(),
                correct: BTreeSet::from([0, 2]),
            },
        };
        let mut session = start_session(vec![question.clone()]);
        // {2, 0} submitted in reverse order still matches {0, 2}
        let (is_correct, _) =
            answer_current(&mut session, Selection::Multiple(BTreeSet::from([2, 0])));
        assert!(is_correct);

        let mut session = start_session(vec![question]);
        let (is_correct, _) =
            answer_current(&mut session, Selection::Multiple(BTreeSet::from([0])));
        assert!(!is_correct);
    }

    #[test]
    fn correct_rendering_follows_the_presentation_order() {
        let view = logic::QuestionView {
            answers: vec!["b".to_string(), "a".to_string(), "c".to_string()],
            correct: CorrectKey::Single(1),
        };
        assert_eq!(render_correct(&view), "a");

        let view = logic::QuestionView {
            answers: vec!["x".to_string(), "y".to_string(), "z".to_string()],
            correct: CorrectKey::Multiple(BTreeSet::from([0, 2])),
        };
        assert_eq!(render_correct(&view), "x, z");

        let view = logic::QuestionView {
            answers: Vec::new(),
            correct: CorrectKey::Text("Париж".to_string()),
        };
        assert_eq!(render_correct(&view), "Париж");
    }
}
