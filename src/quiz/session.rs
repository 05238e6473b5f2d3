use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Local};
use teloxide::types::{ChatId, MessageId, UserId};
use tokio::sync::oneshot;

use super::logic::QuestionView;
use super::{AnswerSpec, QuizQuestion};

/// In-progress answer buffer, narrowed to the current question's type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Single(usize),
    Multiple(BTreeSet<usize>),
}

/// One graded answer. Appended once per advanced question, never mutated.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnswerRecord {
    #[serde(rename = "questionIndex")]
    pub question_index: usize,
    pub question: String,
    #[serde(rename = "selectedAnswer")]
    pub selected_answer: String,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingConsent,
    AwaitingNickname,
    InProgress,
}

/// Live state of one user's quiz attempt, from the start request until
/// termination.
#[derive(Debug)]
pub struct Session {
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub phase: Phase,
    pub forum_nickname: Option<String>,
    /// Bank snapshot taken at the start request, sequenced once the
    /// questions begin.
    pub bank: Vec<QuizQuestion>,
    pub questions: Vec<QuizQuestion>,
    pub current: usize,
    pub score: u32,
    pub records: Vec<AnswerRecord>,
    pub selection: Selection,
    /// Presented options and correctness key of the current question.
    pub view: Option<QuestionView>,
    /// Message carrying the current inline keyboard, for in-place edits.
    pub quiz_message: Option<MessageId>,
    pub started_at: Option<DateTime<Local>>,
    pub deadline: Option<Instant>,
    /// Dropping this side cancels the armed timeout task.
    pub timeout: Option<oneshot::Sender<()>>,
}

impl Session {
    pub fn new(chat_id: ChatId, username: Option<String>, bank: Vec<QuizQuestion>) -> Self {
        Self {
            chat_id,
            username,
            phase: Phase::AwaitingConsent,
            forum_nickname: None,
            bank,
            questions: Vec::new(),
            current: 0,
            score: 0,
            records: Vec::new(),
            selection: Selection::None,
            view: None,
            quiz_message: None,
            started_at: None,
            deadline: None,
            timeout: None,
        }
    }

    /// Moves the session into the question flow, resetting every counter
    /// from any previous phase.
    pub fn begin(
        &mut self,
        questions: Vec<QuizQuestion>,
        forum_nickname: Option<String>,
        started_at: DateTime<Local>,
        deadline: Instant,
        cancel_timeout: oneshot::Sender<()>,
    ) {
        self.phase = Phase::InProgress;
        self.forum_nickname = forum_nickname;
        self.questions = questions;
        self.current = 0;
        self.score = 0;
        self.records.clear();
        self.selection = Selection::None;
        self.view = None;
        self.quiz_message = None;
        self.started_at = Some(started_at);
        self.deadline = Some(deadline);
        self.timeout = Some(cancel_timeout);
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Whether the session's deadline has already passed. Checked at the top
    /// of every in-progress transition, so a stale answer can never be graded
    /// after the time limit even if the timer task has not fired yet.
    pub fn expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Single choice toggle: re-selecting the chosen option clears it.
    pub fn toggle_single(&mut self, index: usize) {
        self.selection = match self.selection {
            Selection::Single(picked) if picked == index => Selection::None,
            _ => Selection::Single(index),
        };
    }

    /// Multiple choice toggle: flips the option's membership.
    pub fn toggle_multiple(&mut self, index: usize) {
        match &mut self.selection {
            Selection::Multiple(picked) => {
                if !picked.remove(&index) {
                    picked.insert(index);
                }
            }
            _ => self.selection = Selection::Multiple(BTreeSet::from([index])),
        }
    }

    /// Resets the buffer to the shape of the current question's answer type.
    pub fn reset_selection_for_current(&mut self) {
        self.selection = match self.current_question().map(|q| &q.answer) {
            Some(AnswerSpec::Multiple { .. }) => Selection::Multiple(BTreeSet::new()),
            _ => Selection::None,
        };
    }

    /// Appends the graded record for the current question and advances past
    /// it. Exactly one record per progression.
    pub fn record_answer(
        &mut self,
        selected_answer: String,
        correct_answer: String,
        is_correct: bool,
        timestamp: String,
    ) {
        let question = self
            .current_question()
            .map(|q| q.question.clone())
            .unwrap_or_default();
        self.records.push(AnswerRecord {
            question_index: self.current,
            question,
            selected_answer,
            correct_answer,
            is_correct,
            timestamp,
        });
        if is_correct {
            self.score += 1;
        }
        self.current += 1;
        self.selection = Selection::None;
        self.view = None;
    }

    /// Cancels the armed timeout, if any. Dropping the sender wakes the
    /// timer task on its cancellation branch.
    pub fn cancel_timeout(&mut self) {
        self.timeout.take();
    }
}

/// Process-wide table of live sessions, one slot per user.
///
/// Slots are independently created and destroyed; the lock is only ever held
/// for the duration of a closure, never across an await point.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<UserId, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previous session for the user. A replaced session is
    /// dropped here, which also cancels its armed timeout.
    pub fn insert(&self, user: UserId, session: Session) {
        self.lock().insert(user, session);
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.lock().contains_key(&user)
    }

    /// Runs `f` against the user's live session, if any.
    pub fn with<T>(&self, user: UserId, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        self.lock().get_mut(&user).map(f)
    }

    /// Takes the session out of the table. Every termination path goes
    /// through here first: whichever caller removes the session wins, any
    /// later caller sees `None` and does nothing.
    pub fn remove(&self, user: UserId) -> Option<Session> {
        self.lock().remove(&user)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, Session>> {
        self.inner.lock().expect("session registry lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn session() -> Session {
        Session::new(ChatId(10), Some("user".to_string()), Vec::new())
    }

    fn questions(n: usize) -> Vec<QuizQuestion> {
        (0..n)
            .map(|i| QuizQuestion {
                question: format!("q{i}"),
                image: None,
                all_answers_correct: false,
                answer: AnswerSpec::Single {
                    answers: vec!["a".to_string(), "b".to_string()],
                    correct: 0,
                },
            })
            .collect()
    }

    fn begun(n: usize) -> Session {
        let mut s = session();
        let (tx, _rx) = oneshot::channel();
        s.begin(
            questions(n),
            None,
            Local::now(),
            Instant::now() + Duration::from_secs(600),
            tx,
        );
        s
    }

    #[test]
    fn single_toggle_clears_on_reselect() {
        let mut s = session();
        s.toggle_single(1);
        assert_eq!(s.selection, Selection::Single(1));
        s.toggle_single(2);
        assert_eq!(s.selection, Selection::Single(2));
        s.toggle_single(2);
        assert_eq!(s.selection, Selection::None);
    }

    #[test]
    fn multiple_toggle_flips_membership() {
        let mut s = session();
        s.toggle_multiple(0);
        s.toggle_multiple(2);
        assert_eq!(s.selection, Selection::Multiple(BTreeSet::from([0, 2])));
        s.toggle_multiple(0);
        assert_eq!(s.selection, Selection::Multiple(BTreeSet::from([2])));
    }

    #[test]
    fn record_answer_appends_exactly_one_record_and_advances() {
        let mut s = begun(3);
        assert_eq!(s.current, 0);
        s.record_answer("a".into(), "a".into(), true, "t".into());
        assert_eq!(s.records.len(), 1);
        assert_eq!(s.current, 1);
        assert_eq!(s.score, 1);
        assert_eq!(s.records[0].question, "q0");
        s.record_answer("b".into(), "a".into(), false, "t".into());
        assert_eq!(s.records.len(), 2);
        assert_eq!(s.score, 1);
        assert_eq!(s.current, 2);
    }

    #[test]
    fn full_run_collects_one_record_per_question() {
        let mut s = begun(5);
        for _ in 0..5 {
            s.record_answer("a".into(), "a".into(), true, "t".into());
        }
        assert_eq!(s.records.len(), s.total());
        assert!(s.current_question().is_none());
    }

    #[test]
    fn begin_resets_previous_progress() {
        let mut s = begun(2);
        s.record_answer("a".into(), "a".into(), true, "t".into());
        let (tx, _rx) = oneshot::channel();
        s.begin(
            questions(4),
            Some("nick".to_string()),
            Local::now(),
            Instant::now() + Duration::from_secs(600),
            tx,
        );
        assert_eq!(s.current, 0);
        assert_eq!(s.score, 0);
        assert!(s.records.is_empty());
        assert_eq!(s.total(), 4);
        assert_eq!(s.forum_nickname.as_deref(), Some("nick"));
    }

    #[test]
    fn expired_only_after_deadline() {
        let mut s = session();
        let now = Instant::now();
        assert!(!s.expired(now));
        s.deadline = Some(now + Duration::from_secs(600));
        assert!(!s.expired(now));
        assert!(s.expired(now + Duration::from_secs(600)));
        assert!(s.expired(now + Duration::from_secs(601)));
    }

    #[test]
    fn registry_replaces_and_isolates_per_user() {
        let registry = SessionRegistry::new();
        let a = UserId(1);
        let b = UserId(2);
        registry.insert(a, session());
        registry.insert(b, session());

        registry.with(a, |s| s.score = 7);
        let mut replacement = session();
        replacement.score = 1;
        registry.insert(a, replacement);

        assert_eq!(registry.with(a, |s| s.score), Some(1));
        assert_eq!(registry.with(b, |s| s.score), Some(0));

        registry.remove(a);
        assert!(!registry.contains(a));
        assert!(registry.contains(b));
    }

    #[test]
    fn remove_yields_the_session_exactly_once() {
        let registry = SessionRegistry::new();
        let user = UserId(5);
        registry.insert(user, session());
        assert!(registry.remove(user).is_some());
        assert!(registry.remove(user).is_none());
    }

    #[test]
    fn dropping_the_session_cancels_its_timeout() {
        let (tx, mut rx) = oneshot::channel::<()>();
        let mut s = session();
        s.timeout = Some(tx);
        drop(s);
        // a dropped sender completes the receiver with an error
        assert!(rx.try_recv().is_err());
    }
}
