use std::collections::BTreeMap;
use std::path::PathBuf;

use teloxide::types::UserId;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::quiz::session::AnswerRecord;

/// A finished attempt as it is persisted. Created on natural completion
/// only, never on timeout or manual exit.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuizResult {
    pub date: String,
    pub score: u32,
    #[serde(rename = "totalQuestions")]
    pub total_questions: usize,
    #[serde(rename = "percentageCorrect")]
    pub percentage_correct: String,
    #[serde(rename = "timeSpent")]
    pub time_spent: String,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    pub answers: Vec<AnswerRecord>,
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "forumNickname")]
    pub forum_nickname: String,
}

#[derive(Debug, Error)]
enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

type History = BTreeMap<String, Vec<QuizResult>>;

/// Append-only result history: a JSON file keyed by user id plus a flat CSV
/// export, one row per attempt.
#[derive(Debug)]
pub struct ResultStore {
    results_path: PathBuf,
    csv_path: PathBuf,
}

// The CSV is opened by spreadsheet software, hence the BOM and CRLF endings.
const CSV_BOM: &str = "\u{feff}";
const CSV_HEADER: &str = "ID Пользователя,Имя Пользователя,Ник на форуме,Дата,Правильные ответы,Всего вопросов,Время прохождения,Время начала,Время окончания,Ответы\r\n";
const NO_NICKNAME: &str = "регистрации на форуме нет";
const ANSWER_SEPARATOR: &str = "────────────────────────";

impl ResultStore {
    pub fn new(results_path: PathBuf, csv_path: PathBuf) -> Self {
        Self {
            results_path,
            csv_path,
        }
    }

    pub fn csv_path(&self) -> &std::path::Path {
        &self.csv_path
    }

    /// All stored attempts of one user, oldest first.
    pub async fn user_results(&self, user: UserId) -> Vec<QuizResult> {
        self.load_all()
            .await
            .remove(&user.to_string())
            .unwrap_or_default()
    }

    /// Whether any stored attempt belongs to this username. Users without a
    /// username are never matched.
    pub async fn has_user_taken(&self, username: Option<&str>) -> bool {
        let Some(username) = username else {
            return false;
        };
        let tagged = format!("@{username}");
        self.load_all()
            .await
            .values()
            .flatten()
            .any(|result| result.username == tagged)
    }

    /// Persists one attempt into the history and the CSV export. Failures
    /// are logged and swallowed, a lost record must not break termination.
    pub async fn save(&self, user: UserId, result: QuizResult) {
        if let Err(err) = self.try_save(user, &result).await {
            log::error!("failed to persist quiz result for user {user}: {err}");
        }
    }

    async fn try_save(&self, user: UserId, result: &QuizResult) -> Result<(), StoreError> {
        if let Some(dir) = self.results_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut history = self.load_all().await;
        history
            .entry(user.to_string())
            .or_default()
            .push(result.clone());
        let raw = serde_json::to_string_pretty(&history)?;
        tokio::fs::write(&self.results_path, raw).await?;

        self.append_csv(user, result).await?;
        Ok(())
    }

    async fn load_all(&self) -> History {
        match tokio::fs::read_to_string(&self.results_path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                log::error!("result history is not valid JSON: {err}");
                History::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => History::new(),
            Err(err) => {
                log::error!("failed to read result history: {err}");
                History::new()
            }
        }
    }

    async fn append_csv(&self, user: UserId, result: &QuizResult) -> Result<(), StoreError> {
        if let Some(dir) = self.csv_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        if tokio::fs::metadata(&self.csv_path).await.is_err() {
            tokio::fs::write(&self.csv_path, format!("{CSV_BOM}{CSV_HEADER}")).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .await?;
        file.write_all(csv_row(user, result).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

pub fn render_username(username: Option<&str>) -> String {
    match username {
        Some(name) => format!("@{name}"),
        None => "No username".to_string(),
    }
}

/// The "Мои результаты" listing.
pub fn render_history(results: &[QuizResult]) -> String {
    let mut message = String::from("Ваши результаты викторины:\n\n");
    for (index, result) in results.iter().enumerate() {
        message.push_str(&format!(
            "Попытка {} ({}):\nПользователь: {}\nСчёт: {} из {}\n\n",
            index + 1,
            result.date,
            result.username,
            result.score,
            result.total_questions
        ));
    }
    message
}

fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// The per-question answer log flattened into one readable cell.
fn format_answer_block(answers: &[AnswerRecord]) -> String {
    answers
        .iter()
        .enumerate()
        .map(|(index, answer)| {
            let mark = if answer.is_correct { "✅" } else { "❌" };
            [
                format!("Вопрос {}", index + 1),
                format!("Вопрос: {}", answer.question),
                format!("Ответ: {}", answer.selected_answer),
                format!("Правильно: {mark} ({})", answer.correct_answer),
                ANSWER_SEPARATOR.to_string(),
            ]
            .join("\r\n")
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn csv_row(user: UserId, result: &QuizResult) -> String {
    let nickname = if result.forum_nickname.is_empty() {
        csv_quote(NO_NICKNAME)
    } else {
        csv_quote(&result.forum_nickname)
    };
    let row = [
        user.to_string(),
        result.username.clone(),
        nickname,
        result.date.clone(),
        result.score.to_string(),
        result.total_questions.to_string(),
        result.time_spent.clone(),
        result.start_time.clone(),
        result.end_time.clone(),
        csv_quote(&format_answer_block(&result.answers)),
    ]
    .join(",");
    format!("{row}\r\n")
}
