use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use teloxide::types::UserId;

use crate::datefmt;

/// Runtime settings, read once at startup. Every value has a default; a
/// malformed override is logged and replaced by the default instead of
/// refusing to boot.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Quiz window bounds in `DD.MM.YYYY`, kept raw for user messages.
    pub quiz_start: String,
    pub quiz_end: String,
    pub time_limit: Duration,
    pub randomize_questions: bool,
    pub randomize_answers: bool,
    pub show_quiz_button: bool,
    pub bank_path: PathBuf,
    pub navigation_path: PathBuf,
    pub images_dir: PathBuf,
    pub results_path: PathBuf,
    pub csv_path: PathBuf,
    pub admin_ids: Vec<UserId>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            quiz_start: env_or("QUIZ_START_TIME", "04.05.2025"),
            quiz_end: env_or("QUIZ_END_TIME", "13.07.2025"),
            time_limit: Duration::from_secs(parse_u64(
                "TIME_LIMIT",
                env::var("TIME_LIMIT").ok(),
                600,
            )),
            randomize_questions: parse_flag(
                "RANDOMIZE_QUESTIONS",
                env::var("RANDOMIZE_QUESTIONS").ok(),
                true,
            ),
            randomize_answers: parse_flag(
                "RANDOMIZE_ANSWERS",
                env::var("RANDOMIZE_ANSWERS").ok(),
                true,
            ),
            show_quiz_button: parse_flag("QUIZ_BUTTON", env::var("QUIZ_BUTTON").ok(), true),
            bank_path: env_or("QUIZ_DATA_PATH", "data/quizData.json").into(),
            navigation_path: env_or("NAVIGATION_PATH", "data/navigation.json").into(),
            images_dir: env_or("IMAGES_DIR", "data/images").into(),
            results_path: env_or("RESULTS_PATH", "data/userResults.json").into(),
            csv_path: env_or("CSV_FILE_PATH", "data/userResults.csv").into(),
            admin_ids: parse_admin_ids(env::var("ADMIN_IDS").ok()),
        }
    }

    /// The configured quiz window, or `None` when either bound is malformed.
    pub fn quiz_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = datefmt::parse_window_date(&self.quiz_start, false)?;
        let end = datefmt::parse_window_date(&self.quiz_end, true)?;
        Some((start, end))
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admin_ids.contains(&user)
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(name: &str, raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(str::trim) {
        None | Some("") => default,
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        Some(other) => {
            log::warn!("ignoring invalid {name}={other:?}, using {default}");
            default
        }
    }
}

fn parse_u64(name: &str, raw: Option<String>, default: u64) -> u64 {
    match raw.as_deref().map(str::trim) {
        None | Some("") => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            log::warn!("ignoring invalid {name}={value:?}, using {default}");
            default
        }),
    }
}

fn parse_admin_ids(raw: Option<String>) -> Vec<UserId> {
    let Some(raw) = raw else { return Vec::new() };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse() {
            Ok(id) => Some(UserId(id)),
            Err(_) => {
                log::warn!("ignoring invalid admin id {part:?}");
                None
            }
        })
        .collect()
}
