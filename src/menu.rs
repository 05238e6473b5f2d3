use std::path::Path;

use serde_json::Value;
use teloxide::types::{KeyboardButton, KeyboardMarkup};
use thiserror::Error;

pub const QUIZ_BUTTON: &str = "🎲 Викторина 🎲";
pub const MY_RESULTS_BUTTON: &str = "📊 Мои результаты";
pub const BACK_BUTTON: &str = "Назад";

const MAX_BUTTONS_PER_ROW: usize = 3;
const MAX_BUTTON_WIDTH: usize = 20;

/// Two-level navigation tree: a list of single-key objects, each mapping a
/// first-level label to its sub-item map. Authored order is preserved.
pub type NavTree = Vec<serde_json::Map<String, Value>>;

#[derive(Debug, Error)]
pub enum NavError {
    #[error("failed to read navigation config: {0}")]
    Io(#[from] std::io::Error),
    #[error("navigation config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Loads the navigation tree, collapsing to an empty tree on any failure.
pub async fn load_navigation(path: &Path) -> NavTree {
    match try_load(path).await {
        Ok(tree) => tree,
        Err(err) => {
            log::error!("navigation config rejected: {err}");
            Vec::new()
        }
    }
}

async fn try_load(path: &Path) -> Result<NavTree, NavError> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// First-level labels, in authored order.
pub fn first_level_items(tree: &NavTree) -> Vec<String> {
    tree.iter()
        .filter_map(|item| item.keys().next().cloned())
        .collect()
}

/// Sub-item labels of one first-level entry.
pub fn sub_items(tree: &NavTree, first_level: &str) -> Option<Vec<String>> {
    let sub = tree.iter().find_map(|item| item.get(first_level))?;
    Some(sub.as_object()?.keys().cloned().collect())
}

/// Looks a leaf label up across all first-level entries.
pub fn find_leaf_text(tree: &NavTree, label: &str) -> Option<String> {
    tree.iter()
        .flat_map(|item| item.values())
        .filter_map(|sub| sub.as_object())
        .find_map(|sub| sub.get(label))
        .and_then(|text| text.as_str().map(str::to_string))
}

/// Reply keyboard with up to three buttons per row; an overlong label starts
/// its own row. First-level keyboards get the quiz entry appended, nested
/// ones get a back button instead.
pub fn adaptive_keyboard(items: &[String], with_back: bool, show_quiz_button: bool) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = Vec::new();
    let mut row: Vec<KeyboardButton> = Vec::new();

    for item in items {
        let needs_new_row =
            item.chars().count() > MAX_BUTTON_WIDTH || row.len() >= MAX_BUTTONS_PER_ROW;
        if needs_new_row && !row.is_empty() {
            rows.push(std::mem::take(&mut row));
        }
        row.push(KeyboardButton::new(item.clone()));
    }
    if !row.is_empty() {
        rows.push(row);
    }

    if !with_back && show_quiz_button {
        rows.push(vec![KeyboardButton::new(QUIZ_BUTTON)]);
    }
    if with_back {
        rows.push(vec![KeyboardButton::new(BACK_BUTTON)]);
    }

    KeyboardMarkup::new(rows)
        .resize_keyboard(true)
        .one_time_keyboard(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> NavTree {
        serde_json::from_str(
            r#"[
                {"Правила": {"Общие правила": "Текст правил", "FAQ": "Текст FAQ"}},
                {"Контакты": {"Администрация": "Список админов"}}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn first_level_keeps_authored_order() {
        assert_eq!(first_level_items(&tree()), ["Правила", "Контакты"]);
    }

    #[test]
    fn sub_items_resolve_by_first_level_label() {
        assert_eq!(
            sub_items(&tree(), "Правила").unwrap(),
            ["Общие правила", "FAQ"]
        );
        assert!(sub_items(&tree(), "Нет такого").is_none());
    }

    #[test]
    fn leaf_text_is_found_across_entries() {
        assert_eq!(
            find_leaf_text(&tree(), "Администрация").as_deref(),
            Some("Список админов")
        );
        assert!(find_leaf_text(&tree(), "Правила").is_none());
    }

    #[test]
    fn malformed_tree_fails_to_parse() {
        let parsed: Result<NavTree, _> = serde_json::from_str(r#"{"не": "массив"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn keyboard_wraps_rows_and_appends_quiz_button() {
        let items: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let markup = adaptive_keyboard(&items, false, true);
        let rows: Vec<Vec<String>> = markup
            .keyboard
            .iter()
            .map(|row| row.iter().map(|b| b.text.clone()).collect())
            .collect();
        assert_eq!(rows, [
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["d".to_string()],
            vec![QUIZ_BUTTON.to_string()],
        ]);
    }

    #[test]
    fn nested_keyboard_gets_back_button_instead_of_quiz() {
        let items = vec!["x".to_string()];
        let markup = adaptive_keyboard(&items, true, true);
        let last = markup.keyboard.last().unwrap();
        assert_eq!(last[0].text, BACK_BUTTON);
        assert!(markup
            .keyboard
            .iter()
            .flatten()
            .all(|b| b.text != QUIZ_BUTTON));
    }

    #[test]
    fn overlong_label_starts_its_own_row() {
        let items: Vec<String> = vec![
            "коротко".to_string(),
            "очень длинная надпись на кнопке".to_string(),
            "ещё".to_string(),
        ];
        let markup = adaptive_keyboard(&items, false, false);
        assert_eq!(markup.keyboard[0].len(), 1);
        assert_eq!(markup.keyboard[1].len(), 2);
    }
}
