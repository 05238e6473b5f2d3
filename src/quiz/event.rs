use teloxide::types::UserId;

/// Reserved menu phrase that exits a running quiz.
pub const EXIT_PHRASE: &str = "Выйти из викторины";

/// Callback action decoded from an inline button token.
///
/// Tokens embed the id of the user the keyboard was rendered for. A token
/// carrying a different id than the pressing user decodes to nothing, which
/// drops replayed buttons from other users' keyboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizAction {
    ConsentYes,
    ConsentNo,
    ToggleSingle(usize),
    ToggleMultiple(usize),
    Submit,
    Exit,
}

impl QuizAction {
    pub fn encode(&self, user: UserId) -> String {
        match self {
            QuizAction::ConsentYes => format!("quiz_nickname_yes_{user}"),
            QuizAction::ConsentNo => format!("quiz_nickname_no_{user}"),
            QuizAction::ToggleSingle(index) => format!("quiz_single_{user}_{index}"),
            QuizAction::ToggleMultiple(index) => format!("quiz_multiple_{user}_{index}"),
            QuizAction::Submit => format!("quiz_submit_{user}"),
            QuizAction::Exit => format!("quiz_exit_{user}"),
        }
    }

    pub fn decode(data: &str, user: UserId) -> Option<Self> {
        let rest = data.strip_prefix("quiz_")?;
        let uid = user.to_string();

        if let Some(owner) = rest.strip_prefix("nickname_yes_") {
            return (owner == uid).then_some(QuizAction::ConsentYes);
        }
        if let Some(owner) = rest.strip_prefix("nickname_no_") {
            return (owner == uid).then_some(QuizAction::ConsentNo);
        }
        if let Some(owner) = rest.strip_prefix("submit_") {
            return (owner == uid).then_some(QuizAction::Submit);
        }
        if let Some(owner) = rest.strip_prefix("exit_") {
            return (owner == uid).then_some(QuizAction::Exit);
        }
        if let Some(tail) = rest.strip_prefix("single_") {
            let (owner, index) = split_owner_index(tail)?;
            return (owner == uid).then_some(QuizAction::ToggleSingle(index));
        }
        if let Some(tail) = rest.strip_prefix("multiple_") {
            let (owner, index) = split_owner_index(tail)?;
            return (owner == uid).then_some(QuizAction::ToggleMultiple(index));
        }
        None
    }
}

fn split_owner_index(tail: &str) -> Option<(&str, usize)> {
    let (owner, index) = tail.rsplit_once('_')?;
    Some((owner, index.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId(42);

    #[test]
    fn actions_round_trip_through_tokens() {
        let actions = [
            QuizAction::ConsentYes,
            QuizAction::ConsentNo,
            QuizAction::ToggleSingle(3),
            QuizAction::ToggleMultiple(0),
            QuizAction::Submit,
            QuizAction::Exit,
        ];
        for action in actions {
            let token = action.encode(USER);
            assert_eq!(QuizAction::decode(&token, USER), Some(action), "{token}");
        }
    }

    #[test]
    fn token_for_another_user_is_dropped() {
        let token = QuizAction::Submit.encode(USER);
        assert_eq!(QuizAction::decode(&token, UserId(43)), None);
        let token = QuizAction::ToggleSingle(1).encode(USER);
        assert_eq!(QuizAction::decode(&token, UserId(43)), None);
    }

    #[test]
    fn malformed_tokens_are_dropped() {
        for data in [
            "",
            "quiz_",
            "quiz_single_42",
            "quiz_single_42_x",
            "quiz_unknown_42",
            "not_a_quiz_token",
        ] {
            assert_eq!(QuizAction::decode(data, USER), None, "{data}");
        }
    }
}
