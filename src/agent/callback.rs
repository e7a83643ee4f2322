//! Survey answer button payloads.
//!
//! A payload names the user the question was sent to, the question index and
//! the chosen option: `answer:<user>:<question>:<option>`. The option is the
//! option's index, which keeps payloads well under Telegram's 64-byte limit.
//! The older `answer_<user>_<question>_<label>` form is still accepted so
//! buttons sent before an upgrade keep working.

use crate::channels::{Button, UserId};
use crate::survey::{AnswerOption, Question};

const PREFIX: &str = "answer:";
const LEGACY_PREFIX: &str = "answer_";

/// Decoded answer button payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerPayload {
    pub user_id: UserId,
    pub question_index: usize,
    /// Option label. Validated by the survey engine, not here.
    pub label: String,
}

impl AnswerPayload {
    pub fn encode(user_id: UserId, question_index: usize, option: AnswerOption) -> String {
        format!("{PREFIX}{user_id}:{question_index}:{}", option.index())
    }

    /// `None` when the payload is not an answer payload at all.
    pub fn decode(payload: &str) -> Option<Self> {
        let (rest, sep) = if let Some(rest) = payload.strip_prefix(PREFIX) {
            (rest, ':')
        } else if let Some(rest) = payload.strip_prefix(LEGACY_PREFIX) {
            (rest, '_')
        } else {
            return None;
        };

        let mut parts = rest.splitn(3, sep);
        let user_id = parts.next()?.parse().ok()?;
        let question_index = parts.next()?.parse().ok()?;
        let answer = parts.next()?;

        let label = match answer.parse::<usize>() {
            Ok(index) => AnswerOption::from_index(index)
                .map(|o| o.label().to_string())
                .unwrap_or_else(|| answer.to_string()),
            Err(_) => answer.to_string(),
        };

        Some(Self {
            user_id,
            question_index,
            label,
        })
    }
}

/// One button per answer option for `question`, addressed to `user_id`.
pub fn answer_buttons(user_id: UserId, question: &Question) -> Vec<Button> {
    question
        .options()
        .into_iter()
        .map(|option| {
            Button::new(
                option.label(),
                AnswerPayload::encode(user_id, question.index, option),
            )
        })
        .collect()
}
