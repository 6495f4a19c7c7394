//! Common types shared by the poll loop, the dispatcher and the collaborators.

use std::fmt;

use strum::{AsRefStr, Display, EnumString, VariantArray};

/// Telegram user identifier. Challenges are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram chat identifier. Replies are addressed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ground-truth answer of an illusion.
///
/// The string form doubles as the callback data of the matching button, so
/// parsing is case-sensitive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, VariantArray,
)]
#[strum(serialize_all = "lowercase")]
pub enum Answer {
    /// The first object is larger
    First,
    /// The second object is larger
    Second,
    /// Both objects have the same size
    Equal,
}

impl Answer {
    /// Button label shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            Answer::First => "First is larger",
            Answer::Second => "Second is larger",
            Answer::Equal => "They are equal",
        }
    }

    /// What the image must actually show for this answer to be true.
    pub fn description(self) -> &'static str {
        match self {
            Answer::First => "the first object is actually larger",
            Answer::Second => "the second object is actually larger",
            Answer::Equal => "both objects are actually the same size",
        }
    }
}

/// An inline button: the label the user sees and the data sent back on press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonOption {
    pub label: String,
    pub value: String,
}

/// The three fixed answer buttons, in display order.
pub fn answer_options() -> Vec<ButtonOption> {
    Answer::VARIANTS
        .iter()
        .map(|answer| ButtonOption {
            label: answer.label().to_string(),
            value: answer.to_string(),
        })
        .collect()
}

/// One inbound event from Telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub id: i64,
    pub payload: UpdatePayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePayload {
    /// A text message
    Message(TextMessage),
    /// An inline button press
    Callback(CallbackPress),
    /// A button press without chat or data; only acknowledged
    StaleCallback { callback_id: String },
    /// Anything the bot does not handle (stickers, edits, ...)
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPress {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub data: String,
    pub callback_id: String,
}

/// Output of prompt generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPrompt {
    pub text: String,
    pub answer: Answer,
    pub explanation: String,
}
