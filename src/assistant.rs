use serde::{Deserialize, Serialize};

/// One prior turn of the assistant conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// A homework suggestion returned by the idea generator. Purely advisory;
/// the caller decides whether to feed it into homework creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeworkIdea {
    pub title: String,
    pub description: String,
}

#[derive(Debug)]
pub enum AssistantError {
    Request(String),
    Status(u16),
}

impl std::fmt::Display for AssistantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantError::Request(message) => write!(f, "assistant request failed: {message}"),
            AssistantError::Status(status) => {
                write!(f, "assistant returned status {status}")
            }
        }
    }
}
