//! Conversation state types

use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Assistant,
}

/// A single conversation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_human(&self) -> bool {
        self.role == Role::Human
    }
}

/// State flowing through the graph
///
/// Built fresh for every invocation; nothing carries over between turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
}

impl ConversationState {
    /// State holding a single human message
    pub fn from_human(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::human(text)],
        }
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append the messages produced by a node
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
    }
}

/// Messages a node wants appended to the state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
}

impl StateUpdate {
    pub fn reply(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(content)],
        }
    }
}
