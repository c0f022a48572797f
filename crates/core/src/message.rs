//! Message and conversation-turn domain types.
//!
//! A chat request becomes exactly one [`ConversationTurn`]: the configured
//! system prompt followed by the (possibly tool-rewritten, possibly
//! retrieval-augmented) user content.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single message sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// One request/response exchange: a system message followed by a user message.
///
/// The two-field shape is the only way to build a turn, so the message list
/// handed to a provider is always `[System, User]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    system: Message,
    user: Message,
}

impl ConversationTurn {
    pub fn new(system_prompt: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system: Message::system(system_prompt),
            user: Message::user(user_content),
        }
    }

    pub fn system(&self) -> &Message {
        &self.system
    }

    pub fn user(&self) -> &Message {
        &self.user
    }

    /// The ordered message list for a provider request.
    pub fn into_messages(self) -> Vec<Message> {
        vec![self.system, self.user]
    }
}
