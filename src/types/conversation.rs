//! Conversation and message types owned by the application state.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Title given to conversations before a summary title is generated.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// "user" for prompts, the model name for assistant replies
    pub creator: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Message {
    /// A user prompt stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            role: Role::User,
            content: content.into(),
            creator: "user".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// An empty assistant reply created by `model`, filled in as the stream arrives.
    pub fn assistant_placeholder(model: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            role: Role::Assistant,
            content: String::new(),
            creator: model.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// An ordered list of messages with a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Conversation {
    /// A fresh, empty conversation with a random id.
    pub fn new() -> Self {
        let now = now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Creation time as a UTC datetime; out-of-range stamps map to the epoch.
    pub fn created_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.created_at)
            .single()
            .unwrap_or_default()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
