//! Wire types for the local model server API.
//!
//! Field names follow the server's JSON. Response types tolerate unknown
//! fields and missing optional ones so that newer server versions keep
//! decoding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::conversation::Message;

/// A message as sent in a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Role of the message sender ("user", "assistant", "system")
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: String,
    /// The model's thinking process (for thinking models)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl ApiMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            thinking: None,
        }
    }
}

impl From<&Message> for ApiMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role.as_str(), message.content.clone())
    }
}

/// Chat request (`POST /api/chat`)
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model name
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<ApiMessage>,
    /// Whether to stream the response
    pub stream: bool,
    /// Additional model options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, serde_json::Value>>,
    /// Keep model loaded duration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ApiMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
            options: None,
            keep_alive: None,
        }
    }

    /// Build a request from stored conversation messages.
    pub fn from_history(model: impl Into<String>, history: &[Message]) -> Self {
        Self::new(model, history.iter().map(ApiMessage::from).collect())
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

/// Completion request (`POST /api/generate`)
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Model name
    pub model: String,
    /// Prompt text
    pub prompt: String,
    /// System message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Whether to stream the response
    pub stream: bool,
    /// Additional model options (temperature, seed, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, serde_json::Value>>,
    /// Keep model loaded duration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            stream: true,
            options: None,
            keep_alive: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(self, temperature: f32) -> Self {
        self.with_option("temperature", serde_json::json!(temperature))
    }

    pub fn with_seed(self, seed: i64) -> Self {
        self.with_option("seed", serde_json::json!(seed))
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

/// Implemented by every record shape a stream can carry.
pub trait StreamRecord {
    /// The incremental text carried by this record.
    fn content(&self) -> &str;

    /// Whether this is the final record of its stream.
    fn is_done(&self) -> bool;
}

/// One record of a chat stream, or the whole body of a non-streaming chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub message: Option<ApiMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub load_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

impl StreamRecord for ChatRecord {
    fn content(&self) -> &str {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// One record of a completion stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

impl StreamRecord for CompletionRecord {
    fn content(&self) -> &str {
        &self.response
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// Model details shared by local and running models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub parent_model: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub families: Option<Vec<String>>,
    #[serde(default)]
    pub parameter_size: String,
    #[serde(default)]
    pub quantization_level: String,
}

/// A model installed on the server (`GET /api/tags`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalModel {
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub details: ModelDetails,
}

/// A model currently loaded in memory (`GET /api/ps`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningModel {
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub details: ModelDetails,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default)]
    pub size_vram: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ModelList<T> {
    #[serde(default = "Vec::new")]
    pub models: Vec<T>,
}
