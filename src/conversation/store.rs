//! Conversation store with optional JSON-file persistence.
//!
//! The whole store is serialized as one JSON array of conversations.
//! Structural changes (new conversation, message added, rename, delete,
//! clear) are written through immediately when a file is attached. Content
//! appended to a streaming reply is kept in memory until [`save`] is called.
//!
//! [`save`]: ConversationStore::save

use std::path::{Path, PathBuf};

use crate::error::{ChatError, Result};
use crate::types::{Conversation, Message, Role, now_millis};

/// Ordered collection of conversations, newest first, with a current selection.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current_id: Option<String>,
    path: Option<PathBuf>,
}

impl ConversationStore {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`.
    ///
    /// A missing file starts an empty store. An unreadable or corrupt file is
    /// logged and also starts an empty store; it is overwritten on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let conversations = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<Conversation>>(&text) {
                Ok(conversations) => conversations,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Error loading conversations");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(ChatError::StorageError(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        tracing::debug!(path = %path.display(), count = conversations.len(), "Conversation store opened");
        Ok(Self {
            conversations,
            current_id: None,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the store to its file, if it has one.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string(&self.conversations)
            .map_err(|e| ChatError::StorageError(format!("Failed to serialize conversations: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current_id.as_deref().and_then(|id| self.get(id))
    }

    fn current_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.current_id.as_deref()?;
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Select an existing conversation.
    pub fn set_current(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(ChatError::InvalidInput(format!("Unknown conversation: {id}")));
        }
        self.current_id = Some(id.to_string());
        Ok(())
    }

    /// Select an empty conversation, reusing an existing one if possible.
    ///
    /// A reused conversation has its timestamps refreshed; a new one is
    /// inserted at the front. Returns the selected id.
    pub fn new_conversation(&mut self) -> Result<String> {
        let now = now_millis();
        let id = match self.conversations.iter_mut().find(|c| c.is_empty()) {
            Some(empty) => {
                empty.created_at = now;
                empty.updated_at = now;
                empty.id.clone()
            }
            None => {
                let conversation = Conversation::new();
                let id = conversation.id.clone();
                self.conversations.insert(0, conversation);
                id
            }
        };

        self.current_id = Some(id.clone());
        self.save()?;
        Ok(id)
    }

    /// Append a message to the current conversation.
    pub fn add_message(&mut self, message: Message) -> Result<()> {
        let conversation = self
            .current_mut()
            .ok_or_else(|| ChatError::InvalidInput("No conversation selected".to_string()))?;
        conversation.messages.push(message);
        conversation.updated_at = now_millis();
        self.save()
    }

    /// Append streamed content to the current conversation's last message.
    ///
    /// Only applies when that message is an assistant message; returns
    /// whether anything was appended. Not persisted until [`save`](Self::save).
    pub fn append_to_last_assistant(&mut self, content: &str) -> bool {
        let Some(conversation) = self.current_mut() else {
            return false;
        };
        let now = now_millis();
        let Some(last) = conversation
            .messages
            .last_mut()
            .filter(|m| m.role == Role::Assistant)
        else {
            return false;
        };

        last.content.push_str(content);
        last.updated_at = now;
        conversation.updated_at = now;
        true
    }

    /// Rename a conversation; returns whether it existed.
    pub fn rename(&mut self, id: &str, title: impl Into<String>) -> Result<bool> {
        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        conversation.title = title.into();
        conversation.updated_at = now_millis();
        self.save()?;
        Ok(true)
    }

    /// Delete a conversation; returns whether it existed.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            return Ok(false);
        }
        if self.current_id.as_deref() == Some(id) {
            self.current_id = None;
        }
        self.save()?;
        Ok(true)
    }

    /// Remove every conversation and clear the selection.
    pub fn clear(&mut self) -> Result<()> {
        self.conversations.clear();
        self.current_id = None;
        self.save()
    }
}
