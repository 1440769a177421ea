//! Conversation state: the persisted store and age-based grouping.

pub mod groups;
pub mod store;

pub use groups::{ConversationGroup, ConversationGroups, group_conversations, group_conversations_at};
pub use store::ConversationStore;
