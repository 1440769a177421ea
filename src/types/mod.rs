//! Core data types: server wire formats and conversation state.

pub mod api;
pub mod conversation;

pub use api::*;
pub use conversation::*;
