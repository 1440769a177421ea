//! # Ollachat - Streaming chat core for local LLM servers
//!
//! Ollachat talks to an Ollama-compatible server, decodes its
//! newline-delimited JSON reply streams, and separates a model's
//! `<think>...</think>` reasoning from the answer shown to the user.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Tolerant decoding**: malformed or falsy records are skipped, never fatal.
//! - **Chunk-safe**: records and UTF-8 characters split across network chunks are reassembled.
//! - **Reasoning extraction**: reasoning blocks are separated incrementally while streaming,
//!   or after the fact with [`reasoning::split_segments`].
//! - **Conversations**: a JSON-file store with age grouping for listings.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ollachat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let _guard = ollachat::telemetry::init_from_env()?;
//!
//!     let client = OllamaClient::new(ClientConfig::from_env()?)?;
//!     let store = ConversationStore::open("conversations.json")?;
//!     let mut session = ChatSession::from_client(client, store);
//!
//!     let outcome = session
//!         .submit_with("Why is the sky blue?", "deepseek-r1", |event| {
//!             if let ThinkEvent::Narrative(text) = event {
//!                 print!("{text}");
//!             }
//!         })
//!         .await?;
//!     println!("\n{} reasoning block(s)", outcome.reasoning.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod reasoning;
pub mod session;
pub mod streaming;
pub mod telemetry;
pub mod types;

pub use client::{ChatTransport, OllamaClient};
pub use config::ClientConfig;
pub use error::{ChatError, Result};
pub use session::{ChatSession, SubmitOutcome};

pub mod prelude {
    pub use crate::client::{ChatTransport, OllamaClient, classify_http_error};
    pub use crate::config::{ClientConfig, ClientConfigBuilder};
    pub use crate::conversation::{
        ConversationGroup, ConversationStore, group_conversations, group_conversations_at,
    };
    pub use crate::error::ChatError;
    pub use crate::reasoning::{
        Segment, SegmentKind, TagConfig, ThinkEvent, ThinkExtractor, reassemble, split_segments,
        strip_reasoning,
    };
    pub use crate::session::{ChatSession, SubmitOutcome};
    pub use crate::streaming::{
        Accepted, ChunkReport, RecordStream, StreamAggregator, StreamFactory, decode_chunk,
    };
    pub use crate::types::{
        ChatRecord, ChatRequest, CompletionRecord, CompletionRequest, Conversation, LocalModel,
        Message, Role, RunningModel, StreamRecord,
    };
}
