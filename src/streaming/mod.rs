//! Streaming Module
//!
//! The response pipeline for newline-delimited JSON streams:
//! - Line framing of the body with `tokio-util`'s `LinesCodec`
//! - Best-effort record decoding that skips malformed lines
//! - Accumulation of record content into a transcript

mod aggregator;
mod decoder;
mod factory;

pub use aggregator::*;
pub use decoder::*;
pub use factory::*;
