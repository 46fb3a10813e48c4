//! Conversational retrieval pipeline for webrag.
//!
//! This crate ties together query rewriting, web search, page fetching,
//! prompt assembly, and answer generation into one `ask` operation with
//! bounded conversational memory ([`session::Session`]).

pub mod assembler;
pub mod history;
pub mod model;
pub mod rewriter;
pub mod session;

#[cfg(test)]
mod testing;

pub use history::History;
pub use model::{GeminiModel, LanguageModel};
pub use session::{ProgressReporter, Session, SilentProgress};
