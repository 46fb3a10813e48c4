//! Shared types, error model, and configuration for webrag.
//!
//! This crate is the foundation depended on by all other webrag crates.
//! It provides:
//! - [`WebRagError`] — the unified error type
//! - Domain types ([`Exchange`], [`PageExcerpt`], [`SessionId`])
//! - Configuration ([`AppConfig`], runtime option structs, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BROWSER_USER_AGENT, FetchConfig, FetchOptions, ModelConfig, ModelOptions,
    SearchConfig, SearchOptions, SessionConfig, SessionOptions, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, WebRagError};
pub use types::{Exchange, PageExcerpt, SessionId};
