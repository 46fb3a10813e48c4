//! Page fetching and readable-text extraction.
//!
//! This crate provides:
//! - [`PageFetcher`] — HTTP fetcher that turns URLs into bounded excerpts
//! - [`extract_text`] — the HTML-to-text reduction used by the fetcher

pub mod extract;
pub mod fetcher;

pub use extract::extract_text;
pub use fetcher::PageFetcher;
