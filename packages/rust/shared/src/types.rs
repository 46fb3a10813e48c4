//! Core domain types shared by the retrieval and conversation crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one conversation session (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new time-sortable session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// One completed question/answer pair. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    user: String,
    assistant: String,
}

impl Exchange {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }

    /// The question as the user typed it.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The generated answer.
    pub fn assistant(&self) -> &str {
        &self.assistant
    }
}

// ---------------------------------------------------------------------------
// PageExcerpt
// ---------------------------------------------------------------------------

/// Bounded plain text extracted from one fetched page.
///
/// Empty `text` means the fetch or extraction failed; such excerpts never
/// reach the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageExcerpt {
    /// Source URL, as returned by the search provider.
    pub url: String,
    /// Extracted text, at most the configured character cap.
    pub text: String,
}

impl PageExcerpt {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }

    /// True for a page that could not be fetched or had no content.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_roundtrip() {
        let id = SessionId::new();
        let s = id.to_string();
        let parsed: SessionId = s.parse().expect("parse SessionId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn exchange_accessors() {
        let ex = Exchange::new("What is the capital of France?", "Paris.");
        assert_eq!(ex.user(), "What is the capital of France?");
        assert_eq!(ex.assistant(), "Paris.");
    }

    #[test]
    fn empty_excerpt_is_empty() {
        assert!(PageExcerpt::new("https://example.com", "").is_empty());
        assert!(!PageExcerpt::new("https://example.com", "text").is_empty());
    }
}
