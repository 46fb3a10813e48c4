//! Answer prompt assembly.
//!
//! The template below is what the answering model is tuned against: section
//! headings, the `[[Source i]]` markers, and the numbered instructions must
//! stay exactly as written.

use webrag_shared::{Exchange, PageExcerpt};

use crate::history::{History, PROMPT_HISTORY_LEN};

/// Stand-in for the conversation block when nothing has been said yet.
pub const NO_HISTORY_MARKER: &str = "No previous conversation";

const INSTRUCTIONS: &str = "\
1. Answer the new question considering both contexts
2. Resolve pronouns (e.g., 'there' -> Paris)
3. Cite sources like [[1]] when using specific info
4. If conflicting info, state clearly
5. Be concise but thorough";

/// Render exchanges as `User:`/`Assistant:` pairs, or the no-history marker.
pub fn format_history(recent: &[&Exchange]) -> String {
    if recent.is_empty() {
        return NO_HISTORY_MARKER.to_string();
    }

    recent
        .iter()
        .map(|ex| format!("User: {}\nAssistant: {}", ex.user(), ex.assistant()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render excerpts as 1-indexed `[[Source i]]` blocks in the given order.
pub fn format_sources(excerpts: &[PageExcerpt]) -> String {
    excerpts
        .iter()
        .enumerate()
        .map(|(i, excerpt)| {
            format!("[[Source {}]]\nURL: {}\n{}", i + 1, excerpt.url, excerpt.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the answer prompt from the user's question, the conversation so far,
/// and the retrieved excerpts.
pub fn build_prompt(user_query: &str, history: &History, excerpts: &[PageExcerpt]) -> String {
    let history_context = format_history(&history.recent(PROMPT_HISTORY_LEN));
    let web_context = format_sources(excerpts);

    format!(
        "**Conversation Context**\n\
         {history_context}\n\
         \n\
         **New Research Context**\n\
         {web_context}\n\
         \n\
         **Instructions**\n\
         {INSTRUCTIONS}\n\
         \n\
         **New Question**: {user_query}\n\
         \n\
         **Formatted Answer**:"
    )
}
