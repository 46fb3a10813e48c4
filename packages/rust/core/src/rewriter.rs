//! Search query rewriting.
//!
//! Turns a conversational question ("how many people live there?") into a
//! standalone search query by letting the model resolve references against
//! recent history. Failure here is never fatal: the user's own words are
//! always a usable query.

use tracing::{debug, instrument, warn};

use webrag_shared::Exchange;

use crate::assembler::format_history;
use crate::model::LanguageModel;

/// Characters stripped from both ends of the model's reply.
const QUOTE_CHARS: &[char] = &['"', '\'', '`', '“', '”', '‘', '’'];

/// Build the rewrite prompt from recent exchanges and the new question.
pub fn rewrite_prompt(user_query: &str, recent: &[&Exchange]) -> String {
    let history_context = format_history(recent);

    format!(
        "**Conversation Context**\n\
         {history_context}\n\
         \n\
         **New Question**: {user_query}\n\
         \n\
         **Instructions**\n\
         Rewrite the new question as a single web search query optimized for retrieval.\n\
         Use the conversation context to resolve references such as pronouns, so the query \
         stands on its own.\n\
         Respond with the search query only, on one line, without quotes or explanation.\n\
         \n\
         **Search Query**:"
    )
}

/// Reduce a raw model reply to a bare query: first non-empty line, trimmed,
/// with surrounding quotes removed.
pub fn clean_rewrite(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_matches(QUOTE_CHARS).trim().to_string())
        .unwrap_or_default()
}

/// Produce a search query for `user_query`, falling back to it verbatim when
/// the model fails or replies with nothing usable.
#[instrument(skip_all, fields(query = %user_query))]
pub async fn rewrite(model: &dyn LanguageModel, user_query: &str, recent: &[&Exchange]) -> String {
    let prompt = rewrite_prompt(user_query, recent);

    match model.rewrite(&prompt).await {
        Ok(raw) => {
            let cleaned = clean_rewrite(&raw);
            if cleaned.is_empty() {
                debug!("rewrite was empty, using original query");
                user_query.to_string()
            } else {
                debug!(rewritten = %cleaned, "query rewritten");
                cleaned
            }
        }
        Err(e) => {
            warn!(error = %e, "query rewrite failed, using original query");
            user_query.to_string()
        }
    }
}
