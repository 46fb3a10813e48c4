//! Web search client for a SerpAPI-compatible provider.
//!
//! Given a query, returns organic result URLs in the order the engine ranked
//! them. Failures never escape this crate: a provider that is unreachable or
//! answers with something unexpected simply yields no results, so the caller
//! can still answer from conversation context alone.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use webrag_shared::{Result, SearchOptions, WebRagError};

/// Search engine requested from the provider.
const ENGINE: &str = "google";

// ---------------------------------------------------------------------------
// Provider response
// ---------------------------------------------------------------------------

/// The subset of the provider's JSON body we read.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    /// Set by the provider instead of results on quota/key problems.
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: Option<String>,
}

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// Client for the external search provider.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    options: SearchOptions,
}

impl SearchClient {
    /// Create a client for the provider described by `options`.
    pub fn new(options: SearchOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| WebRagError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    /// Search for `query`, returning at most `count` result URLs in engine order.
    ///
    /// Transport and parse failures are logged and reported as no results.
    #[instrument(skip_all, fields(query = %query, count))]
    pub async fn search(&self, query: &str, count: usize) -> Vec<String> {
        if count == 0 {
            return Vec::new();
        }

        match self.try_search(query, count).await {
            Ok(urls) => {
                info!(results = urls.len(), "search completed");
                urls
            }
            Err(e) => {
                warn!(error = %e, "search failed, continuing without sources");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, query: &str, count: usize) -> Result<Vec<String>> {
        let num = count.to_string();
        let params = [
            ("api_key", self.options.api_key.as_str()),
            ("engine", ENGINE),
            ("q", query),
            ("num", num.as_str()),
            ("location", self.options.location.as_str()),
            ("google_domain", self.options.google_domain.as_str()),
        ];

        debug!(endpoint = %self.options.endpoint, "querying search provider");

        let response = self
            .client
            .get(&self.options.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| WebRagError::Network(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebRagError::Network(format!(
                "search provider returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WebRagError::Network(format!("failed to read search response: {e}")))?;

        parse_results(&body, count)
    }
}

/// Extract organic result links from a provider response body.
fn parse_results(body: &str, count: usize) -> Result<Vec<String>> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| WebRagError::parse(format!("invalid search response: {e}")))?;

    if let Some(error) = parsed.error {
        return Err(WebRagError::Network(format!("search provider error: {error}")));
    }

    Ok(parsed
        .organic_results
        .into_iter()
        .filter_map(|r| r.link)
        .take(count)
        .collect())
}
