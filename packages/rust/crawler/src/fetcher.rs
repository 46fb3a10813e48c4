//! Page fetcher: downloads search result pages and reduces them to excerpts.
//!
//! Every failure mode (bad URL, timeout, HTTP error, unreadable body) turns
//! into an empty excerpt. A page that cannot be read is simply absent from
//! the answer's sources.

use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use webrag_shared::{FetchOptions, PageExcerpt, Result, WebRagError};

use crate::extract::extract_text;

/// Maximum number of redirects followed per page.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// PageFetcher
// ---------------------------------------------------------------------------

/// HTTP page fetcher with a browser-like identity and a fixed timeout.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    options: FetchOptions,
}

impl PageFetcher {
    /// Create a new fetcher with the given options.
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(options.timeout)
            .build()
            .map_err(|e| WebRagError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    /// Fetch `url` and return its extracted text, or an empty string on any failure.
    pub async fn fetch(&self, url: &str) -> String {
        match self.try_fetch(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url, error = %e, "page fetch failed");
                String::new()
            }
        }
    }

    /// Fetch `url` and wrap the result as a [`PageExcerpt`].
    pub async fn fetch_excerpt(&self, url: &str) -> PageExcerpt {
        PageExcerpt::new(url, self.fetch(url).await)
    }

    /// Fetch all `urls` with bounded concurrency.
    ///
    /// Returns non-empty excerpts in the order of `urls`, regardless of which
    /// fetch finished first.
    #[instrument(skip_all, fields(urls = urls.len(), concurrency = self.options.concurrency))]
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<PageExcerpt> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));

        let handles: Vec<_> = urls
            .iter()
            .map(|url| {
                let fetcher = self.clone();
                let sem = semaphore.clone();
                let url = url.clone();
                tokio::spawn(async move {
                    let _permit = sem.acquire().await;
                    fetcher.fetch_excerpt(&url).await
                })
            })
            .collect();

        let mut excerpts = Vec::with_capacity(handles.len());
        for (url, handle) in urls.iter().zip(handles) {
            match handle.await {
                Ok(excerpt) if !excerpt.is_empty() => excerpts.push(excerpt),
                Ok(_) => debug!(%url, "no readable content, skipping"),
                Err(e) => warn!(%url, error = %e, "fetch task failed"),
            }
        }

        info!(
            requested = urls.len(),
            usable = excerpts.len(),
            "pages fetched"
        );

        excerpts
    }

    async fn try_fetch(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| WebRagError::validation(format!("invalid URL '{url}': {e}")))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(WebRagError::validation(format!(
                "unsupported scheme '{}' in {url}",
                parsed.scheme()
            )));
        }

        debug!(%parsed, "fetching page");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| WebRagError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebRagError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WebRagError::Network(format!("{url}: body read failed: {e}")))?;

        let text = extract_text(&body, self.options.max_chars);
        debug!(url, chars = text.chars().count(), "extracted page text");

        Ok(text)
    }
}
