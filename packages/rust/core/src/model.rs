//! Generative model capability and the Gemini implementation.
//!
//! The pipeline talks to the model through [`LanguageModel`], which has one
//! method per prompt template. Tests substitute a scripted double.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use webrag_shared::{ModelOptions, Result, WebRagError};

/// Sampling temperature for query rewriting (deterministic as possible).
const REWRITE_TEMPERATURE: f32 = 0.0;

/// Output token budget for a rewritten search query.
const REWRITE_MAX_OUTPUT_TOKENS: u32 = 64;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// A text-completion model used twice per question.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a query-rewrite prompt. Callers fall back on failure.
    async fn rewrite(&self, prompt: &str) -> Result<String>;

    /// Complete an answer prompt. The returned text is used unmodified.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Gemini wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

// ---------------------------------------------------------------------------
// GeminiModel
// ---------------------------------------------------------------------------

/// [`LanguageModel`] backed by the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: Client,
    options: ModelOptions,
}

impl GeminiModel {
    pub fn new(options: ModelOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| WebRagError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    /// Model ID requests are sent to.
    pub fn model_id(&self) -> &str {
        &self.options.model
    }

    #[instrument(skip_all, fields(model = %self.options.model, prompt_chars = prompt.len()))]
    async fn generate_content(
        &self,
        prompt: &str,
        temperature: f32,
        max_output_tokens: Option<u32>,
    ) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.options.base_url, self.options.model
        );

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens,
            },
        };

        debug!("sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.options.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| WebRagError::Network(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WebRagError::Network(format!("failed to read Gemini response: {e}")))?;

        if !status.is_success() {
            return Err(WebRagError::Generation(format!(
                "Gemini returned HTTP {status}: {}",
                body.chars().take(500).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| WebRagError::parse(format!("invalid Gemini response: {e}")))?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                tokens_in = usage.prompt_token_count,
                tokens_out = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        response_text(parsed)
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GenerateResponse) -> Result<String> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| part.thought != Some(true))
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(WebRagError::Generation(match block_reason {
            Some(reason) => format!("prompt blocked by model: {reason}"),
            None => "model returned no text".into(),
        }));
    }

    Ok(text)
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn rewrite(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt, REWRITE_TEMPERATURE, Some(REWRITE_MAX_OUTPUT_TOKENS))
            .await
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt, self.options.temperature, None)
            .await
    }
}
