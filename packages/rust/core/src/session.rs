//! Conversation session: the end-to-end `ask` pipeline.
//!
//! question → rewrite → search → fetch → assemble → generate → history.
//!
//! Retrieval and rewrite failures degrade the answer but never fail it. Only a
//! failed final generation surfaces as an error, and then history is left
//! untouched.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use webrag_crawler::PageFetcher;
use webrag_search::SearchClient;
use webrag_shared::{
    AppConfig, Exchange, FetchOptions, ModelOptions, Result, SearchOptions, SessionId,
    SessionOptions, WebRagError, resolve_api_key,
};

use crate::assembler::build_prompt;
use crate::history::{History, PROMPT_HISTORY_LEN};
use crate::model::{GeminiModel, LanguageModel};
use crate::rewriter;

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per `ask`, whether it succeeded or not.
    fn done(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self) {}
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A conversation with bounded memory.
///
/// `ask` takes `&mut self`, so one question is fully answered before the next
/// can start.
pub struct Session {
    id: SessionId,
    options: SessionOptions,
    history: History,
    search: SearchClient,
    fetcher: PageFetcher,
    model: Arc<dyn LanguageModel>,
}

impl Session {
    /// Assemble a session from already-built collaborators.
    pub fn new(
        options: SessionOptions,
        search: SearchClient,
        fetcher: PageFetcher,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            history: History::new(options.history_cap),
            options,
            search,
            fetcher,
            model,
        }
    }

    /// Build a session with the SerpAPI client, the page fetcher, and Gemini,
    /// reading API keys from the environment variables the config names.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let search_key = resolve_api_key(&config.search.api_key_env, "Search")?;
        let model_key = resolve_api_key(&config.model.api_key_env, "Gemini")?;

        let search = SearchClient::new(SearchOptions::from_config(&config.search, search_key))?;
        let fetcher = PageFetcher::new(FetchOptions::from(&config.fetch))?;
        let model = GeminiModel::new(ModelOptions::from_config(&config.model, model_key))?;
        info!(model = model.model_id(), "language model ready");

        Ok(Self::new(
            SessionOptions::from(config),
            search,
            fetcher,
            Arc::new(model),
        ))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Forget every exchange.
    pub fn clear_history(&mut self) {
        self.history.clear();
        info!(session = %self.id, "history cleared");
    }

    /// Answer `query` using fresh web sources and recent history.
    pub async fn ask(&mut self, query: &str) -> Result<String> {
        self.ask_with_progress(query, &SilentProgress).await
    }

    /// [`Session::ask`] with progress callbacks.
    #[instrument(skip_all, fields(session = %self.id, query = %query))]
    pub async fn ask_with_progress(
        &mut self,
        query: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<String> {
        let result = self.run_pipeline(query, progress).await;
        progress.done();
        result
    }

    async fn run_pipeline(&mut self, query: &str, progress: &dyn ProgressReporter) -> Result<String> {
        if query.trim().is_empty() {
            return Err(WebRagError::validation("question must not be empty"));
        }

        let start = Instant::now();

        progress.phase("Understanding the question");
        let search_query = {
            let recent = self.history.recent(PROMPT_HISTORY_LEN);
            rewriter::rewrite(self.model.as_ref(), query, &recent).await
        };

        progress.phase("Searching the web");
        let urls = self.search.search(&search_query, self.options.num_results).await;

        progress.phase(&format!("Reading {} sources", urls.len()));
        let excerpts = self.fetcher.fetch_all(&urls).await;

        progress.phase("Writing the answer");
        let prompt = build_prompt(query, &self.history, &excerpts);
        let answer = self.model.generate(&prompt).await?;

        self.history.record(Exchange::new(query, answer.as_str()));

        info!(
            search_query = %search_query,
            results = urls.len(),
            sources = excerpts.len(),
            history = self.history.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "question answered"
        );

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::testing::ScriptedModel;

    fn session_for(server: &wiremock::MockServer, model: Arc<ScriptedModel>, cap: usize) -> Session {
        let search = SearchClient::new(SearchOptions {
            api_key: "serp-test-key".into(),
            endpoint: format!("{}/search", server.uri()),
            location: "United States".into(),
            google_domain: "google.com".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        let fetcher = PageFetcher::new(FetchOptions {
            timeout: Duration::from_millis(500),
            ..FetchOptions::default()
        })
        .unwrap();

        let options = SessionOptions {
            history_cap: cap,
            num_results: 10,
        };

        Session::new(options, search, fetcher, model)
    }

    async fn mount_search(server: &wiremock::MockServer, paths: &[&str]) {
        let results: Vec<serde_json::Value> = paths
            .iter()
            .map(|p| serde_json::json!({ "link": format!("{}{p}", server.uri()) }))
            .collect();

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/search"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "organic_results": results })),
            )
            .mount(server)
            .await;
    }

    async fn mount_page(server: &wiremock::MockServer, path: &str, text: &str) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(path))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(format!(
                "<html><body><article><p>{text}</p></article></body></html>"
            )))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn capital_of_france_end_to_end() {
        let server = wiremock::MockServer::start().await;
        mount_search(&server, &["/wiki/paris", "/guide/france"]).await;
        mount_page(&server, "/wiki/paris", "Paris is the capital of France.").await;
        mount_page(&server, "/guide/france", "France's capital city is Paris.").await;

        let model = Arc::new(
            ScriptedModel::new()
                .with_rewrite(Ok("capital of France".into()))
                .with_answer(Ok("The capital of France is Paris [[1]].".into())),
        );
        let mut session = session_for(&server, model.clone(), 10);

        let answer = session.ask("What is the capital of France?").await.unwrap();
        assert_eq!(answer, "The capital of France is Paris [[1]].");

        let prompt = model.last_answer_prompt();
        assert!(prompt.contains("No previous conversation"));
        assert!(prompt.contains("**New Question**: What is the capital of France?"));
        assert!(prompt.contains("[[Source 1]]\nURL: "));
        assert!(prompt.contains("Paris is the capital of France."));
        assert!(prompt.contains("[[Source 2]]"));

        let history: Vec<&Exchange> = session.history().iter().collect();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user(), "What is the capital of France?");
        assert_eq!(history[0].assistant(), "The capital of France is Paris [[1]].");
    }

    #[tokio::test]
    async fn searches_with_rewritten_query_but_answers_original() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/search"))
            .and(wiremock::matchers::query_param("q", "Paris population"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "organic_results": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let model = Arc::new(
            ScriptedModel::new()
                .with_answer(Ok("Paris.".into()))
                .with_rewrite(Err("rewrite unavailable".into()))
                .with_rewrite(Ok("\"Paris population\"".into())),
        );
        let mut session = session_for(&server, model.clone(), 10);

        // First question: rewrite fails, original query is searched (no mock match → no sources).
        session.ask("What is the capital of France?").await.unwrap();
        session.ask("How many people live there?").await.unwrap();

        let rewrite_prompts = model.rewrite_prompts();
        assert!(rewrite_prompts[1].contains("User: What is the capital of France?\nAssistant: Paris."));

        let prompt = model.last_answer_prompt();
        assert!(prompt.contains("**New Question**: How many people live there?"));
        assert!(!prompt.contains("Paris population"));
    }

    #[tokio::test]
    async fn history_is_capped_fifo() {
        let server = wiremock::MockServer::start().await;
        mount_search(&server, &[]).await;

        let model = Arc::new(ScriptedModel::new());
        let mut session = session_for(&server, model, 10);

        for i in 1..=11 {
            session.ask(&format!("question {i}")).await.unwrap();
        }

        let users: Vec<&str> = session.history().iter().map(Exchange::user).collect();
        assert_eq!(users.len(), 10);
        assert!(!users.contains(&"question 1"));
        assert_eq!(users.first(), Some(&"question 2"));
        assert_eq!(users.last(), Some(&"question 11"));
    }

    #[tokio::test]
    async fn clear_history_resets_prompt_context() {
        let server = wiremock::MockServer::start().await;
        mount_search(&server, &[]).await;

        let model = Arc::new(ScriptedModel::new());
        let mut session = session_for(&server, model.clone(), 10);

        session.ask("What is the capital of France?").await.unwrap();
        session.ask("How many people live there?").await.unwrap();
        assert!(!model.last_answer_prompt().contains("No previous conversation"));

        session.clear_history();
        assert!(session.history().is_empty());

        session.ask("What is the tallest mountain?").await.unwrap();
        let prompt = model.last_answer_prompt();
        assert!(prompt.starts_with("**Conversation Context**\nNo previous conversation\n"));
        assert!(!prompt.contains("capital of France"));
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn timed_out_page_is_excluded_from_prompt() {
        let server = wiremock::MockServer::start().await;
        mount_search(&server, &["/slow", "/fast"]).await;

        wiremock::Mock::given(wiremock::matchers::path("/slow"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<article><p>slow page text</p></article>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        mount_page(&server, "/fast", "fast page text").await;

        let model = Arc::new(ScriptedModel::new());
        let mut session = session_for(&server, model.clone(), 10);
        session.ask("anything").await.unwrap();

        let prompt = model.last_answer_prompt();
        assert!(!prompt.contains("slow page text"));
        assert!(!prompt.contains("/slow"));
        assert!(prompt.contains(&format!("[[Source 1]]\nURL: {}/fast\nfast page text", server.uri())));
        assert!(!prompt.contains("[[Source 2]]"));
    }

    #[tokio::test]
    async fn search_failure_still_answers_without_sources() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/search"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let model = Arc::new(ScriptedModel::new().with_answer(Ok("From memory: Paris.".into())));
        let mut session = session_for(&server, model.clone(), 10);

        let answer = session.ask("What is the capital of France?").await.unwrap();
        assert_eq!(answer, "From memory: Paris.");
        assert!(!model.last_answer_prompt().contains("[[Source"));
    }

    #[tokio::test]
    async fn generation_failure_propagates_and_keeps_history() {
        let server = wiremock::MockServer::start().await;
        mount_search(&server, &[]).await;

        let model = Arc::new(
            ScriptedModel::new()
                .with_answer(Ok("Paris.".into()))
                .with_answer(Err("model overloaded".into())),
        );
        let mut session = session_for(&server, model, 10);

        session.ask("What is the capital of France?").await.unwrap();
        let err = session.ask("How many people live there?").await.unwrap_err();

        assert!(matches!(err, WebRagError::Generation(_)));
        assert_eq!(session.history().len(), 1);
        let only = session.history().iter().next().unwrap();
        assert_eq!(only.user(), "What is the capital of France?");
    }

    #[tokio::test]
    async fn blank_question_is_rejected_without_model_calls() {
        let server = wiremock::MockServer::start().await;
        let model = Arc::new(ScriptedModel::new());
        let mut session = session_for(&server, model.clone(), 10);

        let err = session.ask("   ").await.unwrap_err();
        assert!(matches!(err, WebRagError::Validation { .. }));
        assert!(model.rewrite_prompts().is_empty());
        assert!(model.answer_prompts().is_empty());
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        done: Mutex<usize>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn done(&self) {
            *self.done.lock().unwrap() += 1;
        }
    }

    #[tokio::test]
    async fn progress_reports_phases_and_done_on_failure() {
        let server = wiremock::MockServer::start().await;
        mount_search(&server, &[]).await;

        let model = Arc::new(ScriptedModel::new().with_answer(Err("down".into())));
        let mut session = session_for(&server, model, 10);
        let progress = RecordingProgress::default();

        assert!(session.ask_with_progress("question", &progress).await.is_err());

        let phases = progress.phases.lock().unwrap().clone();
        assert_eq!(
            phases,
            vec![
                "Understanding the question",
                "Searching the web",
                "Reading 0 sources",
                "Writing the answer",
            ]
        );
        assert_eq!(*progress.done.lock().unwrap(), 1);
    }
}
