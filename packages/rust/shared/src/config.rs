//! Application configuration for webrag.
//!
//! User config lives at `~/.webrag/webrag.toml`. Every section is optional;
//! missing values fall back to defaults. API keys are never stored in the
//! file, only the names of the environment variables that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WebRagError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "webrag.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".webrag";

/// Timeout for search provider requests.
const SEARCH_TIMEOUT_SECS: u64 = 15;

/// Browser-like identification sent with page fetches. Many sites refuse
/// obvious bot user agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching webrag.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Page fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Generative model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Conversation settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Search endpoint URL.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Number of results requested per query.
    #[serde(default = "default_num_results")]
    pub num_results: usize,

    /// Fixed search locale.
    #[serde(default = "default_location")]
    pub location: String,

    /// Google domain to query through.
    #[serde(default = "default_google_domain")]
    pub google_domain: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            endpoint: default_search_endpoint(),
            num_results: default_num_results(),
            location: default_location(),
            google_domain: default_google_domain(),
        }
    }
}

fn default_search_key_env() -> String {
    "SERPAPI_API_KEY".into()
}
fn default_search_endpoint() -> String {
    "https://serpapi.com/search".into()
}
fn default_num_results() -> usize {
    10
}
fn default_location() -> String {
    "United States".into()
}
fn default_google_domain() -> String {
    "google.com".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum characters kept from one page.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Maximum page fetches in flight for one question.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// User-Agent header sent with page fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_chars: default_max_chars(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}
fn default_max_chars() -> usize {
    10_000
}
fn default_concurrency() -> usize {
    4
}
fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name of the env var holding the model API key.
    #[serde(default = "default_model_key_env")]
    pub api_key_env: String,

    /// Base URL of the Gemini REST API.
    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    /// Model ID used for both query rewriting and answering.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for answers.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_model_key_env(),
            base_url: default_model_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

fn default_model_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_model_timeout_secs() -> u64 {
    120
}

/// `[session]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of exchanges remembered.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
        }
    }
}

fn default_history_cap() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Runtime options (derived from config, passed into constructors)
// ---------------------------------------------------------------------------

/// Runtime search options. The API key is resolved separately.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub api_key: String,
    pub endpoint: String,
    pub location: String,
    pub google_domain: String,
    pub timeout: Duration,
}

impl SearchOptions {
    /// Build options from the `[search]` section and a resolved key.
    pub fn from_config(config: &SearchConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: config.endpoint.clone(),
            location: config.location.clone(),
            google_domain: config.google_domain.clone(),
            timeout: Duration::from_secs(SEARCH_TIMEOUT_SECS),
        }
    }
}

/// Runtime page fetch options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_chars: usize,
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_chars: config.max_chars,
            concurrency: config.concurrency.max(1),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Runtime model options. The API key is resolved separately.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ModelOptions {
    /// Build options from the `[model]` section and a resolved key.
    pub fn from_config(config: &ModelConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Runtime conversation options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Maximum exchanges kept in history.
    pub history_cap: usize,
    /// Results requested from the search provider per question.
    pub num_results: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            history_cap: config.session.history_cap,
            num_results: config.search.num_results,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.webrag/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| WebRagError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.webrag/webrag.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| WebRagError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| WebRagError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WebRagError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| WebRagError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WebRagError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named environment variable.
pub fn resolve_api_key(var_name: &str, service: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(WebRagError::config(format!(
            "{service} API key not found. Set the {var_name} environment variable."
        ))),
    }
}
