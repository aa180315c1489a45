use crate::error::{AppError, Result};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

/// Browser identification sent with every page fetch.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Total budget for a single page fetch, body included (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 15;

/// Redirect hops followed before the fetch is abandoned.
pub const MAX_REDIRECTS: usize = 5;
/// Bodies are read up to this many bytes; the rest is dropped.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Total budget for one oracle round trip (seconds).
pub const ORACLE_TIMEOUT_SECS: u64 = 30;

/// Titles derived from pasted text are cut to this many characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Bound on the persisted raw input / error snapshot.
pub const MAX_RAW_INPUT_CHARS: usize = 5000;

/// Diagnostic markup excerpt kept when a known-site extraction comes up short.
pub const MARKUP_EXCERPT_CHARS: usize = 5000;

/// Diagnostic markup excerpt for pages matched by the generic profile.
pub const GENERIC_EXCERPT_CHARS: usize = 3000;

/// History paging.
pub const HISTORY_DEFAULT_LIMIT: i64 = 10;
pub const HISTORY_MAX_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Currency tag stored with every check (CURRENCY)
    pub currency: String,
    /// Presence of OPENAI_API_KEY switches the oracle from placeholder to model-backed.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "price_checks.db".to_string()),
            api_port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("PORT must be a valid port number".to_string()))?,
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| OPENAI_MODEL.to_string()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| OPENAI_BASE_URL.to_string()),
        })
    }
}
