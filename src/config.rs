//! Explicit configuration for every collaborator
//!
//! Loaded once from the environment (after `.env`) and handed to each
//! client's constructor. Nothing reads credentials from the process
//! environment after startup.

use crate::error::AssistantError;
use crate::Result;
use sha2::{Digest, Sha256};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: String,
    pub base_url: String,
    pub search_depth: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.tavily.com".to_string(),
            search_depth: "basic".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuoteConfig {
    pub base_url: String,
    /// Page that hands out the session cookie the crumb is bound to
    pub cookie_url: String,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com".to_string(),
            cookie_url: "https://fc.yahoo.com".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub retry_attempts: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub quote: QuoteConfig,
    pub http: HttpConfig,
    pub db_file: PathBuf,
    pub session: String,
    pub api_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            quote: QuoteConfig::default(),
            http: HttpConfig::default(),
            db_file: PathBuf::from("financial_data.db"),
            session: "financial-analyst-user".to_string(),
            api_port: 8080,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and build the configuration from the environment
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; missing keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm = LlmConfig {
            api_key: get("OPENAI_API_KEY").unwrap_or_default(),
            base_url: get("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.llm.base_url),
            model: get("LLM_MODEL").unwrap_or(defaults.llm.model),
            temperature: parse_or(get("LLM_TEMPERATURE"), "LLM_TEMPERATURE", defaults.llm.temperature)?,
            max_tokens: parse_or(get("LLM_MAX_TOKENS"), "LLM_MAX_TOKENS", defaults.llm.max_tokens)?,
        };

        let search = SearchConfig {
            api_key: get("TAVILY_API_KEY").unwrap_or_default(),
            base_url: get("TAVILY_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.search.base_url),
            search_depth: get("TAVILY_SEARCH_DEPTH").unwrap_or(defaults.search.search_depth),
        };

        let quote = QuoteConfig {
            base_url: get("QUOTE_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.quote.base_url),
            cookie_url: get("QUOTE_COOKIE_URL").unwrap_or(defaults.quote.cookie_url),
        };

        let http = HttpConfig {
            timeout: Duration::from_secs(parse_or(
                get("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                defaults.http.timeout.as_secs(),
            )?),
            retry_attempts: parse_or(
                get("RETRY_ATTEMPTS"),
                "RETRY_ATTEMPTS",
                defaults.http.retry_attempts,
            )?,
        };

        let api_port = parse_or(
            get("PORT").or_else(|| get("API_PORT")),
            "PORT",
            defaults.api_port,
        )?;

        Ok(Self {
            llm,
            search,
            quote,
            http,
            db_file: get("DB_FILE").map(PathBuf::from).unwrap_or(defaults.db_file),
            session: get("SESSION_ID").unwrap_or(defaults.session),
            api_port,
        })
    }

    pub fn session_id(&self) -> Uuid {
        stable_uuid_from_string(&self.session)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            AssistantError::Configuration(format!("Invalid {} value: {}", key, raw))
        }),
        None => Ok(default),
    }
}

/// Deterministic UUID for a free-form session label
pub fn stable_uuid_from_string(input: &str) -> Uuid {
    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Accept a literal UUID, otherwise hash the label
pub fn parse_or_stable_uuid(value: Option<&str>, fallback_seed: &str) -> Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => stable_uuid_from_string(fallback_seed),
    }
}

/// Short fingerprint of a credential, safe to log
pub fn key_fingerprint(key: &str) -> String {
    if key.is_empty() {
        return "unset".to_string();
    }
    let hash = Sha256::digest(key.as_bytes());
    hex::encode(&hash[..4])
}
