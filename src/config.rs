//! Environment configuration
//!
//! Everything is read from the process environment (after loading `.env`).
//! Missing provider keys are not fatal: the service falls back to the mock
//! model, the local embedder and the in-process store.

use crate::error::AdvisorError;
use crate::memory::ContextConfig;
use crate::Result;
use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_SERPER_BASE_URL: &str = "https://google.serper.dev";
const DEVELOPMENT_SECRET: &str = "development-secret";

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub google_api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub serper_api_key: Option<String>,
    pub serper_base_url: String,
    pub database_url: Option<String>,
    pub session_secret: String,
    pub port: u16,
    pub memory: ContextConfig,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            serper_api_key: None,
            serper_base_url: DEFAULT_SERPER_BASE_URL.to_string(),
            database_url: None,
            session_secret: DEVELOPMENT_SECRET.to_string(),
            port: DEFAULT_PORT,
            memory: ContextConfig::default(),
        }
    }
}

impl AdvisorConfig {
    /// Load `.env` (if present) and read the environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let session_secret = match first(&["SESSION_SECRET", "SECRET_KEY"]) {
            Some(secret) => secret,
            None => {
                warn!("SESSION_SECRET not set; using the development secret");
                defaults.session_secret
            }
        };

        let mut memory = defaults.memory;
        if let Some(v) = first(&["MEMORY_RECENT_WINDOW"]) {
            memory.recent_window = parse_value("MEMORY_RECENT_WINDOW", &v)?;
        }
        if let Some(v) = first(&["MEMORY_RECALL_LIMIT"]) {
            memory.recall_limit = parse_value("MEMORY_RECALL_LIMIT", &v)?;
        }
        if let Some(v) = first(&["MEMORY_MIN_SIMILARITY"]) {
            memory.min_similarity = parse_value("MEMORY_MIN_SIMILARITY", &v)?;
        }

        let port = match first(&["PORT", "API_PORT"]) {
            Some(v) => parse_value("PORT", &v)?,
            None => defaults.port,
        };

        Ok(Self {
            google_api_key: first(&["GOOGLE_API_KEY", "GEMINI_API_KEY"])
                .filter(|k| k != "your_gemini_api_key_here"),
            chat_model: first(&["GEMINI_MODEL"]).unwrap_or(defaults.chat_model),
            embedding_model: first(&["GEMINI_EMBEDDING_MODEL"])
                .unwrap_or(defaults.embedding_model),
            serper_api_key: first(&["SERPER_API_KEY"]),
            serper_base_url: first(&["SERPER_BASE_URL"])
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.serper_base_url),
            database_url: first(&["DATABASE_URL", "POSTGRES_URL", "SUPABASE_DB_URL"]),
            session_secret,
            port,
            memory,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| {
        AdvisorError::ConfigError(format!("{} has an invalid value: '{}'", key, raw))
    })
}
