//! Configuration types.
//!
//! Everything is read once at startup. Missing or malformed values are
//! startup-fatal; nothing here is re-read per request.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Trigger words that move a conversation into the leave application flow.
pub const DEFAULT_LEAVE_TRIGGER_WORDS: &[&str] = &["leave", "permission", "sick"];

/// Name the assistant introduces itself with.
pub const DEFAULT_ASSISTANT_NAME: &str = "ATB AI";

/// Where the persistent conversation state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Local SQLite-compatible file.
    Local(String),
    /// Remote libSQL server (Turso, sqld).
    Remote(String),
    /// Throwaway in-memory database.
    Memory,
}

impl DatabaseLocation {
    /// Parse a `DATABASE_URL` value.
    ///
    /// `libsql://` and `http(s)://` are remote, `:memory:` is in-memory, and
    /// `sqlite://` prefixes or bare paths are local files.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "DATABASE_URL".into(),
                message: "must not be empty".into(),
            });
        }
        if url == ":memory:" || url == "sqlite::memory:" {
            return Ok(Self::Memory);
        }
        if url.starts_with("libsql://") || url.starts_with("https://") || url.starts_with("http://")
        {
            return Ok(Self::Remote(url.to_string()));
        }
        if let Some(path) = url.strip_prefix("sqlite://") {
            // sqlite:///./test.db keeps its relative path
            let path = path.strip_prefix('/').filter(|p| p.starts_with('.')).unwrap_or(path);
            return Ok(Self::Local(path.to_string()));
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(ConfigError::InvalidValue {
                key: "DATABASE_URL".into(),
                message: format!(
                    "unsupported scheme {scheme}://; the conversation store is libSQL, \
so use a file path, sqlite://<path>, :memory:, or a libsql:// or https:// URL \
(PostgreSQL and MySQL URLs are not supported)"
                ),
            });
        }
        Ok(Self::Local(url.to_string()))
    }
}

/// Persistence settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub location: DatabaseLocation,
    /// Auth token for remote libSQL databases.
    pub auth_token: Option<SecretString>,
}

/// Cache store settings (last-message cache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: String,
    pub last_message_ttl: Duration,
}

/// Language-model service settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
}

/// Messaging relay settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub base_url: String,
    pub api_key: SecretString,
    /// Relay instance (session) that owns the sending number.
    pub instance: String,
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub llm: LlmConfig,
    pub relay: RelayConfig,
    pub server: ServerConfig,
    /// Timeout applied to every outbound HTTP call (model and relay).
    pub http_timeout: Duration,
    pub leave_trigger_words: Vec<String>,
    pub assistant_name: String,
}

impl AppConfig {
    /// Load configuration from `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };
        let optional = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database = DatabaseConfig {
            location: DatabaseLocation::parse(&required("DATABASE_URL")?)?,
            auth_token: optional("DATABASE_AUTH_TOKEN").map(SecretString::from),
        };

        let ttl_secs: u64 =
            parse_number("LAST_MESSAGE_TTL_SECS", optional("LAST_MESSAGE_TTL_SECS"), 86_400)?;
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LAST_MESSAGE_TTL_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }
        let cache = CacheConfig {
            url: required("REDIS_URL")?,
            last_message_ttl: Duration::from_secs(ttl_secs),
        };

        let llm = LlmConfig {
            base_url: trim_base_url(&required("LLM_BASE_URL")?),
            api_key: SecretString::from(required("LLM_API_KEY")?),
            model: required("LLM_MODEL")?,
        };

        let relay = RelayConfig {
            base_url: trim_base_url(&required("EVOLUTION_API_URL")?),
            api_key: SecretString::from(required("EVOLUTION_API_KEY")?),
            instance: required("EVOLUTION_INSTANCE")?,
        };

        let server = ServerConfig {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_number("PORT", optional("PORT"), 8000)?,
        };

        let timeout_secs: u64 = parse_number("HTTP_TIMEOUT_SECS", optional("HTTP_TIMEOUT_SECS"), 30)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HTTP_TIMEOUT_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }

        let leave_trigger_words = match optional("LEAVE_TRIGGER_WORDS") {
            Some(raw) => parse_word_list(&raw),
            None => DEFAULT_LEAVE_TRIGGER_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
        };
        if leave_trigger_words.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "LEAVE_TRIGGER_WORDS".into(),
                message: "must contain at least one word".into(),
            });
        }

        Ok(Self {
            database,
            cache,
            llm,
            relay,
            server,
            http_timeout: Duration::from_secs(timeout_secs),
            leave_trigger_words,
            assistant_name: optional("ASSISTANT_NAME")
                .unwrap_or_else(|| DEFAULT_ASSISTANT_NAME.to_string()),
        })
    }
}

fn parse_number<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value:?}: {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_word_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
