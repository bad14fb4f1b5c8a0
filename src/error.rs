//! Error types for WhatsApp Assist.

use std::time::Duration;

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Cache store errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to connect to cache at {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("Cache command failed: {0}")]
    Command(String),
}

/// Messaging relay errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Pipeline errors that fail the inbound request.
///
/// Only the persistence leg can fail a request; model and delivery failures
/// are absorbed inside the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Conversation state unavailable: {0}")]
    Persistence(#[from] DatabaseError),
}
