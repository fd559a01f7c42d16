// src/error.rs

//! Unified error handling for the job feed application.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for job feed operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Timed out waiting for the store's advisory file lock
    #[error("Timed out after {waited:?} acquiring store lock at {path}")]
    LockTimeout { path: String, waited: Duration },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream job search failed
    #[error("Search error for {context}: {message}")]
    Search { context: String, message: String },

    /// Exchange rate fetch failed
    #[error("FX error: {0}")]
    Fx(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a search error with context.
    pub fn search(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Search {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create an FX error.
    pub fn fx(message: impl Into<String>) -> Self {
        Self::Fx(message.into())
    }

    /// True when the error is storage contention rather than data loss.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}
