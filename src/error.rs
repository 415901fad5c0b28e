//! Error handling for the storefront client

use crate::validation::ValidationErrors;
use std::fmt;
use thiserror::Error;

/// Unified error type for the storefront client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Missing session or insufficient role
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Input rejected before it was sent
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Persisted store errors
    #[error("Store error: {0}")]
    Store(#[from] shopfront_stores::StoreError),

    /// Live channel errors
    #[error("Chat error: {0}")]
    Chat(#[from] shopfront_chat::ChatError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

/// How a failure should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network and API failures: a dismissible notification, never fatal.
    Transient,
    /// Rendered inline next to the offending fields.
    Validation,
    /// Redirect away instead of rendering an error.
    Authorization,
    /// Logged only.
    Channel,
    /// Programming or configuration mistakes.
    Internal,
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new unauthorized error
    pub fn unauthorized<T: fmt::Display>(msg: T) -> Self {
        Error::Unauthorized(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// A single-field validation error
    pub fn invalid(field: &str, message: &str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Error::Validation(errors)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(_) | Error::Api { .. } | Error::Json(_) => ErrorKind::Transient,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Unauthorized(_) => ErrorKind::Authorization,
            Error::Chat(_) => ErrorKind::Channel,
            Error::Url(_) | Error::Store(_) | Error::Config(_) | Error::General(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
