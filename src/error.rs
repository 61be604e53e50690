//! Error types for the typing engine.
//!
//! Nothing in the session loop surfaces these to the observer: invalid requests
//! become `Response::Ignored` and delivery failures become skipped characters.
//! They are returned by configuration loading, snapshot stores, session
//! construction and surface implementations.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CadenceError {
    /// A session could not be created from the given request.
    #[error("invalid session request: {0}")]
    InvalidRequest(String),

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing a configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// The surface has no implementation for the requested operation.
    #[error("surface does not support {0}")]
    UnsupportedOperation(&'static str),

    /// The surface rejected or failed to apply an input.
    #[error("surface error: {0}")]
    Surface(String),

    /// Snapshot persistence failed.
    #[error("snapshot store '{path}': {reason}")]
    Store { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CadenceError>;

impl CadenceError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn surface(message: impl Into<String>) -> Self {
        Self::Surface(message.into())
    }

    pub fn store(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Store {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
