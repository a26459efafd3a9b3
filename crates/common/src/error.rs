//! Error types shared across Cinecut crates.

use std::path::PathBuf;

/// Top-level error type for Cinecut operations.
#[derive(Debug, thiserror::Error)]
pub enum CinecutError {
    #[error("Compile error: {message}")]
    Compile { message: String },

    #[error("Render engine unavailable: {message}")]
    EngineUnavailable { message: String },

    #[error("Engine invocation failed: {message}")]
    Invocation { message: String },

    #[error("Program validation failed: {message}")]
    Validation { message: String },

    #[error("Time arithmetic error: {message}")]
    Time { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CinecutError.
pub type CinecutResult<T> = Result<T, CinecutError>;

impl CinecutError {
    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile {
            message: msg.into(),
        }
    }

    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            message: msg.into(),
        }
    }

    pub fn invocation(msg: impl Into<String>) -> Self {
        Self::Invocation {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn time(msg: impl Into<String>) -> Self {
        Self::Time {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
