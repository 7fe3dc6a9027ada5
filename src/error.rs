//! Error types for the boardroom consultation engine

use crate::roles::Role;
use thiserror::Error;

/// Result type alias for boardroom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the boardroom consultation engine
#[derive(Debug, Error)]
pub enum Error {
    /// Turn generation failed (provider error, malformed output)
    #[error("generation failed for {role}: {message}")]
    Generation { role: Role, message: String },

    /// Turn generation exceeded its per-invocation deadline
    #[error("generation timed out for {role} after {seconds}s")]
    GenerationTimeout { role: Role, seconds: u64 },

    /// The same role failed generation on too many consecutive attempts
    #[error("{role} failed {attempts} consecutive generation attempts")]
    GeneratorExhausted { role: Role, attempts: u32 },

    /// Error from the OpenRouter API
    #[error("OpenRouter API error: {0}")]
    OpenRouter(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generation error
    pub fn generation(role: Role, message: impl Into<String>) -> Self {
        Self::Generation {
            role,
            message: message.into(),
        }
    }

    /// Create an OpenRouter error
    pub fn openrouter(msg: impl Into<String>) -> Self {
        Self::OpenRouter(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error is recoverable by skipping the turn and re-routing
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Generation { .. }
                | Error::GenerationTimeout { .. }
                | Error::OpenRouter(_)
                | Error::Http(_)
        )
    }
}
