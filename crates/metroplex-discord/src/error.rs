//! Error types for metroplex-discord

use thiserror::Error;

/// Adapter error type
#[derive(Debug, Error)]
pub enum Error {
    /// Gateway client construction or startup failed
    #[error("discord client error: {0}")]
    Client(String),

    /// Orchestrator error
    #[error(transparent)]
    Core(#[from] metroplex_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
