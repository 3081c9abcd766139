//! Runtime error types.

use gantry_core::SerializationError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop the serve loop.
///
/// Per-event failures never show up here: they are answered with a response.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reading events or writing responses failed.
    #[error("Event source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be encoded for the wire.
    #[error("Failed to encode response: {0}")]
    Encode(#[from] SerializationError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
