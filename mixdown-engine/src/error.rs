//! Error types for the mixdown engine
//!
//! Two families matter here: configuration errors are rejected before any
//! rendering starts (the whole job fails fast, no partial output), and
//! resource errors (fetch, decode) are fatal for the job they occur in.
//! Degraded analysis data is never an error; the planner falls back to
//! documented defaults instead.

use thiserror::Error;

/// Main error type for the mixdown engine
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed job or plan, rejected before rendering starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio decoding errors (fatal for the job)
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio encoding errors
    #[error("Audio encode error: {0}")]
    Encode(String),

    /// Storage fetch failure (fatal for the job)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Render-time failure
    #[error("Render error: {0}")]
    Render(String),

    /// Job was cancelled cooperatively; a terminal state, not a failure
    #[error("Render cancelled")]
    Cancelled,

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the common crate
    #[error(transparent)]
    Common(#[from] mixdown_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
