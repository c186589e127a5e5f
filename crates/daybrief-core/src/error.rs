//! Error taxonomy shared by every core component.
//!
//! Collaborator failures surface as one of four kinds (embedding, storage,
//! filter, model invocation). The retrieval pipeline propagates them as-is;
//! the analysis units convert [`Error::ModelInvocation`] into an error-shaped
//! [`AnalysisResult`](crate::models::AnalysisResult) instead.

use thiserror::Error;

/// Main error type for the core library.
#[derive(Error, Debug)]
pub enum Error {
    /// The embedding gateway failed or returned an unusable response.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The backing vector store could not be reached or rejected the operation.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A metadata filter was malformed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The completion gateway failed or returned an unusable response.
    #[error("model invocation error: {0}")]
    ModelInvocation(String),

    /// Chunker configuration that would never advance the window.
    #[error("invalid chunking configuration: {0}")]
    InvalidChunking(String),

    /// Caller-supplied arguments that cannot be processed (e.g. mismatched batch lengths).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The briefing state machine could not complete (step budget exhausted,
    /// a result slot left empty).
    #[error("workflow error: {0}")]
    Workflow(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a [`Error::StorageUnavailable`] from any displayable cause.
    pub fn storage(cause: impl std::fmt::Display) -> Self {
        Error::StorageUnavailable(cause.to_string())
    }

    /// Build a [`Error::Embedding`] from any displayable cause.
    pub fn embedding(cause: impl std::fmt::Display) -> Self {
        Error::Embedding(cause.to_string())
    }

    /// Build a [`Error::ModelInvocation`] from any displayable cause.
    pub fn model(cause: impl std::fmt::Display) -> Self {
        Error::ModelInvocation(cause.to_string())
    }
}
