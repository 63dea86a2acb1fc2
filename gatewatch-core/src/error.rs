use thiserror::Error;

/// Failures from the external aviation data provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("flight not found")]
    NotFound,
    #[error("unsupported provider: {0}")]
    Unsupported(String),
    #[error("upstream provider error: {0}")]
    Upstream(String),
}

/// Error taxonomy for the tracking and notification pipeline.
///
/// Not-found and validation errors are surfaced to the caller and never
/// retried. Provider errors are surfaced on synchronous paths and logged and
/// skipped on scheduler paths; the next tick is the de-facto retry. Store
/// errors abort only the operation (or scheduler iteration) that hit them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Error::Store(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
