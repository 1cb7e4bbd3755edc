use thiserror::Error;

/// Errors from chunk and storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A chunk load was attempted while the owning storage has no file
    /// provider. Fatal to the call; carries the storage URL for
    /// diagnostics.
    #[error("no file provider available for storage '{url}'")]
    MissingProvider { url: String },

    /// Failure opening or reading the provider stream. Passed through
    /// unchanged; this layer neither wraps nor retries.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
