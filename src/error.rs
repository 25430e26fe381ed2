//! Error types for Penstock.

use thiserror::Error;

/// Result type alias using Penstock's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The pipeline's data source has already been consumed.
    ///
    /// A pipeline runs at most once: the first terminal operation (or
    /// pull-adapter wrap) takes the source cursor out of the head, and any
    /// later attempt fails with this error.
    #[error("pipeline source already consumed")]
    SourceConsumed,

    /// One or more close actions failed.
    ///
    /// Every registered action runs exactly once regardless of earlier
    /// failures; the first failure is carried here and any later failures
    /// are kept as `suppressed`.
    #[error("close action failed: {source}")]
    Close {
        /// The first failure encountered, in registration order.
        source: Box<Error>,
        /// Failures from actions that ran after the first failing one.
        suppressed: Vec<Error>,
    },

    /// Free-form failure, for user-supplied close actions.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Shorthand for a [`Error::Custom`] with the given message.
    pub fn custom(message: impl Into<String>) -> Self {
        Error::Custom(message.into())
    }
}
