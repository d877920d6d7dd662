//! Unified error type.

use thiserror::Error;

/// Boxed error raised by user code inside a middleware or handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout relay.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned by relay's fallible operations.
///
/// Every variant except [`Error::Middleware`] and [`Error::Body`] is a
/// contract violation: the stack is misconfigured or one of its components
/// misbehaved. The dispatcher never catches or retries them; they end the
/// current dispatch and reach the caller as-is.
#[derive(Debug, Error)]
pub enum Error {
    /// The dispatcher was given an unusable configuration (an empty stack).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A resolved stack entry is neither a middleware nor a function.
    #[error("unsupported middleware type: {type_name} ({value})")]
    UnsupportedMiddlewareType { type_name: String, value: String },

    /// A middleware returned something other than a response.
    #[error("unexpected middleware result: {given} returned by: {middleware}")]
    UnexpectedResult { given: String, middleware: String },

    /// Every middleware delegated to `next` and nothing produced a response.
    #[error("unresolved request: middleware stack exhausted with no result")]
    StackExhausted,

    /// Failure raised by a middleware or terminal handler.
    #[error("middleware failed: {0}")]
    Middleware(#[source] BoxError),

    /// The request body could not be read at the hyper boundary.
    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),
}

impl Error {
    /// Wraps an application error raised from inside a middleware.
    ///
    /// ```rust
    /// use relay::Error;
    ///
    /// let err = Error::middleware("token expired");
    /// assert_eq!(err.to_string(), "middleware failed: token expired");
    /// ```
    pub fn middleware(err: impl Into<BoxError>) -> Self {
        Self::Middleware(err.into())
    }

    /// `true` for the variants that signal a misconfigured or misbehaving
    /// stack rather than an application failure.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_)
                | Self::UnsupportedMiddlewareType { .. }
                | Self::UnexpectedResult { .. }
                | Self::StackExhausted
        )
    }
}
