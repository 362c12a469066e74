//! Error types shared by the pipeline, the router and handlers.
//!
//! # Design Decisions
//! - Anything that fails an exchange is a `DispatchError`; the dispatcher maps
//!   every variant to the same fixed 500 response
//! - Misuse of the registration API is a `RegistrationError`, surfaced before
//!   any exchange is processed

use thiserror::Error;

/// Failure that aborts the current exchange.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The transport failed while the payload was being accumulated.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] axum::Error),

    /// A response value could not be serialized.
    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A middleware or handler gave up.
    #[error("handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    /// Wrap an arbitrary error raised by application code.
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Handler(err.into())
    }
}

/// Invalid arguments passed to a registration call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("route pattern `{0}` must start with `/`")]
    InvalidPattern(String),

    #[error("mount prefix `{0}` must start with `/`")]
    InvalidPrefix(String),

    #[error("route pattern `{0}` contains a capture without a name")]
    EmptyCapture(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_from_str() {
        let err = DispatchError::handler("database unavailable");
        assert_eq!(err.to_string(), "handler failed: database unavailable");
    }

    #[test]
    fn test_registration_error_display() {
        let err = RegistrationError::InvalidPrefix("api".into());
        assert_eq!(err.to_string(), "mount prefix `api` must start with `/`");
    }
}
