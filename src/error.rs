//! Error types and handling for the bridge
//!
//! Both sides of the bridge speak `StreamError`: push-side failures become
//! the `Err` item that ends a pull stream, and pull-side failures become the
//! error signal of a push subscription.

/// Main error type for bridge operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// I/O related errors
    #[error("IO error: {0}")]
    IO(String),
    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
    /// Operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,
    /// The push source signalled an error
    #[error("Upstream error: {0}")]
    Upstream(String),
    /// A producer panicked while being driven by the bridge
    #[error("Producer panicked: {0}")]
    Panicked(String),
    /// Every producer went away without closing the channel
    #[error("Producer abandoned the stream without a terminal signal")]
    Abandoned,
    /// A subscriber requested a non-positive amount of items
    #[error("Invalid request amount: {0}")]
    InvalidRequest(u64),
    /// A single-result stream finished without a value
    #[error("Stream completed without producing an element")]
    NoElements,
    /// No task runtime was available to drive the bridge
    #[error("Runtime unavailable: {0}")]
    Runtime(String),
    /// Custom error with message
    #[error("Stream error: {0}")]
    Custom(String),
}

impl StreamError {
    /// Whether this failure is a cancellation rather than a genuine error.
    ///
    /// A deadline expiring counts as cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StreamError::Cancelled | StreamError::Timeout)
    }

    /// Build a `Panicked` error from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        StreamError::Panicked(message)
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::IO(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for StreamError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        StreamError::Timeout
    }
}

impl From<tokio::task::JoinError> for StreamError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            StreamError::Cancelled
        } else {
            match err.try_into_panic() {
                Ok(payload) => StreamError::from_panic(payload),
                Err(err) => StreamError::Custom(err.to_string()),
            }
        }
    }
}

/// Result type for bridge operations
pub type StreamResult<T> = Result<T, StreamError>;
