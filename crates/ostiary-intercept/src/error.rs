use std::time::Duration;
use thiserror::Error;

/// Error type for the ostiary-intercept crate.
///
/// None of these escape the pipeline: every failure degrades to
/// "no interception" so the rendering engine falls back to its own
/// resource loading.
#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("authority reply timed out after {0:?}")]
    ReplyTimeout(Duration),

    #[error("authority reply channel closed without a reply")]
    ReplyAbandoned,

    #[error("http client initialization failed: {0}")]
    ClientInit(String),

    #[error("fetch failed: {0}")]
    Fetch(String),
}

/// Result type alias for ostiary-intercept operations.
pub type InterceptResult<T> = Result<T, InterceptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InterceptError::ReplyTimeout(Duration::from_secs(10));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(
            InterceptError::ReplyAbandoned.to_string(),
            "authority reply channel closed without a reply"
        );
        assert_eq!(
            InterceptError::Fetch("connection refused".to_string()).to_string(),
            "fetch failed: connection refused"
        );
    }
}
