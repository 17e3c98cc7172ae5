//! Error types for the studio.

use std::time::Duration;

/// Maximum length of an upstream error message we keep.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while generating videos or moving credits.
#[derive(Debug, thiserror::Error)]
pub enum SeedanceError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized error message.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// Operation timed out (e.g., task polling).
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., persisting the gallery).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote API answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The remote task finished in a failed state.
    #[error("video generation failed: {0}")]
    VideoGeneration(String),

    /// The user does not hold enough credits for the operation.
    #[error("insufficient credits: {required} required, {available} available")]
    InsufficientCredits {
        /// Credits the operation needs.
        required: i64,
        /// Credits the user holds.
        available: i64,
    },

    /// A generation, task or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Credit ledger storage error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SeedanceError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Timeout(_) => Some(Duration::from_secs(1)),
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

/// Result type alias for studio operations.
pub type Result<T> = std::result::Result<T, SeedanceError>;

/// Cleans an upstream error body before it reaches logs or API clients.
///
/// Bearer tokens and `sk-` style keys are redacted and the message is
/// truncated to a bounded length on a char boundary.
pub fn sanitize_error_message(message: &str) -> String {
    let redacted: Vec<String> = message
        .trim()
        .split(' ')
        .scan(false, |after_bearer, word| {
            let out = if *after_bearer || word.starts_with("sk-") {
                "[REDACTED]".to_string()
            } else {
                word.to_string()
            };
            *after_bearer = word.eq_ignore_ascii_case("bearer");
            Some(out)
        })
        .collect();
    let joined = redacted.join(" ");

    if joined.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return joined;
    }
    let mut truncated: String = joined.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}

/// Reads an integral `Retry-After` header, in seconds.
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(SeedanceError::RateLimited { retry_after: None }.is_retryable());
        assert!(SeedanceError::Timeout(Duration::from_secs(30)).is_retryable());

        assert!(!SeedanceError::Auth("bad key".into()).is_retryable());
        assert!(!SeedanceError::ContentBlocked("nsfw".into()).is_retryable());
        assert!(!SeedanceError::InsufficientCredits {
            required: 10,
            available: 0
        }
        .is_retryable());
        assert!(!SeedanceError::Decode("bad base64".into()).is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let rate_limited = SeedanceError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(60)));

        let rate_limited_no_hint = SeedanceError::RateLimited { retry_after: None };
        assert_eq!(rate_limited_no_hint.retry_after(), None);

        let timeout = SeedanceError::Timeout(Duration::from_secs(30));
        assert_eq!(timeout.retry_after(), Some(Duration::from_secs(1)));

        let auth = SeedanceError::Auth("bad".into());
        assert_eq!(auth.retry_after(), None);
    }

    #[test]
    fn test_error_display() {
        let err = SeedanceError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = SeedanceError::InsufficientCredits {
            required: 15,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient credits: 15 required, 10 available"
        );
    }

    #[test]
    fn test_sanitize_redacts_tokens() {
        let msg = sanitize_error_message("  invalid header Bearer abc123 for key sk-live-999 ");
        assert_eq!(msg, "invalid header Bearer [REDACTED] for key [REDACTED]");
    }

    #[test]
    fn test_sanitize_truncates_long_messages() {
        let long = "é".repeat(MAX_ERROR_MESSAGE_LEN + 20);
        let msg = sanitize_error_message(&long);
        assert!(msg.ends_with("..."));
        assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(reqwest::header::RETRY_AFTER, "42".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(42));

        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
