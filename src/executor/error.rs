use thiserror::Error;

/// Typed failure recorded on a cache entry.
///
/// Errors are data: they are stored on the entry and inspected through the
/// `Rejected` status, never thrown across the subscribe boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Parse(String),

    #[error("unauthorized - token missing or expired")]
    Unauthorized,
}

/// Maximum length for error response bodies kept on a cache entry
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl FetchError {
    /// Truncate a response body to avoid retaining excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Classify a non-success HTTP status.
    ///
    /// 401 and 403 surface as `Unauthorized` so consumers can redirect to
    /// login instead of pattern-matching on status codes.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => FetchError::Unauthorized,
            _ => FetchError::Http {
                status,
                body: Self::truncate_body(body),
            },
        }
    }
}
