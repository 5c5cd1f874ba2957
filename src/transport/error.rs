use reqwest::StatusCode;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: personal access token missing, expired or lacking scope")]
    Unauthorized,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Map a non-success status and its body onto an error.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound(body),
            StatusCode::BAD_REQUEST => Self::BadRequest(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(body),
            _ => Self::Server {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// Whether retrying the same call can reasonably succeed.
    ///
    /// Timeouts, connection failures, throttling and 5xx responses are
    /// transient; a missing entity or a rejected credential is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::RateLimited(_) => true,
            Self::Server { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::BadRequest(_) | Self::Unauthorized | Self::Decode(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses() {
        assert!(ClientError::from_status(StatusCode::NOT_FOUND, String::new()).is_not_found());
        assert!(matches!(
            ClientError::from_status(StatusCode::FORBIDDEN, String::new()),
            ClientError::Unauthorized
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_GATEWAY, "x".into()),
            ClientError::Server { status: 502, .. }
        ));
    }

    #[test]
    fn classifies_transient_errors() {
        assert!(ClientError::RateLimited(String::new()).is_transient());
        assert!(ClientError::Server { status: 503, body: String::new() }.is_transient());
        assert!(!ClientError::Server { status: 409, body: String::new() }.is_transient());
        assert!(!ClientError::NotFound(String::new()).is_transient());
        assert!(!ClientError::Unauthorized.is_transient());
    }
}
