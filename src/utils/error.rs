//! Error types for the playlist checker
//!
//! This module defines the domain errors raised while reading playlists and
//! probing stream locations.

use thiserror::Error;

/// Errors that can occur while probing a single candidate location
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The location could not be parsed as a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL scheme has no liveness check
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The attempt did not finish within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Connection could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Server answered with a status that does not count as reachable
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// Any other transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The owning group no longer needs this probe
    #[error("Probe cancelled")]
    Cancelled,
}

impl ProbeError {
    /// Whether another attempt could change the verdict
    ///
    /// `retry_client_errors` controls 4xx statuses other than 408 and 429,
    /// which are always retried.
    pub fn is_retryable(&self, retry_client_errors: bool) -> bool {
        match self {
            Self::InvalidUrl(_) | Self::UnsupportedScheme(_) | Self::Cancelled => false,
            Self::Timeout | Self::Connect(_) | Self::Http(_) => true,
            Self::Status(code) => match code {
                408 | 429 => true,
                400..=499 => retry_client_errors,
                _ => true,
            },
        }
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::UnsupportedScheme(_) => "unsupported_scheme",
            Self::Timeout => "timeout",
            Self::Connect(_) => "connect",
            Self::Status(_) => "status",
            Self::Http(_) => "http",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Errors raised while reading playlist files
#[derive(Error, Debug)]
pub enum PlaylistError {
    /// No playlist files were found at the given path
    #[error("No M3U files found in '{0}'")]
    NoPlaylists(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_location_is_final() {
        assert!(!ProbeError::InvalidUrl("::".into()).is_retryable(true));
        assert!(!ProbeError::UnsupportedScheme("udp".into()).is_retryable(true));
    }

    #[test]
    fn test_status_retry_classes() {
        assert!(ProbeError::Status(503).is_retryable(false));
        assert!(ProbeError::Status(429).is_retryable(false));
        assert!(ProbeError::Status(408).is_retryable(false));
        assert!(!ProbeError::Status(404).is_retryable(false));
        assert!(ProbeError::Status(404).is_retryable(true));
        assert!(ProbeError::Timeout.is_retryable(false));
    }
}
