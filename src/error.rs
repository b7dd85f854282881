//! Unified error handling for the playcheck crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while keeping the
//! domain errors available where a caller needs the detail.
//!
//! Only run-level failures travel through [`Error`]: invalid configuration
//! and infrastructure problems such as unreadable inputs or an unwritable
//! output. Probe failures are absorbed by the engine and only show up in
//! run statistics.
//!
//! # Usage
//!
//! ```rust,ignore
//! use playcheck::error::{Error, ErrorCategory, ErrorClass};
//!
//! fn handle_error(err: Error) {
//!     if err.category() == ErrorCategory::Config {
//!         eprintln!("Fix the configuration: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::utils::error::{PlaylistError, ProbeError};

/// Common classification interface for all playcheck error types
pub trait ErrorClass: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, connect)
    Network,
    /// Playlist reading and decoding errors
    Parsing,
    /// Filesystem errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Worker task failures
    Runtime,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Runtime => "runtime",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the playcheck crate
#[derive(Error, Debug)]
pub enum Error {
    /// Probe errors surfaced outside the engine
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Playlist reading errors
    #[error("Playlist error: {0}")]
    Playlist(#[from] PlaylistError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TOML configuration file errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A worker task panicked or was aborted
    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ErrorClass for ProbeError {
    fn is_recoverable(&self) -> bool {
        self.is_retryable(true)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidUrl(_) | Self::UnsupportedScheme(_) => ErrorCategory::Config,
            Self::Cancelled => ErrorCategory::Runtime,
            _ => ErrorCategory::Network,
        }
    }
}

impl ErrorClass for PlaylistError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::NoPlaylists(_) => ErrorCategory::Storage,
        }
    }
}

impl ErrorClass for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Probe(e) => e.is_recoverable(),
            Self::Playlist(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Toml(_) => false,
            Self::Task(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Probe(e) => e.category(),
            Self::Playlist(e) => e.category(),
            Self::Io(_) => ErrorCategory::Storage,
            Self::Toml(_) => ErrorCategory::Config,
            Self::Task(_) => ErrorCategory::Runtime,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let probe_err = Error::Probe(ProbeError::Timeout);
        assert_eq!(probe_err.category(), ErrorCategory::Network);

        let playlist_err = Error::Playlist(PlaylistError::NoPlaylists("lists".into()));
        assert_eq!(playlist_err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::Probe(ProbeError::Timeout).is_recoverable());
        assert!(!Error::Probe(ProbeError::InvalidUrl("x".into())).is_recoverable());
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("workers must be greater than 0");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Config error: workers must be greater than 0");
    }

    #[test]
    fn test_other_error_with_source() {
        let io = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = Error::with_source("cannot write output", io);
        assert_eq!(err.category(), ErrorCategory::Other);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_conversion() {
        let unified: Error = PlaylistError::NoPlaylists("dir".into()).into();
        assert!(matches!(unified, Error::Playlist(_)));
        assert_eq!(unified.category(), ErrorCategory::Storage);
    }
}
