//! Error types for scout-core operations.
//!
//! Discovery is best-effort: almost every failure described here is caught
//! by the orchestrator and degraded to "no data" for the one source that
//! failed. The variants still matter for the individual loaders, which are
//! public and can be used on their own.
//!
//! ## Error Categories
//!
//! - **Source unavailable**: robots.txt or a sitemap answered with a non-2xx status
//! - **Navigation**: a page failed to load in the browser within its timeout
//! - **Parse**: malformed sitemap XML or an unexpected script result
//! - **Network**: the HTTP client could not complete a request
//!
//! Robots or pattern exclusions are not errors. They are silent skips.
//!
//! ```rust
//! use scout_core::Error;
//!
//! let err = Error::SourceUnavailable {
//!     url: "https://example.com/robots.txt".to_string(),
//!     status: 503,
//! };
//! assert_eq!(err.category(), "source_unavailable");
//! assert!(err.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for scout-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A robots.txt or sitemap fetch returned a non-success status.
    #[error("Source unavailable: {url} returned HTTP {status}")]
    SourceUnavailable {
        /// URL that was requested.
        url: String,
        /// HTTP status code of the response.
        status: u16,
    },

    /// A browser navigation failed.
    #[error("Navigation to {url} failed: {reason}")]
    Navigation {
        /// URL the page was navigating to.
        url: String,
        /// Human readable failure reason.
        reason: String,
    },

    /// Content could not be parsed (sitemap XML, script results).
    #[error("Parse error: {0}")]
    Parse(String),

    /// HTTP client failure.
    ///
    /// Connection and timeout errors are recoverable, everything else is not.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL is malformed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A navigation exceeded its time budget.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The browser context rejected an operation.
    #[error("Browser error: {0}")]
    Browser(String),

    /// Configuration values are out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON conversion failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Check if the error might go away if the operation is retried.
    ///
    /// Timeouts, connection failures and 5xx/429 responses are considered
    /// transient. Parse, configuration and URL errors are permanent.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::SourceUnavailable { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout(_) | Self::Navigation { .. } => true,
            _ => false,
        }
    }

    /// Get the error category as a string identifier for structured logs.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::Navigation { .. } => "navigation",
            Self::Parse(_) => "parse",
            Self::Network(_) => "network",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Timeout(_) => "timeout",
            Self::Browser(_) => "browser",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
