//! Error types for dzm-shorts
//!
//! The feed engine separates failures by who has to care about them:
//! - `FetchError`: feed or category fetch failed; recoverable, shown to the viewer
//! - `TrackingFlushError`: a view report was not delivered; logged only
//! - `Error`: setup failures (configuration, HTTP client construction)
//!
//! An empty feed is not an error at all; the session reports it as a
//! display state (see `session::FeedStatus::Empty`).

use thiserror::Error;

/// Feed or category fetch failure
///
/// Never escapes the session controller: it is turned into a
/// `FetchFailed` event and the feed stays on its last good state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("Catalog returned HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// Envelope with `success: false`
    #[error("Catalog rejected request ({code}): {message}")]
    Rejected { code: String, message: String },

    /// Body did not match the expected envelope
    #[error("Malformed catalog response: {0}")]
    Parse(String),
}

/// View report delivery failure
///
/// Logged by the reporter; never surfaced, never retried inline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingFlushError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Catalog returned HTTP {0}")]
    Server(u16),

    /// The viewer is not signed in, so there is nobody to attribute the view to
    #[error("No session token configured")]
    Unauthenticated,
}

/// Setup errors for dzm-shorts
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or resolution failed
    #[error("Configuration error: {0}")]
    Config(#[from] dzm_common::Error),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Convenience Result type using dzm-shorts Error
pub type Result<T> = std::result::Result<T, Error>;
