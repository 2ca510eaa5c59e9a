//! Error taxonomy for the forum client.
//!
//! Not-found is never an error: entity getters return `Ok(None)` when the
//! underlying fetch is a 404 or an optional anchor is missing from the
//! fragment. Everything else maps onto one of the variants below, with the
//! underlying cause preserved for diagnostics.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Failure classes surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials or session rejected during `connect()`. Never rewrapped.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A structurally required anchor or attribute is missing from a
    /// fragment the server did return.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An entity operation was attempted without an active session.
    /// No I/O is performed.
    #[error("not connected: call connect() first")]
    NotConnected,

    /// Wrapped transport or unclassified failure, carrying the failed
    /// URL and status when available.
    #[error("request failed{}", request_context(.url, .status))]
    Operation {
        url: Option<String>,
        status: Option<u16>,
        #[source]
        source: anyhow::Error,
    },
}

impl ClientError {
    /// Wrap a transport-level failure with its request context.
    pub fn operation(
        url: Option<String>,
        status: Option<u16>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        ClientError::Operation {
            url,
            status,
            source: source.into(),
        }
    }
}

fn request_context(url: &Option<String>, status: &Option<u16>) -> String {
    match (url, status) {
        (Some(u), Some(s)) => format!(" ({u}: HTTP {s})"),
        (Some(u), None) => format!(" ({u})"),
        (None, Some(s)) => format!(" (HTTP {s})"),
        (None, None) => String::new(),
    }
}
