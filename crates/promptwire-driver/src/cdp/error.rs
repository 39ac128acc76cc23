//! CDP transport error type.

use thiserror::Error;

/// Errors from the CDP transport layer.
///
/// Everything here converts to a structured `CommunicationError` at the
/// broker/orchestrator boundary; nothing escapes as an uncaught failure.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to establish the WebSocket connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Chrome is not reachable on the configured debugging endpoint.
    #[error("browser not available at {0}; start Chrome with --remote-debugging-port=9222")]
    BrowserNotAvailable(String),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Protocol-level error reply.
    #[error("protocol error: {message} (code {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error during endpoint discovery.
    #[error("http error: {0}")]
    Http(String),

    /// Script evaluation threw inside the page.
    #[error("script error: {0}")]
    Script(String),

    /// No reply within the transport deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The session's socket closed while a request was in flight.
    #[error("session closed")]
    SessionClosed,

    /// A reply arrived without the field the caller needed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}
