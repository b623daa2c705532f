use std::time::Duration;

use thiserror::Error;

use crate::socketio::FrameError;

pub const GENERIC_EXECUTE_FAILURE: &str = "Failed to execute command";

/// Coarse category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Client,
    Server,
    Parse,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Client => "server-4xx",
            ErrorKind::Server => "server-5xx",
            ErrorKind::Parse => "parse",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("request rejected ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("invalid response: {0}")]
    Parse(String),
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Network(_) => ErrorKind::Network,
            TransportError::Timeout(_) => ErrorKind::Timeout,
            TransportError::Client { .. } => ErrorKind::Client,
            TransportError::Server { .. } => ErrorKind::Server,
            TransportError::Parse(_) => ErrorKind::Parse,
        }
    }

    /// Build from a non-2xx status and the backend's `error` field, if any.
    pub fn from_status(status: u16, body_error: Option<String>) -> Self {
        let message = body_error
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Request failed with status code {status}"));
        if status >= 500 {
            TransportError::Server { status, message }
        } else {
            TransportError::Client { status, message }
        }
    }

    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else if err.is_decode() {
            TransportError::Parse(err.to_string())
        } else {
            TransportError::Network(err.without_url().to_string())
        }
    }

    /// Human-readable text for the transcript; never empty.
    pub fn user_message(&self) -> String {
        let msg = match self {
            TransportError::Network(detail) => {
                format!("Cannot reach the backend ({detail})")
            }
            TransportError::Timeout(after) => {
                format!("Request timed out after {}s", after.as_secs())
            }
            TransportError::Client { message, .. } | TransportError::Server { message, .. } => {
                message.clone()
            }
            TransportError::Parse(_) => "The backend sent an unreadable response".to_string(),
        };
        if msg.trim().is_empty() {
            GENERIC_EXECUTE_FAILURE.to_string()
        } else {
            msg
        }
    }
}

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("event channel is not connected")]
    NotConnected,

    #[error("event channel session closed")]
    Closed,

    #[error("no heartbeat from the server within {0:?}")]
    HeartbeatTimeout(std::time::Duration),

    #[error("server rejected the channel: {0}")]
    Rejected(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid channel configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL '{0}': {1}")]
    InvalidUrl(String, String),

    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_categorized() {
        assert_eq!(
            TransportError::from_status(404, None).kind(),
            ErrorKind::Client
        );
        assert_eq!(
            TransportError::from_status(503, None).kind(),
            ErrorKind::Server
        );
    }

    #[test]
    fn backend_error_field_becomes_message() {
        let err = TransportError::from_status(404, Some("File not found: adi.c".into()));
        assert_eq!(err.user_message(), "File not found: adi.c");

        let err = TransportError::from_status(500, Some("   ".into()));
        assert_eq!(err.user_message(), "Request failed with status code 500");
    }

    #[test]
    fn user_messages_are_never_empty() {
        let errors = [
            TransportError::Network(String::new()),
            TransportError::Timeout(Duration::from_secs(30)),
            TransportError::Parse(String::new()),
        ];
        for err in errors {
            assert!(!err.user_message().trim().is_empty(), "{err:?}");
        }
        assert_eq!(
            TransportError::Timeout(Duration::from_secs(30)).user_message(),
            "Request timed out after 30s"
        );
    }

    #[test]
    fn kind_labels_match_taxonomy() {
        assert_eq!(ErrorKind::Client.as_str(), "server-4xx");
        assert_eq!(ErrorKind::Server.as_str(), "server-5xx");
    }
}
