//! Real-time channel payloads and connection bookkeeping.

use serde::{Deserialize, Serialize};

use crate::api::{ExecuteResponse, RemoteHistoryEntry};

/// Outbound `execute_command` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteCommandEvent {
    pub command: String,
    pub is_voice: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectedPayload {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_directory: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerErrorPayload {
    #[serde(default)]
    pub error: String,
}

/// Last transition observed by the event channel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting {
        attempt: u32,
    },
    GaveUp,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Reconnecting { .. } => "Reconnecting",
            ConnectionStatus::GaveUp => "Offline",
        }
    }
}

/// Event kinds a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Status,
    Connected,
    CommandResult,
    CommandExecuted,
    ServerError,
}

impl EventKind {
    /// Socket.IO event name, for kinds delivered by the server.
    pub fn wire_name(self) -> Option<&'static str> {
        match self {
            EventKind::Status => None,
            EventKind::Connected => Some("connected"),
            EventKind::CommandResult => Some("command_result"),
            EventKind::CommandExecuted => Some("command_executed"),
            EventKind::ServerError => Some("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Status(ConnectionStatus),
    Connected(ConnectedPayload),
    CommandResult(ExecuteResponse),
    CommandExecuted(RemoteHistoryEntry),
    ServerError(ServerErrorPayload),
}

impl ChannelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChannelEvent::Status(_) => EventKind::Status,
            ChannelEvent::Connected(_) => EventKind::Connected,
            ChannelEvent::CommandResult(_) => EventKind::CommandResult,
            ChannelEvent::CommandExecuted(_) => EventKind::CommandExecuted,
            ChannelEvent::ServerError(_) => EventKind::ServerError,
        }
    }

    /// Decode a named server event. Unknown names yield `Ok(None)`.
    pub fn from_wire(
        name: &str,
        payload: serde_json::Value,
    ) -> Result<Option<Self>, serde_json::Error> {
        let event = match name {
            "connected" => ChannelEvent::Connected(serde_json::from_value(payload)?),
            "command_result" => ChannelEvent::CommandResult(serde_json::from_value(payload)?),
            "command_executed" => ChannelEvent::CommandExecuted(serde_json::from_value(payload)?),
            "error" => ChannelEvent::ServerError(serde_json::from_value(payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
