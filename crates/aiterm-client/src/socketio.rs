//! Minimal Socket.IO v5 / Engine.IO v4 text framing.
//!
//! Only the default namespace and text packets are supported; binary
//! attachments are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake (`0{...}`).
    Open(OpenPayload),
    /// Engine.IO close (`1`).
    Close,
    Ping,
    Pong,
    /// Socket.IO namespace connected (`40`).
    Connect { sid: Option<String> },
    /// Socket.IO namespace disconnected by the server (`41`).
    Disconnect,
    Event {
        name: String,
        payload: Value,
        ack_id: Option<u64>,
    },
    /// Socket.IO connect refused (`44{message}`).
    ConnectError(String),
    Noop,
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("unknown packet type '{0}'")]
    UnknownType(char),

    #[error("unsupported packet: {0}")]
    Unsupported(&'static str),

    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("invalid JSON in packet: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn decode(frame: &str) -> Result<Packet, FrameError> {
    let mut chars = frame.chars();
    let engine_type = chars.next().ok_or(FrameError::Empty)?;
    let rest = chars.as_str();
    match engine_type {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket_packet(rest),
        '5' => Err(FrameError::Unsupported("transport upgrade")),
        '6' => Ok(Packet::Noop),
        other => Err(FrameError::UnknownType(other)),
    }
}

fn decode_socket_packet(body: &str) -> Result<Packet, FrameError> {
    let mut chars = body.chars();
    let socket_type = chars.next().ok_or(FrameError::Empty)?;
    let rest = strip_namespace(chars.as_str());
    match socket_type {
        '0' => {
            let sid = if rest.is_empty() {
                None
            } else {
                let v: Value = serde_json::from_str(rest)?;
                v.get("sid").and_then(Value::as_str).map(str::to_string)
            };
            Ok(Packet::Connect { sid })
        }
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(rest),
        '3' => Ok(Packet::Noop),
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or_else(|| v.as_str().map(str::to_string))
                })
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(message))
        }
        '5' | '6' => Err(FrameError::Unsupported("binary attachments")),
        other => Err(FrameError::UnknownType(other)),
    }
}

// "/admin,..." -> "..."; the default namespace carries no prefix.
fn strip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        rest.split_once(',').map(|(_, tail)| tail).unwrap_or("")
    } else {
        rest
    }
}

fn decode_event(rest: &str) -> Result<Packet, FrameError> {
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    let (ack, json) = rest.split_at(digits);
    let ack_id = if ack.is_empty() {
        None
    } else {
        Some(
            ack.parse::<u64>()
                .map_err(|e| FrameError::Malformed(e.to_string()))?,
        )
    };

    let mut args = match serde_json::from_str::<Value>(json)? {
        Value::Array(args) => args.into_iter(),
        _ => return Err(FrameError::Malformed("event body is not an array".into())),
    };
    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => return Err(FrameError::Malformed("event name missing".into())),
    };
    let payload = args
        .next()
        .unwrap_or_else(|| Value::Object(Default::default()));

    Ok(Packet::Event {
        name,
        payload,
        ack_id,
    })
}

pub fn encode_connect() -> String {
    "40".to_string()
}

pub fn encode_pong() -> String {
    "3".to_string()
}

pub fn encode_event<T: Serialize>(name: &str, payload: &T) -> Result<String, serde_json::Error> {
    let body = serde_json::to_string(&(name, payload))?;
    Ok(format!("42{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_engine_handshake() {
        let packet = decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#)
            .unwrap();
        assert_eq!(
            packet,
            Packet::Open(OpenPayload {
                sid: "abc".into(),
                ping_interval: 25000,
                ping_timeout: 20000,
            })
        );
    }

    #[test]
    fn decodes_namespace_connect_with_and_without_sid() {
        assert_eq!(decode("40").unwrap(), Packet::Connect { sid: None });
        assert_eq!(
            decode(r#"40{"sid":"xyz"}"#).unwrap(),
            Packet::Connect {
                sid: Some("xyz".into())
            }
        );
    }

    #[test]
    fn decodes_event_with_payload() {
        let packet =
            decode(r#"42["connected",{"status":"connected","current_directory":"/srv"}]"#).unwrap();
        match packet {
            Packet::Event {
                name,
                payload,
                ack_id,
            } => {
                assert_eq!(name, "connected");
                assert_eq!(payload["current_directory"], "/srv");
                assert_eq!(ack_id, None);
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn decodes_event_with_ack_and_namespace() {
        let packet = decode(r#"42/term,7["command_result"]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Event {
                name: "command_result".into(),
                payload: json!({}),
                ack_id: Some(7),
            }
        );
    }

    #[test]
    fn heartbeat_and_close_frames() {
        assert_eq!(decode("2").unwrap(), Packet::Ping);
        assert_eq!(decode("1").unwrap(), Packet::Close);
        assert_eq!(decode("41").unwrap(), Packet::Disconnect);
        assert_eq!(decode("6").unwrap(), Packet::Noop);
    }

    #[test]
    fn connect_error_extracts_message() {
        assert_eq!(
            decode(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::ConnectError("Not authorized".into())
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode(""), Err(FrameError::Empty)));
        assert!(matches!(decode("9"), Err(FrameError::UnknownType('9'))));
        assert!(matches!(decode("42{}"), Err(FrameError::Malformed(_))));
        assert!(matches!(decode("45[]"), Err(FrameError::Unsupported(_))));
    }

    #[test]
    fn encodes_outbound_event() {
        let frame = encode_event(
            "execute_command",
            &json!({"command": "list files", "is_voice": false}),
        )
        .unwrap();
        assert!(frame.starts_with(r#"42["execute_command",{"#));
        match decode(&frame).unwrap() {
            Packet::Event { name, payload, .. } => {
                assert_eq!(name, "execute_command");
                assert_eq!(payload["command"], "list files");
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }
}
