//! Engine.IO v4 / Socket.IO v5 text frame codec
//!
//! Each websocket text frame carries one Engine.IO packet:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,..}   open
//! 2 / 3                                   ping / pong
//! 40                                      socket connect (default namespace)
//! 42["setup",{...}]                       socket event
//! 42/admin,7["event",1]                   event on a namespace with ack id 7
//! ```
//!
//! Binary attachments (Socket.IO types 5 and 6) are not used by the chat
//! server and are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("unknown packet type '{0}'")]
    UnknownType(char),
    #[error("unsupported packet type '{0}'")]
    Unsupported(char),
    #[error("malformed payload: {0}")]
    Payload(String),
}

/// Engine.IO handshake sent by the server on open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping(Option<String>),
    Pong(Option<String>),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet carried in an Engine.IO message
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Value,
    },
}

impl SocketPacket {
    /// Connect to the default namespace
    pub fn connect() -> Self {
        SocketPacket::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: None,
        }
    }

    pub fn disconnect() -> Self {
        SocketPacket::Disconnect {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Event on the default namespace without ack
    pub fn event(name: impl Into<String>, args: Vec<Value>) -> Self {
        SocketPacket::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack_id: None,
            name: name.into(),
            args,
        }
    }

    fn type_digit(&self) -> char {
        match self {
            SocketPacket::Connect { .. } => '0',
            SocketPacket::Disconnect { .. } => '1',
            SocketPacket::Event { .. } => '2',
            SocketPacket::Ack { .. } => '3',
            SocketPacket::ConnectError { .. } => '4',
        }
    }

    fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }
}

/// Encode one packet as a websocket text frame
pub fn encode(packet: &Packet) -> String {
    match packet {
        Packet::Open(handshake) => {
            // Handshake serialization cannot fail: plain strings and integers.
            format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
        }
        Packet::Close => "1".to_string(),
        Packet::Ping(data) => format!("2{}", data.as_deref().unwrap_or("")),
        Packet::Pong(data) => format!("3{}", data.as_deref().unwrap_or("")),
        Packet::Message(socket) => format!("4{}", encode_socket(socket)),
        Packet::Upgrade => "5".to_string(),
        Packet::Noop => "6".to_string(),
    }
}

fn encode_socket(packet: &SocketPacket) -> String {
    let mut out = String::new();
    out.push(packet.type_digit());
    if packet.namespace() != DEFAULT_NAMESPACE {
        out.push_str(packet.namespace());
        out.push(',');
    }
    match packet {
        SocketPacket::Connect { data, .. } => {
            if let Some(data) = data {
                out.push_str(&data.to_string());
            }
        }
        SocketPacket::Disconnect { .. } => {}
        SocketPacket::Event {
            ack_id, name, args, ..
        } => {
            if let Some(id) = ack_id {
                out.push_str(&id.to_string());
            }
            let mut array = Vec::with_capacity(args.len() + 1);
            array.push(Value::String(name.clone()));
            array.extend(args.iter().cloned());
            out.push_str(&Value::Array(array).to_string());
        }
        SocketPacket::Ack { ack_id, args, .. } => {
            out.push_str(&ack_id.to_string());
            out.push_str(&Value::Array(args.clone()).to_string());
        }
        SocketPacket::ConnectError { data, .. } => out.push_str(&data.to_string()),
    }
    out
}

/// Decode one websocket text frame
pub fn decode(frame: &str) -> Result<Packet, FrameError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(FrameError::Empty)?;
    let rest = chars.as_str();
    let data = || (!rest.is_empty()).then(|| rest.to_string());

    match kind {
        '0' => serde_json::from_str(rest)
            .map(Packet::Open)
            .map_err(|e| FrameError::Payload(e.to_string())),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping(data())),
        '3' => Ok(Packet::Pong(data())),
        '4' => decode_socket(rest).map(Packet::Message),
        '5' => Ok(Packet::Upgrade),
        '6' => Ok(Packet::Noop),
        other => Err(FrameError::UnknownType(other)),
    }
}

fn decode_socket(input: &str) -> Result<SocketPacket, FrameError> {
    let mut chars = input.chars();
    let kind = chars.next().ok_or(FrameError::Empty)?;
    let mut rest = chars.as_str();

    let namespace = if rest.starts_with('/') {
        match rest.find(',') {
            Some(end) => {
                let ns = &rest[..end];
                rest = &rest[end + 1..];
                ns.to_string()
            }
            None => {
                let ns = rest.to_string();
                rest = "";
                ns
            }
        }
    } else {
        DEFAULT_NAMESPACE.to_string()
    };

    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let ack_id = if digits > 0 {
        let id = rest[..digits]
            .parse::<u64>()
            .map_err(|e| FrameError::Payload(e.to_string()))?;
        rest = &rest[digits..];
        Some(id)
    } else {
        None
    };

    let json = || -> Result<Value, FrameError> {
        serde_json::from_str(rest).map_err(|e| FrameError::Payload(e.to_string()))
    };

    match kind {
        '0' => Ok(SocketPacket::Connect {
            namespace,
            data: if rest.is_empty() { None } else { Some(json()?) },
        }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let mut items = match json()? {
                Value::Array(items) => items.into_iter(),
                other => return Err(FrameError::Payload(format!("event is not an array: {}", other))),
            };
            let name = match items.next() {
                Some(Value::String(name)) => name,
                _ => return Err(FrameError::Payload("event name missing".to_string())),
            };
            Ok(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args: items.collect(),
            })
        }
        '3' => {
            let ack_id = ack_id.ok_or_else(|| FrameError::Payload("ack without id".to_string()))?;
            let args = match json()? {
                Value::Array(items) => items,
                other => vec![other],
            };
            Ok(SocketPacket::Ack {
                namespace,
                ack_id,
                args,
            })
        }
        '4' => Ok(SocketPacket::ConnectError {
            namespace,
            data: if rest.is_empty() { Value::Null } else { json()? },
        }),
        '5' | '6' => Err(FrameError::Unsupported(kind)),
        other => Err(FrameError::UnknownType(other)),
    }
}
