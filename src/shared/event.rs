/**
 * Real-time Event System
 *
 * Named events exchanged over the realtime channel. The server owns the
 * event names and payloads; the constants below mirror the deployment.
 */
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::SharedError;
use super::message::ChatMessage;
use super::user::User;

/// Client → server: announces the connected user
pub const SETUP_EVENT: &str = "setup";
/// Server → client: acknowledges `setup`
pub const CONNECTED_EVENT: &str = "connected";
/// Server → client: a message was delivered
pub const MESSAGE_RECEIVED_EVENT: &str = "message received";
/// Server → client: ids of users currently online
pub const PRESENCE_EVENT: &str = "online users";

/// Kind of a realtime event, used for logging and filtering
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Connected,
    Message,
    Presence,
    Custom,
}

/// Inbound event decoded from the channel
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// The server accepted `setup`
    Connected,
    /// A new chat message
    MessageReceived(ChatMessage),
    /// Users currently online
    Presence(Vec<String>),
    /// Any event this client does not interpret
    Other { name: String, data: Vec<Value> },
}

impl RealtimeEvent {
    /// Decode a named event and its arguments.
    ///
    /// Unknown names are passed through as `Other`; a known name with a
    /// malformed payload is an error.
    pub fn decode(name: &str, mut data: Vec<Value>) -> Result<Self, SharedError> {
        match name {
            CONNECTED_EVENT => Ok(RealtimeEvent::Connected),
            MESSAGE_RECEIVED_EVENT => {
                let payload = first_arg(name, &mut data)?;
                Ok(RealtimeEvent::MessageReceived(serde_json::from_value(payload)?))
            }
            PRESENCE_EVENT => {
                let payload = first_arg(name, &mut data)?;
                Ok(RealtimeEvent::Presence(serde_json::from_value(payload)?))
            }
            _ => Ok(RealtimeEvent::Other {
                name: name.to_string(),
                data,
            }),
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            RealtimeEvent::Connected => EventType::Connected,
            RealtimeEvent::MessageReceived(_) => EventType::Message,
            RealtimeEvent::Presence(_) => EventType::Presence,
            RealtimeEvent::Other { .. } => EventType::Custom,
        }
    }
}

fn first_arg(name: &str, data: &mut Vec<Value>) -> Result<Value, SharedError> {
    if data.is_empty() {
        return Err(SharedError::validation(name, "event carries no payload"));
    }
    Ok(data.swap_remove(0))
}

/// Payload of the `setup` announcement
pub fn setup_payload(user: &User) -> Result<Value, SharedError> {
    Ok(serde_json::to_value(user)?)
}
