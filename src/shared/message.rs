/**
 * Chat Message Data Structure
 *
 * Messages as the REST API and the realtime channel carry them, plus the
 * conversation key that selects the global channel or a direct chat.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identifies a conversation: the shared global channel or a direct chat with a peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationKey {
    #[default]
    Global,
    Peer(String),
}

impl ConversationKey {
    /// `None` selects the global channel, as the chat screen does
    pub fn from_peer(peer_id: Option<&str>) -> Self {
        match peer_id {
            Some(id) => ConversationKey::Peer(id.to_string()),
            None => ConversationKey::Global,
        }
    }

    pub fn peer_id(&self) -> Option<&str> {
        match self {
            ConversationKey::Global => None,
            ConversationKey::Peer(id) => Some(id),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, ConversationKey::Global)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationKey::Global => f.write_str("global"),
            ConversationKey::Peer(id) => write!(f, "peer:{}", id),
        }
    }
}

/// Author of a message, as embedded by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSender {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// A chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: MessageSender,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Recipient user id; `None` for the global channel
    #[serde(rename = "conversationKey", default)]
    pub recipient: Option<String>,
}

impl ChatMessage {
    pub fn sender_id(&self) -> &str {
        &self.sender.id
    }

    pub fn sender_name(&self) -> &str {
        &self.sender.name
    }

    /// The conversation this message belongs to from `viewer_id`'s point of view.
    ///
    /// A direct message is filed under the other party: the recipient when the
    /// viewer sent it, the sender otherwise.
    pub fn conversation_key_for(&self, viewer_id: &str) -> ConversationKey {
        match &self.recipient {
            None => ConversationKey::Global,
            Some(recipient) if self.sender.id == viewer_id => {
                ConversationKey::Peer(recipient.clone())
            }
            Some(_) => ConversationKey::Peer(self.sender.id.clone()),
        }
    }

    /// Display order: `createdAt`, then id to keep ties stable
    pub fn display_order(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }

    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender.id == user_id
    }
}

/// Body of `POST /api/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(rename = "conversationKey")]
    pub recipient: Option<String>,
}

impl SendMessageRequest {
    pub fn new(content: impl Into<String>, key: &ConversationKey) -> Self {
        Self {
            content: content.into(),
            recipient: key.peer_id().map(str::to_string),
        }
    }
}
