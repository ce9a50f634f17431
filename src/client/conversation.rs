/**
 * Conversation State
 *
 * Per-conversation message lists for the chat screen. History is fetched
 * through the gateway the first time a conversation is selected; live
 * messages arrive from the realtime channel through `receive`.
 *
 * Messages are kept sorted by `createdAt` (ties by id) and never appear
 * twice: every insert is deduplicated by message id, so a REST response and
 * the channel echo of the same message collapse into one entry.
 *
 * Messages received for a conversation that has not been fetched yet are
 * kept in a not-yet-loaded conversation and merged with the history once it
 * is fetched.
 */
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};

use super::error::ClientError;
use super::gateway::ApiClient;
use super::realtime::ChannelState;
use super::session::SessionHandle;
use crate::shared::{ChatMessage, ConversationKey, SendMessageRequest, SharedError};

const SEND_FALLBACK: &str = "Error sending message";
const FETCH_FALLBACK: &str = "Error fetching messages";

const UPDATE_BUFFER: usize = 64;

/// Messages of one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub key: ConversationKey,
    pub messages: Vec<ChatMessage>,
    /// Whether the history has been fetched
    pub loaded: bool,
}

impl Conversation {
    pub fn new(key: ConversationKey) -> Self {
        Self {
            key,
            messages: Vec::new(),
            loaded: false,
        }
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    /// Insert in display order. Returns `false` if the id is already present.
    pub fn insert(&mut self, message: ChatMessage) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        let position = self
            .messages
            .partition_point(|existing| existing.display_order(&message).is_lt());
        self.messages.insert(position, message);
        true
    }

    /// Merge fetched history with whatever is already here
    pub fn merge(&mut self, history: Vec<ChatMessage>) -> bool {
        let mut changed = false;
        for message in history {
            changed |= self.insert(message);
        }
        changed
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// Session epoch the contents belong to
    epoch: u64,
    conversations: HashMap<ConversationKey, Conversation>,
    selected: Option<ConversationKey>,
}

/// Message lists keyed by conversation
#[derive(Clone)]
pub struct ConversationStore {
    api: ApiClient,
    session: SessionHandle,
    channel_state: watch::Receiver<ChannelState>,
    inner: Arc<Mutex<Inner>>,
    updates: broadcast::Sender<ConversationKey>,
}

impl ConversationStore {
    pub fn new(
        api: ApiClient,
        session: SessionHandle,
        channel_state: watch::Receiver<ChannelState>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        let inner = Inner {
            epoch: session.epoch(),
            ..Inner::default()
        };
        Self {
            api,
            session,
            channel_state,
            inner: Arc::new(Mutex::new(inner)),
            updates,
        }
    }

    /// Keys of conversations whose messages changed
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationKey> {
        self.updates.subscribe()
    }

    /// Open a conversation and load its history if needed.
    pub async fn select(&self, key: ConversationKey) -> Result<Vec<ChatMessage>, ClientError> {
        tracing::debug!(conversation = %key, "selecting conversation");
        self.lock().selected = Some(key.clone());
        self.fetch_messages(&key).await
    }

    pub fn selected(&self) -> Option<ConversationKey> {
        self.lock().selected.clone()
    }

    pub fn selected_messages(&self) -> Vec<ChatMessage> {
        let inner = self.lock();
        inner
            .selected
            .as_ref()
            .and_then(|key| inner.conversations.get(key))
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// Snapshot of a conversation's messages, in display order
    pub fn messages(&self, key: &ConversationKey) -> Vec<ChatMessage> {
        self.lock()
            .conversations
            .get(key)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    pub fn is_loaded(&self, key: &ConversationKey) -> bool {
        self.lock()
            .conversations
            .get(key)
            .map(|c| c.loaded)
            .unwrap_or(false)
    }

    /// Load history unless the conversation already has it.
    pub async fn fetch_messages(&self, key: &ConversationKey) -> Result<Vec<ChatMessage>, ClientError> {
        if self.is_loaded(key) {
            return Ok(self.messages(key));
        }
        self.refresh_messages(key).await
    }

    /// Load history from the server even if it was loaded before.
    ///
    /// On failure nothing changes. A response that arrives after the user
    /// changed is discarded.
    pub async fn refresh_messages(&self, key: &ConversationKey) -> Result<Vec<ChatMessage>, ClientError> {
        let epoch = self.session.epoch();
        let path = match key.peer_id() {
            None => "/api/messages".to_string(),
            Some(peer_id) => format!("/api/messages/{}", peer_id),
        };

        let history: Vec<ChatMessage> = self.api.get(&path).await.map_err(|e| {
            tracing::warn!(conversation = %key, error = %e, "failed to fetch messages");
            e.or_message(FETCH_FALLBACK)
        })?;

        let count = history.len();
        let messages = {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                tracing::debug!(conversation = %key, "discarding history fetched for a previous session");
                return Ok(Vec::new());
            }
            let conversation = inner
                .conversations
                .entry(key.clone())
                .or_insert_with(|| Conversation::new(key.clone()));
            conversation.merge(history);
            conversation.loaded = true;
            conversation.messages.clone()
        };
        tracing::debug!(conversation = %key, fetched = count, total = messages.len(), "messages loaded");
        let _ = self.updates.send(key.clone());
        Ok(messages)
    }

    /// Post a message to a conversation.
    ///
    /// Blank content is rejected before any request. While the realtime
    /// channel is connected the message shows up through its echo; otherwise
    /// the server's response is appended directly.
    pub async fn send_message(&self, content: &str, key: &ConversationKey) -> Result<ChatMessage, ClientError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SharedError::validation("content", "Message cannot be empty").into());
        }

        let epoch = self.session.epoch();
        let request = SendMessageRequest::new(content, key);
        let message: ChatMessage = self.api.post("/api/messages", &request).await.map_err(|e| {
            tracing::warn!(conversation = %key, error = %e, "failed to send message");
            e.or_message(SEND_FALLBACK)
        })?;
        tracing::debug!(conversation = %key, message_id = %message.id, "message sent");

        if *self.channel_state.borrow() != ChannelState::Connected {
            self.append(epoch, key, message.clone());
        }
        Ok(message)
    }

    /// Record a message delivered by the realtime channel.
    ///
    /// Returns the conversation it was filed under, or `None` when nobody is
    /// logged in.
    pub fn receive(&self, message: ChatMessage) -> Option<ConversationKey> {
        let epoch = self.session.epoch();
        let viewer = self.session.user_id()?;
        let key = message.conversation_key_for(&viewer);
        self.append(epoch, &key, message);
        Some(key)
    }

    /// Forget every conversation.
    ///
    /// Happens on its own whenever the logged-in user changes.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.conversations.clear();
        inner.selected = None;
    }

    /// Insert unless the user changed since `epoch` was read
    fn append(&self, epoch: u64, key: &ConversationKey, message: ChatMessage) {
        let inserted = {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                tracing::debug!(message_id = %message.id, "dropping message for a previous session");
                return;
            }
            inner
                .conversations
                .entry(key.clone())
                .or_insert_with(|| Conversation::new(key.clone()))
                .insert(message)
        };
        if inserted {
            let _ = self.updates.send(key.clone());
        }
    }

    /// Lock the state, first dropping it if it belongs to an earlier session
    fn lock(&self) -> MutexGuard<'_, Inner> {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let epoch = self.session.epoch();
        if inner.epoch != epoch {
            tracing::debug!(from = inner.epoch, to = epoch, "session changed, dropping conversations");
            inner.conversations.clear();
            inner.selected = None;
            inner.epoch = epoch;
        }
        inner
    }
}
