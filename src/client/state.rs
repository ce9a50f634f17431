//! Client Context
//!
//! Owns every client component and wires them together: the session handle
//! feeds the gateway, the realtime channel and the conversation store, and
//! channel events feed the conversation store.
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), teammatch::client::ClientError> {
//! use teammatch::client::{ClientContext, Config};
//!
//! let context = ClientContext::with_defaults(Config::load(None)?)?;
//! context.start().await?;
//! context.auth().login("a@x.com", "pw").await?;
//! context.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::config::Config;
use super::conversation::ConversationStore;
use super::error::ClientError;
use super::gateway::ApiClient;
use super::realtime::{Connector, RealtimeChannel, WebSocketConnector};
use super::search::Debounced;
use super::services::{Geocoder, MatchService, TeamService, UserService};
use super::session::{SessionHandle, SessionStore};
use super::storage::{FileTokenStore, MemoryTokenStore, TokenStore};
use crate::shared::{RealtimeEvent, User};

pub struct ClientContext {
    config: Config,
    session: SessionHandle,
    api: ApiClient,
    auth: SessionStore,
    channel: RealtimeChannel,
    conversations: ConversationStore,
    users: UserService,
    teams: TeamService,
    matches: MatchService,
    user_search: Debounced<UserService>,
    address_lookup: Debounced<Geocoder>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ClientContext {
    /// Build every component. Must be called inside a Tokio runtime.
    pub fn new(
        config: Config,
        storage: Arc<dyn TokenStore>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ClientError> {
        let session = SessionHandle::new();
        let api = ApiClient::new(config.clone(), session.clone())?;
        let auth = SessionStore::new(api.clone(), storage, session.clone());
        let channel = RealtimeChannel::spawn(&config, connector, &session);
        let conversations = ConversationStore::new(api.clone(), session.clone(), channel.state_changes());

        let users = UserService::new(api.clone());
        let user_search = Debounced::new(users.clone(), config.debounce());
        let address_lookup = Debounced::new(Geocoder::nominatim(config.request_timeout())?, config.debounce());

        Ok(Self {
            teams: TeamService::new(api.clone()),
            matches: MatchService::new(api.clone()),
            config,
            session,
            api,
            auth,
            channel,
            conversations,
            users,
            user_search,
            address_lookup,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Session file from the config and a websocket connector
    pub fn with_defaults(config: Config) -> Result<Self, ClientError> {
        let storage: Arc<dyn TokenStore> = match config.session_file() {
            Some(path) => Arc::new(FileTokenStore::new(path)),
            None => {
                tracing::warn!("no data directory, session will not persist");
                Arc::new(MemoryTokenStore::new())
            }
        };
        let connector = Arc::new(WebSocketConnector::new(config.request_timeout()));
        Self::new(config, storage, connector)
    }

    /// Start the background tasks and restore a persisted session.
    pub async fn start(&self) -> Result<Option<User>, ClientError> {
        {
            let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
            if tasks.is_empty() {
                tasks.push(self.spawn_inbound_pump());
            }
        }
        self.auth.restore_session().await
    }

    /// Close the realtime connection and stop the background tasks
    pub async fn shutdown(&self) {
        self.channel.shutdown().await;
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }
        tracing::debug!("client context shut down");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> &SessionStore {
        &self.auth
    }

    pub fn channel(&self) -> &RealtimeChannel {
        &self.channel
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn teams(&self) -> &TeamService {
        &self.teams
    }

    pub fn matches(&self) -> &MatchService {
        &self.matches
    }

    pub fn user_search(&self) -> &Debounced<UserService> {
        &self.user_search
    }

    pub fn address_lookup(&self) -> &Debounced<Geocoder> {
        &self.address_lookup
    }

    /// Channel messages into the conversation store
    fn spawn_inbound_pump(&self) -> JoinHandle<()> {
        let mut events = self.channel.subscribe();
        let conversations = self.conversations.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(RealtimeEvent::MessageReceived(message)) => {
                        let message_id = message.id.clone();
                        if let Some(key) = conversations.receive(message) {
                            tracing::debug!(%message_id, conversation = %key, "message received");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "inbound pump lagged, messages dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
