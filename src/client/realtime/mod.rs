//! Realtime Channel
//!
//! Keeps one Socket.IO connection alive for the logged-in user.
//!
//! # Architecture
//!
//! - **`frame`** - Engine.IO / Socket.IO text packet codec
//! - **`transport`** - `Connector` seam and the websocket implementation
//! - **`connection`** - per-identity connection task with reconnect backoff
//!
//! A supervisor task watches the session. When the authenticated identity
//! (user id plus token) changes it stops the current connection task, waits
//! for it to finish, and only then starts one for the new identity. Logging
//! out, shutting the channel down or dropping it closes the connection.
//!
//! Inbound events are decoded into `RealtimeEvent` and broadcast to every
//! subscriber. Failures are logged; chat keeps working over REST.

pub mod connection;
pub mod frame;
pub mod transport;

pub use connection::Backoff;
pub use transport::{Connector, FrameSink, FrameStream, Transport, WebSocketConnector};

use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use self::connection::ConnectionParams;
use self::frame::{Packet, SocketPacket};
use super::config::Config;
use super::error::ClientError;
use super::session::{Session, SessionHandle};
use crate::shared::RealtimeEvent;

/// How long a stopped connection gets to close before it is aborted
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(2);

const EVENT_BUFFER: usize = 256;

/// Connection state as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
        })
    }
}

/// State shared between the handle, the supervisor and the connection task
pub(crate) struct Shared {
    state: watch::Sender<ChannelState>,
    events: broadcast::Sender<RealtimeEvent>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    online: Mutex<Vec<String>>,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state,
            events,
            outbound: Mutex::new(None),
            online: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_state(&self, state: ChannelState) {
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    pub(crate) fn connected(&self, outbound: mpsc::UnboundedSender<String>) {
        *lock(&self.outbound) = Some(outbound);
        self.set_state(ChannelState::Connected);
    }

    pub(crate) fn disconnected(&self) {
        lock(&self.outbound).take();
        lock(&self.online).clear();
        self.set_state(ChannelState::Disconnected);
    }

    /// Decode an inbound event and hand it to subscribers
    pub(crate) fn dispatch(&self, name: &str, args: Vec<Value>) {
        let event = match RealtimeEvent::decode(name, args) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(event = name, error = %e, "dropping malformed event");
                return;
            }
        };
        tracing::debug!(event = name, kind = ?event.event_type(), "realtime event");

        if let RealtimeEvent::Presence(users) = &event {
            *lock(&self.online) = users.clone();
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The running connection for one identity
struct Live {
    identity: (String, String),
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Live {
    async fn teardown(self) {
        let Live {
            identity,
            stop,
            mut handle,
        } = self;
        tracing::info!(user_id = %identity.0, "closing realtime connection");

        let _ = stop.send(());
        if tokio::time::timeout(TEARDOWN_TIMEOUT, &mut handle).await.is_err() {
            tracing::warn!(user_id = %identity.0, "realtime connection did not close in time, aborting");
            handle.abort();
            let _ = handle.await;
        }
    }
}

/// Handle to the realtime channel. Dropping it closes the connection.
pub struct RealtimeChannel {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeChannel {
    /// Start the supervisor. Must be called inside a Tokio runtime.
    pub fn spawn(config: &Config, connector: Arc<dyn Connector>, session: &SessionHandle) -> Self {
        let shared = Arc::new(Shared::new());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let supervisor = tokio::spawn(supervise(
            shared.clone(),
            connector,
            config.clone(),
            session.subscribe(),
            shutdown_rx,
        ));

        Self {
            shared,
            shutdown,
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.shared.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Receive every inbound event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.shared.events.subscribe()
    }

    /// Users the server last reported online
    pub fn online_users(&self) -> Vec<String> {
        lock(&self.shared.online).clone()
    }

    /// Send a custom event to the server
    pub fn emit(&self, event: &str, data: Value) -> Result<(), ClientError> {
        let frame = frame::encode(&Packet::Message(SocketPacket::event(event, vec![data])));
        let outbound = lock(&self.shared.outbound);
        match outbound.as_ref() {
            Some(tx) => tx
                .send(frame)
                .map_err(|_| ClientError::channel("realtime connection closed")),
            None => Err(ClientError::channel("realtime channel not connected")),
        }
    }

    /// Close the connection and stop following the session
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let supervisor = lock(&self.supervisor).take();
        if let Some(handle) = supervisor {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "realtime supervisor ended abnormally");
            }
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn supervise(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    config: Config,
    mut session_rx: watch::Receiver<Session>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut live: Option<Live> = None;

    loop {
        let session = session_rx.borrow_and_update().clone();
        let wanted = session
            .identity()
            .map(|(user_id, token)| (user_id.to_string(), token.to_string()));

        if live.as_ref().map(|l| &l.identity) != wanted.as_ref() {
            if let Some(old) = live.take() {
                old.teardown().await;
                shared.disconnected();
            }
            if let (Session::Authenticated(auth), Some(identity)) = (session, wanted) {
                let (stop, stop_rx) = oneshot::channel();
                let params = ConnectionParams {
                    url: config.socket_url(),
                    auth,
                    handshake_timeout: config.request_timeout(),
                    backoff: config.reconnect_enabled().then(|| {
                        Backoff::new(config.reconnect_base_delay(), config.reconnect_max_delay())
                    }),
                };
                tracing::debug!(user_id = %identity.0, "starting realtime connection");
                let handle = tokio::spawn(connection::run(
                    shared.clone(),
                    connector.clone(),
                    params,
                    stop_rx,
                ));
                live = Some(Live {
                    identity,
                    stop,
                    handle,
                });
            }
        }

        tokio::select! {
            changed = session_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }

    if let Some(old) = live.take() {
        old.teardown().await;
    }
    shared.disconnected();
}
