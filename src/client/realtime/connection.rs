//! One identity's connection task.
//!
//! Dials, runs the Engine.IO/Socket.IO handshake, announces the user with
//! `setup`, then pumps frames until it is stopped or the link drops. Dropped
//! links are redialed with exponential backoff while the task is alive.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::frame::{self, Handshake, Packet, SocketPacket};
use super::transport::{Connector, FrameSink, FrameStream, Transport};
use super::{ChannelState, Shared};
use crate::client::error::ClientError;
use crate::client::session::AuthenticatedSession;
use crate::shared::event::{setup_payload, SETUP_EVENT};

/// Exponential reconnect delay: `base * 2^attempt`, capped at `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1_u32 << attempt.min(16);
        self.base.saturating_mul(factor).min(self.max)
    }
}

pub(super) struct ConnectionParams {
    pub url: String,
    pub auth: AuthenticatedSession,
    pub handshake_timeout: Duration,
    pub backoff: Option<Backoff>,
}

enum Exit {
    /// Asked to stop
    Stopped,
    /// The server disconnected this socket on purpose
    ServerClosed,
    Failed { established: bool },
}

pub(super) async fn run(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    params: ConnectionParams,
    mut stop: oneshot::Receiver<()>,
) {
    let user_id = params.auth.user.id.clone();
    let mut attempt: u32 = 0;

    loop {
        shared.set_state(ChannelState::Connecting);
        let exit = connect_and_serve(&shared, connector.as_ref(), &params, &mut stop).await;
        shared.disconnected();

        let established = match exit {
            Exit::Stopped => break,
            Exit::ServerClosed => {
                tracing::info!(%user_id, "realtime channel closed by server");
                break;
            }
            Exit::Failed { established } => established,
        };

        let Some(backoff) = params.backoff else {
            tracing::info!(%user_id, "realtime channel down, reconnect disabled");
            break;
        };
        if established {
            attempt = 0;
        }
        let delay = backoff.delay(attempt);
        attempt = attempt.saturating_add(1);
        tracing::info!(
            %user_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "realtime reconnect scheduled"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut stop => break,
        }
    }
}

async fn connect_and_serve(
    shared: &Shared,
    connector: &dyn Connector,
    params: &ConnectionParams,
    stop: &mut oneshot::Receiver<()>,
) -> Exit {
    let user_id = params.auth.user.id.as_str();

    let dialed = tokio::select! {
        result = connector.connect(&params.url) => Some(result),
        _ = &mut *stop => None,
    };
    let Transport { mut sink, mut stream } = match dialed {
        None => return Exit::Stopped,
        Some(Ok(transport)) => transport,
        Some(Err(e)) => {
            tracing::warn!(user_id, url = %params.url, error = %e, "realtime connect failed");
            return Exit::Failed { established: false };
        }
    };

    let handshake_result = tokio::select! {
        result = tokio::time::timeout(params.handshake_timeout, handshake(&mut sink, &mut stream)) => Some(result),
        _ = &mut *stop => None,
    };
    let open = match handshake_result {
        None => {
            close(&mut sink, false).await;
            return Exit::Stopped;
        }
        Some(Ok(Ok(open))) => open,
        Some(Ok(Err(e))) => {
            tracing::warn!(user_id, error = %e, "realtime handshake failed");
            close(&mut sink, false).await;
            return Exit::Failed { established: false };
        }
        Some(Err(_)) => {
            tracing::warn!(user_id, "realtime handshake timed out");
            close(&mut sink, false).await;
            return Exit::Failed { established: false };
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    shared.connected(outbound_tx);
    tracing::info!(user_id, sid = %open.sid, "realtime channel connected");

    match setup_payload(&params.auth.user) {
        Ok(payload) => {
            let setup = Packet::Message(SocketPacket::event(SETUP_EVENT, vec![payload]));
            if let Err(e) = sink.send(frame::encode(&setup)).await {
                tracing::warn!(user_id, error = %e, "failed to send setup");
                return Exit::Failed { established: true };
            }
        }
        Err(e) => tracing::warn!(user_id, error = %e, "could not encode setup payload"),
    }

    let window = ping_window(&open);
    let mut deadline = Instant::now() + window;

    loop {
        tokio::select! {
            item = stream.next() => {
                let text = match item {
                    Some(Ok(text)) => text,
                    Some(Err(e)) => {
                        tracing::warn!(user_id, error = %e, "realtime read failed");
                        return Exit::Failed { established: true };
                    }
                    None => {
                        tracing::info!(user_id, "realtime connection closed");
                        return Exit::Failed { established: true };
                    }
                };
                deadline = Instant::now() + window;

                match frame::decode(&text) {
                    Ok(Packet::Ping(data)) => {
                        if let Err(e) = sink.send(frame::encode(&Packet::Pong(data))).await {
                            tracing::warn!(user_id, error = %e, "failed to answer ping");
                            return Exit::Failed { established: true };
                        }
                    }
                    Ok(Packet::Close) => return Exit::Failed { established: true },
                    Ok(Packet::Message(SocketPacket::Event { name, args, .. })) => {
                        shared.dispatch(&name, args);
                    }
                    Ok(Packet::Message(SocketPacket::Disconnect { .. })) => {
                        close(&mut sink, false).await;
                        return Exit::ServerClosed;
                    }
                    Ok(other) => tracing::trace!(?other, "ignoring packet"),
                    Err(e) => tracing::warn!(user_id, error = %e, "undecodable frame"),
                }
            }
            Some(outbound) = outbound_rx.recv() => {
                if let Err(e) = sink.send(outbound).await {
                    tracing::warn!(user_id, error = %e, "realtime write failed");
                    return Exit::Failed { established: true };
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                tracing::warn!(user_id, "no ping from server, dropping connection");
                close(&mut sink, false).await;
                return Exit::Failed { established: true };
            }
            _ = &mut *stop => {
                close(&mut sink, true).await;
                return Exit::Stopped;
            }
        }
    }
}

/// Wait for `open`, connect to the default namespace and wait for the ack.
async fn handshake(sink: &mut FrameSink, stream: &mut FrameStream) -> Result<Handshake, ClientError> {
    let open = match next_packet(stream).await? {
        Packet::Open(open) => open,
        other => {
            return Err(ClientError::channel(format!(
                "expected open packet, got {:?}",
                other
            )))
        }
    };

    sink.send(frame::encode(&Packet::Message(SocketPacket::connect())))
        .await?;

    loop {
        match next_packet(stream).await? {
            Packet::Message(SocketPacket::Connect { .. }) => return Ok(open),
            Packet::Message(SocketPacket::ConnectError { data, .. }) => {
                return Err(ClientError::channel(format!("connection refused: {}", data)))
            }
            Packet::Ping(data) => sink.send(frame::encode(&Packet::Pong(data))).await?,
            Packet::Close => return Err(ClientError::channel("closed during handshake")),
            other => tracing::trace!(?other, "ignoring packet during handshake"),
        }
    }
}

async fn next_packet(stream: &mut FrameStream) -> Result<Packet, ClientError> {
    loop {
        let text = match stream.next().await {
            Some(item) => item?,
            None => return Err(ClientError::channel("connection closed")),
        };
        match frame::decode(&text) {
            Ok(packet) => return Ok(packet),
            Err(e) => tracing::warn!(error = %e, frame = %text, "undecodable frame"),
        }
    }
}

/// Longest silence tolerated before the link is considered dead
const MAX_PING_WINDOW: Duration = Duration::from_secs(3600);

/// How long to wait for the next server ping, from the handshake values
fn ping_window(open: &Handshake) -> Duration {
    Duration::from_millis(open.ping_interval.saturating_add(open.ping_timeout)).min(MAX_PING_WINDOW)
}

async fn close(sink: &mut FrameSink, leave_namespace: bool) {
    if leave_namespace {
        let _ = sink
            .send(frame::encode(&Packet::Message(SocketPacket::disconnect())))
            .await;
    }
    let _ = sink.close().await;
}
