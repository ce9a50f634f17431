//! Realtime transport
//!
//! The channel only speaks text frames. A `Connector` dials the server and
//! hands back a sink/stream pair of frames, so the connection state machine
//! can run over a real websocket or over in-memory pipes.

use async_trait::async_trait;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::client::error::ClientError;

/// Outbound half of a transport
pub type FrameSink = Pin<Box<dyn Sink<String, Error = ClientError> + Send>>;

/// Inbound half of a transport; ends when the peer closes
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

/// An open connection
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Transport {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Dials the realtime endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Transport, ClientError>;
}

/// WebSocket connector (tokio-tungstenite, rustls)
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Transport, ClientError> {
        let (ws_stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                ClientError::channel(format!("connect timed out after {:?}", self.connect_timeout))
            })?
            .map_err(|e| ClientError::channel(format!("connect failed: {}", e)))?;

        let (write_half, read_half) = ws_stream.split();

        let sink = write_half
            .sink_map_err(|e| ClientError::channel(e.to_string()))
            .with(|frame: String| future::ready(Ok::<_, ClientError>(Message::text(frame))));

        // Control frames are answered by tungstenite itself; only text matters here.
        let stream = read_half.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                Ok(_) => None,
                Err(e) => Some(Err(ClientError::channel(e.to_string()))),
            })
        });

        Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
    }
}
