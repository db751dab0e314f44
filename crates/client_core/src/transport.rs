//! One WebSocket connection to the orchestrator and its lifecycle.
//!
//! A session never reconnects. Once it reports `Closed` or `Errored` it is
//! finished, and a new session must be created by whoever owns it.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::TransportError;

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8502/ws";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Errored(String),
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
            Self::Errored(reason) => write!(f, "errored: {reason}"),
        }
    }
}

/// Everything a session surfaces, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    Closed,
    Errored(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn state(&self) -> ConnectionState;
    /// Fails immediately unless the connection is open; nothing is queued.
    async fn send_text(&self, text: String) -> Result<(), TransportError>;
}

/// Stand-in used before any session exists.
pub struct DisconnectedTransport;

#[async_trait]
impl Transport for DisconnectedTransport {
    fn state(&self) -> ConnectionState {
        ConnectionState::Closed
    }

    async fn send_text(&self, _text: String) -> Result<(), TransportError> {
        Err(TransportError::NotOpen {
            state: ConnectionState::Closed.to_string(),
        })
    }
}

pub fn validate_endpoint(endpoint: &str) -> Result<Url, TransportError> {
    let url = Url::parse(endpoint).map_err(|err| TransportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme {other}, expected ws or wss"),
        }),
    }
}

struct SessionShared {
    state: watch::Sender<ConnectionState>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl SessionShared {
    /// Move to a terminal state and announce it, at most once per session.
    fn finish(&self, terminal: ConnectionState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            *current = terminal.clone();
            true
        });
        if changed {
            let event = match terminal {
                ConnectionState::Errored(reason) => TransportEvent::Errored(reason),
                _ => TransportEvent::Closed,
            };
            let _ = self.events.send(event);
        }
        changed
    }
}

pub struct TransportSession {
    endpoint: String,
    shared: Arc<SessionShared>,
    writer: Mutex<Option<WsWriter>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl TransportSession {
    /// Open a connection and start forwarding inbound frames.
    ///
    /// The returned receiver yields `Opened`, then every inbound frame in
    /// arrival order, then exactly one `Closed` or `Errored`.
    pub async fn connect(
        endpoint: &str,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let url = validate_endpoint(endpoint)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let shared = Arc::new(SessionShared {
            state: state_tx,
            events: events_tx,
        });

        info!(endpoint, "websocket connecting");
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let (writer, mut reader) = ws_stream.split();

        shared.state.send_replace(ConnectionState::Open);
        let _ = shared.events.send(TransportEvent::Opened);
        info!(endpoint, "websocket open");

        let task_shared = Arc::clone(&shared);
        let reader_task = tokio::spawn(async move {
            while let Some(msg) = reader.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!("dropping non-utf8 binary frame");
                            continue;
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(error = %err, "websocket receive failed");
                        task_shared.finish(ConnectionState::Errored(err.to_string()));
                        return;
                    }
                };
                debug!(frame_len = text.len(), "websocket frame received");
                if task_shared.events.send(TransportEvent::Frame(text)).is_err() {
                    break;
                }
            }
            if task_shared.finish(ConnectionState::Closed) {
                info!("websocket closed by peer");
            }
        });

        Ok((
            Arc::new(Self {
                endpoint: endpoint.to_string(),
                shared,
                writer: Mutex::new(Some(writer)),
                reader: Mutex::new(Some(reader_task)),
            }),
            events_rx,
        ))
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Close the connection and release it, whatever state it is in.
    pub async fn close(&self) {
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            if self.state().is_open() {
                let _ = writer.send(Message::Close(None)).await;
            }
            let _ = writer.close().await;
        }
        if self.shared.finish(ConnectionState::Closed) {
            info!(endpoint = %self.endpoint, "websocket closed by client");
        }
    }
}

#[async_trait]
impl Transport for TransportSession {
    fn state(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    async fn send_text(&self, text: String) -> Result<(), TransportError> {
        let state = self.state();
        if !state.is_open() {
            return Err(TransportError::NotOpen {
                state: state.to_string(),
            });
        }
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(TransportError::NotOpen {
                state: ConnectionState::Closed.to_string(),
            });
        };
        if let Err(err) = writer.send(Message::Text(text)).await {
            warn!(endpoint = %self.endpoint, error = %err, "websocket send failed");
            self.shared.finish(ConnectionState::Errored(err.to_string()));
            return Err(TransportError::Send(err));
        }
        Ok(())
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        if let Ok(mut reader) = self.reader.try_lock() {
            if let Some(handle) = reader.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
