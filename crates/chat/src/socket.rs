use crate::error::ChatError;
use crate::message::{ClientEvent, ServerEvent};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Pushed events of one live channel, in transport order.
pub type EventStream = mpsc::UnboundedReceiver<ServerEvent>;

/// Publishing side of a live channel.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn emit(&self, event: ClientEvent) -> Result<(), ChatError>;
    /// Tear the channel down. Closing twice is harmless.
    async fn close(&self) -> Result<(), ChatError>;
}

/// Opens authenticated live channels.
#[async_trait]
pub trait ChatConnector: Send + Sync {
    async fn connect(
        &self,
        token: &str,
    ) -> Result<(Arc<dyn ChatTransport>, EventStream), ChatError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct SocketOptions {
    pub ping_interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(25),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// A websocket live channel.
///
/// Frames are JSON [`ClientEvent`]s out and [`ServerEvent`]s in. There is no
/// application-level reconnect: once the socket drops, the state goes to
/// `Disconnected` and the event stream ends.
pub struct ChatSocket {
    sender: Arc<RwLock<Option<mpsc::Sender<Message>>>>,
    state: Arc<RwLock<ConnectionState>>,
    state_change: broadcast::Sender<ConnectionState>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSocket {
    /// Websocket URL for `url` authenticated with `token`. `http(s)` schemes
    /// map to `ws(s)`.
    pub fn endpoint(url: &str, token: &str) -> Result<Url, ChatError> {
        let mut endpoint = Url::parse(url)?;
        let scheme = match endpoint.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            s => {
                return Err(ChatError::Connection(format!(
                    "Unsupported URL scheme: {}",
                    s
                )))
            }
        };
        endpoint
            .set_scheme(scheme)
            .map_err(|_| ChatError::Connection(format!("Cannot use scheme {} for {}", scheme, url)))?;
        endpoint.query_pairs_mut().append_pair("token", token);
        Ok(endpoint)
    }

    pub async fn connect(url: &str, token: &str) -> Result<(Self, EventStream), ChatError> {
        Self::connect_with_options(url, token, SocketOptions::default()).await
    }

    pub async fn connect_with_options(
        url: &str,
        token: &str,
        options: SocketOptions,
    ) -> Result<(Self, EventStream), ChatError> {
        let endpoint = Self::endpoint(url, token)?;
        let (state_change, _) = broadcast::channel(16);
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));
        set_state(&state, &state_change, ConnectionState::Connecting).await;

        info!("Connecting live channel to {}", endpoint.host_str().unwrap_or("?"));
        let ws_stream = match timeout(options.connect_timeout, connect_async(endpoint.as_str())).await {
            Ok(Ok((stream, response))) => {
                debug!("WebSocket handshake complete: {}", response.status());
                stream
            }
            Ok(Err(e)) => {
                error!("WebSocket connection failed: {}", e);
                set_state(&state, &state_change, ConnectionState::Disconnected).await;
                return Err(ChatError::Connection(format!("WebSocket connection failed: {}", e)));
            }
            Err(_) => {
                error!("WebSocket connection timed out");
                set_state(&state, &state_change, ConnectionState::Disconnected).await;
                return Err(ChatError::Connection("Connection timed out".to_string()));
            }
        };
        set_state(&state, &state_change, ConnectionState::Connected).await;

        let (mut write, mut read) = ws_stream.split();
        let (socket_tx, mut socket_rx) = mpsc::channel::<Message>(100);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sender = Arc::new(RwLock::new(Some(socket_tx.clone())));

        // --- Writer task ---
        tokio::spawn(async move {
            while let Some(message) = socket_rx.recv().await {
                trace!("Writer sending {:?}", message);
                if let Err(e) = write.send(message).await {
                    error!("WebSocket send error: {}", e);
                    socket_rx.close();
                    break;
                }
            }
            if let Err(e) = write.close().await {
                trace!("Close frame not sent: {}", e);
            }
            debug!("Writer task finished");
        });

        // --- Reader task (with pings) ---
        let reader_state = state.clone();
        let reader_state_change = state_change.clone();
        let reader_sender = sender.clone();
        let ping_frame = serde_json::to_string(&ClientEvent::Ping)?;
        let reader = tokio::spawn(async move {
            let mut ping = interval_at(Instant::now() + options.ping_interval, options.ping_interval);
            loop {
                tokio::select! {
                    biased;

                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ServerEvent>(&text) {
                                Ok(event) => {
                                    trace!("Received {:?}", event);
                                    if events_tx.send(event).is_err() {
                                        debug!("Event receiver dropped, stopping reader");
                                        break;
                                    }
                                }
                                Err(e) => warn!("Ignoring unrecognised frame ({}): {}", e, text),
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!("Server closed the channel: {:?}", frame);
                            break;
                        }
                        Some(Ok(other)) => trace!("Ignoring non-text frame: {:?}", other),
                        Some(Err(e)) => {
                            error!("WebSocket read error: {}", e);
                            break;
                        }
                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }
                    },

                    _ = ping.tick() => {
                        if socket_tx.send(Message::Text(ping_frame.clone())).await.is_err() {
                            warn!("Ping failed, writer is gone");
                            break;
                        }
                    }
                }
            }
            *reader_sender.write().await = None;
            set_state(&reader_state, &reader_state_change, ConnectionState::Disconnected).await;
        });

        Ok((
            Self {
                sender,
                state,
                state_change,
                reader: Mutex::new(Some(reader)),
            },
            events_rx,
        ))
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub fn on_state_change(&self) -> broadcast::Receiver<ConnectionState> {
        self.state_change.subscribe()
    }
}

#[async_trait]
impl ChatTransport for ChatSocket {
    async fn emit(&self, event: ClientEvent) -> Result<(), ChatError> {
        let frame = serde_json::to_string(&event)?;
        let guard = self.sender.read().await;
        match guard.as_ref() {
            Some(tx) => {
                debug!("Emitting {}", event.name());
                tx.send(Message::Text(frame))
                    .await
                    .map_err(|e| ChatError::Connection(format!("Failed to queue frame: {}", e)))
            }
            None => {
                warn!("Cannot emit {}, channel is closed", event.name());
                Err(ChatError::Connection("Channel is closed".to_string()))
            }
        }
    }

    async fn close(&self) -> Result<(), ChatError> {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = reader {
            handle.abort();
        }
        if self.sender.write().await.take().is_some() {
            info!("Live channel closed");
        }
        set_state(&self.state, &self.state_change, ConnectionState::Disconnected).await;
        Ok(())
    }
}

impl Drop for ChatSocket {
    fn drop(&mut self) {
        let reader = self
            .reader
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = reader {
            handle.abort();
        }
    }
}

async fn set_state(
    state: &RwLock<ConnectionState>,
    state_change: &broadcast::Sender<ConnectionState>,
    next: ConnectionState,
) {
    let mut current = state.write().await;
    if *current != next {
        trace!("Live channel state {:?} -> {:?}", *current, next);
        *current = next;
        // No receivers is fine.
        let _ = state_change.send(next);
    }
}

/// [`ChatConnector`] for websocket channels at a fixed URL.
#[derive(Debug, Clone)]
pub struct SocketConnector {
    url: String,
    options: SocketOptions,
}

impl SocketConnector {
    pub fn new(url: &str) -> Self {
        Self::with_options(url, SocketOptions::default())
    }

    pub fn with_options(url: &str, options: SocketOptions) -> Self {
        Self {
            url: url.to_string(),
            options,
        }
    }
}

#[async_trait]
impl ChatConnector for SocketConnector {
    async fn connect(
        &self,
        token: &str,
    ) -> Result<(Arc<dyn ChatTransport>, EventStream), ChatError> {
        let (socket, events) =
            ChatSocket::connect_with_options(&self.url, token, self.options.clone()).await?;
        Ok((Arc::new(socket), events))
    }
}
