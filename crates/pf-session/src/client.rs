//! Session Client — WebSocket connection to the game session server

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::event::{EventTranslator, GameEvent};
use crate::protocol::{self, SessionMessage};

/// Connection state of the session client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the session server
    pub url: String,
    /// Slot name to authenticate as
    pub slot_name: String,
    /// Slot password, if the session requires one
    pub password: Option<String>,
    /// Connection timeout in milliseconds
    pub timeout_ms: u32,
}

/// Session client for live game-event streaming
pub struct SessionClient {
    /// Connection configuration
    config: SessionConfig,

    /// Current connection state
    state: Arc<RwLock<SessionState>>,

    /// Channel for normalized game events
    event_tx: broadcast::Sender<GameEvent>,

    /// Connection task handle
    connection_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,

    /// Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

impl SessionClient {
    /// Create a new client with config
    pub fn new(config: SessionConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: Arc::new(RwLock::new(SessionState::Disconnected)),
            event_tx,
            connection_handle: Arc::new(RwLock::new(None)),
            shutdown_tx,
        }
    }

    /// Get the current connection state
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Subscribe to game events
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.event_tx.subscribe()
    }

    /// Connect to the session server and start the read loop. The handshake
    /// frame goes out immediately; `Connected` arriving from the server is
    /// what flips the state to `Connected`.
    pub async fn connect(&self) -> Result<(), SessionError> {
        {
            let mut state = self.state.write().await;
            if matches!(*state, SessionState::Connecting | SessionState::Connected) {
                return Err(SessionError::AlreadyConnected);
            }
            *state = SessionState::Connecting;
        }

        match self.connect_inner().await {
            Ok(()) => Ok(()),
            Err(err) => {
                *self.state.write().await = SessionState::Error;
                Err(err)
            }
        }
    }

    async fn connect_inner(&self) -> Result<(), SessionError> {
        let _ = url::Url::parse(&self.config.url)
            .map_err(|e| SessionError::ConnectionFailed(format!("Invalid URL: {e}")))?;

        let timeout = Duration::from_millis(u64::from(self.config.timeout_ms));
        let ws_stream = tokio::time::timeout(timeout, connect_async(self.config.url.as_str()))
            .await
            .map_err(|_| SessionError::Timeout)?
            .map_err(|e| SessionError::ConnectionFailed(format!("WebSocket error: {e}")))?
            .0;

        let (mut write, mut read) = ws_stream.split();

        let handshake = protocol::connect_frame(&self.config.slot_name, self.config.password.as_deref());
        write
            .send(Message::text(handshake))
            .await
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

        let event_tx = self.event_tx.clone();
        let state = Arc::clone(&self.state);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // Spawn connection task
        let handle = tokio::spawn(async move {
            let mut translator = EventTranslator::new();

            loop {
                tokio::select! {
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                Self::handle_frame(&text, &mut translator, &event_tx, &state).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                log::info!("[Session] Server closed the connection");
                                *state.write().await = SessionState::Disconnected;
                                break;
                            }
                            Some(Err(e)) => {
                                log::error!("[Session] WebSocket error: {e}");
                                *state.write().await = SessionState::Error;
                                break;
                            }
                            _ => {} // Ignore ping/pong/binary
                        }
                    }

                    _ = shutdown_rx.recv() => {
                        let _ = write.send(Message::Close(None)).await;
                        *state.write().await = SessionState::Disconnected;
                        break;
                    }
                }
            }
        });

        *self.connection_handle.write().await = Some(handle);
        Ok(())
    }

    /// Disconnect from the session server
    pub async fn disconnect(&self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.connection_handle.write().await.take() {
            let _ = handle.await;
        }
        *self.state.write().await = SessionState::Disconnected;
    }

    /// Parse one text frame and broadcast the resulting events
    async fn handle_frame(
        text: &str,
        translator: &mut EventTranslator,
        event_tx: &broadcast::Sender<GameEvent>,
        state: &Arc<RwLock<SessionState>>,
    ) {
        let messages = match protocol::parse_frame(text) {
            Ok(messages) => messages,
            Err(e) => {
                log::warn!("[Session] Invalid frame: {e}");
                return;
            }
        };

        for message in messages {
            if matches!(message, SessionMessage::Connected { .. }) {
                *state.write().await = SessionState::Connected;
                log::info!("[Session] Handshake accepted");
            }
            for event in translator.translate(message) {
                let _ = event_tx.send(event);
            }
        }
    }
}

/// Session client builder
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create builder with the server URL and slot name
    pub fn new(url: &str, slot_name: &str) -> Self {
        Self {
            config: SessionConfig {
                url: url.to_string(),
                slot_name: slot_name.to_string(),
                password: None,
                timeout_ms: 5000,
            },
        }
    }

    /// Set the slot password
    pub fn password(mut self, password: &str) -> Self {
        self.config.password = Some(password.to_string());
        self
    }

    /// Set connection timeout
    pub fn timeout(mut self, timeout_ms: u32) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Build the client
    pub fn build(self) -> SessionClient {
        SessionClient::new(self.config)
    }
}

/// Session client errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
