//! WebSocket client for collaboration.
//!
//! The socket runs on a background thread; the owner sends frames through a
//! command channel and drains [`SyncEvent`]s with [`NativeWebSocket::poll_events`].

use crate::collaboration::OutboundSink;
use crate::protocol::{RelayControl, RelayNotice, ServerFrame, WireMessage};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tungstenite::{Message, connect};
use url::Url;

/// Errors from the collaboration transport.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not connected")]
    NotConnected,
    #[error("already connected")]
    AlreadyConnected,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the WebSocket client
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    JoinedRoom { room: String, peer_count: usize },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// Collaboration message relayed from a peer.
    Received(WireMessage),
    Error { message: String },
}

impl From<ServerFrame> for SyncEvent {
    fn from(frame: ServerFrame) -> Self {
        match frame {
            ServerFrame::Message(message) => SyncEvent::Received(message),
            ServerFrame::Notice(RelayNotice::Joined { room, peer_count }) => {
                SyncEvent::JoinedRoom { room, peer_count }
            }
            ServerFrame::Notice(RelayNotice::PeerJoined { peer_id }) => SyncEvent::PeerJoined { peer_id },
            ServerFrame::Notice(RelayNotice::PeerLeft { peer_id }) => SyncEvent::PeerLeft { peer_id },
            ServerFrame::Notice(RelayNotice::Error { message }) => SyncEvent::Error { message },
        }
    }
}

/// Validate a relay URL.
pub fn parse_ws_url(url: &str) -> Result<Url, SyncError> {
    let parsed = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(SyncError::InvalidUrl(format!("unsupported scheme: {other}"))),
    }
}

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket client running on a background thread.
pub struct NativeWebSocket {
    state: ConnectionState,
    events: Vec<SyncEvent>,
    cmd_tx: Option<Sender<WsCommand>>,
    event_rx: Option<Receiver<SyncEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    /// Create a new disconnected WebSocket client.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            events: Vec::new(),
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Connect to a relay server.
    pub fn connect(&mut self, url: &str) -> Result<(), SyncError> {
        if self.cmd_tx.is_some() {
            return Err(SyncError::AlreadyConnected);
        }
        let url = parse_ws_url(url)?.to_string();

        self.state = ConnectionState::Connecting;

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<SyncEvent>();

        let handle = thread::spawn(move || run_socket(&url, &cmd_rx, &event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);
        Ok(())
    }

    /// Disconnect from the server.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Join the room for a page.
    pub fn join(&self, room: &str) -> Result<(), SyncError> {
        let frame = serde_json::to_string(&RelayControl::Join { room: room.to_string() })?;
        self.send_text(frame)
    }

    pub fn leave(&self) -> Result<(), SyncError> {
        self.send_text(serde_json::to_string(&RelayControl::Leave)?)
    }

    fn send_text(&self, text: String) -> Result<(), SyncError> {
        let tx = self.cmd_tx.as_ref().ok_or(SyncError::NotConnected)?;
        tx.send(WsCommand::Send(text))
            .map_err(|e| SyncError::Send(e.to_string()))
    }

    /// Poll for pending events (non-blocking).
    pub fn poll_events(&mut self) -> Vec<SyncEvent> {
        if let Some(ref rx) = self.event_rx {
            while let Ok(event) = rx.try_recv() {
                match &event {
                    SyncEvent::Connected => self.state = ConnectionState::Connected,
                    SyncEvent::Disconnected => self.state = ConnectionState::Disconnected,
                    SyncEvent::Error { .. } if self.state != ConnectionState::Connected => {
                        self.state = ConnectionState::Error
                    }
                    _ => {}
                }
                self.events.push(event);
            }
        }
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

impl OutboundSink for NativeWebSocket {
    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn send(&mut self, message: &WireMessage) -> Result<(), SyncError> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.send_text(message.to_json()?)
    }
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn run_socket(url: &str, cmd_rx: &Receiver<WsCommand>, event_tx: &Sender<SyncEvent>) {
    log::info!("WebSocket thread: connecting to {}", url);

    let (mut socket, response) = match connect(url) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("WebSocket connection failed: {}", e);
            let _ = event_tx.send(SyncEvent::Error {
                message: format!("Connection failed: {}", e),
            });
            return;
        }
    };

    log::info!("WebSocket connected, status: {}", response.status());
    let _ = event_tx.send(SyncEvent::Connected);

    // Short read timeout so the loop can service outgoing commands.
    match socket.get_mut() {
        tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        #[allow(unreachable_patterns)]
        _ => log::debug!("TLS or other stream - using default timeout handling"),
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("WebSocket sending: {}", msg.chars().take(100).collect::<String>());
                if let Err(e) = socket.send(Message::Text(msg)) {
                    log::error!("WebSocket send error: {}", e);
                    break;
                }
            }
            Ok(WsCommand::Close) => {
                log::info!("WebSocket close requested");
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Disconnected) => {
                log::info!("WebSocket command channel disconnected");
                break;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(txt)) => match ServerFrame::parse(&txt) {
                Ok(frame) => {
                    let _ = event_tx.send(SyncEvent::from(frame));
                }
                Err(e) => log::warn!("Failed to parse server frame: {}", e),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                break;
            }
        }
    }

    log::info!("WebSocket thread exiting");
    let _ = event_tx.send(SyncEvent::Disconnected);
}
