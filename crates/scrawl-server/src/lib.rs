//! Scrawl WebSocket Relay Server
//!
//! Groups clients into rooms (one room per page) and relays collaboration
//! envelopes between the peers of a room.
//!
//! ## Protocol
//!
//! Every frame is a JSON envelope:
//! ```json
//! { "type": "join", "data": { "room": "page-id" } }
//! { "type": "leave" }
//! { "type": "nodes-add", "data": [ ... ] }
//! ```
//! Collaboration envelopes are validated and forwarded verbatim to the other
//! peers of the sender's room. The relay answers with `joined`, `peer-joined`,
//! `peer-left` and `error` notices.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use scrawl_core::protocol::{ClientFrame, RelayControl, RelayNotice};
use std::{collections::HashSet, net::SocketAddr, sync::Arc};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3030";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Per-room broadcast buffer; slow peers that fall further behind drop frames.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3030)),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Read `SCRAWL_BIND_ADDR` and `SCRAWL_CHANNEL_CAPACITY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let bind_addr = match lookup("SCRAWL_BIND_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("Invalid SCRAWL_BIND_ADDR {:?}: {}, using {}", raw, e, DEFAULT_BIND_ADDR);
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };
        let channel_capacity = match lookup("SCRAWL_CHANNEL_CAPACITY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => {
                    warn!("Invalid SCRAWL_CHANNEL_CAPACITY {:?}, using {}", raw, DEFAULT_CHANNEL_CAPACITY);
                    defaults.channel_capacity
                }
            },
            None => defaults.channel_capacity,
        };
        Self {
            bind_addr,
            channel_capacity,
        }
    }
}

/// A frame fanned out to a room: sender id and serialized JSON.
type RoomFrame = (String, String);

/// Room state
struct Room {
    tx: broadcast::Sender<RoomFrame>,
    peers: HashSet<String>,
}

impl Room {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    rooms: DashMap<String, Room>,
    channel_capacity: usize,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            channel_capacity: config.channel_capacity,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map(|room| room.peers.len()).unwrap_or(0)
    }

    /// Add peer to room
    fn join_room(&self, room_id: &str, peer_id: &str) -> (broadcast::Receiver<RoomFrame>, usize) {
        let capacity = self.channel_capacity;
        let mut room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(capacity));
        room.peers.insert(peer_id.to_string());
        (room.tx.subscribe(), room.peers.len())
    }

    /// Remove peer from room, dropping the room once empty
    fn leave_room(&self, room_id: &str, peer_id: &str) {
        let now_empty = match self.rooms.get_mut(room_id) {
            Some(mut room) => {
                room.peers.remove(peer_id);
                room.peers.is_empty()
            }
            None => false,
        };
        // a peer may have joined since the guard above was released
        if now_empty {
            self.rooms.remove_if(room_id, |_, room| room.peers.is_empty());
        }
    }

    /// Broadcast a serialized frame to room
    fn broadcast(&self, room_id: &str, from: &str, frame: String) {
        if let Some(room) = self.rooms.get(room_id) {
            let _ = room.tx.send((from.to_string(), frame));
        }
    }

    fn broadcast_notice(&self, room_id: &str, from: &str, notice: &RelayNotice) {
        match serde_json::to_string(notice) {
            Ok(json) => self.broadcast(room_id, from, json),
            Err(e) => warn!("Failed to encode notice: {}", e),
        }
    }
}

/// Build the relay router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "Scrawl Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

type Outgoing = SplitSink<WebSocket, Message>;

/// Outcome of waiting on a room subscription.
#[derive(Debug, PartialEq, Eq)]
enum RoomEvent {
    Frame(RoomFrame),
    Lagged(u64),
    Closed,
}

async fn next_room_event(rx: &mut broadcast::Receiver<RoomFrame>) -> RoomEvent {
    match rx.recv().await {
        Ok(frame) => RoomEvent::Frame(frame),
        Err(broadcast::error::RecvError::Lagged(skipped)) => RoomEvent::Lagged(skipped),
        Err(broadcast::error::RecvError::Closed) => RoomEvent::Closed,
    }
}

/// Send a notice to this client only. Returns `false` if the socket is gone.
async fn send_notice(sender: &mut Outgoing, notice: &RelayNotice) -> bool {
    match serde_json::to_string(notice) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to encode notice: {}", e);
            true
        }
    }
}

/// Per-connection membership.
struct Session {
    peer_id: String,
    room: Option<String>,
    room_rx: Option<broadcast::Receiver<RoomFrame>>,
}

impl Session {
    fn leave(&mut self, state: &AppState) {
        if let Some(room) = self.room.take() {
            state.leave_room(&room, &self.peer_id);
            state.broadcast_notice(
                &room,
                &self.peer_id,
                &RelayNotice::PeerLeft {
                    peer_id: self.peer_id.clone(),
                },
            );
            info!("Peer {} left room {}", self.peer_id, room);
        }
        self.room_rx = None;
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut session = Session {
        peer_id: Uuid::new_v4().to_string(),
        room: None,
        room_rx: None,
    };
    info!("New connection: {}", session.peer_id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_text(text.as_str(), &mut session, &state, &mut sender).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let notice = RelayNotice::Error { message: "binary frames are not supported".to_string() };
                        if !send_notice(&mut sender, &notice).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", session.peer_id, e);
                        break;
                    }
                }
            }

            event = async {
                match &mut session.room_rx {
                    Some(rx) => next_room_event(rx).await,
                    None => std::future::pending::<RoomEvent>().await,
                }
            } => {
                match event {
                    RoomEvent::Frame((from, json)) => {
                        // Don't echo back to sender
                        if from != session.peer_id && sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    RoomEvent::Lagged(skipped) => {
                        warn!("Peer {} lagged, {} frame(s) dropped", session.peer_id, skipped);
                    }
                    RoomEvent::Closed => {
                        warn!("Room closed under peer {}", session.peer_id);
                        session.room = None;
                        session.room_rx = None;
                        let notice = RelayNotice::Error { message: "room closed, join again".to_string() };
                        if !send_notice(&mut sender, &notice).await {
                            break;
                        }
                    }
                }
            }
        }
    }

    session.leave(&state);
    info!("Connection closed: {}", session.peer_id);
}

/// Handle one text frame. Returns `false` when the connection should close.
async fn handle_text(text: &str, session: &mut Session, state: &AppState, sender: &mut Outgoing) -> bool {
    let frame = match ClientFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Invalid message from {}: {}", session.peer_id, e);
            let notice = RelayNotice::Error {
                message: format!("Invalid message: {}", e),
            };
            return send_notice(sender, &notice).await;
        }
    };

    match frame {
        ClientFrame::Control(RelayControl::Join { room }) => {
            session.leave(state);

            let (rx, peer_count) = state.join_room(&room, &session.peer_id);
            session.room_rx = Some(rx);
            session.room = Some(room.clone());

            let joined = RelayNotice::Joined {
                room: room.clone(),
                peer_count,
            };
            if !send_notice(sender, &joined).await {
                return false;
            }
            state.broadcast_notice(
                &room,
                &session.peer_id,
                &RelayNotice::PeerJoined {
                    peer_id: session.peer_id.clone(),
                },
            );
            info!("Peer {} joined room {}", session.peer_id, room);
            true
        }
        ClientFrame::Control(RelayControl::Leave) => {
            session.leave(state);
            true
        }
        ClientFrame::Message(_) => match &session.room {
            Some(room) => {
                debug!("Relaying {} bytes from {} in {}", text.len(), session.peer_id, room);
                state.broadcast(room, &session.peer_id, text.to_string());
                true
            }
            None => {
                let notice = RelayNotice::Error {
                    message: "join a room before sending messages".to_string(),
                };
                send_notice(sender, &notice).await
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr.port(), 3030);
        assert_eq!(config.channel_capacity, 256);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("SCRAWL_BIND_ADDR", "127.0.0.1:9000"),
            ("SCRAWL_CHANNEL_CAPACITY", "16"),
        ]
        .into_iter()
        .collect();
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn test_config_invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(|key| match key {
            "SCRAWL_BIND_ADDR" => Some("nowhere".to_string()),
            _ => Some("0".to_string()),
        });
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_rooms_track_peers() {
        let state = AppState::new(&ServerConfig::default());
        let (_rx1, count) = state.join_room("page", "a");
        assert_eq!(count, 1);
        let (_rx2, count) = state.join_room("page", "b");
        assert_eq!(count, 2);
        assert_eq!(state.room_count(), 1);

        state.leave_room("page", "a");
        assert_eq!(state.peer_count("page"), 1);
        state.leave_room("page", "b");
        assert_eq!(state.room_count(), 0);
        assert_eq!(state.peer_count("page"), 0);
    }

    #[test]
    fn test_leave_keeps_room_with_remaining_peers() {
        let state = AppState::new(&ServerConfig::default());
        let (_rx_a, _) = state.join_room("page", "a");
        let (mut rx_b, _) = state.join_room("page", "b");

        state.leave_room("page", "a");
        state.leave_room("page", "nobody");
        state.leave_room("elsewhere", "a");
        assert_eq!(state.room_count(), 1);

        state.broadcast("page", "c", "still here".to_string());
        assert_eq!(rx_b.try_recv().unwrap().1, "still here");
    }

    #[tokio::test]
    async fn test_room_events() {
        let state = AppState::new(&ServerConfig {
            channel_capacity: 1,
            ..ServerConfig::default()
        });
        let (mut rx, _) = state.join_room("page", "a");

        state.broadcast("page", "b", "one".to_string());
        assert_eq!(
            next_room_event(&mut rx).await,
            RoomEvent::Frame(("b".to_string(), "one".to_string()))
        );

        state.broadcast("page", "b", "two".to_string());
        state.broadcast("page", "b", "three".to_string());
        assert_eq!(next_room_event(&mut rx).await, RoomEvent::Lagged(1));
        assert!(matches!(next_room_event(&mut rx).await, RoomEvent::Frame(_)));

        state.leave_room("page", "a");
        assert_eq!(next_room_event(&mut rx).await, RoomEvent::Closed);
    }

    #[test]
    fn test_broadcast_reaches_room_members() {
        let state = AppState::new(&ServerConfig::default());
        let (mut rx, _) = state.join_room("page", "a");
        let (_other, _) = state.join_room("elsewhere", "c");

        state.broadcast("page", "b", "{}".to_string());
        state.broadcast("elsewhere", "c", "ignored".to_string());
        assert_eq!(rx.try_recv().unwrap(), ("b".to_string(), "{}".to_string()));
        assert!(rx.try_recv().is_err());
    }
}
