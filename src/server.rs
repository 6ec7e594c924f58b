//! Relay server: websocket sessions, room lobby and the update-request tick.
//!
//! The server never simulates. Each tick it asks every seated player for
//! its ship record, and every record it receives is forwarded to the other
//! players of the same room.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::components::RoomId;
use crate::config::ServerConfig;
use crate::error::{ConfigError, LoginDenied, ServerError};
use crate::room::{Directory, RoomRegistry, RoomSummary, Seat};
use crate::wire_format::{ClientMessage, ServerMessage, ShipUpdate};

/// Outbound frames buffered per connection before sends start dropping.
pub const OUTBOUND_QUEUE: usize = 256;

/// Parsed client frames buffered per connection. A full queue stops the
/// socket reader until the dispatcher catches up.
pub const INBOUND_QUEUE: usize = 256;

/// Room registry behind one lock, plus a snapshot of it for lock-free reads.
pub struct Lobby {
    registry: Mutex<RoomRegistry>,
    directory: watch::Sender<Arc<Directory>>,
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new()
    }
}

impl Lobby {
    pub fn new() -> Self {
        let (directory, _) = watch::channel(Arc::new(Directory::new()));
        Self {
            registry: Mutex::new(RoomRegistry::new()),
            directory,
        }
    }

    fn registry(&self) -> MutexGuard<'_, RoomRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, registry: &RoomRegistry) {
        self.directory.send_replace(Arc::new(registry.directory()));
    }

    pub fn login(
        &self,
        requested: Option<RoomId>,
        connection: Uuid,
        player_name: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<Seat, LoginDenied> {
        let mut registry = self.registry();
        let seat = registry.login(requested, connection, player_name, sender)?;
        self.publish(&registry);
        Ok(seat)
    }

    /// Release the connection's slot, if it holds one.
    pub fn logout(&self, connection: Uuid) -> Option<Seat> {
        let mut registry = self.registry();
        let seat = registry.logout(connection)?;
        self.publish(&registry);
        Some(seat)
    }

    /// Snapshot taken at the last registry change.
    pub fn directory(&self) -> Arc<Directory> {
        self.directory.borrow().clone()
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.directory().values().map(RoomSummary::from).collect()
    }

    /// Ask every seated player for its ship record. Returns how many
    /// requests were queued.
    pub fn request_updates(&self) -> usize {
        let directory = self.directory();
        directory
            .values()
            .flat_map(|room| room.players())
            .filter(|member| member.try_send(ServerMessage::PlayerUpdateRequest))
            .count()
    }

    /// Forward a record to every other player of the sender's room.
    pub fn relay(&self, from: Uuid, seat: Seat, update: ShipUpdate) -> usize {
        let directory = self.directory();
        let Some(room) = directory.get(&seat.room_id) else {
            return 0;
        };
        room.players()
            .iter()
            .filter(|member| member.connection != from)
            .filter(|member| member.try_send(ServerMessage::OtherPlayerUpdate(update.clone())))
            .count()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub lobby: Arc<Lobby>,
}

/// Per-connection protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket open, nothing received yet.
    New,
    /// Talking, but not seated (no login yet or login denied).
    AwaitingRoom,
    Playing(Seat),
    Closed,
}

/// Apply one client frame to a connection.
pub fn on_message(
    state: ConnectionState,
    message: ClientMessage,
    lobby: &Lobby,
    connection: Uuid,
    outbound: &mpsc::Sender<ServerMessage>,
) -> ConnectionState {
    match (state, message) {
        (ConnectionState::Closed, _) => ConnectionState::Closed,
        (_, ClientMessage::Exited) => {
            info!(%connection, "player exited");
            ConnectionState::Closed
        }
        (
            state,
            ClientMessage::Login {
                room_id,
                player_name,
            },
        ) => match lobby.login(room_id, connection, &player_name, outbound.clone()) {
            Ok(seat) => {
                reply(
                    outbound,
                    ServerMessage::LoginOk {
                        ship_id: seat.ship_id,
                        room_id: seat.room_id,
                    },
                );
                ConnectionState::Playing(seat)
            }
            Err(denied) => {
                warn!(%connection, ?room_id, "login denied: {}", denied);
                reply(
                    outbound,
                    ServerMessage::LoginDeny {
                        reason: denied.to_string(),
                    },
                );
                match state {
                    ConnectionState::Playing(seat) => ConnectionState::Playing(seat),
                    _ => ConnectionState::AwaitingRoom,
                }
            }
        },
        (ConnectionState::Playing(seat), ClientMessage::PlayerUpdate(mut update)) => {
            update.ship_id = seat.ship_id;
            update.room_id = seat.room_id;
            let peers = lobby.relay(connection, seat, update);
            debug!(room = seat.room_id, ship = seat.ship_id, peers, "update relayed");
            ConnectionState::Playing(seat)
        }
        (_, ClientMessage::PlayerUpdate(_)) => {
            debug!(%connection, "update before login ignored");
            ConnectionState::AwaitingRoom
        }
    }
}

/// Apply queued client frames in arrival order until the connection closes
/// or the reader goes away.
pub async fn dispatch(
    mut inbound: mpsc::Receiver<ClientMessage>,
    lobby: &Lobby,
    connection: Uuid,
    outbound: &mpsc::Sender<ServerMessage>,
) -> ConnectionState {
    let mut state = ConnectionState::New;
    while let Some(message) = inbound.recv().await {
        state = on_message(state, message, lobby, connection, outbound);
        if state == ConnectionState::Closed {
            break;
        }
    }
    state
}

fn reply(outbound: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
    if let Err(e) = outbound.try_send(message) {
        warn!("reply dropped: {}", e);
    }
}

/// Routes with CORS restricted to `client_origin` when set.
pub fn router(state: AppState, client_origin: Option<&str>) -> Result<Router, ConfigError> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let cors = match client_origin {
        Some(origin) => cors.allow_origin(
            origin
                .parse::<HeaderValue>()
                .map_err(|_| ConfigError::InvalidOrigin(origin.to_string()))?,
        ),
        None => cors.allow_origin(Any),
    };

    Ok(Router::new()
        .route("/", get(|| async { "Mayhem relay server" }))
        .route("/ws", get(websocket_handler))
        .route("/rooms", get(list_rooms))
        .layer(cors)
        .with_state(state))
}

/// Send an update request to every player `tick_rate` times per second.
pub fn spawn_tick_loop(lobby: Arc<Lobby>, tick_rate: u32) -> JoinHandle<()> {
    let period = Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1)));
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            lobby.request_updates();
        }
    })
}

/// Run the relay on an already bound listener until the server stops.
pub async fn serve(listener: TcpListener, config: &ServerConfig) -> Result<(), ServerError> {
    let state = AppState {
        lobby: Arc::new(Lobby::new()),
    };
    let ticker = spawn_tick_loop(state.lobby.clone(), config.tick_rate);
    let app = router(state, config.client_origin.as_deref())?;

    let address = listener.local_addr()?;
    info!("Mayhem relay listening on http://{}", address);
    info!("WebSocket endpoint: ws://{}/ws", address);
    info!(tick_rate = config.tick_rate, "update requests scheduled");

    let served = axum::serve(listener, app).await;
    ticker.abort();
    served.map_err(ServerError::from)
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.lobby.summaries())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let connection = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE);

    info!(%connection, "connection opened");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match message.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("cannot encode {:?}: {}", message, e);
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let (inbound_tx, inbound_rx) = mpsc::channel::<ClientMessage>(INBOUND_QUEUE);

    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!(%connection, "websocket error: {}", e);
                    break;
                }
            };
            match ClientMessage::from_json(&text) {
                Ok(message) => {
                    if inbound_tx.send(message).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(%connection, "malformed frame: {}", e),
            }
        }
    });

    let mut dispatch_task = {
        let lobby = state.lobby.clone();
        tokio::spawn(async move { dispatch(inbound_rx, &lobby, connection, &tx).await })
    };

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            dispatch_task.abort();
        }
        _ = &mut dispatch_task => {
            recv_task.abort();
            send_task.abort();
        }
    }

    if let Some(seat) = state.lobby.logout(connection) {
        info!(%connection, room = seat.room_id, ship = seat.ship_id, "player left");
    }
    info!(%connection, "connection closed");
}
