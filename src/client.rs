//! Websocket link from a game client to the relay server.
//!
//! The link logs in, then answers every update request with the most recent
//! record published by the simulation and queues peer records for the next
//! tick.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::components::RoomId;
use crate::error::LinkError;
use crate::room::Seat;
use crate::wire_format::{ClientMessage, ServerMessage, ShipUpdate};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Peer records buffered before the oldest ones start dropping.
pub const INBOUND_QUEUE: usize = 256;

pub struct ClientLink {
    seat: Seat,
    latest: watch::Sender<Option<ShipUpdate>>,
    inbound: mpsc::Receiver<ShipUpdate>,
    exit: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ClientLink {
    /// Connect and log in. `room_id` of `None` lets the server pick.
    pub async fn connect(
        url: &str,
        room_id: Option<RoomId>,
        player_name: &str,
    ) -> Result<Self, LinkError> {
        let (mut socket, _) = connect_async(url).await?;
        let login = ClientMessage::Login {
            room_id,
            player_name: player_name.to_string(),
        };
        socket.send(Message::text(login.to_json()?)).await?;

        let seat = await_login(&mut socket).await?;
        info!(room = seat.room_id, ship = seat.ship_id, "logged in");

        let (latest, watcher) = watch::channel(None);
        let (inbound_tx, inbound) = mpsc::channel(INBOUND_QUEUE);
        let (exit, exit_rx) = mpsc::channel(1);
        let task = tokio::spawn(pump(socket, watcher, inbound_tx, exit_rx));

        Ok(Self {
            seat,
            latest,
            inbound,
            exit,
            task,
        })
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    /// Replace the record sent at the next update request.
    pub fn publish(&self, update: ShipUpdate) {
        self.latest.send_replace(Some(update));
    }

    pub fn try_recv(&mut self) -> Option<ShipUpdate> {
        self.inbound.try_recv().ok()
    }

    /// All peer records received since the last call.
    pub fn drain(&mut self) -> Vec<ShipUpdate> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Wait for the next peer record. `None` once the link is down.
    pub async fn recv(&mut self) -> Option<ShipUpdate> {
        self.inbound.recv().await
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Tell the server we are leaving and wait for the link to close.
    pub async fn exit(self) {
        if self.exit.send(()).await.is_ok() {
            let _ = self.task.await;
        } else {
            self.task.abort();
        }
    }
}

async fn await_login(socket: &mut Socket) -> Result<Seat, LinkError> {
    while let Some(frame) = socket.next().await {
        let frame = frame?;
        if frame.is_close() {
            break;
        }
        if !frame.is_text() {
            continue;
        }
        match ServerMessage::from_json(frame.to_text()?)? {
            ServerMessage::LoginOk { ship_id, room_id } => return Ok(Seat { room_id, ship_id }),
            ServerMessage::LoginDeny { reason } => return Err(LinkError::Denied(reason)),
            other => debug!("ignored before login: {:?}", other),
        }
    }
    Err(LinkError::ClosedDuringLogin)
}

async fn pump(
    socket: Socket,
    latest: watch::Receiver<Option<ShipUpdate>>,
    inbound: mpsc::Sender<ShipUpdate>,
    mut exit: mpsc::Receiver<()>,
) {
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("link error: {}", e);
                        break;
                    }
                };
                let message = match ServerMessage::from_json(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("malformed frame: {}", e);
                        continue;
                    }
                };
                match message {
                    ServerMessage::PlayerUpdateRequest => {
                        let Some(update) = latest.borrow().clone() else {
                            continue;
                        };
                        let Ok(json) = ClientMessage::PlayerUpdate(update).to_json() else {
                            continue;
                        };
                        if sink.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    ServerMessage::OtherPlayerUpdate(update) => {
                        if let Err(e) = inbound.try_send(update) {
                            debug!("peer record dropped: {}", e);
                        }
                    }
                    other => debug!("unexpected after login: {:?}", other),
                }
            }
            _ = exit.recv() => {
                if let Ok(json) = ClientMessage::Exited.to_json() {
                    let _ = sink.send(Message::text(json)).await;
                }
                let _ = sink.close().await;
                break;
            }
        }
    }
    info!("link closed");
}
