//! Room bookkeeping for the relay server.
//!
//! A room seats up to four players, one per ship slot. The registry is the
//! only mutable state on the server and is always used behind one lock;
//! readers work from cloned snapshots.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::components::{MAX_SHIPS, RoomId, ShipId};
use crate::error::LoginDenied;
use crate::wire_format::ServerMessage;

/// Room and slot assigned to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Seat {
    pub room_id: RoomId,
    pub ship_id: ShipId,
}

/// A seated connection and its outbound queue.
#[derive(Debug, Clone)]
pub struct Member {
    pub connection: Uuid,
    pub ship_id: ShipId,
    pub player_name: String,
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Member {
    /// Queue a message without waiting. A full or closed queue drops it.
    pub fn try_send(&self, message: ServerMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                debug!(connection = %self.connection, ship = self.ship_id, "dropped send: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    /// Always sorted ascending.
    free_ships: Vec<ShipId>,
    players: Vec<Member>,
}

impl Room {
    fn new(id: RoomId) -> Self {
        Self {
            id,
            free_ships: (1..=MAX_SHIPS as ShipId).collect(),
            players: Vec::new(),
        }
    }

    pub fn free_ships(&self) -> &[ShipId] {
        &self.free_ships
    }

    pub fn players(&self) -> &[Member] {
        &self.players
    }

    pub fn is_full(&self) -> bool {
        self.free_ships.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn seat(&mut self, member: impl FnOnce(ShipId) -> Member) -> Option<ShipId> {
        if self.free_ships.is_empty() {
            return None;
        }
        let ship_id = self.free_ships.remove(0);
        self.players.push(member(ship_id));
        Some(ship_id)
    }

    fn unseat(&mut self, connection: Uuid) -> Option<ShipId> {
        let index = self.players.iter().position(|m| m.connection == connection)?;
        let member = self.players.remove(index);
        self.free_ships.push(member.ship_id);
        self.free_ships.sort_unstable();
        Some(member.ship_id)
    }
}

/// Read-only copy of every room, handed to the tick loop and relays.
pub type Directory = BTreeMap<RoomId, Room>;

/// JSON view of a room for `GET /rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub free_ships: Vec<ShipId>,
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummary {
    pub ship_id: ShipId,
    pub player_name: String,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id,
            free_ships: room.free_ships.clone(),
            players: room
                .players
                .iter()
                .map(|m| PlayerSummary {
                    ship_id: m.ship_id,
                    player_name: m.player_name.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: BTreeMap<RoomId, Room>,
    seats: HashMap<Uuid, Seat>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat a connection.
    ///
    /// Without a requested room the lowest open slot of the lowest open room
    /// is taken, and a new room is opened only when every room is full. A
    /// requested room that does not exist yet is created.
    pub fn login(
        &mut self,
        requested: Option<RoomId>,
        connection: Uuid,
        player_name: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<Seat, LoginDenied> {
        if self.seats.contains_key(&connection) {
            return Err(LoginDenied::AlreadyRegistered);
        }

        let room_id = match requested {
            Some(id) => id,
            None => self
                .rooms
                .values()
                .find(|room| !room.is_full())
                .map(|room| room.id)
                .unwrap_or_else(|| self.lowest_unused_id()),
        };

        let room = self.rooms.entry(room_id).or_insert_with(|| {
            info!(room = room_id, "room created");
            Room::new(room_id)
        });

        let ship_id = room
            .seat(|ship_id| Member {
                connection,
                ship_id,
                player_name: player_name.to_string(),
                sender,
            })
            .ok_or(LoginDenied::RoomFull(room_id))?;

        let seat = Seat { room_id, ship_id };
        self.seats.insert(connection, seat);
        info!(room = room_id, ship = ship_id, player = player_name, "player seated");
        Ok(seat)
    }

    /// Free the connection's slot. An emptied room is deleted.
    pub fn logout(&mut self, connection: Uuid) -> Option<Seat> {
        let seat = self.seats.remove(&connection)?;
        let room = self.rooms.get_mut(&seat.room_id)?;
        room.unseat(connection);
        info!(
            room = seat.room_id,
            ship = seat.ship_id,
            free = ?room.free_ships,
            "slot freed"
        );
        if room.is_empty() {
            self.rooms.remove(&seat.room_id);
            info!(room = seat.room_id, "room deleted");
        }
        Some(seat)
    }

    pub fn seat_of(&self, connection: Uuid) -> Option<Seat> {
        self.seats.get(&connection).copied()
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn directory(&self) -> Directory {
        self.rooms.clone()
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.rooms.values().map(RoomSummary::from).collect()
    }

    fn lowest_unused_id(&self) -> RoomId {
        (1..)
            .find(|id| !self.rooms.contains_key(id))
            .unwrap_or(RoomId::MAX)
    }
}
