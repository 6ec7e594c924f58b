//! Wire format for the relay protocol
//!
//! Every frame is one JSON text message. Messages are tagged with their
//! action code under `"a"` and carry their payload under `"p"`:
//!
//! ```json
//! {"a": "LOGIN", "p": {"room_id": null, "player_name": "tony"}}
//! {"a": "PLAYER_UPDATE_REQUEST"}
//! ```

use serde::{Deserialize, Serialize};

use crate::components::{LevelId, RoomId, ShipId};
use crate::error::WireError;

/// Replicated state of one authoritative ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipUpdate {
    pub ship_id: ShipId,
    pub room_id: RoomId,
    /// Only meaningful coming from ship 1.
    pub level_id: LevelId,
    #[serde(default)]
    pub player_name: String,
    /// Precise position.
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub landed: bool,
    pub thrust_on: bool,
    pub shield_on: bool,
    pub game_over: bool,
    #[serde(default)]
    pub shots: Vec<(i32, i32)>,
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "a", content = "p", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Ask for a seat; `None` joins any room with a free slot.
    Login {
        room_id: Option<RoomId>,
        #[serde(default)]
        player_name: String,
    },
    PlayerUpdate(ShipUpdate),
    Exited,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "a", content = "p", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    LoginOk { ship_id: ShipId, room_id: RoomId },
    LoginDeny { reason: String },
    PlayerUpdateRequest,
    OtherPlayerUpdate(ShipUpdate),
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(text)?)
    }
}
