//! Mapping between a ship and its network record.
//!
//! The authoritative side packages its ship every tick; the receiving side
//! overwrites a shadow ship wholesale. Shadows are never integrated.

use rapier2d::prelude::*;

use crate::components::{FlightState, LevelId, RoomId, Ship, ShipRole, Shot, SpriteVariant};
use crate::config::PhysicsConfig;
use crate::kinematics::{Body, wrap_degrees};
use crate::wire_format::ShipUpdate;

/// Package the current state of an authoritative ship.
pub fn capture(ship: &Ship, room_id: RoomId, level_id: LevelId) -> ShipUpdate {
    ShipUpdate {
        ship_id: ship.id,
        room_id,
        level_id,
        player_name: ship.player_name.clone(),
        x: ship.body.position.x,
        y: ship.body.position.y,
        angle: ship.heading,
        landed: ship.is_landed(),
        thrust_on: ship.intents.thrust,
        shield_on: ship.intents.shield,
        game_over: ship.is_game_over(),
        shots: ship.shots.iter().map(Shot::screen_position).collect(),
    }
}

/// Overwrite a shadow ship from a peer record.
///
/// A shadow already exploding locally finishes its explosion; the peer's
/// game-over flag always wins.
pub fn apply(ship: &mut Ship, update: &ShipUpdate, config: &PhysicsConfig) {
    if ship.role == ShipRole::Absent {
        ship.role = ShipRole::Shadow;
    }

    ship.player_name.clone_from(&update.player_name);
    ship.body = Body::at(vector![update.x, update.y]);
    ship.sync_position();
    ship.heading = wrap_degrees(update.angle);

    ship.intents.thrust = update.thrust_on;
    ship.intents.shield = update.shield_on;
    ship.thrust = if update.thrust_on { config.thrust_max } else { 0.0 };
    ship.shielded = update.shield_on;
    ship.variant = if update.thrust_on {
        SpriteVariant::Thrust
    } else if update.shield_on {
        SpriteVariant::Shield
    } else {
        SpriteVariant::Normal
    };

    ship.shots = update
        .shots
        .iter()
        .map(|&(x, y)| Shot {
            position: vector![x as f32, y as f32],
            velocity: Vector::zeros(),
        })
        .collect();

    if update.game_over {
        ship.state = FlightState::Destroyed;
        ship.lives = 0;
    } else if !ship.is_destructing() {
        ship.state = if update.landed {
            FlightState::Landed
        } else {
            FlightState::Flying
        };
    }

    ship.refresh_pose();
}
