//! Entity data for Mayhem
//!
//! Ships, their shots and debris, landing platforms and the control intents
//! that drive a ship. Behaviour lives in the flight, collision and explosion
//! modules; this module only holds state and its small invariants.

use std::sync::Arc;

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::kinematics::{Body, truncate};
use crate::terrain::{Color, Mask, Sprite};

/// Ship slot inside a room, 1 to 4.
pub type ShipId = u8;
pub type RoomId = u32;
pub type LevelId = u8;

pub const MAX_SHIPS: usize = 4;
pub const SHIP_SPRITE_SIZE: i32 = 32;

/// Boolean control intents sampled once per tick for one ship.
///
/// Serialized as the tuple `(left, right, thrust, shield, shoot)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(bool, bool, bool, bool, bool)", into = "(bool, bool, bool, bool, bool)")]
pub struct ControlIntents {
    pub left: bool,
    pub right: bool,
    pub thrust: bool,
    pub shield: bool,
    pub shoot: bool,
}

impl ControlIntents {
    pub const IDLE: ControlIntents = ControlIntents {
        left: false,
        right: false,
        thrust: false,
        shield: false,
        shoot: false,
    };

    pub fn thrust() -> Self {
        Self {
            thrust: true,
            ..Self::IDLE
        }
    }

    pub fn shoot() -> Self {
        Self {
            shoot: true,
            ..Self::IDLE
        }
    }

    pub fn shield() -> Self {
        Self {
            shield: true,
            ..Self::IDLE
        }
    }

    pub fn left() -> Self {
        Self {
            left: true,
            ..Self::IDLE
        }
    }

    pub fn right() -> Self {
        Self {
            right: true,
            ..Self::IDLE
        }
    }
}

impl From<(bool, bool, bool, bool, bool)> for ControlIntents {
    fn from((left, right, thrust, shield, shoot): (bool, bool, bool, bool, bool)) -> Self {
        Self {
            left,
            right,
            thrust,
            shield,
            shoot,
        }
    }
}

impl From<ControlIntents> for (bool, bool, bool, bool, bool) {
    fn from(c: ControlIntents) -> Self {
        (c.left, c.right, c.thrust, c.shield, c.shoot)
    }
}

/// Where a ship is in its flight lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Flying,
    Landed,
    /// Touched a platform too fast this tick; back to `Flying` next tick.
    Bouncing,
    /// Exploding. `elapsed` counts explosion ticks already advanced; 0 means
    /// the collision happened this tick and debris has not spawned yet.
    Destructing { elapsed: u32 },
    /// Out of lives. Terminal.
    Destroyed,
}

impl FlightState {
    pub fn is_airborne(&self) -> bool {
        matches!(self, FlightState::Flying | FlightState::Bouncing)
    }
}

/// Which sprite a ship currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteVariant {
    Normal,
    Thrust,
    Shield,
}

/// Who drives a ship slot on this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipRole {
    /// Simulated here from control intents.
    Local,
    /// Mirrored from peer updates; never integrated.
    Shadow,
    /// Slot not in play (no peer has reported it yet).
    Absent,
}

/// Audio cues raised by the simulation; playback is up to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    ThrustStart,
    ThrustStop,
    ShieldStart,
    ShieldStop,
    Shoot,
    Bounce,
    Explosion,
    /// Silence every loop the ship owns.
    StopAll,
}

/// Horizontal landing strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub min_x: i32,
    pub max_x: i32,
    pub flat_y: i32,
}

impl Platform {
    pub const fn new(min_x: i32, max_x: i32, flat_y: i32) -> Self {
        Self {
            min_x,
            max_x,
            flat_y,
        }
    }

    /// Ship x range (sprite top-left) that rests on the strip.
    pub fn landing_x_range(&self) -> std::ops::RangeInclusive<i32> {
        (self.min_x - (SHIP_SPRITE_SIZE - 23))..=(self.max_x - (SHIP_SPRITE_SIZE - 9))
    }

    /// Ship y (sprite top-left) when resting on the strip.
    pub fn resting_y(&self) -> i32 {
        self.flat_y - (SHIP_SPRITE_SIZE - 2)
    }

    /// Spawn point of a ship assigned to this platform.
    pub fn spawn_point(&self) -> Vector<f32> {
        vector![
            (self.min_x + self.max_x) as f32 / 2.0 - 16.0,
            (self.flat_y - 29) as f32
        ]
    }
}

/// Projectile fired by a ship.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub position: Vector<f32>,
    /// Displacement per tick.
    pub velocity: Vector<f32>,
}

impl Shot {
    pub fn screen_position(&self) -> (i32, i32) {
        truncate(self.position)
    }
}

/// Wreck particle thrown out by an exploding ship.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Debris {
    pub body: Body,
    /// One-shot outward push, consumed on the first explosion tick.
    pub impulse: f32,
    /// Launch angle in degrees.
    pub angle: f32,
}

impl Debris {
    pub fn screen_position(&self) -> (i32, i32) {
        self.body.screen_position()
    }
}

/// The three images a ship can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipSprites {
    pub normal: Sprite,
    pub thrust: Sprite,
    pub shield: Sprite,
}

impl ShipSprites {
    pub fn get(&self, variant: SpriteVariant) -> &Sprite {
        match variant {
            SpriteVariant::Normal => &self.normal,
            SpriteVariant::Thrust => &self.thrust,
            SpriteVariant::Shield => &self.shield,
        }
    }

    /// Built-in lander art for headless runs: a hull with two legs, a flame
    /// under it when thrusting and a ring when shielded. The three lowest
    /// rows stay empty so a resting ship does not touch the strip.
    pub fn procedural(hull: Color) -> Self {
        let size = SHIP_SPRITE_SIZE;
        let mut normal = Sprite::new(size, size, Color::BLACK);
        for y in 4..=21 {
            let half = (y - 4) * 6 / 17;
            for x in (15 - half)..=(16 + half) {
                normal.set(x, y, hull);
            }
        }
        for x in 9..=22 {
            normal.set(x, 22, hull);
        }
        for y in 23..=25 {
            for x in [9, 10, 21, 22] {
                normal.set(x, y, hull);
            }
        }

        let mut thrust = normal.clone();
        for y in 23..=27 {
            for x in 14..=17 {
                thrust.set(x, y, Color(255, 160, 32));
            }
        }

        let mut shield = normal.clone();
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 + 0.5 - 16.0;
                let dy = y as f32 + 0.5 - 16.0;
                let distance = (dx * dx + dy * dy).sqrt();
                if (distance - 13.5).abs() < 0.75 {
                    shield.set(x, y, Color(96, 160, 255));
                }
            }
        }

        Self {
            normal,
            thrust,
            shield,
        }
    }
}

/// Rotated image and mask for one (heading, variant) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub heading: f32,
    pub variant: SpriteVariant,
    pub image: Sprite,
    pub mask: Mask,
    /// Shift from the ship position to the rotated image's top-left corner.
    pub offset: (i32, i32),
}

impl Pose {
    pub fn new(sprites: &ShipSprites, heading: f32, variant: SpriteVariant) -> Self {
        let image = sprites.get(variant).rotated(heading);
        let mask = image.mask();
        let offset = (
            (SHIP_SPRITE_SIZE - image.width()) / 2,
            (SHIP_SPRITE_SIZE - image.height()) / 2,
        );
        Self {
            heading,
            variant,
            image,
            mask,
            offset,
        }
    }
}

/// A ship slot: kinematics, lifecycle state, owned shots and debris.
#[derive(Debug, Clone)]
pub struct Ship {
    pub id: ShipId,
    pub role: ShipRole,
    pub player_name: String,
    pub body: Body,
    /// Truncation of `body.position`, refreshed every tick.
    pub position: (i32, i32),
    /// Degrees in `[0, 360)`, counter-clockwise from upright.
    pub heading: f32,
    pub thrust: f32,
    pub state: FlightState,
    pub shielded: bool,
    pub shooting: bool,
    /// Set on the tick the shoot intent goes from released to held.
    pub shoot_edge: bool,
    /// Hit during the current tick. Cleared by `begin_tick`.
    pub hit_this_tick: bool,
    /// Velocity received from shots/debris while shielded, consumed next tick.
    pub impact: Vector<f32>,
    pub lives: u32,
    pub last_safe: Vector<f32>,
    pub shots: Vec<Shot>,
    pub debris: Vec<Debris>,
    /// Intents applied on the last update (mirrored to peers).
    pub intents: ControlIntents,
    pub variant: SpriteVariant,
    pub pose: Pose,
    sprites: Arc<ShipSprites>,
}

impl Ship {
    pub fn new(
        id: ShipId,
        role: ShipRole,
        spawn: Vector<f32>,
        lives: u32,
        sprites: Arc<ShipSprites>,
    ) -> Self {
        let body = Body::at(spawn);
        let pose = Pose::new(&sprites, 0.0, SpriteVariant::Normal);
        Self {
            id,
            role,
            player_name: String::new(),
            position: body.screen_position(),
            body,
            heading: 0.0,
            thrust: 0.0,
            state: FlightState::Flying,
            shielded: false,
            shooting: false,
            shoot_edge: false,
            hit_this_tick: false,
            impact: Vector::zeros(),
            lives,
            last_safe: spawn,
            shots: Vec::new(),
            debris: Vec::new(),
            intents: ControlIntents::IDLE,
            variant: SpriteVariant::Normal,
            pose,
            sprites,
        }
    }

    pub fn sprites(&self) -> &Arc<ShipSprites> {
        &self.sprites
    }

    pub fn set_sprites(&mut self, sprites: Arc<ShipSprites>) {
        self.sprites = sprites;
        self.pose = Pose::new(&self.sprites, self.heading, self.variant);
    }

    /// Takes part in this tick's collision and draw passes.
    pub fn in_play(&self) -> bool {
        self.role != ShipRole::Absent
    }

    /// Flying, landed or bouncing: controllable and vulnerable.
    pub fn is_alive(&self) -> bool {
        matches!(
            self.state,
            FlightState::Flying | FlightState::Landed | FlightState::Bouncing
        )
    }

    /// Still physically present for ship-vs-ship tests. A ship hit earlier in
    /// the same tick keeps its hull; from the next tick on it is a wreck.
    pub fn is_tangible(&self) -> bool {
        self.is_alive() || (self.hit_this_tick && self.is_destructing())
    }

    /// Forget hits recorded during the previous tick.
    pub fn begin_tick(&mut self) {
        self.hit_this_tick = false;
    }

    pub fn is_destructing(&self) -> bool {
        matches!(self.state, FlightState::Destructing { .. })
    }

    pub fn is_landed(&self) -> bool {
        self.state == FlightState::Landed
    }

    pub fn is_game_over(&self) -> bool {
        self.state == FlightState::Destroyed
    }

    /// Recompute the integer position from the precise one.
    pub fn sync_position(&mut self) {
        self.position = self.body.screen_position();
    }

    /// Move both precise and integer positions to a pixel.
    pub fn place_at(&mut self, x: i32, y: i32) {
        self.body.position = vector![x as f32, y as f32];
        self.position = (x, y);
    }

    /// Top-left corner of the rotated mask in terrain coordinates.
    pub fn mask_origin(&self) -> (i32, i32) {
        (
            self.position.0 + self.pose.offset.0,
            self.position.1 + self.pose.offset.1,
        )
    }

    /// Rebuild the rotated sprite and mask if heading or image changed.
    pub fn refresh_pose(&mut self) {
        if self.pose.heading != self.heading || self.pose.variant != self.variant {
            self.pose = Pose::new(&self.sprites, self.heading, self.variant);
        }
    }

    /// Mark the ship as hit. Has no effect unless it is alive.
    pub fn destruct(&mut self) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state = FlightState::Destructing { elapsed: 0 };
        self.hit_this_tick = true;
        true
    }

    /// End of an explosion: back to the last safe landing spot with one life
    /// less, or out of the game.
    pub fn respawn(&mut self) {
        self.body = Body::at(self.last_safe);
        self.sync_position();
        self.impact = Vector::zeros();
        self.heading = 0.0;
        self.thrust = 0.0;
        self.shielded = false;
        self.shooting = false;
        self.shoot_edge = false;
        self.hit_this_tick = false;
        self.debris.clear();
        self.variant = SpriteVariant::Normal;
        self.refresh_pose();

        self.lives = self.lives.saturating_sub(1);
        self.state = if self.lives == 0 {
            FlightState::Destroyed
        } else {
            FlightState::Flying
        };
    }
}
