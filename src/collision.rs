//! Pixel-exact collision passes.
//!
//! Each pass runs over every ship in play in slot order, and a ship hit by
//! an earlier check is already marked destructing for later checks in the
//! same tick.

use rapier2d::prelude::*;
use tracing::debug;

use crate::components::{Platform, Ship, ShipId, Shot};
use crate::config::{CollisionStrategy, PhysicsConfig};
use crate::terrain::{Color, Rect, TerrainBuffer};

/// Outcome of a single collision check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Terrain(ShipId),
    Ships(ShipId, ShipId),
    Projectile { attacker: ShipId, defender: ShipId },
    /// Hit absorbed by a shield.
    Deflected { attacker: ShipId, defender: ShipId },
}

/// Shield resting on a strip, or thrust right above one, skips the terrain
/// test so the strip itself cannot destroy the ship.
pub fn terrain_exempt(ship: &Ship, platforms: &[Platform], config: &PhysicsConfig) -> bool {
    let (x, y) = ship.position;
    platforms.iter().any(|platform| {
        let rest = platform.resting_y();
        if !platform.landing_x_range().contains(&x) {
            return false;
        }
        let shield_rest = ship.shielded
            && (rest - 1..=rest + 3).contains(&y)
            && config.within_landing_cone(ship.heading);
        let thrust_hover = ship.thrust > 0.0 && (rest - 1..=rest + 1).contains(&y);
        shield_rest || thrust_hover
    })
}

/// Does the ship's rotated mask touch any solid terrain pixel?
pub fn hits_terrain(ship: &Ship, terrain: &TerrainBuffer, strategy: CollisionStrategy) -> bool {
    let mask = &ship.pose.mask;
    let origin = ship.mask_origin();
    match strategy {
        CollisionStrategy::SpriteWindow => {
            let region = Rect::new(origin.0, origin.1, mask.width(), mask.height());
            let (window, window_origin) = terrain.solid_mask(region);
            let offset = (origin.0 - window_origin.0, origin.1 - window_origin.1);
            window.overlap(mask, offset).is_some()
        }
        CollisionStrategy::FullBuffer => terrain.full_mask().overlap(mask, origin).is_some(),
    }
}

/// Ship-vs-terrain for every live ship in play.
pub fn terrain_pass(
    ships: &mut [Ship],
    terrain: &TerrainBuffer,
    platforms: &[Platform],
    config: &PhysicsConfig,
    events: &mut Vec<Collision>,
) {
    for ship in ships.iter_mut() {
        if !ship.in_play() || !ship.is_alive() || terrain_exempt(ship, platforms, config) {
            continue;
        }
        if hits_terrain(ship, terrain, config.collision) {
            debug!(ship = ship.id, x = ship.position.0, y = ship.position.1, "terrain collision");
            ship.destruct();
            events.push(Collision::Terrain(ship.id));
        }
    }
}

/// Pairwise ship-vs-ship. A live ship tests itself against every other ship
/// still present and both are destroyed on overlap.
pub fn ship_pass(ships: &mut [Ship], events: &mut Vec<Collision>) {
    for i in 0..ships.len() {
        if !ships[i].in_play() || !ships[i].is_alive() {
            continue;
        }
        for j in 0..ships.len() {
            if i == j || !ships[j].in_play() || !ships[j].is_tangible() {
                continue;
            }
            let (a, b) = (&ships[i], &ships[j]);
            let (ax, ay) = a.mask_origin();
            let (bx, by) = b.mask_origin();
            if a.pose.mask.overlap(&b.pose.mask, (bx - ax, by - ay)).is_none() {
                continue;
            }
            let pair = (a.id, b.id);
            debug!(a = pair.0, b = pair.1, "ship collision");
            ships[i].destruct();
            ships[j].destruct();
            events.push(Collision::Ships(pair.0, pair.1));
        }
    }
}

/// Opposing shots and debris against live defenders.
///
/// An unshielded hit ends the attacker's checks for this tick. A shielded
/// defender keeps the projectile's velocity as its pending impact.
pub fn projectile_pass(ships: &mut [Ship], events: &mut Vec<Collision>) {
    for a in 0..ships.len() {
        if !ships[a].in_play() {
            continue;
        }
        let attacker = ships[a].id;
        let projectiles: Vec<((i32, i32), Vector<f32>)> = ships[a]
            .shots
            .iter()
            .map(|shot| (shot.screen_position(), shot.velocity))
            .chain(
                ships[a]
                    .debris
                    .iter()
                    .map(|debris| (debris.screen_position(), debris.body.velocity)),
            )
            .collect();
        if projectiles.is_empty() {
            continue;
        }

        'defenders: for d in 0..ships.len() {
            if d == a || !ships[d].in_play() || !ships[d].is_alive() {
                continue;
            }
            let defender = &mut ships[d];
            let (ox, oy) = defender.mask_origin();
            for &((px, py), velocity) in &projectiles {
                if !defender.pose.mask.get(px - ox, py - oy) {
                    continue;
                }
                if defender.shielded {
                    defender.impact = velocity;
                    events.push(Collision::Deflected {
                        attacker,
                        defender: defender.id,
                    });
                } else {
                    debug!(attacker, defender = defender.id, "projectile hit");
                    defender.destruct();
                    events.push(Collision::Projectile {
                        attacker,
                        defender: defender.id,
                    });
                    break 'defenders;
                }
            }
        }
    }
}

/// Move shots one step and paint them. A shot is retired when it lands on a
/// solid pixel or leaves the buffer.
pub fn plot_shots(shots: &mut Vec<Shot>, terrain: &mut TerrainBuffer) {
    shots.retain_mut(|shot| {
        shot.position += shot.velocity;
        let (x, y) = shot.screen_position();
        match terrain.is_solid(x, y) {
            None => false,
            Some(solid) => {
                terrain.set_pixel(x, y, Color::WHITE);
                !solid
            }
        }
    });
}
