//! Destruction sequence: debris burst, cosmetic flash and respawn.

use rand::Rng;
use rapier2d::prelude::*;
use tracing::debug;

use crate::components::{Debris, FlightState, SHIP_SPRITE_SIZE, Ship, SoundCue};
use crate::config::PhysicsConfig;
use crate::kinematics::{Body, heading_vector};
use crate::terrain::{Color, TerrainBuffer};

pub const DEBRIS_COUNT: usize = 8;
pub const DEBRIS_IMPULSE: f32 = 8.0;
const DEBRIS_FIRST_ANGLE: f32 = 22.0;
const DEBRIS_SPACING: f32 = 45.0;
const DEBRIS_DISTANCE: f32 = 20.0;
/// Debris falls faster than ships.
const DEBRIS_GRAVITY_SCALE: f32 = 5.0;
const BURST_RADIUS: f32 = 32.0;

/// One pixel of the explosion flash. Purely visual: never written into the
/// terrain buffer and never collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstParticle {
    pub x: i32,
    pub y: i32,
    pub color: Color,
}

/// How a finished explosion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplosionOutcome {
    Respawned,
    GameOver,
}

/// Eight debris pieces evenly spread around the ship's centre.
pub fn spawn_debris(ship: &Ship) -> Vec<Debris> {
    let (x, y) = ship.position;
    let centre = vector![(x + 15) as f32, (y + 16) as f32];
    (0..DEBRIS_COUNT)
        .map(|i| {
            let angle = DEBRIS_FIRST_ANGLE + DEBRIS_SPACING * i as f32;
            Debris {
                body: Body::at(centre + heading_vector(angle) * DEBRIS_DISTANCE),
                impulse: DEBRIS_IMPULSE,
                angle,
            }
        })
        .collect()
}

/// Advance a destructing ship by one explosion tick. Returns the outcome
/// once the sequence is over, `None` while it runs or if the ship is not
/// exploding.
pub fn advance_explosion(
    ship: &mut Ship,
    terrain: &mut TerrainBuffer,
    config: &PhysicsConfig,
    rng: &mut impl Rng,
    burst: &mut Vec<BurstParticle>,
    cues: &mut Vec<SoundCue>,
) -> Option<ExplosionOutcome> {
    let FlightState::Destructing { elapsed } = ship.state else {
        return None;
    };

    if elapsed == 0 {
        cues.push(SoundCue::StopAll);
        cues.push(SoundCue::Explosion);
        ship.debris = spawn_debris(ship);
        debug!(ship = ship.id, x = ship.position.0, y = ship.position.1, "explosion");
    } else {
        emit_burst(ship, elapsed, config.explosion_ticks(), rng, burst);
        move_debris(&mut ship.debris, terrain, config);
    }

    let elapsed = elapsed + 1;
    if elapsed <= config.explosion_ticks() {
        ship.state = FlightState::Destructing { elapsed };
        return None;
    }

    ship.respawn();
    if ship.is_game_over() {
        debug!(ship = ship.id, "game over");
        Some(ExplosionOutcome::GameOver)
    } else {
        debug!(ship = ship.id, lives = ship.lives, "respawn");
        Some(ExplosionOutcome::Respawned)
    }
}

/// One ballistic step per piece. A piece is dropped when it lands on solid
/// terrain or leaves the buffer, otherwise painted white.
pub fn move_debris(debris: &mut Vec<Debris>, terrain: &mut TerrainBuffer, config: &PhysicsConfig) {
    let gravity = vector![0.0, config.gravity * DEBRIS_GRAVITY_SCALE];
    debris.retain_mut(|piece| {
        let push = heading_vector(piece.angle) * piece.impulse + gravity;
        config.integrator.step(&mut piece.body, push);
        piece.impulse = 0.0;

        let (x, y) = piece.screen_position();
        match terrain.is_solid(x, y) {
            None => false,
            Some(solid) => {
                terrain.set_pixel(x, y, Color::WHITE);
                !solid
            }
        }
    });
}

/// Random pixels in a disc shrinking linearly to nothing over the sequence.
fn emit_burst(
    ship: &Ship,
    elapsed: u32,
    duration: u32,
    rng: &mut impl Rng,
    burst: &mut Vec<BurstParticle>,
) {
    let half = SHIP_SPRITE_SIZE / 2;
    let (cx, cy) = (
        (ship.position.0 + half) as f32,
        (ship.position.1 + half) as f32,
    );
    let shrink = (1.0 - elapsed as f32 / duration.max(1) as f32).max(0.0);
    let radius = BURST_RADIUS * shrink;
    let grey = Color::grey(200u32.saturating_sub(elapsed) as u8);
    let count = 240u32.saturating_sub(elapsed) / 4;

    burst.extend((0..count).map(|_| {
        let r = radius * rng.random::<f32>().sqrt();
        let theta = rng.random::<f32>() * std::f32::consts::TAU;
        BurstParticle {
            x: (cx + r * theta.cos()) as i32,
            y: (cy + r * theta.sin()) as i32,
            color: grey,
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ShipRole, ShipSprites};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn exploding_ship(lives: u32) -> Ship {
        let mut ship = Ship::new(
            2,
            ShipRole::Local,
            vector![200.0, 200.0],
            lives,
            Arc::new(ShipSprites::procedural(Color::WHITE)),
        );
        ship.last_safe = vector![50.0, 60.0];
        ship.state = FlightState::Destructing { elapsed: 0 };
        ship
    }

    struct Run {
        terrain: TerrainBuffer,
        config: PhysicsConfig,
        rng: StdRng,
        burst: Vec<BurstParticle>,
        cues: Vec<SoundCue>,
    }

    impl Run {
        fn new() -> Self {
            Self {
                terrain: TerrainBuffer::new(400, 400, Color::BLACK),
                config: PhysicsConfig::default(),
                rng: StdRng::seed_from_u64(7),
                burst: Vec::new(),
                cues: Vec::new(),
            }
        }

        fn tick(&mut self, ship: &mut Ship) -> Option<ExplosionOutcome> {
            self.burst.clear();
            self.cues.clear();
            advance_explosion(
                ship,
                &mut self.terrain,
                &self.config,
                &mut self.rng,
                &mut self.burst,
                &mut self.cues,
            )
        }
    }

    #[test]
    fn eight_pieces_at_even_spacing() {
        let ship = exploding_ship(3);
        let debris = spawn_debris(&ship);
        assert_eq!(debris.len(), DEBRIS_COUNT);

        let centre = vector![215.0, 216.0];
        for (i, piece) in debris.iter().enumerate() {
            assert_eq!(piece.angle, 22.0 + 45.0 * i as f32);
            assert_eq!(piece.impulse, DEBRIS_IMPULSE);
            assert_eq!(piece.body.velocity, Vector::zeros());
            assert!(((piece.body.position - centre).magnitude() - 20.0).abs() < 1e-3);
        }
        for pair in debris.windows(2) {
            assert_eq!(pair[1].angle - pair[0].angle, 45.0);
        }
    }

    #[test]
    fn first_tick_spawns_debris_and_silences_ship() {
        let mut run = Run::new();
        let mut ship = exploding_ship(3);

        assert_eq!(run.tick(&mut ship), None);
        assert_eq!(ship.debris.len(), DEBRIS_COUNT);
        assert_eq!(ship.state, FlightState::Destructing { elapsed: 1 });
        assert_eq!(run.cues, vec![SoundCue::StopAll, SoundCue::Explosion]);
        assert!(run.burst.is_empty());
    }

    #[test]
    fn debris_flies_outward_once() {
        let mut run = Run::new();
        let mut ship = exploding_ship(3);
        run.tick(&mut ship);
        let before: Vec<_> = ship.debris.iter().map(|d| d.body.position).collect();

        run.tick(&mut ship);
        let centre = vector![215.0, 216.0];
        for (piece, start) in ship.debris.iter().zip(&before) {
            assert_eq!(piece.impulse, 0.0);
            assert!((piece.body.position - centre).magnitude() > (start - centre).magnitude() - 1.0);
            let (x, y) = piece.screen_position();
            assert_eq!(run.terrain.get_pixel(x, y), Some(Color::WHITE));
        }
    }

    #[test]
    fn debris_stops_on_solid_terrain() {
        let config = PhysicsConfig::default();
        let mut terrain = TerrainBuffer::new(400, 400, Color::BLACK);
        let mut debris = vec![
            Debris {
                body: Body::at(vector![100.2, 100.2]),
                impulse: 0.0,
                angle: 0.0,
            },
            Debris {
                body: Body::at(vector![0.1, 100.0]),
                impulse: DEBRIS_IMPULSE,
                angle: 90.0,
            },
        ];
        terrain.set_pixel(100, 100, Color(1, 1, 1));

        move_debris(&mut debris, &mut terrain, &config);
        assert!(debris.is_empty());
    }

    #[test]
    fn burst_shrinks_and_stays_off_the_terrain() {
        let mut run = Run::new();
        let mut ship = exploding_ship(3);
        run.tick(&mut ship);
        run.tick(&mut ship);

        assert_eq!(run.burst.len(), (240 - 1) / 4);
        for particle in &run.burst {
            assert_eq!(particle.color, Color::grey(199));
            assert!((particle.x - 216).abs() <= 32 && (particle.y - 216).abs() <= 32);
        }
        let painted = (0..400)
            .flat_map(|y| (0..400).map(move |x| (x, y)))
            .filter(|&(x, y)| run.terrain.is_solid(x, y) == Some(true))
            .count();
        assert!(painted <= DEBRIS_COUNT);
    }

    #[test]
    fn sequence_ends_with_respawn() {
        let mut run = Run::new();
        let mut ship = exploding_ship(3);
        let duration = run.config.explosion_ticks();

        for _ in 0..duration {
            assert_eq!(run.tick(&mut ship), None);
        }
        assert_eq!(ship.state, FlightState::Destructing { elapsed: duration });

        assert_eq!(run.tick(&mut ship), Some(ExplosionOutcome::Respawned));
        assert_eq!(ship.lives, 2);
        assert_eq!(ship.body.position, vector![50.0, 60.0]);
        assert_eq!(ship.position, (50, 60));
        assert!(ship.debris.is_empty());
        assert_eq!(ship.state, FlightState::Flying);
    }

    #[test]
    fn last_life_ends_the_game() {
        let mut run = Run::new();
        let mut ship = exploding_ship(1);
        let duration = run.config.explosion_ticks();

        for _ in 0..duration {
            run.tick(&mut ship);
        }
        assert_eq!(run.tick(&mut ship), Some(ExplosionOutcome::GameOver));
        assert_eq!(ship.state, FlightState::Destroyed);
        assert_eq!(ship.lives, 0);
        assert_eq!(run.tick(&mut ship), None);
        assert_eq!(ship.state, FlightState::Destroyed);
    }
}
