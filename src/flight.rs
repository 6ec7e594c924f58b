//! Per-ship flight update: control interpretation, integration, wrap and
//! landing detection.

use rapier2d::prelude::*;
use tracing::debug;

use crate::components::{ControlIntents, FlightState, Ship, Shot, SoundCue, SpriteVariant};
use crate::config::{MotionMode, PhysicsConfig};
use crate::kinematics::{heading_vector, wrap_degrees};
use crate::level::Level;

/// Translation per tick while thrust is held in the gravity-free modes.
const STEER_SPEED: f32 = 2.0;

/// Read-only world data a ship update needs.
#[derive(Debug, Clone, Copy)]
pub struct FlightContext<'a> {
    pub config: &'a PhysicsConfig,
    pub level: &'a Level,
}

/// Advance one locally simulated ship by one tick.
///
/// Destructing and destroyed ships are left untouched. Sound cues raised by
/// the update are appended to `cues`.
pub fn update_ship(
    ship: &mut Ship,
    intents: ControlIntents,
    ctx: &FlightContext,
    cues: &mut Vec<SoundCue>,
) {
    if !ship.is_alive() {
        return;
    }
    if ship.state == FlightState::Bouncing {
        ship.state = FlightState::Flying;
    }

    let was_thrusting = ship.thrust > 0.0;
    let was_shielded = ship.shielded;
    ship.intents = intents;

    match ctx.config.motion {
        MotionMode::Gravity => gravity_step(ship, intents, ctx, cues),
        MotionMode::Thrust | MotionMode::Basic => steer_step(ship, intents, ctx, cues),
    }

    push_loop_cues(ship, was_thrusting, was_shielded, cues);
    ship.refresh_pose();
}

fn gravity_step(
    ship: &mut Ship,
    intents: ControlIntents,
    ctx: &FlightContext,
    cues: &mut Vec<SoundCue>,
) {
    let config = ctx.config;

    ship.thrust = 0.0;
    ship.shielded = false;
    ship.variant = SpriteVariant::Normal;

    if intents.shield {
        ship.shielded = true;
        ship.variant = SpriteVariant::Shield;
    } else if intents.thrust {
        ship.thrust = config.thrust_max;
        ship.variant = SpriteVariant::Thrust;
        if ship.state == FlightState::Landed {
            debug!(ship = ship.id, "lift off");
            ship.state = FlightState::Flying;
        }
    }

    handle_trigger(ship, intents.shoot, config, cues);

    if ship.state == FlightState::Landed {
        ship.body.halt();
    } else {
        rotate(ship, intents, config);

        let heading = heading_vector(ship.heading);
        let mut acceleration = heading * ship.thrust + vector![0.0, config.gravity];
        if ship.impact != Vector::zeros() {
            acceleration += ship.impact * config.impact_coeff;
            ship.impact = Vector::zeros();
        }
        config.integrator.step(&mut ship.body, acceleration);
    }

    ship.sync_position();
    wrap_position(ship, ctx.level);
    check_landing(ship, ctx, cues);
}

fn steer_step(
    ship: &mut Ship,
    intents: ControlIntents,
    ctx: &FlightContext,
    cues: &mut Vec<SoundCue>,
) {
    ship.shielded = false;
    ship.thrust = 0.0;
    ship.state = FlightState::Flying;
    ship.variant = if intents.thrust {
        SpriteVariant::Thrust
    } else {
        SpriteVariant::Normal
    };

    handle_trigger(ship, intents.shoot, ctx.config, cues);
    rotate(ship, intents, ctx.config);

    ship.body.halt();
    if intents.thrust {
        ship.thrust = ctx.config.thrust_max;
        ship.body.position += heading_vector(ship.heading) * STEER_SPEED;
    }

    ship.sync_position();
    wrap_position(ship, ctx.level);
}

fn rotate(ship: &mut Ship, intents: ControlIntents, config: &PhysicsConfig) {
    if intents.left {
        ship.heading += config.angle_step;
    }
    if intents.right {
        ship.heading -= config.angle_step;
    }
    ship.heading = wrap_degrees(ship.heading);
}

/// Fire on the rising edge of the shoot intent only.
fn handle_trigger(
    ship: &mut Ship,
    shoot_held: bool,
    config: &PhysicsConfig,
    cues: &mut Vec<SoundCue>,
) {
    ship.shoot_edge = shoot_held && !ship.shooting;
    ship.shooting = shoot_held;

    if ship.shoot_edge && ship.shots.len() < config.max_shots {
        ship.shots.push(fire_shot(ship));
        cues.push(SoundCue::Shoot);
    }
}

/// New shot leaving the nose of the ship.
pub fn fire_shot(ship: &Ship) -> Shot {
    let heading = heading_vector(ship.heading);
    let (x, y) = ship.position;
    Shot {
        position: vector![(x + 15) as f32, (y + 16) as f32] + heading * 18.0,
        velocity: heading * 5.1 + ship.body.velocity / 3.5,
    }
}

/// Wormholes first, then the toroidal wrap on each axis. Only the axis that
/// crossed an edge is reset; the other keeps its sub-pixel position.
fn wrap_position(ship: &mut Ship, level: &Level) {
    if let Some(wormhole) = level.wormhole_at(ship.position) {
        let (x, y) = wormhole.destination;
        debug!(ship = ship.id, x, y, "wormhole");
        ship.place_at(x, y);
    }

    let wrapped_x = if ship.position.0 > level.width {
        Some(0)
    } else if ship.position.0 < 0 {
        Some(level.width)
    } else {
        None
    };
    if let Some(x) = wrapped_x {
        ship.body.position.x = x as f32;
        ship.position.0 = x;
    }

    let wrapped_y = if ship.position.1 > level.height {
        Some(0)
    } else if ship.position.1 < 0 {
        Some(level.height)
    } else {
        None
    };
    if let Some(y) = wrapped_y {
        ship.body.position.y = y as f32;
        ship.position.1 = y;
    }
}

/// Landing and bounce response against the first platform touched.
fn check_landing(ship: &mut Ship, ctx: &FlightContext, cues: &mut Vec<SoundCue>) {
    let (x, y) = ship.position;

    let Some(platform) = ctx.level.platforms.iter().find(|platform| {
        let rest = platform.resting_y();
        platform.landing_x_range().contains(&x)
            && (rest..=rest + 3).contains(&y)
            && ship.body.velocity.y > 0.0
            && ctx.config.within_landing_cone(ship.heading)
    }) else {
        return;
    };

    let rest = platform.resting_y();
    let (state, velocity, cue) = touchdown(ship.body.velocity);

    ship.heading = 0.0;
    ship.body.position.y = rest as f32;
    ship.position.1 = rest;
    ship.last_safe = vector![x as f32, rest as f32];
    ship.state = state;
    if state == FlightState::Landed {
        ship.body.halt();
        debug!(ship = ship.id, x, y = rest, "landed");
    } else {
        ship.body.velocity = velocity;
        debug!(ship = ship.id, x, y = rest, "bounce");
    }
    cues.extend(cue);
}

/// Contact response for a ship meeting a platform at `velocity`: the next
/// state, the velocity leaving the pad and the cue to play.
pub fn touchdown(velocity: Vector<f32>) -> (FlightState, Vector<f32>, Option<SoundCue>) {
    let rebound = vector![velocity.x / 1.1, -velocity.y / 1.2];
    let settled = (-1.0..1.0).contains(&rebound.x) && rebound.y > -1.0 && rebound.y < 1.0;
    if settled {
        (FlightState::Landed, Vector::zeros(), None)
    } else {
        (FlightState::Bouncing, rebound, Some(SoundCue::Bounce))
    }
}

fn push_loop_cues(ship: &Ship, was_thrusting: bool, was_shielded: bool, cues: &mut Vec<SoundCue>) {
    let thrusting = ship.thrust > 0.0;
    if thrusting && !was_thrusting {
        cues.push(SoundCue::ThrustStart);
    } else if !thrusting && was_thrusting {
        cues.push(SoundCue::ThrustStop);
    }

    if ship.shielded && !was_shielded {
        cues.push(SoundCue::ShieldStart);
    } else if !ship.shielded && was_shielded {
        cues.push(SoundCue::ShieldStop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ShipRole, ShipSprites};
    use crate::kinematics::truncate;
    use crate::terrain::Color;
    use std::sync::Arc;

    fn level() -> Level {
        Level::get(1).unwrap()
    }

    fn ship_at(x: f32, y: f32) -> Ship {
        Ship::new(
            1,
            ShipRole::Local,
            vector![x, y],
            3,
            Arc::new(ShipSprites::procedural(Color::WHITE)),
        )
    }

    fn tick(ship: &mut Ship, intents: ControlIntents, config: &PhysicsConfig) -> Vec<SoundCue> {
        let level = level();
        let ctx = FlightContext {
            config,
            level: &level,
        };
        let mut cues = Vec::new();
        update_ship(ship, intents, &ctx, &mut cues);
        cues
    }

    #[test]
    fn integer_position_tracks_precise_position() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(300.3, 600.7);
        let script = [
            ControlIntents::thrust(),
            ControlIntents::left(),
            ControlIntents::IDLE,
            ControlIntents::right(),
        ];
        for i in 0..200 {
            tick(&mut ship, script[i % script.len()], &config);
            assert_eq!(ship.position, truncate(ship.body.position));
        }
    }

    #[test]
    fn heading_wraps_both_ways() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(300.0, 600.0);
        for _ in 0..100 {
            tick(&mut ship, ControlIntents::left(), &config);
            assert!((0.0..360.0).contains(&ship.heading));
        }
        assert_eq!(ship.heading, 140.0);
        for _ in 0..100 {
            tick(&mut ship, ControlIntents::right(), &config);
            assert!((0.0..360.0).contains(&ship.heading));
        }
        assert_eq!(ship.heading, 0.0);
    }

    #[test]
    fn slow_descent_lands_with_zero_velocity() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(470.0, 303.0);
        ship.body.velocity = vector![0.2, 0.5];

        tick(&mut ship, ControlIntents::IDLE, &config);

        assert_eq!(ship.state, FlightState::Landed);
        assert_eq!(ship.body.velocity, Vector::zeros());
        assert_eq!(ship.position, (470, 303));
        assert_eq!(ship.last_safe, vector![470.0, 303.0]);
    }

    #[test]
    fn fast_descent_bounces() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(470.0, 303.0);
        ship.body.velocity = vector![0.0, 3.0];

        let cues = tick(&mut ship, ControlIntents::IDLE, &config);

        let incoming = 3.0 * 0.99 + 0.6 * 0.05;
        assert_eq!(ship.state, FlightState::Bouncing);
        assert!((ship.body.velocity.y + incoming / 1.2).abs() < 1e-5);
        assert!(cues.contains(&SoundCue::Bounce));
        assert_eq!(ship.position.1, 303);

        tick(&mut ship, ControlIntents::IDLE, &config);
        assert_ne!(ship.state, FlightState::Bouncing);
    }

    #[test]
    fn steep_heading_does_not_land() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(470.0, 303.0);
        ship.heading = 90.0;
        ship.body.velocity = vector![0.0, 0.5];

        tick(&mut ship, ControlIntents::IDLE, &config);
        assert_eq!(ship.state, FlightState::Flying);
    }

    #[test]
    fn shooting_is_edge_triggered() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(300.0, 600.0);

        for _ in 0..10 {
            tick(&mut ship, ControlIntents::shoot(), &config);
        }
        assert_eq!(ship.shots.len(), 1);

        tick(&mut ship, ControlIntents::IDLE, &config);
        tick(&mut ship, ControlIntents::shoot(), &config);
        assert_eq!(ship.shots.len(), 2);
    }

    #[test]
    fn shot_count_is_capped() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(300.0, 600.0);
        for _ in 0..(config.max_shots * 2) {
            tick(&mut ship, ControlIntents::shoot(), &config);
            tick(&mut ship, ControlIntents::IDLE, &config);
        }
        assert_eq!(ship.shots.len(), config.max_shots);
    }

    #[test]
    fn shot_leaves_the_nose() {
        let ship = ship_at(100.0, 100.0);
        let shot = fire_shot(&ship);
        assert!((shot.position.x - 115.0).abs() < 1e-4);
        assert!((shot.position.y - (116.0 - 18.0)).abs() < 1e-4);
        assert!((shot.velocity.y + 5.1).abs() < 1e-4);
    }

    #[test]
    fn thrust_lifts_off_a_landed_ship() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(470.0, 303.0);
        ship.state = FlightState::Landed;

        let cues = tick(&mut ship, ControlIntents::thrust(), &config);
        assert_eq!(ship.state, FlightState::Flying);
        assert!(ship.body.velocity.y < 0.0);
        assert!(cues.contains(&SoundCue::ThrustStart));
        assert_eq!(ship.variant, SpriteVariant::Thrust);
    }

    #[test]
    fn landed_ship_does_not_rotate() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(470.0, 303.0);
        ship.state = FlightState::Landed;

        tick(&mut ship, ControlIntents::left(), &config);
        assert_eq!(ship.heading, 0.0);
        assert_eq!(ship.state, FlightState::Landed);
    }

    #[test]
    fn shield_suppresses_thrust() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(300.0, 600.0);
        let intents = ControlIntents {
            thrust: true,
            shield: true,
            ..ControlIntents::IDLE
        };

        let cues = tick(&mut ship, intents, &config);
        assert!(ship.shielded);
        assert_eq!(ship.thrust, 0.0);
        assert_eq!(ship.variant, SpriteVariant::Shield);
        assert!(cues.contains(&SoundCue::ShieldStart));

        let cues = tick(&mut ship, ControlIntents::IDLE, &config);
        assert!(cues.contains(&SoundCue::ShieldStop));
    }

    #[test]
    fn pending_impact_is_consumed() {
        let config = PhysicsConfig::default();
        let mut pushed = ship_at(300.0, 600.0);
        let mut still = pushed.clone();
        pushed.impact = vector![10.0, 0.0];

        tick(&mut pushed, ControlIntents::IDLE, &config);
        tick(&mut still, ControlIntents::IDLE, &config);

        assert_eq!(pushed.impact, Vector::zeros());
        assert!(pushed.body.velocity.x > still.body.velocity.x);
    }

    #[test]
    fn leaving_the_left_edge_wraps_right() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(-1.5, 600.0);

        tick(&mut ship, ControlIntents::IDLE, &config);
        assert_eq!(ship.position.0, level().width);
        assert_eq!(ship.body.position.x, level().width as f32);
    }

    #[test]
    fn wrap_keeps_the_other_axis_precise() {
        let config = PhysicsConfig::default();
        let level = Level::get(2).unwrap();
        let ctx = FlightContext {
            config: &config,
            level: &level,
        };
        let mut ship = ship_at(-1.5, 600.75);

        update_ship(&mut ship, ControlIntents::IDLE, &ctx, &mut Vec::new());

        assert_eq!(ship.position, (level.width, 600));
        assert_eq!(ship.body.position.x, level.width as f32);
        assert!(ship.body.position.y > 600.75);
        assert_ne!(ship.body.position.y.fract(), 0.0);
    }

    #[test]
    fn touchdown_settles_slow_contact() {
        let (state, velocity, cue) = touchdown(vector![0.5, 1.1]);
        assert_eq!(state, FlightState::Landed);
        assert_eq!(velocity, Vector::zeros());
        assert_eq!(cue, None);

        let (state, velocity, cue) = touchdown(vector![2.2, 2.4]);
        assert_eq!(state, FlightState::Bouncing);
        assert!((velocity.x - 2.0).abs() < 1e-5);
        assert!((velocity.y + 2.0).abs() < 1e-5);
        assert_eq!(cue, Some(SoundCue::Bounce));
    }

    #[test]
    fn wormhole_teleports() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(180.0, 150.0);

        tick(&mut ship, ControlIntents::IDLE, &config);
        assert_eq!(ship.position, (344, 1052));
        assert_eq!(ship.body.position, vector![344.0, 1052.0]);
    }

    #[test]
    fn basic_mode_translates_without_gravity() {
        let config = PhysicsConfig {
            motion: MotionMode::Basic,
            ..PhysicsConfig::default()
        };
        let mut ship = ship_at(300.0, 600.0);

        tick(&mut ship, ControlIntents::IDLE, &config);
        assert_eq!(ship.body.position, vector![300.0, 600.0]);

        tick(&mut ship, ControlIntents::thrust(), &config);
        assert!((ship.body.position.y - 598.0).abs() < 1e-4);
        assert_eq!(ship.position, (300, 598));
    }

    #[test]
    fn destructing_ship_ignores_input() {
        let config = PhysicsConfig::default();
        let mut ship = ship_at(300.0, 600.0);
        ship.state = FlightState::Destructing { elapsed: 3 };

        tick(&mut ship, ControlIntents::thrust(), &config);
        assert_eq!(ship.body.position, vector![300.0, 600.0]);
        assert_eq!(ship.thrust, 0.0);
    }
}
