use mayhem::collision::Collision;
use mayhem::components::{ControlIntents, FlightState, MAX_SHIPS};
use mayhem::config::PhysicsConfig;
use mayhem::explosion::ExplosionOutcome;
use mayhem::simulation::{GameSimulation, SessionMode};

const IDLE: [ControlIntents; MAX_SHIPS] = [ControlIntents::IDLE; MAX_SHIPS];

/// Two local ships on level 6, settled, with ship 2 hovering above ship 1.
fn duel() -> GameSimulation {
    let mut sim = GameSimulation::new(
        PhysicsConfig::default(),
        6,
        SessionMode::Offline { players: 2 },
    )
    .unwrap();
    sim.step(IDLE).unwrap();
    assert!(sim.ships().iter().take(2).all(|ship| ship.is_landed()));

    let target = sim.ship_mut(2).unwrap();
    target.place_at(472, 243);
    target.state = FlightState::Flying;
    sim
}

#[test]
fn shot_ship_explodes_and_respawns_on_its_last_platform() {
    let mut sim = duel();

    let mut intents = IDLE;
    intents[0] = ControlIntents::shoot();
    sim.step(intents).unwrap();
    assert_eq!(sim.ship(1).unwrap().shots.len(), 1);

    // Ship 1 shields so the falling wreckage cannot take it down too.
    intents[0] = ControlIntents::shield();

    let mut hit_tick = None;
    for _ in 0..20 {
        let result = sim.step(intents).unwrap();
        if result.collisions.contains(&Collision::Projectile {
            attacker: 1,
            defender: 2,
        }) {
            hit_tick = Some(result.tick);
            break;
        }
    }
    let hit_tick = hit_tick.expect("shot never reached ship 2");
    assert!(sim.ship(2).unwrap().is_destructing());
    assert!(sim.ship(1).unwrap().is_alive());

    let mut respawn_tick = None;
    for _ in 0..200 {
        let result = sim.step(intents).unwrap();
        if result.outcomes.contains(&(2, ExplosionOutcome::Respawned)) {
            respawn_tick = Some(result.tick);
            break;
        }
    }
    let respawn_tick = respawn_tick.expect("ship 2 never respawned");

    assert_eq!(respawn_tick - hit_tick, 121);
    let ship = sim.ship(2).unwrap();
    assert_eq!(ship.position, (77, 1015));
    assert_eq!(ship.lives, 9);
    assert_eq!(ship.state, FlightState::Flying);
    assert!(ship.debris.is_empty());
    assert!(sim.ship(1).unwrap().is_alive());
}

#[test]
fn shielded_ship_is_pushed_instead_of_destroyed() {
    let mut sim = duel();

    let mut intents = IDLE;
    intents[0] = ControlIntents::shoot();
    intents[1] = ControlIntents::shield();
    sim.step(intents).unwrap();
    intents[0] = ControlIntents::IDLE;

    let mut deflected = false;
    for _ in 0..20 {
        let result = sim.step(intents).unwrap();
        if result.collisions.contains(&Collision::Deflected {
            attacker: 1,
            defender: 2,
        }) {
            deflected = true;
            assert_ne!(sim.ship(2).unwrap().impact.y, 0.0);
            break;
        }
    }
    assert!(deflected);
    assert!(sim.ship(2).unwrap().is_alive());
    assert_eq!(sim.ship(2).unwrap().lives, 10);
}

#[test]
fn game_over_after_the_last_life() {
    let mut sim = duel();
    sim.ship_mut(2).unwrap().lives = 1;
    sim.ship_mut(2).unwrap().destruct();

    let mut outcome = None;
    for _ in 0..200 {
        let result = sim.step(IDLE).unwrap();
        if let Some(&(2, o)) = result.outcomes.first() {
            outcome = Some(o);
            break;
        }
    }
    assert_eq!(outcome, Some(ExplosionOutcome::GameOver));

    let ship = sim.ship(2).unwrap();
    assert!(ship.is_game_over());
    assert_eq!(ship.lives, 0);

    // Out of the game: no flight, no painting, no further outcomes.
    let position = ship.position;
    for _ in 0..5 {
        assert!(sim.step(IDLE).unwrap().outcomes.is_empty());
    }
    assert_eq!(sim.ship(2).unwrap().position, position);
}
