//! Game simulation loop and systems
//!
//! One `step` is one tick of a level session, run in a fixed order:
//! - peer records are applied to shadow ships (possibly switching level)
//! - the map art is written into the terrain buffer
//! - local ships read their intents and fly
//! - terrain, ship-vs-ship, shot plotting, explosions, projectile hits
//! - surviving ships are painted into the terrain buffer

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::collision::{self, Collision};
use crate::components::{
    ControlIntents, LevelId, MAX_SHIPS, RoomId, Ship, ShipId, ShipRole, ShipSprites, SoundCue,
};
use crate::config::PhysicsConfig;
use crate::error::SimulationError;
use crate::explosion::{self, BurstParticle, ExplosionOutcome};
use crate::flight::{self, FlightContext};
use crate::level::Level;
use crate::recording::{Playback, Recorder, Recording};
use crate::replication;
use crate::terrain::{Color, TerrainBuffer};
use crate::wire_format::ShipUpdate;

/// Hull colours of the built-in sprites, by slot.
pub const HULL_COLORS: [Color; MAX_SHIPS] = [
    Color(230, 60, 60),
    Color(60, 200, 90),
    Color(80, 130, 240),
    Color(235, 210, 70),
];

/// Source of level map art.
pub trait MapLoader: Send {
    fn load(&self, level: &Level) -> TerrainBuffer;
}

/// Plain maps with only the platforms drawn.
#[derive(Debug, Clone, Copy)]
pub struct GeneratedMaps {
    pub background: Color,
}

impl Default for GeneratedMaps {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
        }
    }
}

impl MapLoader for GeneratedMaps {
    fn load(&self, level: &Level) -> TerrainBuffer {
        level.generated_map(self.background)
    }
}

/// Who the ships of this session belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Ships `1..=players` are all simulated here.
    Offline { players: u8 },
    /// One local ship; the others are shadows of peers in the room.
    Online { ship_id: ShipId, room_id: RoomId },
}

/// Game simulation state for one level session
pub struct GameSimulation {
    pub config: PhysicsConfig,
    mode: SessionMode,
    level: Level,
    /// Pristine map art, written into `terrain` at the start of every tick.
    map: TerrainBuffer,
    terrain: TerrainBuffer,
    /// Slot `n` lives at index `n - 1`.
    ships: Vec<Ship>,
    sprites: Vec<Arc<ShipSprites>>,
    maps: Box<dyn MapLoader>,
    /// Latest unapplied record per peer ship.
    pending: BTreeMap<ShipId, ShipUpdate>,
    rng: StdRng,
    recorder: Option<Recorder>,
    playback: Option<Playback>,
    pub tick: u64,
}

/// Result of a simulation step
#[derive(Debug, Default)]
pub struct SimulationStepResult {
    pub tick: u64,
    pub collisions: Vec<Collision>,
    pub cues: Vec<(ShipId, SoundCue)>,
    pub burst: Vec<BurstParticle>,
    pub outcomes: Vec<(ShipId, ExplosionOutcome)>,
    pub level_switch: Option<LevelId>,
}

impl GameSimulation {
    pub fn new(
        config: PhysicsConfig,
        level_id: LevelId,
        mode: SessionMode,
    ) -> Result<Self, SimulationError> {
        Self::with_maps(config, level_id, mode, Box::new(GeneratedMaps::default()))
    }

    pub fn with_maps(
        config: PhysicsConfig,
        level_id: LevelId,
        mode: SessionMode,
        maps: Box<dyn MapLoader>,
    ) -> Result<Self, SimulationError> {
        if let SessionMode::Offline { players } = mode
            && usize::from(players) > MAX_SHIPS
        {
            return Err(SimulationError::TooManyPlayers(players));
        }

        let level = Level::get(level_id).ok_or(SimulationError::UnknownLevel(level_id))?;
        let map = maps.load(&level);
        let sprites: Vec<_> = HULL_COLORS
            .iter()
            .map(|hull| Arc::new(ShipSprites::procedural(*hull)))
            .collect();

        let mut simulation = Self {
            terrain: map.clone(),
            map,
            ships: Vec::with_capacity(MAX_SHIPS),
            sprites,
            maps,
            pending: BTreeMap::new(),
            rng: StdRng::from_os_rng(),
            recorder: None,
            playback: None,
            tick: 0,
            config,
            mode,
            level,
        };
        simulation.ships = simulation.spawn_ships(&level)?;

        info!(level = level.id, ?mode, "simulation ready");
        Ok(simulation)
    }

    /// Fresh ships at the level's spawn points. Lives, roles and names of
    /// existing ships carry over.
    fn spawn_ships(&self, level: &Level) -> Result<Vec<Ship>, SimulationError> {
        (1..=MAX_SHIPS as ShipId)
            .map(|id| {
                let spawn = level
                    .spawn_platform(id)
                    .ok_or(SimulationError::UnknownLevel(level.id))?
                    .spawn_point();
                let index = usize::from(id - 1);
                let previous = self.ships.get(index);
                let lives = previous.map_or(self.config.max_lives, |ship| ship.lives);
                let role = previous.map_or_else(|| self.initial_role(id), |ship| ship.role);

                let mut ship = Ship::new(id, role, spawn, lives, self.sprites[index].clone());
                if let Some(previous) = previous {
                    ship.player_name.clone_from(&previous.player_name);
                    if previous.is_game_over() {
                        ship.state = previous.state;
                    }
                }
                Ok(ship)
            })
            .collect()
    }

    fn initial_role(&self, id: ShipId) -> ShipRole {
        match self.mode {
            SessionMode::Offline { players } if id <= players => ShipRole::Local,
            SessionMode::Online { ship_id, .. } if id == ship_id => ShipRole::Local,
            _ => ShipRole::Absent,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn terrain(&self) -> &TerrainBuffer {
        &self.terrain
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(usize::from(id).checked_sub(1)?)
    }

    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.get_mut(usize::from(id).checked_sub(1)?)
    }

    pub fn set_player_name(&mut self, id: ShipId, name: &str) {
        if let Some(ship) = self.ship_mut(id) {
            ship.player_name = name.to_string();
        }
    }

    /// Replace the art of one ship slot.
    pub fn set_ship_sprites(&mut self, id: ShipId, sprites: ShipSprites) {
        let Some(index) = usize::from(id).checked_sub(1).filter(|i| *i < MAX_SHIPS) else {
            return;
        };
        let sprites = Arc::new(sprites);
        self.sprites[index] = sprites.clone();
        self.ships[index].set_sprites(sprites);
    }

    /// The ship driven from this process when online.
    pub fn local_ship_id(&self) -> Option<ShipId> {
        match self.mode {
            SessionMode::Online { ship_id, .. } => Some(ship_id),
            SessionMode::Offline { .. } => None,
        }
    }

    /// The ship whose intents are captured or replayed.
    pub fn recorded_ship_id(&self) -> ShipId {
        self.local_ship_id().unwrap_or(1)
    }

    pub fn enable_recording(&mut self) {
        self.recorder = Some(Recorder::new());
        info!(ship = self.recorded_ship_id(), "input recording enabled");
    }

    pub fn take_recording(&mut self) -> Option<Recording> {
        let recorder = self.recorder.take()?;
        info!(frames = recorder.len(), "input recording disabled");
        Some(recorder.finish())
    }

    /// Replace the recorded ship's live intents with `recording`.
    pub fn start_playback(&mut self, recording: Recording) {
        info!(frames = recording.len(), "playback started");
        self.recorder = None;
        self.playback = Some(Playback::new(recording));
    }

    pub fn is_playing_back(&self) -> bool {
        self.playback.is_some()
    }

    /// Switch level and rebuild the four ships at their spawn points.
    ///
    /// Online, only ship 1 may do this unless `force` is set. Returns whether
    /// the switch happened.
    pub fn set_level(&mut self, level_id: LevelId, force: bool) -> Result<bool, SimulationError> {
        let allowed = force || matches!(self.local_ship_id(), None | Some(1));
        if !allowed {
            debug!(level = level_id, "level switch refused: not ship 1");
            return Ok(false);
        }

        let level = Level::get(level_id).ok_or(SimulationError::UnknownLevel(level_id))?;
        let ships = self.spawn_ships(&level)?;
        self.map = self.maps.load(&level);
        self.terrain = self.map.clone();
        self.ships = ships;
        self.level = level;
        info!(level = level_id, forced = force, "level switched");
        Ok(true)
    }

    /// Queue a peer record; the latest one per ship is applied next tick.
    pub fn receive_peer_update(&mut self, update: ShipUpdate) {
        let SessionMode::Online { ship_id, .. } = self.mode else {
            warn!(ship = update.ship_id, "peer update ignored offline");
            return;
        };
        if update.ship_id == ship_id || !(1..=MAX_SHIPS as ShipId).contains(&update.ship_id) {
            warn!(ship = update.ship_id, "peer update for an invalid slot");
            return;
        }
        self.pending.insert(update.ship_id, update);
    }

    /// Outbound record for the local ship (online only).
    pub fn local_update(&self) -> Option<ShipUpdate> {
        let SessionMode::Online { ship_id, room_id } = self.mode else {
            return None;
        };
        let ship = self.ship(ship_id)?;
        Some(replication::capture(ship, room_id, self.level.id))
    }

    /// Run one tick. `intents` is indexed by slot (`intents[0]` drives ship 1).
    pub fn step(
        &mut self,
        intents: [ControlIntents; MAX_SHIPS],
    ) -> Result<SimulationStepResult, SimulationError> {
        let mut result = SimulationStepResult::default();

        for ship in &mut self.ships {
            ship.begin_tick();
        }
        self.apply_peer_updates(&mut result);
        self.terrain.blit_map(&self.map);
        self.update_local_ships(intents, &mut result)?;

        collision::terrain_pass(
            &mut self.ships,
            &self.terrain,
            self.level.platforms,
            &self.config,
            &mut result.collisions,
        );
        collision::ship_pass(&mut self.ships, &mut result.collisions);

        for ship in self.ships.iter_mut().filter(|ship| ship.in_play()) {
            collision::plot_shots(&mut ship.shots, &mut self.terrain);
        }

        self.advance_explosions(&mut result);
        collision::projectile_pass(&mut self.ships, &mut result.collisions);
        self.draw_ships();

        self.tick += 1;
        result.tick = self.tick;
        Ok(result)
    }

    fn apply_peer_updates(&mut self, result: &mut SimulationStepResult) {
        let pending = std::mem::take(&mut self.pending);
        for (id, update) in pending {
            if id == 1 && update.level_id != self.level.id {
                match self.set_level(update.level_id, true) {
                    Ok(_) => result.level_switch = Some(update.level_id),
                    Err(e) => warn!(level = update.level_id, "cannot follow ship 1: {}", e),
                }
            }
            if let Some(ship) = self.ships.get_mut(usize::from(id) - 1) {
                replication::apply(ship, &update, &self.config);
            }
        }
    }

    fn update_local_ships(
        &mut self,
        intents: [ControlIntents; MAX_SHIPS],
        result: &mut SimulationStepResult,
    ) -> Result<(), SimulationError> {
        let recorded = self.recorded_ship_id();
        let ctx = FlightContext {
            config: &self.config,
            level: &self.level,
        };
        let mut cues = Vec::new();

        for (ship, live) in self.ships.iter_mut().zip(intents) {
            if ship.role != ShipRole::Local || !ship.is_alive() {
                continue;
            }

            let mut intents = live;
            if ship.id == recorded {
                if let Some(playback) = self.playback.as_mut() {
                    intents = playback.next_frame()?;
                } else if let Some(recorder) = self.recorder.as_mut() {
                    recorder.record(intents);
                }
            }

            flight::update_ship(ship, intents, &ctx, &mut cues);
            result
                .cues
                .extend(cues.drain(..).map(|cue| (ship.id, cue)));
        }
        Ok(())
    }

    fn advance_explosions(&mut self, result: &mut SimulationStepResult) {
        let mut cues = Vec::new();
        for ship in self.ships.iter_mut().filter(|ship| ship.in_play()) {
            let outcome = explosion::advance_explosion(
                ship,
                &mut self.terrain,
                &self.config,
                &mut self.rng,
                &mut result.burst,
                &mut cues,
            );
            result
                .cues
                .extend(cues.drain(..).map(|cue| (ship.id, cue)));
            if let Some(outcome) = outcome {
                if outcome == ExplosionOutcome::GameOver {
                    info!(ship = ship.id, "game over");
                }
                result.outcomes.push((ship.id, outcome));
            }
        }
    }

    fn draw_ships(&mut self) {
        for ship in self.ships.iter().filter(|ship| ship.in_play() && ship.is_alive()) {
            let (x, y) = ship.mask_origin();
            self.terrain.blit_sprite(&ship.pose.image, x, y);
        }
    }
}
