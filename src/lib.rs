//! Mayhem: a four-ship cave-flying game engine and its network relay.
//!
//! The simulation is deterministic per tick and pixel-exact: ships, shots and
//! debris are tested against a terrain surface rather than a physics world.
//! Online play runs one simulation per client; the relay server only seats
//! players in rooms and forwards their ship records.

pub mod client;
pub mod collision;
pub mod components;
pub mod config;
pub mod error;
pub mod explosion;
pub mod flight;
pub mod kinematics;
pub mod level;
pub mod recording;
pub mod replication;
pub mod room;
pub mod server;
pub mod simulation;
pub mod terrain;
pub mod wire_format;
