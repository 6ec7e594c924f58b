//! Runtime configuration: relay server settings from the environment and the
//! flight model tunables.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kinematics::Integrator;

/// How ships move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionMode {
    /// Gravity, thrust along the heading, landing and bouncing.
    #[default]
    Gravity,
    /// No gravity: holding thrust translates the ship along its heading.
    Thrust,
    /// Simplified profile; steers the same way as `Thrust`.
    Basic,
}

/// Region tested for ship-vs-terrain overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionStrategy {
    /// Only the terrain under the ship's rotated sprite.
    #[default]
    SpriteWindow,
    /// The whole terrain buffer.
    FullBuffer,
}

/// Flight model tunables. Any field missing from JSON takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "default_thrust_max")]
    pub thrust_max: f32,
    /// Downward acceleration added every tick.
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    /// Degrees turned per tick while left or right is held.
    #[serde(default = "default_angle_step")]
    pub angle_step: f32,
    /// Half-width of the landing cone around upright, in degrees.
    #[serde(default = "default_landing_angle")]
    pub landing_angle: f32,
    #[serde(default = "default_max_shots")]
    pub max_shots: usize,
    #[serde(default = "default_max_lives")]
    pub max_lives: u32,
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Scale applied to a pending impact before it joins the acceleration.
    #[serde(default = "default_impact_coeff")]
    pub impact_coeff: f32,
    #[serde(default)]
    pub integrator: Integrator,
    #[serde(default)]
    pub motion: MotionMode,
    #[serde(default)]
    pub collision: CollisionStrategy,
}

fn default_thrust_max() -> f32 {
    0.18
}
fn default_gravity() -> f32 {
    0.05
}
fn default_angle_step() -> f32 {
    5.0
}
fn default_landing_angle() -> f32 {
    30.0
}
fn default_max_shots() -> usize {
    20
}
fn default_max_lives() -> u32 {
    10
}
fn default_tick_rate() -> u32 {
    60
}
fn default_impact_coeff() -> f32 {
    0.02
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            thrust_max: default_thrust_max(),
            gravity: default_gravity(),
            angle_step: default_angle_step(),
            landing_angle: default_landing_angle(),
            max_shots: default_max_shots(),
            max_lives: default_max_lives(),
            tick_rate: default_tick_rate(),
            impact_coeff: default_impact_coeff(),
            integrator: Integrator::default(),
            motion: MotionMode::default(),
            collision: CollisionStrategy::default(),
        }
    }
}

impl PhysicsConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Explosion length in ticks: two seconds at the target rate.
    pub fn explosion_ticks(&self) -> u32 {
        self.tick_rate * 2
    }

    /// Heading within the landing cone around upright.
    pub fn within_landing_cone(&self, heading: f32) -> bool {
        heading <= self.landing_angle || heading >= 360.0 - self.landing_angle
    }
}

/// Relay server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Player update requests per second.
    pub tick_rate: u32,
    /// Allowed CORS origin; any origin when unset.
    pub client_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            tick_rate: 60,
            client_origin: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("MAYHEM_SERVER_HOST").unwrap_or(defaults.host);
        let port = match lookup("MAYHEM_SERVER_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => defaults.port,
        };
        let tick_rate = match lookup("MAYHEM_TICK_RATE") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(rate) if rate > 0 => rate,
                _ => return Err(ConfigError::InvalidTickRate(raw)),
            },
            None => defaults.tick_rate,
        };
        let client_origin = match lookup("MAYHEM_CLIENT_ORIGIN") {
            Some(origin) => {
                if axum::http::HeaderValue::from_str(&origin).is_err() {
                    return Err(ConfigError::InvalidOrigin(origin));
                }
                Some(origin)
            }
            None => None,
        };

        Ok(Self {
            host,
            port,
            tick_rate,
            client_origin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
