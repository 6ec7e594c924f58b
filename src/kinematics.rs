//! Shared integration step for ships and debris.
//!
//! Velocity is damped then pushed by the acceleration, and the precise
//! position follows the velocity. Ships and debris run the exact same step so
//! that a wreck drifts the way the ship that produced it would have.

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

/// Coefficients of the integration step, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Integrator {
    /// Drag applied to the velocity each tick (below 1.0).
    pub damping: [f32; 2],
    /// How strongly acceleration feeds into velocity.
    pub accel_coeff: [f32; 2],
    /// How strongly velocity feeds into position.
    pub velocity_coeff: [f32; 2],
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            damping: [0.984, 0.99],
            accel_coeff: [0.6, 0.6],
            velocity_coeff: [0.6, 0.6],
        }
    }
}

/// Continuous kinematic state of a moving entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Sub-pixel position; the source of truth for motion.
    pub position: Vector<f32>,
    pub velocity: Vector<f32>,
    pub acceleration: Vector<f32>,
}

impl Body {
    pub fn at(position: Vector<f32>) -> Self {
        Self {
            position,
            velocity: Vector::zeros(),
            acceleration: Vector::zeros(),
        }
    }

    /// Zero velocity and acceleration, keeping the position.
    pub fn halt(&mut self) {
        self.velocity = Vector::zeros();
        self.acceleration = Vector::zeros();
    }

    /// Integer screen position: the truncation of the precise position.
    pub fn screen_position(&self) -> (i32, i32) {
        truncate(self.position)
    }
}

impl Integrator {
    fn damping(&self) -> Vector<f32> {
        vector![self.damping[0], self.damping[1]]
    }

    fn accel_coeff(&self) -> Vector<f32> {
        vector![self.accel_coeff[0], self.accel_coeff[1]]
    }

    fn velocity_coeff(&self) -> Vector<f32> {
        vector![self.velocity_coeff[0], self.velocity_coeff[1]]
    }

    /// Advance `body` by one tick under `acceleration`.
    ///
    /// `v = v * damping + coeff_a * a`, then `p += coeff_v * v`.
    pub fn step(&self, body: &mut Body, acceleration: Vector<f32>) {
        body.acceleration = acceleration;
        body.velocity = body.velocity.component_mul(&self.damping())
            + acceleration.component_mul(&self.accel_coeff());
        body.position += body.velocity.component_mul(&self.velocity_coeff());
    }
}

/// Truncate toward zero, the way screen coordinates are derived everywhere.
pub fn truncate(position: Vector<f32>) -> (i32, i32) {
    (position.x as i32, position.y as i32)
}

/// Unit vector pointing "forward" for a heading in degrees.
///
/// Heading 0 points up the screen (negative y); positive headings rotate
/// counter-clockwise, so heading 90 points left.
pub fn heading_vector(angle_degrees: f32) -> Vector<f32> {
    let radians = (90.0 - angle_degrees).to_radians();
    vector![-radians.cos(), -radians.sin()]
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_applies_damping_then_acceleration() {
        let integrator = Integrator::default();
        let mut body = Body::at(vector![10.0, 10.0]);
        body.velocity = vector![1.0, 1.0];

        integrator.step(&mut body, vector![0.0, 1.0]);

        assert!((body.velocity.x - 0.984).abs() < 1e-6);
        assert!((body.velocity.y - (0.99 + 0.6)).abs() < 1e-6);
        assert!((body.position.x - (10.0 + 0.6 * 0.984)).abs() < 1e-5);
        assert!((body.position.y - (10.0 + 0.6 * 1.59)).abs() < 1e-5);
    }

    #[test]
    fn drag_decays_velocity_without_forces() {
        let integrator = Integrator::default();
        let mut body = Body::at(Vector::zeros());
        body.velocity = vector![5.0, -5.0];

        for _ in 0..1000 {
            integrator.step(&mut body, Vector::zeros());
        }

        assert!(body.velocity.magnitude() < 0.01);
    }

    #[test]
    fn screen_position_truncates_toward_zero() {
        let body = Body::at(vector![-0.7, 12.9]);
        assert_eq!(body.screen_position(), (0, 12));
    }

    #[test]
    fn heading_vector_points_up_at_zero() {
        let up = heading_vector(0.0);
        assert!(up.x.abs() < 1e-6);
        assert!((up.y + 1.0).abs() < 1e-6);

        let left = heading_vector(90.0);
        assert!((left.x + 1.0).abs() < 1e-6);
        assert!(left.y.abs() < 1e-6);
    }

    #[test]
    fn wrap_degrees_stays_in_range() {
        assert_eq!(wrap_degrees(365.0), 5.0);
        assert_eq!(wrap_degrees(-5.0), 355.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert!(wrap_degrees(-1e-9) < 360.0);
    }
}
