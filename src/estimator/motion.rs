// src/estimator/motion.rs

//! # Motion Tracking Module
//!
//! Dead-reckoned velocity and position. Acceleration is integrated only
//! while it can carry information: once the craft is level and reading
//! roughly 1 g, the affected velocity axes are re-zeroed to bound drift.

use num_traits::Float;

use super::rotation::RotationMatrix;

/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// Thresholds that decide when velocity may be re-zeroed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionConfig {
    /// Tilt below which an axis counts as level, in radians.
    pub level_threshold: f32,
    /// Lower bound of the at-rest specific force band, in g.
    pub rest_min: f32,
    /// Upper bound of the at-rest specific force band, in g.
    pub rest_max: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            level_threshold: 1.0_f32.to_radians(),
            rest_min: 0.9,
            rest_max: 1.1,
        }
    }
}

/// Velocity and position integrator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionTracker {
    /// Body-frame velocity in m/s.
    pub velocity: [f32; 3],
    /// World-frame position in metres.
    pub position: [f32; 3],
    /// World-vertical specific force with gravity removed, in g.
    pub vertical_acceleration: f32,
}

impl MotionTracker {
    /// Body-frame unit vector pointing at world up, the reading of a
    /// stationary accelerometer at the given attitude.
    pub fn up(pitch: f32, roll: f32) -> [f32; 3] {
        let (sin_p, cos_p) = pitch.sin_cos();
        let (sin_r, cos_r) = roll.sin_cos();
        [sin_p, -cos_p * sin_r, cos_p * cos_r]
    }

    /// Removes the gravity component seen by each body axis at the given
    /// attitude.
    pub fn compensate(acceleration: [f32; 3], pitch: f32, roll: f32) -> [f32; 3] {
        let up = Self::up(pitch, roll);
        [
            acceleration[0] - up[0],
            acceleration[1] - up[1],
            acceleration[2] - up[2],
        ]
    }

    /// Integrates one tick of acceleration at the given attitude.
    pub fn update(
        &mut self,
        config: &MotionConfig,
        acceleration: [f32; 3],
        attitude: (f32, f32, f32),
        dt: f32,
    ) {
        let (pitch, roll, yaw) = attitude;
        let magnitude = acceleration.iter().map(|a| a.abs()).sum::<f32>();
        let at_rest = config.rest_min <= magnitude && magnitude <= config.rest_max;
        let pitch_level = pitch.abs() <= config.level_threshold;
        let roll_level = roll.abs() <= config.level_threshold;

        let compensated = Self::compensate(acceleration, pitch, roll);
        let level = [pitch_level, roll_level, pitch_level && roll_level];

        for axis in 0..3 {
            if level[axis] && at_rest {
                self.velocity[axis] = 0.0;
            } else {
                self.velocity[axis] += compensated[axis] * STANDARD_GRAVITY * dt;
            }
        }
        // Projection onto world up, so tilt does not leak into the climb term.
        let up = Self::up(pitch, roll);
        self.vertical_acceleration = acceleration
            .iter()
            .zip(up.iter())
            .map(|(a, u)| a * u)
            .sum::<f32>()
            - 1.0;

        let world = RotationMatrix::from_yaw_pitch_roll(yaw, pitch, roll).rotate(self.velocity);
        for (position, velocity) in self.position.iter_mut().zip(world.iter()) {
            *position += velocity * dt;
        }
    }

    /// Clears velocity and position.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
