// src/estimator/rotation.rs

//! # Rotation Matrix Module
//!
//! Small-angle rotation built from one tick of angular rate, plus the angle
//! helpers used throughout the estimator.

use core::f32::consts::{PI, TAU};
use num_traits::Float;

/// Wraps an angle in radians into (-π, π].
///
/// Reduces with `%` first so arbitrarily large inputs still take constant
/// time, then applies a single ±2π correction.
pub fn wrap_angle(angle: f32) -> f32 {
    let reduced = angle % TAU;
    if reduced > PI {
        reduced - TAU
    } else if reduced <= -PI {
        reduced + TAU
    } else {
        reduced
    }
}

/// Zeroes `value` when its magnitude is below `threshold`.
pub fn dead_band(value: f32, threshold: f32) -> f32 {
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}

/// A 3×3 direction cosine matrix, row major.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RotationMatrix(pub [[f32; 3]; 3]);

impl RotationMatrix {
    /// The identity rotation.
    pub const IDENTITY: Self = Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    /// Yaw-pitch-roll (Z-Y-X) composition.
    pub fn from_yaw_pitch_roll(yaw: f32, pitch: f32, roll: f32) -> Self {
        let (sy, cy) = yaw.sin_cos();
        let (sp, cp) = pitch.sin_cos();
        let (sr, cr) = roll.sin_cos();

        Self([
            [cy * cp, cy * sp * sr - sy * cr, cy * sp * cr + sy * sr],
            [sy * cp, sy * sp * sr + cy * cr, sy * sp * cr - cy * sr],
            [-sp, cp * sr, cp * cr],
        ])
    }

    /// Rotation covering one tick: each rate is multiplied by `dt` before
    /// composing.
    ///
    /// `rates` is (pitch rate, roll rate, yaw rate) in rad/s.
    pub fn from_rates(rates: [f32; 3], dt: f32) -> Self {
        let [pitch_rate, roll_rate, yaw_rate] = rates;
        Self::from_yaw_pitch_roll(yaw_rate * dt, pitch_rate * dt, roll_rate * dt)
    }

    /// Pitch recovered with `atan2`, valid over the full (-π/2, π/2) range.
    pub fn pitch(&self) -> f32 {
        let m = &self.0;
        (-m[2][0]).atan2((m[2][1] * m[2][1] + m[2][2] * m[2][2]).sqrt())
    }

    /// Roll recovered with `atan2`.
    pub fn roll(&self) -> f32 {
        let m = &self.0;
        m[2][1].atan2(m[2][2])
    }

    /// Yaw recovered with `atan2`.
    pub fn yaw(&self) -> f32 {
        let m = &self.0;
        m[1][0].atan2(m[0][0])
    }

    /// Rotates a body-frame vector into the world frame.
    pub fn rotate(&self, v: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        [
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ]
    }
}
