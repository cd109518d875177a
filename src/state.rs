// src/state.rs

//! Per-tick data exchanged between the sensor boundary, the estimator and
//! the motor mixer. All angles are radians, rates are radians per second,
//! specific force is in g, distances are metres.

/// One calibrated inertial reading, produced once per control tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSample {
    /// Specific force along body x, y, z in g.
    pub acceleration: [f32; 3],
    /// Angular rate as (pitch rate, roll rate, yaw rate) in rad/s.
    pub angular_rate: [f32; 3],
}

impl SensorSample {
    /// Builds a sample from accelerometer and gyro tuples.
    pub fn new(acceleration: (f32, f32, f32), angular_rate: (f32, f32, f32)) -> Self {
        Self {
            acceleration: [acceleration.0, acceleration.1, acceleration.2],
            angular_rate: [angular_rate.0, angular_rate.1, angular_rate.2],
        }
    }

    /// A stationary, level sample: 1 g straight down the z axis, no rotation.
    pub fn level() -> Self {
        Self::new((0.0, 0.0, 1.0), (0.0, 0.0, 0.0))
    }
}

/// Estimated attitude and, when motion tracking is enabled, velocity and
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttitudeState {
    /// Pitch in (-π, π].
    pub pitch: f32,
    /// Roll in (-π, π].
    pub roll: f32,
    /// Yaw in (-π, π].
    pub yaw: f32,
    /// Body-frame velocity in m/s.
    pub velocity: [f32; 3],
    /// World-frame position in metres, relative to the power-on point.
    pub position: [f32; 3],
    /// World-frame vertical specific force with gravity removed, in g.
    pub vertical_acceleration: f32,
}

impl AttitudeState {
    /// Attitude only, with velocity and position zeroed.
    pub fn with_angles(pitch: f32, roll: f32, yaw: f32) -> Self {
        Self {
            pitch,
            roll,
            yaw,
            ..Self::default()
        }
    }
}

/// Commanded attitude from the external command source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TargetState {
    /// Desired pitch in radians.
    pub pitch: f32,
    /// Desired roll in radians.
    pub roll: f32,
    /// Desired yaw in radians.
    pub yaw: f32,
    /// Desired world-frame position; `None` disables position hold.
    pub position: Option<[f32; 3]>,
    /// Desired vertical acceleration in g; `None` disables the vertical term.
    pub vertical_acceleration: Option<f32>,
}

impl TargetState {
    /// Attitude-only target.
    pub fn attitude(pitch: f32, roll: f32, yaw: f32) -> Self {
        Self {
            pitch,
            roll,
            yaw,
            ..Self::default()
        }
    }
}
