// src/estimator.rs

//! # Attitude & Motion Estimator
//!
//! Turns one [`SensorSample`] per control tick into an updated
//! [`AttitudeState`].
//!
//! Each tick:
//!
//! 1. Dead-band the raw sample so sensor noise does not integrate into drift.
//! 2. Build a small-angle [`RotationMatrix`] from rate·dt and advance pitch,
//!    roll and yaw by the angles recovered from it with `atan2`, wrapping
//!    into (-π, π].
//! 3. Pull pitch and roll toward the accelerometer tilt through the
//!    [`ComplementaryFilter`], when the force magnitude passes its gate.
//! 4. Optionally integrate velocity and position with a [`MotionTracker`].
//!
//! When the tick's sample is unavailable, [`Estimator::hold`] keeps the
//! previous state bit for bit and counts the stale tick.

pub mod complementary;
pub mod motion;
pub mod rotation;

pub use complementary::*;
pub use motion::*;
pub use rotation::*;

use crate::state::{AttitudeState, SensorSample};

/// Tuning for the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EstimatorConfig {
    /// Angular rates below this magnitude are zeroed, in rad/s.
    pub rate_dead_band: f32,
    /// Accelerations below this magnitude are zeroed, in g.
    pub accel_dead_band: f32,
    /// Gyro weight of the complementary filter.
    pub gyro_weight: f32,
    /// Lower bound of the complementary filter gate, in g.
    pub min_force: f32,
    /// Accelerometer full scale, the upper bound of the gate, in g.
    pub accel_full_scale: f32,
    /// Per-axis bias added to each acceleration sample, in g.
    pub accel_offset: [f32; 3],
    /// Integrate velocity and position as well as attitude.
    pub track_motion: bool,
    /// Re-zero thresholds for motion tracking.
    pub motion: MotionConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatorConfig {
    /// Creates a configuration with the stock thresholds and a ±2 g
    /// accelerometer.
    ///
    /// Example Usage
    /// ```
    /// use quad_flight_core::estimator::{Estimator, EstimatorConfig};
    ///
    /// let mut config = EstimatorConfig::new();
    /// config.accel_full_scale = 4.0;
    /// config.track_motion = true;
    ///
    /// let estimator = Estimator::with_config(config);
    /// assert_eq!(0.0, estimator.state().pitch);
    /// ```
    pub fn new() -> Self {
        Self {
            rate_dead_band: 0.1_f32.to_radians(),
            accel_dead_band: 0.05,
            gyro_weight: 0.95,
            min_force: 0.5,
            accel_full_scale: 2.0,
            accel_offset: [0.0; 3],
            track_motion: false,
            motion: MotionConfig::default(),
        }
    }
}

/// Gyro-integrating, accelerometer-corrected attitude estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimator {
    config: EstimatorConfig,
    filter: ComplementaryFilter,
    motion: MotionTracker,
    state: AttitudeState,
    stale_ticks: u32,
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator {
    /// Creates an estimator using the provided configuration. The state
    /// starts zeroed.
    pub fn with_config(config: EstimatorConfig) -> Self {
        Self {
            config,
            filter: ComplementaryFilter::new(
                config.gyro_weight,
                config.min_force,
                config.accel_full_scale,
            ),
            motion: MotionTracker::default(),
            state: AttitudeState::default(),
            stale_ticks: 0,
        }
    }

    /// Creates an estimator with default settings.
    pub fn new() -> Self {
        Self::with_config(EstimatorConfig::new())
    }

    /// The active configuration.
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Latest estimate.
    pub fn state(&self) -> &AttitudeState {
        &self.state
    }

    /// Number of consecutive ticks held without a fresh sample.
    pub fn stale_ticks(&self) -> u32 {
        self.stale_ticks
    }

    /// Changes the upper bound of the filter gate, typically after the
    /// sensor reports its configured full scale.
    pub fn set_accel_full_scale(&mut self, full_scale: f32) {
        self.config.accel_full_scale = full_scale;
        self.filter.max_force = full_scale;
    }

    /// Changes the zero offset added to every acceleration sample.
    pub fn set_accel_offset(&mut self, offset: [f32; 3]) {
        self.config.accel_offset = offset;
    }

    /// Advances the estimate by one tick of `dt` seconds.
    pub fn update(&mut self, sample: &SensorSample, dt: f32) -> &AttitudeState {
        self.stale_ticks = 0;

        let rates = sample
            .angular_rate
            .map(|rate| dead_band(rate, self.config.rate_dead_band));
        let mut acceleration = sample.acceleration;
        for (a, offset) in acceleration.iter_mut().zip(self.config.accel_offset.iter()) {
            *a = dead_band(*a + offset, self.config.accel_dead_band);
        }

        let rotation = RotationMatrix::from_rates(rates, dt);
        let pitch = wrap_angle(self.state.pitch + rotation.pitch());
        let roll = wrap_angle(self.state.roll + rotation.roll());
        let yaw = wrap_angle(self.state.yaw + rotation.yaw());

        let (pitch, roll) = self.filter.apply(pitch, roll, acceleration);
        self.state.pitch = pitch;
        self.state.roll = roll;
        self.state.yaw = yaw;

        if self.config.track_motion {
            self.motion
                .update(&self.config.motion, acceleration, (pitch, roll, yaw), dt);
            self.state.velocity = self.motion.velocity;
            self.state.position = self.motion.position;
            self.state.vertical_acceleration = self.motion.vertical_acceleration;
        }

        &self.state
    }

    /// Keeps the previous state for a tick with no usable sample and returns
    /// the running count of such ticks.
    pub fn hold(&mut self) -> u32 {
        self.stale_ticks = self.stale_ticks.saturating_add(1);
        self.stale_ticks
    }

    /// Zeroes attitude, velocity and position.
    pub fn reset(&mut self) {
        self.state = AttitudeState::default();
        self.motion.reset();
        self.stale_ticks = 0;
    }
}
