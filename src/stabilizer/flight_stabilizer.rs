// src/stabilizer/flight_stabilizer.rs

//! A module specifying the shared interface for the quadcopter PID bank.
//! This module is designed for embedded systems in no_std environments.
//! It includes the numeric trait the bank is generic over, a configuration
//! structure for the shared PID gains, the per-axis error input, and a trait
//! defining the stabilization functionality.

use piddiy::Number as PiddiyNumber;

use super::mixer::{MixSigns, QUAD_X};

/// Custom trait to encapsulate base number requirements.
pub trait Number: PiddiyNumber {
    /// Clamps generic PartialOrd values within a given range.
    fn clamp(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if max < self {
            max
        } else {
            self
        }
    }
}

impl<T: PiddiyNumber> Number for T {}

/// Shared PID gains and mixing geometry for all four motor channels.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MixerConfig<T: Number> {
    /// Proportional gain.
    pub kp: T,
    /// Integral gain.
    pub ki: T,
    /// Derivative gain.
    pub kd: T,
    /// Upper limit for integral term to prevent integral windup.
    pub i_limit: T,
    /// Sign coefficients per motor, in motor order e1..e4.
    pub layout: [MixSigns; 4],
}

impl<T: Number> Default for MixerConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Number> MixerConfig<T> {
    /// Creates a new configuration with default values for all parameters.
    /// Gains default to zero or one and the layout to the "X" quad.
    /// These should be replaced with values tuned for the hardware.
    ///
    /// Example Usage
    /// ```
    /// use quad_flight_core::stabilizer::{MixerConfig, MotorMixer};
    ///
    /// let mut config = MixerConfig::<f32>::new();
    ///
    /// // Set the PID gains shared by all four motors.
    /// config.kp = 5.0;
    /// config.ki = 0.3;
    /// config.kd = 3.0;
    ///
    /// // Set the upper limit for the integral term to prevent windup.
    /// config.i_limit = 25.0;
    ///
    /// // The configuration is ready to use.
    /// let mixer = MotorMixer::with_config(config);
    /// ```
    pub fn new() -> Self {
        Self {
            kp: T::one(),
            ki: T::zero(),
            kd: T::zero(),
            i_limit: T::one(),
            layout: QUAD_X,
        }
    }
}

/// Per-axis errors fed to the mixer for one tick.
///
/// Pitch and roll are `target − actual`; yaw is `actual − target`, since yaw
/// correction opposes net rotor torque rather than tilt. The remaining terms
/// are zero unless the target asks for them.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisErrors<T> {
    /// Pitch error, weighted by each motor's pitch sign.
    pub pitch: T,
    /// Roll error, weighted by each motor's roll sign.
    pub roll: T,
    /// Yaw error, weighted by each motor's yaw sign.
    pub yaw: T,
    /// Forward position error, weighted like pitch.
    pub forward: T,
    /// Lateral position error, weighted like roll.
    pub lateral: T,
    /// Altitude and vertical-acceleration error, the same on every motor.
    pub vertical: T,
}

/// A trait for PID banks that turn per-axis errors into one raw control
/// output per motor.
pub trait FlightStabilizer<T: Number> {
    /// Takes the tick's axis errors and computes the raw per-motor outputs.
    ///
    /// - `errors`: The axis errors for this tick.
    /// - `dt`: Time delta since the last update.
    /// - `reset_integral`: Clears the integral terms, used while disarmed.
    ///
    /// Returns the raw PID outputs in motor order e1..e4.
    fn stabilize(&mut self, errors: AxisErrors<T>, dt: T, reset_integral: bool) -> [T; 4];
}
