// src/test_utils.rs

//! This module contains utilities for testing.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::sensor::{InertialSensor, ScaleSelection, SensorConfig};

/// A constant defining the tolerance within which floating-point values
/// are considered close enough to be equal.
pub const TEST_TOLERANCE: f32 = 1e-5;

/// Checks if two floating point numbers are close enough to be considered
/// equal.
///
/// # Arguments
/// * `target` - The target value.
/// * `value` - The value to compare against the target.
///
/// # Returns
/// `true` if the absolute difference between `target` and `value` is less than
/// `TEST_TOLERANCE`, otherwise `false`.
pub fn value_close(target: f32, value: f32) -> bool {
    (target - value).abs() < TEST_TOLERANCE
}

/// Checks if each of the components in a vector is close enough to
/// be considered equal.
///
/// # Arguments
/// * `target` - The target vector as a tuple of three `f32` values.
/// * `value` - The vector to compare against the target.
///
/// # Returns
/// `true` if each component of `target` and `value` is close as per `value_close`,
/// otherwise `false`.
pub fn vector_close(target: (f32, f32, f32), value: (f32, f32, f32)) -> bool {
    value_close(target.0, value.0)
        && value_close(target.1, value.1)
        && value_close(target.2, value.2)
}

/// Error returned by [`MockSensor`] on a scripted failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockBusError;

/// Scripted IMU. Returns fixed readings and fails the next `failures` reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockSensor {
    /// Reading returned by `read_acceleration`, in g.
    pub acceleration: (f32, f32, f32),
    /// Reading returned by `read_angular_rate`, in rad/s.
    pub angular_rate: (f32, f32, f32),
    /// Number of upcoming reads that fail.
    pub failures: u32,
    /// Total reads attempted, failed ones included.
    pub reads: u32,
    /// Make `configure` fail.
    pub configure_fails: bool,
    /// Identity register answer.
    pub identity_ok: bool,
    /// Ranges passed to the last successful `configure`.
    pub configured: Option<ScaleSelection>,
}

impl MockSensor {
    /// A healthy sensor on a level, stationary craft.
    pub fn level() -> Self {
        Self {
            acceleration: (0.0, 0.0, 1.0),
            angular_rate: (0.0, 0.0, 0.0),
            failures: 0,
            reads: 0,
            configure_fails: false,
            identity_ok: true,
            configured: None,
        }
    }

    fn read<T>(&mut self, value: T) -> Result<T, MockBusError> {
        self.reads += 1;
        if self.failures > 0 {
            self.failures -= 1;
            Err(MockBusError)
        } else {
            Ok(value)
        }
    }
}

impl InertialSensor for MockSensor {
    type Error = MockBusError;

    fn configure(&mut self, scales: ScaleSelection) -> Result<SensorConfig, Self::Error> {
        if self.configure_fails {
            return Err(MockBusError);
        }
        self.configured = Some(scales);
        Ok(SensorConfig::from(scales))
    }

    fn verify_identity(&mut self) -> Result<bool, Self::Error> {
        Ok(self.identity_ok)
    }

    fn read_acceleration(&mut self) -> Result<(f32, f32, f32), Self::Error> {
        let value = self.acceleration;
        self.read(value)
    }

    fn read_angular_rate(&mut self) -> Result<(f32, f32, f32), Self::Error> {
        let value = self.angular_rate;
        self.read(value)
    }
}

/// Delay that returns at once and keeps a tally.
#[derive(Debug, Default)]
pub struct NoopDelay {
    /// Total nanoseconds requested.
    pub waited_ns: u64,
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waited_ns += u64::from(ns);
    }
}

/// Output pin that remembers its level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MockPin {
    /// Current level.
    pub high: bool,
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}
