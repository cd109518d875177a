// src/sensor.rs

//! # Sensor Adapter Boundary
//!
//! The flight core does not talk to the bus itself. A board crate wraps its
//! IMU driver in [`InertialSensor`] and the core handles the rest: scale
//! bookkeeping, bounded retries and zero-offset calibration.
//!
//! Accelerations are in g. Angular rates are in rad/s as
//! (pitch rate, roll rate, yaw rate).

use embedded_hal::delay::DelayNs;

use crate::state::SensorSample;

/// Accelerometer full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelScale {
    /// ±2 g.
    G2,
    /// ±4 g.
    G4,
    /// ±6 g.
    G6,
    /// ±8 g.
    #[default]
    G8,
    /// ±16 g.
    G16,
}

impl AccelScale {
    /// Full scale in g.
    pub fn full_scale(self) -> f32 {
        match self {
            AccelScale::G2 => 2.0,
            AccelScale::G4 => 4.0,
            AccelScale::G6 => 6.0,
            AccelScale::G8 => 8.0,
            AccelScale::G16 => 16.0,
        }
    }

    /// g per LSB of a 16-bit reading.
    pub fn sensitivity(self) -> f32 {
        2.0 * self.full_scale() / 65536.0
    }
}

/// Gyroscope full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroScale {
    /// ±250 °/s.
    Dps250,
    /// ±500 °/s.
    #[default]
    Dps500,
    /// ±2000 °/s.
    Dps2000,
}

impl GyroScale {
    /// Full scale in degrees per second.
    pub fn full_scale_dps(self) -> f32 {
        match self {
            GyroScale::Dps250 => 250.0,
            GyroScale::Dps500 => 500.0,
            GyroScale::Dps2000 => 2000.0,
        }
    }

    /// rad/s per LSB of a 16-bit reading.
    pub fn sensitivity(self) -> f32 {
        (2.0 * self.full_scale_dps() / 65536.0).to_radians()
    }
}

/// Requested sensor ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScaleSelection {
    /// Accelerometer range.
    pub accel: AccelScale,
    /// Gyroscope range.
    pub gyro: GyroScale,
}

/// Scale factors in effect after configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfig {
    /// g per LSB.
    pub accel_sensitivity: f32,
    /// rad/s per LSB.
    pub gyro_sensitivity: f32,
    /// Accelerometer full scale in g.
    pub accel_full_scale: f32,
}

impl From<ScaleSelection> for SensorConfig {
    fn from(selection: ScaleSelection) -> Self {
        Self {
            accel_sensitivity: selection.accel.sensitivity(),
            gyro_sensitivity: selection.gyro.sensitivity(),
            accel_full_scale: selection.accel.full_scale(),
        }
    }
}

impl SensorConfig {
    /// Converts raw accelerometer words to g.
    pub fn acceleration(&self, raw: [i16; 3]) -> (f32, f32, f32) {
        let [x, y, z] = raw.map(|word| f32::from(word) * self.accel_sensitivity);
        (x, y, z)
    }

    /// Converts raw gyroscope words to rad/s.
    pub fn angular_rate(&self, raw: [i16; 3]) -> (f32, f32, f32) {
        let [x, y, z] = raw.map(|word| f32::from(word) * self.gyro_sensitivity);
        (x, y, z)
    }
}

/// Interface the flight core needs from an IMU driver.
///
/// Reads may block for a bounded, bus-level time until new data is ready.
pub trait InertialSensor {
    /// Bus or device error.
    type Error;

    /// Programs the requested ranges and reports the resulting scale
    /// factors.
    fn configure(&mut self, scales: ScaleSelection) -> Result<SensorConfig, Self::Error>;

    /// Checks the device identity register. Drivers without one keep the
    /// default.
    fn verify_identity(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    /// Reads one calibrated acceleration sample in g.
    fn read_acceleration(&mut self) -> Result<(f32, f32, f32), Self::Error>;

    /// Reads one calibrated angular-rate sample in rad/s.
    fn read_angular_rate(&mut self) -> Result<(f32, f32, f32), Self::Error>;
}

/// Bounded retry for bus transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u8,
    /// Pause between attempts in microseconds.
    pub delay_us: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_us: 500,
        }
    }
}

/// Runs `op` until it succeeds or the policy's attempts run out, pausing
/// between attempts. Returns the last error on exhaustion.
pub fn read_with_retry<T, E, D: DelayNs>(
    mut op: impl FnMut() -> Result<T, E>,
    delay: &mut D,
    policy: &RetryPolicy,
) -> Result<T, E> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(_) => {
                trace!("sensor read attempt {=u8} failed", attempt);
                delay.delay_us(policy.delay_us);
                attempt += 1;
            }
        }
    }
}

/// Reads acceleration then angular rate, each under the retry policy.
pub fn read_sample<S: InertialSensor, D: DelayNs>(
    sensor: &mut S,
    delay: &mut D,
    policy: &RetryPolicy,
) -> Result<SensorSample, S::Error> {
    let acceleration = read_with_retry(|| sensor.read_acceleration(), delay, policy)?;
    let angular_rate = read_with_retry(|| sensor.read_angular_rate(), delay, policy)?;
    Ok(SensorSample::new(acceleration, angular_rate))
}

/// Averages `samples` acceleration readings taken while stationary and level
/// and returns the per-axis bias that makes the craft read (0, 0, 1 g).
///
/// The bias is meant to be added to every later sample, see
/// [`Estimator::set_accel_offset`](crate::estimator::Estimator::set_accel_offset).
pub fn calibrate_zero_offset<S: InertialSensor, D: DelayNs>(
    sensor: &mut S,
    delay: &mut D,
    policy: &RetryPolicy,
    samples: u16,
) -> Result<[f32; 3], S::Error> {
    let samples = samples.max(1);
    let mut sum = [0.0_f32; 3];
    for _ in 0..samples {
        let (x, y, z) = read_with_retry(|| sensor.read_acceleration(), delay, policy)?;
        sum[0] += x;
        sum[1] += y;
        sum[2] += z;
    }
    let n = f32::from(samples);
    let offset = [-sum[0] / n, -sum[1] / n, 1.0 - sum[2] / n];
    debug!(
        "zero offset {=f32} {=f32} {=f32}",
        offset[0], offset[1], offset[2]
    );
    Ok(offset)
}
