// src/flight.rs

//! # Flight Controller
//!
//! The control-tick side of the system: owns the sensor adapter, the
//! estimator, the motor mixer and the output translator, and publishes one
//! set of motor speeds per tick for the pulse scheduler.
//!
//! ## Lifecycle
//!
//! 1. [`FlightController::startup`] checks the sensor identity, configures
//!    its ranges and checks the system clock. Any failure here is fatal and
//!    the controller stays out of flight mode.
//! 2. Optionally [`FlightController::calibrate`] while the craft sits level.
//! 3. [`FlightController::arm`]. Until then every tick commands the lowest
//!    speed on all motors and keeps the PID integrals cleared.
//! 4. [`FlightController::tick`] once per control period.

use embedded_hal::delay::DelayNs;

use crate::error::Error;
use crate::estimator::{Estimator, EstimatorConfig};
use crate::output::{OutputConfig, OutputTranslator};
use crate::sensor::{
    calibrate_zero_offset, read_sample, read_with_retry, InertialSensor, RetryPolicy,
    ScaleSelection, SensorConfig,
};
use crate::shared::MotorSpeeds;
use crate::state::{AttitudeState, TargetState};
use crate::{AxisErrors, FlightStabilizer, MixerConfig, MotorMixer};

/// Aggregate configuration for the control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlightConfig {
    /// Estimator tuning.
    pub estimator: EstimatorConfig,
    /// PID gains and motor layout.
    pub mixer: MixerConfig<f32>,
    /// PID-to-command mapping and bounds.
    pub output: OutputConfig,
    /// Sensor ranges requested at startup.
    pub scales: ScaleSelection,
    /// Retry policy for every sensor transaction.
    pub retry: RetryPolicy,
    /// Control tick length in seconds.
    pub dt: f32,
    /// Gain applied to position-hold errors.
    pub position_gain: f32,
    /// System clock the board is expected to run at.
    pub clock_target_hz: u32,
    /// Allowed clock deviation in parts per million.
    pub clock_tolerance_ppm: u32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightConfig {
    /// Creates a configuration for a 500 Hz control tick with the reference
    /// airframe's gains.
    ///
    /// Example Usage
    /// ```
    /// use quad_flight_core::flight::FlightConfig;
    /// use quad_flight_core::output::OutputMapping;
    ///
    /// let mut config = FlightConfig::new();
    /// config.dt = 0.004;
    /// config.output.mapping = OutputMapping::Arctangent { k1: 1.0, k2: 300.0 };
    /// config.estimator.track_motion = true;
    /// ```
    pub fn new() -> Self {
        let mut mixer = MixerConfig::new();
        mixer.kp = 5.0;
        mixer.ki = 0.3;
        mixer.kd = 3.0;
        mixer.i_limit = 25.0;

        Self {
            estimator: EstimatorConfig::new(),
            mixer,
            output: OutputConfig::new(),
            scales: ScaleSelection::default(),
            retry: RetryPolicy::default(),
            dt: 0.002,
            position_gain: 0.1,
            clock_target_hz: 80_000_000,
            clock_tolerance_ppm: 10_000,
        }
    }
}

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightMode {
    /// Startup has not completed.
    Uninitialized,
    /// Ready, commanding the lowest speed.
    Disarmed,
    /// Flying.
    Armed,
}

/// Verifies a measured clock against its target within `tolerance_ppm`.
pub fn check_clock<E>(actual_hz: u32, target_hz: u32, tolerance_ppm: u32) -> Result<(), Error<E>> {
    let deviation = u64::from(actual_hz.abs_diff(target_hz)) * 1_000_000;
    if deviation <= u64::from(target_hz) * u64::from(tolerance_ppm) {
        Ok(())
    } else {
        Err(Error::ClockOutOfTolerance {
            actual_hz,
            target_hz,
        })
    }
}

/// The control tick: sensor read, estimate, mix, translate, publish.
pub struct FlightController<S: InertialSensor> {
    sensor: S,
    config: FlightConfig,
    estimator: Estimator,
    mixer: MotorMixer<f32>,
    translator: OutputTranslator,
    mode: FlightMode,
}

impl<S: InertialSensor> FlightController<S> {
    /// Creates a controller around a sensor adapter.
    pub fn with_config(sensor: S, config: FlightConfig) -> Self {
        Self {
            sensor,
            config,
            estimator: Estimator::with_config(config.estimator),
            mixer: MotorMixer::with_config(config.mixer),
            translator: OutputTranslator::with_config(config.output),
            mode: FlightMode::Uninitialized,
        }
    }

    /// Creates a controller with default settings.
    pub fn new(sensor: S) -> Self {
        Self::with_config(sensor, FlightConfig::new())
    }

    /// The active configuration.
    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    /// Current lifecycle stage.
    pub fn mode(&self) -> FlightMode {
        self.mode
    }

    /// Latest attitude estimate.
    pub fn attitude(&self) -> &AttitudeState {
        self.estimator.state()
    }

    /// The motor mixer, for inspecting channel state.
    pub fn mixer(&self) -> &MotorMixer<f32> {
        &self.mixer
    }

    /// The sensor adapter.
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Gives the sensor adapter back.
    pub fn release(self) -> S {
        self.sensor
    }

    /// Brings the sensor up and checks the system clock.
    ///
    /// Every error from here is fatal: the controller stays
    /// [`FlightMode::Uninitialized`] and refuses to arm.
    pub fn startup<D: DelayNs>(
        &mut self,
        delay: &mut D,
        clock_hz: u32,
    ) -> Result<SensorConfig, Error<S::Error>> {
        let retry = self.config.retry;
        let sensor = &mut self.sensor;

        let identity = read_with_retry(|| sensor.verify_identity(), delay, &retry)
            .map_err(Error::Configuration)?;
        if !identity {
            warn!("sensor identity mismatch");
            return Err(Error::IdentityMismatch);
        }

        let scales = self.config.scales;
        let sensor_config = read_with_retry(|| sensor.configure(scales), delay, &retry)
            .map_err(Error::Configuration)?;

        check_clock(clock_hz, self.config.clock_target_hz, self.config.clock_tolerance_ppm)?;

        self.estimator
            .set_accel_full_scale(sensor_config.accel_full_scale);
        self.mode = FlightMode::Disarmed;
        info!(
            "startup complete, accel full scale {=f32} g",
            sensor_config.accel_full_scale
        );
        Ok(sensor_config)
    }

    /// Measures and applies the accelerometer zero offset. The craft must be
    /// level and still.
    pub fn calibrate<D: DelayNs>(
        &mut self,
        delay: &mut D,
        samples: u16,
    ) -> Result<[f32; 3], Error<S::Error>> {
        if self.mode == FlightMode::Uninitialized {
            return Err(Error::NotReady);
        }
        let offset = calibrate_zero_offset(&mut self.sensor, delay, &self.config.retry, samples)
            .map_err(Error::Bus)?;
        self.estimator.set_accel_offset(offset);
        Ok(offset)
    }

    /// Enters flight mode.
    pub fn arm(&mut self) -> Result<(), Error<S::Error>> {
        match self.mode {
            FlightMode::Uninitialized => Err(Error::NotReady),
            FlightMode::Disarmed => {
                info!("armed");
                self.mode = FlightMode::Armed;
                Ok(())
            }
            FlightMode::Armed => Ok(()),
        }
    }

    /// Leaves flight mode. The next tick commands the lowest speed.
    pub fn disarm(&mut self) {
        if self.mode == FlightMode::Armed {
            info!("disarmed");
            self.mode = FlightMode::Disarmed;
        }
    }

    /// Runs one control tick and publishes the resulting speeds.
    ///
    /// If the sensor cannot be read within the retry policy the estimate is
    /// held, nothing is published, and [`Error::StaleData`] reports how many
    /// ticks in a row have been missed.
    pub fn tick<D: DelayNs>(
        &mut self,
        delay: &mut D,
        target: &TargetState,
        speeds: &MotorSpeeds,
    ) -> Result<[u16; 4], Error<S::Error>> {
        if self.mode == FlightMode::Uninitialized {
            return Err(Error::NotReady);
        }
        let dt = self.config.dt;

        match read_sample(&mut self.sensor, delay, &self.config.retry) {
            Ok(sample) => {
                self.estimator.update(&sample, dt);
            }
            Err(_) => {
                let consecutive = self.estimator.hold();
                warn!("sensor stale for {=u32} ticks", consecutive);
                return Err(Error::StaleData { consecutive });
            }
        }

        let armed = self.mode == FlightMode::Armed;
        let errors = AxisErrors::from_states(
            self.estimator.state(),
            target,
            self.config.position_gain,
        );
        let outputs = self.mixer.stabilize(errors, dt, !armed);

        let mut commanded = [self.translator.disarmed(); 4];
        for ((channel, output), speed) in self
            .mixer
            .channels_mut()
            .iter_mut()
            .zip(outputs)
            .zip(commanded.iter_mut())
        {
            if armed {
                *speed = self.translator.translate(output, channel.speed());
            }
            channel.set_speed(*speed);
        }

        speeds.publish(commanded);
        Ok(commanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    const CLOCK_HZ: u32 = 80_000_000;

    fn started(sensor: MockSensor) -> FlightController<MockSensor> {
        let mut controller = FlightController::new(sensor);
        controller
            .startup(&mut NoopDelay::default(), CLOCK_HZ)
            .unwrap();
        controller
    }

    /// Test the clock tolerance bounds.
    #[test]
    fn test_flight_check_clock() {
        assert_eq!(Ok(()), check_clock::<()>(80_800_000, 80_000_000, 10_000));
        assert_eq!(Ok(()), check_clock::<()>(79_200_000, 80_000_000, 10_000));
        assert_eq!(
            Err(Error::ClockOutOfTolerance {
                actual_hz: 80_800_001,
                target_hz: 80_000_000
            }),
            check_clock::<()>(80_800_001, 80_000_000, 10_000)
        );
    }

    /// Test that ticking or arming before startup is refused.
    #[test]
    fn test_flight_not_ready() {
        let mut controller = FlightController::new(MockSensor::level());
        let speeds = MotorSpeeds::new(0);
        assert_eq!(
            Err(Error::NotReady),
            controller.tick(&mut NoopDelay::default(), &TargetState::default(), &speeds)
        );
        assert_eq!(Err(Error::NotReady), controller.arm());
        assert_eq!(0, speeds.generation());
    }

    /// Test that a failed configure is fatal.
    #[test]
    fn test_flight_startup_configure_fails() {
        let mut sensor = MockSensor::level();
        sensor.configure_fails = true;
        let mut controller = FlightController::new(sensor);
        let result = controller.startup(&mut NoopDelay::default(), CLOCK_HZ);
        assert_eq!(Err(Error::Configuration(MockBusError)), result);
        assert!(result.unwrap_err().is_fatal());
        assert_eq!(FlightMode::Uninitialized, controller.mode());
        assert_eq!(Err(Error::NotReady), controller.arm());
    }

    /// Test that a wrong identity is fatal.
    #[test]
    fn test_flight_startup_identity_mismatch() {
        let mut sensor = MockSensor::level();
        sensor.identity_ok = false;
        let mut controller = FlightController::new(sensor);
        assert_eq!(
            Err(Error::IdentityMismatch),
            controller.startup(&mut NoopDelay::default(), CLOCK_HZ)
        );
        assert!(controller.release().configured.is_none(), "Configure never ran.");
    }

    /// Test that an out-of-tolerance clock is fatal.
    #[test]
    fn test_flight_startup_clock_fails() {
        let mut controller = FlightController::new(MockSensor::level());
        let result = controller.startup(&mut NoopDelay::default(), 72_000_000);
        assert!(matches!(result, Err(Error::ClockOutOfTolerance { .. })));
        assert_eq!(FlightMode::Uninitialized, controller.mode());
    }

    /// Test that startup configures the requested ranges.
    #[test]
    fn test_flight_startup_configures() {
        let controller = started(MockSensor::level());
        assert_eq!(FlightMode::Disarmed, controller.mode());
        assert_eq!(
            Some(ScaleSelection::default()),
            controller.release().configured
        );
    }

    /// Test that a disarmed controller commands the lowest speed and keeps
    /// integrals clear even with a large error.
    #[test]
    fn test_flight_disarmed_commands_min() {
        let mut controller = started(MockSensor::level());
        let speeds = MotorSpeeds::new(0);
        let target = TargetState::attitude(0.3, 0.0, 0.0);
        for _ in 0..10 {
            let commanded = controller
                .tick(&mut NoopDelay::default(), &target, &speeds)
                .unwrap();
            assert_eq!([1000; 4], commanded);
        }
        for channel in controller.mixer().channels() {
            assert_eq!(0.0, channel.integral());
        }
        assert_eq!([1000; 4], speeds.snapshot());
    }

    /// Level craft, level target: every motor settles at the hover bias.
    #[test]
    fn test_flight_level_hover() {
        let mut controller = started(MockSensor::level());
        controller.arm().unwrap();
        let speeds = MotorSpeeds::new(0);
        let mut commanded = [0; 4];
        for _ in 0..30 {
            commanded = controller
                .tick(&mut NoopDelay::default(), &TargetState::default(), &speeds)
                .unwrap();
        }
        assert_eq!([1400; 4], commanded);
        assert_eq!([1400; 4], speeds.snapshot());
        for channel in controller.mixer().channels() {
            assert_eq!(0.0, channel.last_error());
        }
    }

    /// Nose up 10° with a level target: front pair slows, rear pair speeds up.
    #[test]
    fn test_flight_pitch_restoring() {
        let angle = 10.0_f32.to_radians();
        let mut sensor = MockSensor::level();
        sensor.acceleration = (angle.sin(), 0.0, angle.cos());
        let mut controller = started(sensor);
        controller.arm().unwrap();

        let speeds = MotorSpeeds::new(0);
        let mut commanded = [0; 4];
        for _ in 0..500 {
            commanded = controller
                .tick(&mut NoopDelay::default(), &TargetState::default(), &speeds)
                .unwrap();
        }
        assert!(value_close(angle, controller.attitude().pitch));

        let [e1, e2, e3, e4] = commanded;
        assert_eq!(e1, e2, "Front pair should match.");
        assert_eq!(e3, e4, "Rear pair should match.");
        assert!(e1 < 1400 && 1400 < e3, "Front {} rear {}", e1, e3);
    }

    /// Three failed reads hold the estimate and publish nothing.
    #[test]
    fn test_flight_stale_holds_state() {
        let mut sensor = MockSensor::level();
        sensor.acceleration = (0.1, -0.05, 0.98);
        sensor.angular_rate = (0.2, -0.1, 0.3);
        let mut controller = started(sensor);
        controller.arm().unwrap();

        let speeds = MotorSpeeds::new(0);
        let mut delay = NoopDelay::default();
        for _ in 0..20 {
            controller
                .tick(&mut delay, &TargetState::default(), &speeds)
                .unwrap();
        }
        let before = *controller.attitude();
        let published = speeds.snapshot();
        let generation = speeds.generation();

        controller.sensor_mut().failures = 9;
        for consecutive in 1..=3 {
            assert_eq!(
                Err(Error::StaleData { consecutive }),
                controller.tick(&mut delay, &TargetState::default(), &speeds)
            );
        }

        assert_eq!(before, *controller.attitude());
        assert_eq!(published, speeds.snapshot());
        assert_eq!(generation, speeds.generation());
        assert!(!Error::<MockBusError>::StaleData { consecutive: 3 }.is_fatal());

        assert!(controller
            .tick(&mut delay, &TargetState::default(), &speeds)
            .is_ok());
    }

    /// Test that calibration feeds the estimator offset.
    #[test]
    fn test_flight_calibrate() {
        let mut sensor = MockSensor::level();
        sensor.acceleration = (0.05, 0.0, 1.0);
        let mut controller = started(sensor);
        let offset = controller
            .calibrate(&mut NoopDelay::default(), 32)
            .unwrap();
        assert!(value_close(-0.05, offset[0]));

        controller.arm().unwrap();
        let speeds = MotorSpeeds::new(0);
        for _ in 0..100 {
            controller
                .tick(&mut NoopDelay::default(), &TargetState::default(), &speeds)
                .unwrap();
        }
        assert!(value_close(0.0, controller.attitude().pitch));
    }

    /// Test that disarming returns every motor to the lowest speed at once.
    #[test]
    fn test_flight_disarm() {
        let mut controller = started(MockSensor::level());
        controller.arm().unwrap();
        let speeds = MotorSpeeds::new(0);
        for _ in 0..30 {
            controller
                .tick(&mut NoopDelay::default(), &TargetState::default(), &speeds)
                .unwrap();
        }
        controller.disarm();
        assert_eq!(FlightMode::Disarmed, controller.mode());
        assert_eq!(
            Ok([1000; 4]),
            controller.tick(&mut NoopDelay::default(), &TargetState::default(), &speeds)
        );
    }
}
