// src/stabilizer/mixer.rs

//! # Motor Mixer
//!
//! Four PID channels, one per motor, that all see the same attitude error
//! but weight it by the signs of their motor's position in the frame. For
//! the "X" quad below, a positive pitch error speeds up the front pair and
//! slows the rear pair; a positive roll error does the same for the left and
//! right pairs; yaw alternates around the frame so that diagonal motors,
//! which spin the same way, move together.
//!
//! ```text
//!     front
//!   e1     e2
//!     \   /
//!      \ /
//!      / \
//!     /   \
//!   e4     e3
//!     rear
//! ```
//!
//! The mixing is first order: no torque or drag cross-coupling is modelled,
//! the loop rate is expected to reject what is left.

use num_traits::Float;
use piddiy::PidController;

use crate::estimator::wrap_angle;
use crate::pid::{compute_motor, MotorControlData};
use crate::state::{AttitudeState, TargetState};
use crate::{AxisErrors, FlightStabilizer, MixerConfig, Number};

/// Sign coefficient of one axis for one motor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sign {
    /// Weight the axis error by +1.
    Positive,
    /// Weight the axis error by −1.
    Negative,
}

impl Sign {
    /// Applies the sign to a value.
    pub fn apply<T: Number>(self, value: T) -> T {
        match self {
            Sign::Positive => value,
            Sign::Negative => -value,
        }
    }
}

/// Per-motor sign coefficients encoding the motor's quadrant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MixSigns {
    /// Pitch sign, also applied to the forward position term.
    pub pitch: Sign,
    /// Roll sign, also applied to the lateral position term.
    pub roll: Sign,
    /// Yaw sign.
    pub yaw: Sign,
}

impl MixSigns {
    /// Builds a sign set.
    pub const fn new(pitch: Sign, roll: Sign, yaw: Sign) -> Self {
        Self { pitch, roll, yaw }
    }
}

/// Sign table for the "X" layout: front-left, front-right, back-right,
/// back-left.
pub const QUAD_X: [MixSigns; 4] = [
    MixSigns::new(Sign::Positive, Sign::Positive, Sign::Positive),
    MixSigns::new(Sign::Positive, Sign::Negative, Sign::Negative),
    MixSigns::new(Sign::Negative, Sign::Negative, Sign::Positive),
    MixSigns::new(Sign::Negative, Sign::Positive, Sign::Negative),
];

impl AxisErrors<f32> {
    /// Computes the tick's axis errors from the estimate and the command.
    ///
    /// Angle errors are wrapped into (-π, π] so a command across the ±π seam
    /// takes the short way round. Position terms are present only when the
    /// target carries a position and are scaled by `position_gain`.
    pub fn from_states(attitude: &AttitudeState, target: &TargetState, position_gain: f32) -> Self {
        let mut errors = AxisErrors {
            pitch: wrap_angle(target.pitch - attitude.pitch),
            roll: wrap_angle(target.roll - attitude.roll),
            yaw: wrap_angle(attitude.yaw - target.yaw),
            ..Default::default()
        };

        if let Some(position) = target.position {
            let heading = attitude.yaw.cos();
            errors.forward = (attitude.position[0] - position[0]) * heading * position_gain;
            errors.lateral = (attitude.position[1] - position[1]) * heading * position_gain;
            errors.vertical += (position[2] - attitude.position[2]) * position_gain;
        }
        if let Some(vertical) = target.vertical_acceleration {
            errors.vertical += vertical - attitude.vertical_acceleration;
        }

        errors
    }
}

/// One motor's PID state and last commanded speeds.
pub struct MotorChannel<T: Number> {
    pid: PidController<T, MotorControlData<T>>,
    signs: MixSigns,
    output: T,
    speed: u16,
    last_speed: u16,
}

impl<T: Number> MotorChannel<T> {
    fn new(config: &MixerConfig<T>, signs: MixSigns) -> Self {
        let mut pid = PidController::new();
        pid.compute_fn(compute_motor)
            .set_point(T::zero())
            .kp(config.kp)
            .ki(config.ki)
            .kd(config.kd);

        Self {
            pid,
            signs,
            output: T::zero(),
            speed: 0,
            last_speed: 0,
        }
    }

    /// Folds the axis errors into this motor's error.
    pub fn mixed_error(&self, errors: &AxisErrors<T>) -> T {
        self.signs.pitch.apply(errors.pitch + errors.forward)
            + self.signs.roll.apply(errors.roll + errors.lateral)
            + self.signs.yaw.apply(errors.yaw)
            + errors.vertical
    }

    /// The motor's sign coefficients.
    pub fn signs(&self) -> MixSigns {
        self.signs
    }

    /// Accumulated integral term.
    pub fn integral(&self) -> T {
        self.pid.integral
    }

    /// Error seen on the previous update.
    pub fn last_error(&self) -> T {
        self.pid.error
    }

    /// Raw PID output of the previous update.
    pub fn output(&self) -> T {
        self.output
    }

    /// Current commanded speed.
    pub fn speed(&self) -> u16 {
        self.speed
    }

    /// Speed commanded the tick before the current one.
    pub fn last_speed(&self) -> u16 {
        self.last_speed
    }

    /// Records a newly commanded speed, keeping the previous one for slew
    /// limiting.
    pub fn set_speed(&mut self, speed: u16) {
        self.last_speed = self.speed;
        self.speed = speed;
    }

    fn update(&mut self, errors: &AxisErrors<T>, dt: T, i_limit: T, reset_integral: bool) -> T {
        let data = MotorControlData {
            error: self.mixed_error(errors),
            dt,
            integral_limit: i_limit,
            reset_integral,
        };
        self.output = self.pid.compute(data);
        self.output
    }
}

/// The four-channel PID bank.
pub struct MotorMixer<T: Number> {
    channels: [MotorChannel<T>; 4],
    i_limit: T,
}

impl<T: Number> Default for MotorMixer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Number> MotorMixer<T> {
    /// Creates a new mixer using the provided configuration.
    pub fn with_config(config: MixerConfig<T>) -> Self {
        let channels = [0, 1, 2, 3].map(|motor| MotorChannel::new(&config, config.layout[motor]));
        MotorMixer {
            channels,
            i_limit: config.i_limit,
        }
    }

    /// Creates a new mixer with default settings.
    pub fn new() -> Self {
        Self::with_config(MixerConfig::new())
    }

    /// The channels in motor order e1..e4.
    pub fn channels(&self) -> &[MotorChannel<T>; 4] {
        &self.channels
    }

    /// Mutable access to the channels, used to record commanded speeds.
    pub fn channels_mut(&mut self) -> &mut [MotorChannel<T>; 4] {
        &mut self.channels
    }
}

impl<T: Number> FlightStabilizer<T> for MotorMixer<T> {
    fn stabilize(&mut self, errors: AxisErrors<T>, dt: T, reset_integral: bool) -> [T; 4] {
        let i_limit = self.i_limit;
        let mut outputs = [T::zero(); 4];
        for (output, channel) in outputs.iter_mut().zip(self.channels.iter_mut()) {
            *output = channel.update(&errors, dt, i_limit, reset_integral);
        }
        outputs
    }
}
