// src/pid/motor.rs

//! # Motor PID Control Module
//!
//! This module provides a compute function and control data structure
//! to run one motor's PID (Proportional-Integral-Derivative) loop on an
//! already-mixed error signal.

use crate::Number;
use piddiy::PidController;

/// Control data for the per-motor PID compute callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorControlData<T> {
    /// The motor's mixed error: attitude errors weighted by the motor's
    /// sign coefficients, plus any unsigned vertical or altitude terms.
    pub error: T,
    /// The time delta since the last computation.
    pub dt: T,
    /// The maximum allowed magnitude for the integral term, used to prevent integral windup.
    pub integral_limit: T,
    /// Flag to reset the integral term, typically used while the motors are disarmed.
    pub reset_integral: bool,
}

/// Per-motor PID compute callback.
///
/// The controller's set point is not consulted: mixing has already folded
/// the target into `data.error`. A non-positive `dt` yields a zero
/// derivative rather than a division by zero.
pub fn compute_motor<T: Number>(
    pid: &mut PidController<T, MotorControlData<T>>,
    data: MotorControlData<T>,
) -> (T, T, T) {
    let error = data.error;
    let integral = if !data.reset_integral {
        (pid.integral + error * data.dt).clamp(-data.integral_limit, data.integral_limit)
    } else {
        T::zero()
    };
    let derivative = if T::zero() < data.dt {
        (error - pid.error) / data.dt
    } else {
        T::zero()
    };

    (error, integral, derivative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn motor_pid(kp: f32, ki: f32, kd: f32) -> PidController<f32, MotorControlData<f32>> {
        let mut pid = PidController::new();
        pid.compute_fn(compute_motor).kp(kp).ki(ki).kd(kd);
        pid
    }

    /// Test that the integral term is clamped to the specified limit.
    #[test]
    fn test_pid_motor_integral_clamping() {
        let mut pid = motor_pid(1.0, 5.0, 0.1);
        let data = MotorControlData {
            error: 50.0,
            dt: 1.0,
            integral_limit: 100.0, // Integral should not exceed this value.
            reset_integral: false,
        };

        for _ in 0..10 {
            let _ = pid.compute(data);
        }

        let (_, integral, _) = compute_motor(&mut pid, data);
        assert!(
            value_close(100.0, integral),
            "Integral should be clamped to 100."
        );
    }

    /// Test the behavior when the reset_integral flag is true.
    #[test]
    fn test_pid_motor_integral_reset() {
        let mut pid = motor_pid(1.0, 1.0, 0.1);
        let data = MotorControlData {
            error: 10.0,
            dt: 1.0,
            integral_limit: 100.0,
            reset_integral: false,
        };

        let _ = pid.compute(data);
        assert!(value_close(10.0, pid.integral), "Integral should accumulate.");

        let data_reset = MotorControlData {
            reset_integral: true,
            ..data
        };
        let _ = pid.compute(data_reset);
        assert!(value_close(0.0, pid.integral), "Integral should be zero.");
    }

    /// Test that the output is the sum of kp·e, ki·∫e and kd·de/dt.
    #[test]
    fn test_pid_motor_response() {
        let mut pid = motor_pid(1.0, 1.0, 1.0);
        let data = MotorControlData {
            error: 10.0,
            dt: 1.0,
            integral_limit: 100.0,
            reset_integral: false,
        };

        let output = pid.compute(data);
        assert!(value_close(30.0, output), "Output should be the sum of terms.");
        assert!(value_close(10.0, pid.error), "Last error should be stored.");

        // Constant error: derivative vanishes, integral keeps growing.
        let output = pid.compute(data);
        assert!(value_close(30.0, output), "10 + 20 + 0 expected.");
        assert!(value_close(20.0, pid.integral));
    }

    /// Test that a zero dt does not produce an infinite derivative.
    #[test]
    fn test_pid_motor_zero_dt() {
        let mut pid = motor_pid(1.0, 1.0, 1.0);
        let data = MotorControlData {
            error: 4.0,
            dt: 0.0,
            integral_limit: 100.0,
            reset_integral: false,
        };
        let output = pid.compute(data);
        assert!(output.is_finite(), "Output should stay finite.");
        assert!(value_close(4.0, output), "Only the proportional term remains.");
    }

    /// Test that identical inputs from identical state give identical output.
    #[test]
    fn test_pid_motor_deterministic() {
        let data = MotorControlData {
            error: 0.37,
            dt: 0.002,
            integral_limit: 25.0,
            reset_integral: false,
        };
        let mut a = motor_pid(5.0, 0.3, 3.0);
        let mut b = motor_pid(5.0, 0.3, 3.0);
        for _ in 0..100 {
            assert_eq!(a.compute(data), b.compute(data));
        }
    }
}
