// src/lib.rs

//! # Quadcopter Flight Stabilization Core
//!
//! A `no_std`, no-alloc flight-stabilization core for "X" quadcopters. It
//! turns inertial-sensor readings into an attitude estimate, compares the
//! estimate with a commanded target through four coupled PID loops, and
//! drives four motor lines from a fixed-period pulse scheduler.
//!
//! Two periodic activities share one [`shared::MotorSpeeds`] block:
//!
//! - the control tick, [`flight::FlightController::tick`], which reads the
//!   sensor, updates the [`estimator::Estimator`], runs the [`MotorMixer`]
//!   and the [`output::OutputTranslator`], and publishes four speeds;
//! - the pulse tick, [`pwm::PulseScheduler::tick`], which runs from a much
//!   faster timer interrupt and latches those speeds once per period.
//!
//! All internal quantities are SI floats (radians, rad/s, g, metres). The
//! PID bank is generic over [`Number`] and also runs on fixed-point types.

#![no_std]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

pub mod error;
pub mod estimator;
pub mod flight;
pub mod output;
pub mod pid;
pub mod pwm;
pub mod sensor;
pub mod shared;
pub mod stabilizer;
pub mod state;

#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use stabilizer::*;

#[cfg(test)]
mod test_utils;
