// src/error.rs

//! # Error Module
//!
//! Every fallible operation in the crate reports through [`Error`]. The type
//! parameter `E` is the error type of the sensor adapter in use, so bus
//! faults keep their original detail.
//!
//! Saturation of PID or actuator outputs is an expected operating condition
//! and is never reported here; those values are clamped silently.

use thiserror::Error;

/// Errors surfaced by the flight core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// A sensor read failed on every retry attempt.
    #[error("sensor bus transaction failed after retries: {0:?}")]
    Bus(E),
    /// The estimator held its previous state because the tick's sample was
    /// unavailable. Non-fatal; the caller decides when to give up.
    #[error("sensor data stale for {consecutive} consecutive ticks")]
    StaleData {
        /// Number of ticks in a row without a fresh sample.
        consecutive: u32,
    },
    /// The sensor could not be configured. Fatal at startup.
    #[error("sensor configuration failed: {0:?}")]
    Configuration(E),
    /// The sensor did not answer with the expected identity. Fatal at startup.
    #[error("sensor identity check failed")]
    IdentityMismatch,
    /// The system clock could not be brought within tolerance. Fatal at startup.
    #[error("clock at {actual_hz} Hz is outside tolerance of {target_hz} Hz")]
    ClockOutOfTolerance {
        /// Measured clock frequency.
        actual_hz: u32,
        /// Requested clock frequency.
        target_hz: u32,
    },
    /// A control tick or arm request arrived before a successful startup.
    #[error("flight core has not completed startup")]
    NotReady,
}

impl<E> Error<E> {
    /// Returns `true` for errors that must keep the craft out of flight mode.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::IdentityMismatch | Error::ClockOutOfTolerance { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Startup faults are fatal, runtime faults are not.
    #[test]
    fn test_error_fatality_classification() {
        assert!(Error::<()>::Configuration(()).is_fatal());
        assert!(Error::<()>::IdentityMismatch.is_fatal());
        assert!(Error::<()>::ClockOutOfTolerance {
            actual_hz: 79_000_000,
            target_hz: 80_000_000
        }
        .is_fatal());

        assert!(!Error::<()>::Bus(()).is_fatal());
        assert!(!Error::<()>::StaleData { consecutive: 3 }.is_fatal());
        assert!(!Error::<()>::NotReady.is_fatal());
    }
}
