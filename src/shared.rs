// src/shared.rs

//! # Shared Motor Speeds
//!
//! The only state shared between the control tick and the pulse scheduler.
//! The control tick is the single writer, the scheduler the single reader,
//! and the reader only samples at the start of a period. Each speed is one
//! atomic word so a read is never torn.
//!
//! Alongside the speeds sit a disarm latch, which any context may set to
//! force every motor to its disarmed command, and a publish generation the
//! scheduler uses to notice a stalled control loop.
//!
//! Only plain loads and stores are used, so the type works on cores without
//! compare-and-swap.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

/// Per-motor speeds published by the control loop.
///
/// ```
/// use quad_flight_core::shared::MotorSpeeds;
///
/// static SPEEDS: MotorSpeeds = MotorSpeeds::new(1000);
///
/// SPEEDS.publish([1400, 1410, 1390, 1400]);
/// assert_eq!([1400, 1410, 1390, 1400], SPEEDS.snapshot());
/// assert_eq!(1, SPEEDS.generation());
/// ```
#[derive(Debug)]
pub struct MotorSpeeds {
    speeds: [AtomicU16; 4],
    generation: AtomicU32,
    disarmed: AtomicBool,
}

impl MotorSpeeds {
    /// Creates the shared block with every motor at `initial`.
    pub const fn new(initial: u16) -> Self {
        Self {
            speeds: [
                AtomicU16::new(initial),
                AtomicU16::new(initial),
                AtomicU16::new(initial),
                AtomicU16::new(initial),
            ],
            generation: AtomicU32::new(0),
            disarmed: AtomicBool::new(false),
        }
    }

    /// Publishes a fully computed set of speeds. Only the control loop may
    /// call this.
    pub fn publish(&self, speeds: [u16; 4]) {
        for (slot, speed) in self.speeds.iter().zip(speeds) {
            slot.store(speed, Ordering::Relaxed);
        }
        // Single writer: load then store instead of a read-modify-write.
        let next = self.generation.load(Ordering::Relaxed).wrapping_add(1);
        self.generation.store(next, Ordering::Release);
    }

    /// Reads the latest speeds.
    pub fn snapshot(&self) -> [u16; 4] {
        // Pairs with the release store in `publish`.
        let _ = self.generation.load(Ordering::Acquire);
        [
            self.speeds[0].load(Ordering::Relaxed),
            self.speeds[1].load(Ordering::Relaxed),
            self.speeds[2].load(Ordering::Relaxed),
            self.speeds[3].load(Ordering::Relaxed),
        ]
    }

    /// Number of publishes so far, wrapping.
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    /// Latches the disarmed state. Safe to call from any context.
    pub fn disarm(&self) {
        self.disarmed.store(true, Ordering::SeqCst);
    }

    /// Releases the disarm latch.
    pub fn clear_disarm(&self) {
        self.disarmed.store(false, Ordering::SeqCst);
    }

    /// Whether the disarm latch is set.
    pub fn is_disarmed(&self) -> bool {
        self.disarmed.load(Ordering::SeqCst)
    }
}
