// src/pwm.rs

//! # PWM Pulse Scheduler
//!
//! Generates four variable-width pulses per fixed period from a single
//! high-frequency timer interrupt. Call [`PulseScheduler::tick`] once per
//! timer interrupt; it returns the level each motor line should have until
//! the next interrupt.
//!
//! At the start of a period every line is asserted and each motor's
//! commanded speed is latched as its deadline. On every later tick of the
//! period a line is deasserted once the elapsed tick count reaches its
//! deadline. The period restarts after exactly `period` ticks whatever the
//! lines are doing, so a deadline of zero gives a one-tick pulse and a
//! deadline at or past the period keeps the line high throughout, both from
//! the same comparison.
//!
//! The scheduler drives every motor at `disarmed_deadline` for the whole
//! period when the shared disarm latch is set, after an emergency stop, or
//! when the control loop has not published within `stale_periods` periods.

use embedded_hal::digital::OutputPin;

use crate::shared::MotorSpeeds;

/// Scheduler tuning. Durations are in scheduler ticks, the same unit as the
/// published motor speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerConfig {
    /// Period length in ticks.
    pub period: u32,
    /// Deadline used for every motor while disarmed.
    pub disarmed_deadline: u16,
    /// Periods without a new publish after which the motors are disarmed;
    /// `None` disables the watchdog.
    pub stale_periods: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerConfig {
    /// A 400 Hz period at one tick per microsecond, watchdog off.
    pub fn new() -> Self {
        Self {
            period: 2500,
            disarmed_deadline: 0,
            stale_periods: None,
        }
    }
}

/// Line levels for one scheduler tick, in motor order e1..e4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineLevels(pub [bool; 4]);

impl LineLevels {
    /// Whether the given motor's line is asserted.
    pub fn is_high(&self, motor: usize) -> bool {
        self.0.get(motor).copied().unwrap_or(false)
    }

    /// Levels packed for a port write, motor e1 in bit 0.
    pub fn mask(&self) -> u8 {
        self.0
            .iter()
            .enumerate()
            .fold(0, |mask, (bit, &high)| mask | (u8::from(high) << bit))
    }

    /// Drives four output pins to these levels.
    pub fn apply<P: OutputPin>(&self, pins: &mut [P; 4]) -> Result<(), P::Error> {
        for (pin, &high) in pins.iter_mut().zip(self.0.iter()) {
            if high {
                pin.set_high()?;
            } else {
                pin.set_low()?;
            }
        }
        Ok(())
    }
}

/// Per-motor pulse state and the period timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseScheduler {
    config: SchedulerConfig,
    asserted: [bool; 4],
    deadlines: [u16; 4],
    elapsed: u32,
    last_generation: u32,
    quiet_periods: u32,
    stopped: bool,
    holding_disarmed: bool,
}

impl Default for PulseScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseScheduler {
    /// Creates a scheduler using the provided configuration. The first tick
    /// starts a period.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            asserted: [false; 4],
            deadlines: [config.disarmed_deadline; 4],
            elapsed: config.period,
            last_generation: 0,
            quiet_periods: 0,
            stopped: false,
            holding_disarmed: false,
        }
    }

    /// Creates a scheduler with default settings.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::new())
    }

    /// The active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Deadlines latched at the start of the current period.
    pub fn deadlines(&self) -> [u16; 4] {
        self.deadlines
    }

    /// Ticks elapsed in the current period.
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Whether the current period is running at the disarmed deadline.
    pub fn is_holding_disarmed(&self) -> bool {
        self.holding_disarmed
    }

    /// Current line levels.
    pub fn levels(&self) -> LineLevels {
        LineLevels(self.asserted)
    }

    /// Advances one scheduler tick.
    pub fn tick(&mut self, speeds: &MotorSpeeds) -> LineLevels {
        if self.elapsed >= self.config.period {
            self.start_period(speeds);
        } else {
            let elapsed = self.elapsed;
            for (asserted, &deadline) in self.asserted.iter_mut().zip(self.deadlines.iter()) {
                if *asserted && u32::from(deadline) <= elapsed {
                    *asserted = false;
                }
            }
        }
        self.elapsed += 1;
        self.levels()
    }

    /// Deasserts every line at once and keeps the motors disarmed until
    /// [`rearm`](Self::rearm). Intended for the highest-priority context.
    pub fn emergency_stop(&mut self) -> LineLevels {
        if !self.stopped {
            warn!("emergency stop");
        }
        self.stopped = true;
        self.asserted = [false; 4];
        self.deadlines = [self.config.disarmed_deadline; 4];
        self.levels()
    }

    /// Releases an emergency stop. Takes effect at the next period start.
    pub fn rearm(&mut self) {
        self.stopped = false;
        self.quiet_periods = 0;
    }

    fn start_period(&mut self, speeds: &MotorSpeeds) {
        let generation = speeds.generation();
        if generation != self.last_generation {
            self.last_generation = generation;
            self.quiet_periods = 0;
        } else {
            self.quiet_periods = self.quiet_periods.saturating_add(1);
        }
        let stale = self
            .config
            .stale_periods
            .is_some_and(|limit| self.quiet_periods >= limit);

        let disarmed = self.stopped || stale || speeds.is_disarmed();
        if disarmed != self.holding_disarmed {
            if stale {
                warn!("control loop stalled for {=u32} periods", self.quiet_periods);
            } else {
                info!("motors held disarmed: {=bool}", disarmed);
            }
            self.holding_disarmed = disarmed;
        }

        self.deadlines = if disarmed {
            [self.config.disarmed_deadline; 4]
        } else {
            speeds.snapshot()
        };
        self.asserted = [true; 4];
        self.elapsed = 0;
    }
}
