// src/output.rs

//! # Output Translator
//!
//! Maps a raw PID output to a bounded motor command in scheduler ticks.
//! The mapping law is a tunable [`OutputMapping`]; every law shares the same
//! post-conditions: the result lies in `[min, max]` and, with slew limiting
//! enabled, rises by at most `max_step` per control tick.

use num_traits::Float;

/// Law turning a raw PID output into an offset from the hover bias.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputMapping {
    /// `hover + pid / scale`.
    Linear {
        /// Divisor applied to the PID output.
        scale: f32,
    },
    /// `hover + sign(pid) · |pid|^exponent · factor`.
    PowerLaw {
        /// Exponent of the odd power law, 2.4 on the reference airframe.
        exponent: f32,
        /// Multiplier applied after the power.
        factor: f32,
    },
    /// `hover + atan2(pid, k1) · k2`, a soft saturation.
    Arctangent {
        /// Input softness: larger values widen the linear region.
        k1: f32,
        /// Output gain: the offset tends to ±k2·π/2.
        k2: f32,
    },
}

impl OutputMapping {
    /// Offset from the hover bias for a raw PID output. May be non-finite.
    pub fn offset(&self, pid_out: f32) -> f32 {
        match *self {
            OutputMapping::Linear { scale } => pid_out / scale,
            OutputMapping::PowerLaw { exponent, factor } => {
                pid_out.signum() * pid_out.abs().powf(exponent) * factor
            }
            OutputMapping::Arctangent { k1, k2 } => pid_out.atan2(k1) * k2,
        }
    }
}

/// Output translator tuning. All speeds are in scheduler ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputConfig {
    /// Selected mapping law.
    pub mapping: OutputMapping,
    /// Command giving roughly zero net vertical acceleration.
    pub hover_bias: u16,
    /// Lowest command, also commanded while disarmed.
    pub min: u16,
    /// Highest command.
    pub max: u16,
    /// Largest increase allowed per tick; `None` disables slew limiting.
    pub max_step: Option<u16>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputConfig {
    /// Standard ESC pulse range of 1000 to 2000 µs, linear mapping.
    pub fn new() -> Self {
        Self {
            mapping: OutputMapping::Linear { scale: 0.01 },
            hover_bias: 1400,
            min: 1000,
            max: 2000,
            max_step: Some(20),
        }
    }
}

/// Stateless PID-to-command translator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputTranslator {
    config: OutputConfig,
}

impl Default for OutputTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputTranslator {
    /// Creates a translator using the provided configuration.
    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Creates a translator with default settings.
    pub fn new() -> Self {
        Self::with_config(OutputConfig::new())
    }

    /// The active configuration.
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// The command used while disarmed.
    pub fn disarmed(&self) -> u16 {
        self.config.min
    }

    /// Translates a raw PID output, given the command of the previous tick.
    ///
    /// A NaN mapping result is treated as the lowest command. Infinite
    /// results saturate like any other out-of-range value.
    pub fn translate(&self, pid_out: f32, last_speed: u16) -> u16 {
        let min = f32::from(self.config.min);
        let max = f32::from(self.config.max);

        let raw = f32::from(self.config.hover_bias) + self.config.mapping.offset(pid_out);
        let mut speed = if raw.is_nan() { min } else { raw.clamp(min, max) };

        if let Some(step) = self.config.max_step {
            let ceiling = f32::from(last_speed) + f32::from(step);
            if speed > ceiling {
                speed = ceiling;
            }
        }

        // The slew ceiling can sit below min when the last command was zero.
        speed.round().clamp(min, max) as u16
    }
}
