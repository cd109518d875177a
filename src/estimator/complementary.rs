// src/estimator/complementary.rs

//! # Complementary Filter Module
//!
//! Pulls the gyro-integrated pitch and roll toward the tilt implied by the
//! accelerometer. The correction is only trusted while the total specific
//! force looks like gravity alone; outside that band the accelerometer is
//! sensing manoeuvre or vibration and is ignored for the tick.

use num_traits::Float;

use super::rotation::wrap_angle;

/// Tilt-correcting complementary filter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComplementaryFilter {
    /// Weight kept on the gyro-integrated angle, in [0, 1].
    pub gyro_weight: f32,
    /// Lower bound of the accepted |a_x|+|a_y|+|a_z| band, in g.
    pub min_force: f32,
    /// Upper bound of the accepted band, in g. Normally the accelerometer
    /// full scale.
    pub max_force: f32,
}

impl Default for ComplementaryFilter {
    fn default() -> Self {
        Self::new(0.95, 0.5, 2.0)
    }
}

impl ComplementaryFilter {
    /// Creates a filter with the given gyro weight and acceptance band.
    pub fn new(gyro_weight: f32, min_force: f32, max_force: f32) -> Self {
        Self {
            gyro_weight,
            min_force,
            max_force,
        }
    }

    /// Accelerometer-only tilt as (pitch, roll) in radians.
    pub fn tilt(acceleration: [f32; 3]) -> (f32, f32) {
        let [a_x, a_y, a_z] = acceleration;
        let a_z = a_z.clamp(-1.0, 1.0);
        (a_x.atan2(a_z), -a_y.atan2(a_z))
    }

    /// Returns `true` when the approximate force magnitude lies strictly
    /// inside the acceptance band.
    pub fn accepts(&self, acceleration: [f32; 3]) -> bool {
        let magnitude = acceleration.iter().map(|a| a.abs()).sum::<f32>();
        self.min_force < magnitude && magnitude < self.max_force
    }

    /// Blends `(pitch, roll)` with the accelerometer tilt.
    ///
    /// Returns the input unchanged when the gate rejects the sample.
    pub fn apply(&self, pitch: f32, roll: f32, acceleration: [f32; 3]) -> (f32, f32) {
        if !self.accepts(acceleration) {
            trace!("accelerometer outside gate, gyro only");
            return (pitch, roll);
        }
        let (pitch_acc, roll_acc) = Self::tilt(acceleration);
        let accel_weight = 1.0 - self.gyro_weight;
        // Blend along the shortest arc so the ±π seam does not average to 0.
        (
            wrap_angle(pitch + accel_weight * wrap_angle(pitch_acc - pitch)),
            wrap_angle(roll + accel_weight * wrap_angle(roll_acc - roll)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    /// Level, 1 g readings produce zero tilt.
    #[test]
    fn test_filter_tilt_level() {
        let (pitch, roll) = ComplementaryFilter::tilt([0.0, 0.0, 1.0]);
        assert!(value_close(0.0, pitch));
        assert!(value_close(0.0, roll));
    }

    /// Tilt follows atan2(a_x, a_z) for pitch and -atan2(a_y, a_z) for roll.
    #[test]
    fn test_filter_tilt_signs() {
        let angle = 10.0_f32.to_radians();
        let (pitch, _) = ComplementaryFilter::tilt([angle.sin(), 0.0, angle.cos()]);
        assert!(value_close(angle, pitch), "Pitch tilt should be +10°.");

        let (_, roll) = ComplementaryFilter::tilt([0.0, angle.sin(), angle.cos()]);
        assert!(value_close(-angle, roll), "Roll tilt should be -10°.");
    }

    /// Accepted samples blend 95/5.
    #[test]
    fn test_filter_blend_weights() {
        let filter = ComplementaryFilter::default();
        let angle = 10.0_f32.to_radians();
        let (pitch, roll) = filter.apply(0.0, 0.0, [angle.sin(), 0.0, angle.cos()]);
        assert!(value_close(0.05 * angle, pitch));
        assert!(value_close(0.0, roll));
    }

    /// Forces outside [0.5 g, full scale] leave the gyro angles untouched.
    #[test]
    fn test_filter_gate_rejects_out_of_band() {
        let filter = ComplementaryFilter::new(0.95, 0.5, 4.0);
        let (pitch, roll) = (0.2, -0.1);

        let free_fall = [0.1, 0.1, 0.2];
        assert_eq!((pitch, roll), filter.apply(pitch, roll, free_fall));

        let high_g = [2.0, 1.0, 3.0];
        assert_eq!((pitch, roll), filter.apply(pitch, roll, high_g));

        let saturated = [0.0, 0.0, -4.5];
        assert_eq!((pitch, roll), filter.apply(pitch, roll, saturated));
    }

    /// Repeated accepted samples converge on the accelerometer tilt.
    #[test]
    fn test_filter_converges() {
        let filter = ComplementaryFilter::default();
        let angle = 5.0_f32.to_radians();
        let accel = [angle.sin(), 0.0, angle.cos()];
        let (mut pitch, mut roll) = (0.0, 0.0);
        for _ in 0..500 {
            (pitch, roll) = filter.apply(pitch, roll, accel);
        }
        assert!(value_close(angle, pitch), "Pitch should converge.");
        assert!(value_close(0.0, roll), "Roll should stay level.");
    }

    /// An inverted, stationary craft stays inverted while the accelerometer
    /// roll flips across the ±180° seam every tick.
    #[test]
    fn test_filter_blend_across_seam() {
        let filter = ComplementaryFilter::default();
        let (mut pitch, mut roll) = (core::f32::consts::PI, core::f32::consts::PI);
        for tick in 0..2000 {
            let a_y = if tick % 2 == 0 { 0.06 } else { -0.06 };
            (pitch, roll) = filter.apply(pitch, roll, [0.0, a_y, -1.0]);
            assert!(
                roll.abs().to_degrees() > 176.0,
                "Roll swept toward level: {}",
                roll.to_degrees()
            );
        }
    }
}
