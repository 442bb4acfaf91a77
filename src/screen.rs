//! Range screening of the input grids.
//!
//! Out-of-range values are clamped to the nearest valid value rather than
//! rejected. Each clamp is counted so callers get a summary in the log.

use log::warn;
use rayon::prelude::*;

/// Upper bound (exclusive) of a physically meaningful zenith angle, degrees.
const MAX_ZENITH: f64 = 180.0;

/// Number of values that were clamped, per input category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenReport {
    /// GHI values below zero
    pub negative_ghi: usize,
    /// Zenith angles outside [0, 180)
    pub zenith_out_of_range: usize,
    /// Zenith angles above the configured limit (including the out-of-range ones)
    pub zenith_above_limit: usize,
    /// Optical depths below zero or above the screening maximum
    pub optical_depth_out_of_range: usize,
    /// Transmittances outside [0, 1]
    pub transmittance_out_of_range: usize,
}

impl ScreenReport {
    /// Total number of clamped values.
    pub fn total(&self) -> usize {
        self.negative_ghi
            + self.zenith_out_of_range
            + self.zenith_above_limit
            + self.optical_depth_out_of_range
            + self.transmittance_out_of_range
    }

    /// Emit one warning per category with a nonzero count.
    pub fn log_warnings(&self) {
        if self.negative_ghi > 0 {
            warn!("clamped {} negative GHI values to 0", self.negative_ghi);
        }
        if self.zenith_out_of_range > 0 {
            warn!(
                "{} zenith angles outside [0, 180) degrees",
                self.zenith_out_of_range
            );
        }
        if self.zenith_above_limit > 0 {
            warn!(
                "clamped {} zenith angles to the zenith limit",
                self.zenith_above_limit
            );
        }
        if self.optical_depth_out_of_range > 0 {
            warn!(
                "clamped {} cloud optical depths into the valid range",
                self.optical_depth_out_of_range
            );
        }
        if self.transmittance_out_of_range > 0 {
            warn!(
                "clamped {} clear-sky transmittances into [0, 1]",
                self.transmittance_out_of_range
            );
        }
    }
}

impl std::ops::Add for ScreenReport {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            negative_ghi: self.negative_ghi + rhs.negative_ghi,
            zenith_out_of_range: self.zenith_out_of_range + rhs.zenith_out_of_range,
            zenith_above_limit: self.zenith_above_limit + rhs.zenith_above_limit,
            optical_depth_out_of_range: self.optical_depth_out_of_range
                + rhs.optical_depth_out_of_range,
            transmittance_out_of_range: self.transmittance_out_of_range
                + rhs.transmittance_out_of_range,
        }
    }
}

/// Negative irradiance becomes 0. NaN is left alone.
#[inline]
pub fn screen_ghi(ghi: f64) -> f64 {
    if ghi < 0.0 {
        0.0
    } else {
        ghi
    }
}

/// Clamp a zenith angle (degrees) into `[0, limit]`.
#[inline]
pub fn screen_zenith(zenith: f64, limit: f64) -> f64 {
    zenith.clamp(0.0, limit)
}

/// Clamp a cloud property into `[0, max]`. A NaN stays NaN, since it marks a
/// missing retrieval.
#[inline]
pub fn screen_cloud(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.clamp(0.0, max)
    }
}

/// Clamp a transmittance or reflectance into `[0, 1]`.
#[inline]
pub fn screen_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Irradiance leaving the model: negative or non-finite values become 0.
#[inline]
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Count how many values of each input fall outside their valid range.
///
/// Every argument is a flat slice over the same cells. Pass an empty slice for
/// inputs that don't take part.
pub fn count_out_of_range(
    ghi: &[f64],
    zenith: &[f64],
    zenith_limit: f64,
    tau: &[f64],
    max_optical_depth: f64,
    transmittance: &[f64],
) -> ScreenReport {
    fn count(values: &[f64], bad: impl Fn(f64) -> bool + Sync) -> usize {
        values.par_iter().filter(|&&v| bad(v)).count()
    }

    ScreenReport {
        negative_ghi: count(ghi, |v| v < 0.0),
        zenith_out_of_range: count(zenith, |v| !(0.0..MAX_ZENITH).contains(&v)),
        zenith_above_limit: count(zenith, |v| v > zenith_limit),
        optical_depth_out_of_range: count(tau, |v| v < 0.0 || v > max_optical_depth),
        transmittance_out_of_range: count(transmittance, |v| !(0.0..=1.0).contains(&v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_screens() {
        assert_eq!(screen_ghi(-3.0), 0.0);
        assert_eq!(screen_ghi(250.0), 250.0);
        assert_eq!(screen_zenith(95.0, 87.0), 87.0);
        assert_eq!(screen_zenith(-1.0, 87.0), 0.0);
        assert_eq!(screen_cloud(200.0, 160.0), 160.0);
        assert_eq!(screen_cloud(-1.0, 160.0), 0.0);
        assert!(screen_cloud(f64::NAN, 160.0).is_nan());
        assert_eq!(screen_unit(1.2), 1.0);
        assert_eq!(screen_unit(f64::NAN), 0.0);
        assert_eq!(non_negative(-2.0), 0.0);
        assert_eq!(non_negative(f64::INFINITY), 0.0);
        assert_eq!(non_negative(3.5), 3.5);
    }

    #[test]
    fn counts_each_category() {
        let report = count_out_of_range(
            &[-1.0, 0.0, 100.0, -0.5],
            &[10.0, 88.0, 185.0, -2.0],
            87.0,
            &[-1.0, 5.0, 161.0, f64::NAN],
            160.0,
            &[0.5, 1.5],
        );
        assert_eq!(
            report,
            ScreenReport {
                negative_ghi: 2,
                zenith_out_of_range: 2,
                zenith_above_limit: 2,
                optical_depth_out_of_range: 2,
                transmittance_out_of_range: 1,
            }
        );
        assert_eq!(report.total(), 9);
        assert_eq!((report + report).negative_ghi, 4);
    }

    #[test]
    fn empty_inputs_count_nothing() {
        let report = count_out_of_range(&[], &[], 87.0, &[], 160.0, &[]);
        assert_eq!(report, ScreenReport::default());
        report.log_warnings();
    }
}
