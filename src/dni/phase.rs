//! Phase-specific transmittance of the scattered circumsolar beam.
//!
//! Implements Eqs. 3-6 of Yang et al. (2022). Each function gives the share of
//! the beam that a cloud of that phase scatters into the circumsolar region.
//! The water and ice values are independent quantities, not weights that add
//! up to one.

use ndarray::{ArrayD, ArrayViewD, Zip};

use super::coefficients::{
    segment_below, segment_up_to, SlopeFit, TaupBand, ICE_LARGE_DE, ICE_LARGE_SCALE,
    ICE_LARGE_TDDP, ICE_MEDIUM_SCALE, ICE_MEDIUM_TDDP, ICE_OVERHEAD_DE_BREAK, ICE_OVERHEAD_EXP,
    ICE_OVERHEAD_LINEAR, ICE_OVERHEAD_MU, ICE_SLOPE, ICE_SMALL_TDDP, ICE_TAUP, WATER_H,
    WATER_SLOPE, WATER_TAUP, WATER_TDDP,
};
use crate::error::FarmsError;
use crate::grid::check_shapes;

/// Effective diameter (µm) at or below which ice clouds use the small-particle fit.
const ICE_SMALL_DE: f64 = 10.0;

/// Optical depth at which the transmittance peaks. The last matching band
/// wins; no match gives 0.
fn peak_optical_depth(bands: &[TaupBand], mu: f64, de: f64) -> f64 {
    bands
        .iter()
        .rev()
        .find(|band| band.contains(mu, de))
        .map_or(0.0, |band| band.value)
}

fn water_peak(mu: f64, de: f64) -> f64 {
    let h = WATER_H[0] * de.ln() + WATER_H[1];
    segment_below(&WATER_TDDP, mu).map_or(0.0, |s| h * s.eval(mu))
}

fn ice_peak(mu: f64, de: f64) -> f64 {
    if de <= ICE_SMALL_DE {
        return segment_below(&ICE_SMALL_TDDP, mu).map_or(0.0, |s| s.eval(mu));
    }

    if mu >= ICE_OVERHEAD_MU {
        return if de <= ICE_OVERHEAD_DE_BREAK {
            ICE_OVERHEAD_LINEAR[0] * de + ICE_OVERHEAD_LINEAR[1]
        } else {
            ICE_OVERHEAD_EXP[0] * (ICE_OVERHEAD_EXP[1] * de).exp()
        };
    }

    let (table, [c2, c1, c0]) = if de <= ICE_LARGE_DE {
        (&ICE_MEDIUM_TDDP, ICE_MEDIUM_SCALE)
    } else {
        (&ICE_LARGE_TDDP, ICE_LARGE_SCALE)
    };
    let scale = c2 * de * de + c1 * de + c0;
    segment_up_to(table, mu).map_or(0.0, |s| scale * s.eval(mu))
}

/// Eq. 5: rises as `tanh(a τ)` up to `0.9 τp`, then a linear bridge, then
/// decays as `tanh(b / τ²)` past `τp`.
fn shape(peak: f64, fit: SlopeFit, mu: f64, tau: f64, taup: f64) -> f64 {
    let a = fit.a_coef * mu.powf(fit.a_exp);
    let b = fit.b_coef * mu.powf(fit.b_exp);

    if tau <= 0.9 * taup {
        peak * (a * tau).tanh()
    } else if tau < taup {
        let rise = (0.9 * a * taup).tanh();
        let fall = (b / (taup * taup)).tanh();
        peak * rise + peak * (fall - rise) * (tau - 0.9 * taup) / (0.1 * taup)
    } else {
        peak * (b / (tau * tau)).tanh()
    }
}

/// Clamp into [0, 1], with anything non-finite mapped to 0.
fn unit_interval(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn phase_transmittance(
    zenith: f64,
    tau: f64,
    de: f64,
    bands: &[TaupBand],
    fit: SlopeFit,
    peak: fn(f64, f64) -> f64,
) -> f64 {
    let mu = zenith.to_radians().cos();
    if mu <= 0.0 || tau.is_nan() {
        return 0.0;
    }
    // Outside every fitted band there is no circumsolar peak to scale
    let taup = peak_optical_depth(bands, mu, de);
    if taup <= 0.0 {
        return 0.0;
    }
    unit_interval(shape(peak(mu, de), fit, mu, tau, taup))
}

/// Circumsolar transmittance of a water cloud.
///
/// `zenith` in degrees, `tau` the (scaled) optical depth, `de` the effective
/// droplet diameter in µm. The result is within [0, 1]. It is 0 when the sun
/// is below the horizon.
pub fn p_water(zenith: f64, tau: f64, de: f64) -> f64 {
    phase_transmittance(zenith, tau, de, &WATER_TAUP, WATER_SLOPE, water_peak)
}

/// Circumsolar transmittance of an ice cloud. Same conventions as [`p_water`].
pub fn p_ice(zenith: f64, tau: f64, de: f64) -> f64 {
    phase_transmittance(zenith, tau, de, &ICE_TAUP, ICE_SLOPE, ice_peak)
}

fn map_grid(
    zenith: ArrayViewD<'_, f64>,
    tau: ArrayViewD<'_, f64>,
    de: ArrayViewD<'_, f64>,
    f: fn(f64, f64, f64) -> f64,
) -> Result<ArrayD<f64>, FarmsError> {
    check_shapes(&[
        ("zenith", zenith.shape()),
        ("tau", tau.shape()),
        ("de", de.shape()),
    ])?;
    Ok(Zip::from(&zenith)
        .and(&tau)
        .and(&de)
        .par_map_collect(|&z, &t, &d| f(z, t, d)))
}

/// [`p_water`] over a grid.
pub fn water_weight(
    zenith: ArrayViewD<'_, f64>,
    tau: ArrayViewD<'_, f64>,
    de: ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>, FarmsError> {
    map_grid(zenith, tau, de, p_water)
}

/// [`p_ice`] over a grid.
pub fn ice_weight(
    zenith: ArrayViewD<'_, f64>,
    tau: ArrayViewD<'_, f64>,
    de: ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>, FarmsError> {
    map_grid(zenith, tau, de, p_ice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array, IxDyn};

    #[test]
    fn peak_depth_bands() {
        assert_eq!(peak_optical_depth(&WATER_TAUP, 0.5, 8.0), 0.5);
        assert_eq!(peak_optical_depth(&WATER_TAUP, 0.7, 20.0), 1.0);
        assert_eq!(peak_optical_depth(&ICE_TAUP, 0.5, 3.0), 0.0);
        // Upper edge moves with De: 1.0367 - 0.0006 De
        assert_eq!(peak_optical_depth(&ICE_TAUP, 0.9999, 60.0), 1.5);
        assert_eq!(peak_optical_depth(&ICE_TAUP, 0.9999, 100.0), 2.0);
    }

    #[test]
    fn zero_optical_depth_scatters_nothing() {
        for zenith in [0.0, 30.0, 60.0, 85.0] {
            for de in [5.0, 12.0, 20.0, 40.0, 80.0] {
                assert_eq!(p_water(zenith, 0.0, de), 0.0);
                assert_eq!(p_ice(zenith, 0.0, de), 0.0);
            }
        }
    }

    #[test]
    fn bounded_and_not_complementary() {
        for zenith in (0..=86).step_by(2) {
            for tau in [0.05, 0.3, 1.0, 2.0, 5.0, 20.0, 60.0] {
                for de in [2.0, 3.0, 4.5, 6.0, 11.0, 15.0, 25.0, 35.0, 60.0, 100.0] {
                    let w = p_water(zenith as f64, tau, de);
                    let i = p_ice(zenith as f64, tau, de);
                    assert!((0.0..=1.0).contains(&w), "z={zenith} tau={tau} de={de} w={w}");
                    assert!((0.0..=1.0).contains(&i), "z={zenith} tau={tau} de={de} i={i}");
                    // Each is a small circumsolar share, not a phase fraction
                    assert!(w + i < 0.9, "z={zenith} tau={tau} de={de} sum={}", w + i);
                }
            }
        }
    }

    #[test]
    fn small_ice_crystals_have_no_peak() {
        // No ice band below 5 µm, so nothing is scattered at any depth
        for zenith in [0.0, 6.0, 30.0, 60.0, 85.0] {
            for tau in [0.01, 0.05, 0.5, 3.0, 30.0] {
                for de in [1.0, 2.0, 4.9] {
                    assert_eq!(p_ice(zenith, tau, de), 0.0, "z={zenith} tau={tau} de={de}");
                }
            }
        }
        assert!(p_ice(6.0, 0.05, 5.0) > 0.0);
    }

    #[test]
    fn thick_clouds_decay() {
        let moderate = p_water(30.0, 2.0, 20.0);
        let thick = p_water(30.0, 50.0, 20.0);
        assert!(thick < moderate);
        assert!(p_ice(30.0, 150.0, 40.0) < 1e-3);
    }

    #[test]
    fn sun_below_horizon() {
        assert_eq!(p_water(95.0, 2.0, 20.0), 0.0);
        assert_eq!(p_ice(120.0, 2.0, 20.0), 0.0);
        assert_eq!(p_water(30.0, f64::NAN, 20.0), 0.0);
    }

    #[test]
    fn overhead_ice_gap_is_filled() {
        // mu in [0.999, 0.9994) used to fall between segments
        let zenith = 0.9992f64.acos().to_degrees();
        assert!(p_ice(zenith, 1.0, 20.0) > 0.0);
        assert!(p_ice(zenith, 1.0, 40.0) > 0.0);
    }

    #[test]
    fn water_peak_scaling() {
        // Flat segment between 0.342 and 0.4694
        let h = WATER_H[0] * 20f64.ln() + WATER_H[1];
        assert_abs_diff_eq!(water_peak(0.4, 20.0), h, epsilon = 1e-12);
    }

    #[test]
    fn grid_matches_scalar() {
        let zenith = Array::from_shape_vec(IxDyn(&[2, 2]), vec![10.0, 40.0, 60.0, 80.0]).unwrap();
        let tau = Array::from_elem(IxDyn(&[2, 2]), 1.5);
        let de = Array::from_elem(IxDyn(&[2, 2]), 24.0);

        let w = water_weight(zenith.view(), tau.view(), de.view()).unwrap();
        let i = ice_weight(zenith.view(), tau.view(), de.view()).unwrap();
        for ((&z, &w), &i) in zenith.iter().zip(&w).zip(&i) {
            assert_eq!(w, p_water(z, 1.5, 24.0));
            assert_eq!(i, p_ice(z, 1.5, 24.0));
        }

        let short = Array::from_elem(IxDyn(&[2, 3]), 24.0);
        assert!(water_weight(zenith.view(), tau.view(), short.view()).is_err());
    }
}
