//! Beam scaling and circumsolar terms shared by the FARMS-DNI components.

use std::f64::consts::PI;

use ndarray::{ArrayD, ArrayViewD, Zip};

use super::coefficients::{
    DepthScaling, CIRCUMSOLAR_OMEGA, ICE_DEPTH, THICK_SCALE, THICK_TAU, WATER_DEPTH,
};
use super::phase::{p_ice, p_water};
use crate::error::FarmsError;
use crate::grid::{check_shapes, CloudPhase, CloudyPhase};

/// Optical depth that attenuates the direct beam, `τ_dni` (Eqs. 3a and 3b of
/// Xie et al. 2020). Forward scattering makes it smaller than `tau`.
pub fn scaled_optical_depth(tau: f64, phase: CloudyPhase) -> f64 {
    let DepthScaling {
        cubic: [c1, c2, c3],
        boost,
        thick_offset,
    } = match phase {
        CloudyPhase::Water => WATER_DEPTH,
        CloudyPhase::Ice => ICE_DEPTH,
    };

    if tau < THICK_TAU {
        (c1 * tau + c2 * tau * tau + c3 * tau.powi(3)) * (1.0 + (THICK_TAU - tau) * boost)
    } else {
        THICK_SCALE * (tau - THICK_TAU).powf(1.5) + thick_offset
    }
}

/// Surface-reflected radiation scattered back into the circumsolar region,
/// `Fd2` in W/m².
///
/// `ghi` is the all-sky global irradiance and `f1` the first-order FARMS
/// irradiance, so `ghi − f1` is the multiply-reflected part. Never negative.
pub fn tdd2(zenith: f64, ghi: f64, f1: f64) -> f64 {
    let [a, b, c] = CIRCUMSOLAR_OMEGA;
    let mu_omega = a * (-(zenith - b).powi(3) / c).exp();
    let fd2 = zenith.to_radians().cos() * (ghi - f1) * mu_omega / PI;
    if fd2.is_finite() {
        fd2.max(0.0)
    } else {
        0.0
    }
}

/// Circumsolar transmittance of the scattered beam for one cell.
///
/// Selects [`p_water`] or [`p_ice`] by phase. Clear and unknown cells have no
/// cloud to scatter from and give 0.
pub fn tddp(zenith: f64, tau: f64, de: f64, phase: CloudPhase) -> f64 {
    match phase {
        CloudPhase::Water => p_water(zenith, tau, de),
        CloudPhase::Ice => p_ice(zenith, tau, de),
        CloudPhase::Clear | CloudPhase::Unknown => 0.0,
    }
}

/// Share of the clear-sky beam that gets through a cloud, counting both the
/// unscattered beam and the circumsolar part, `exp(−τ_dni/µ0) + tddp(τ_dni)`.
///
/// The result is within [0, 1] and equals 1 when `tau` is 0.
pub fn cloud_beam_transmittance(zenith: f64, tau: f64, de: f64, phase: CloudyPhase) -> f64 {
    let mu = zenith.to_radians().cos();
    if mu <= 0.0 {
        return 0.0;
    }
    let tau_dni = scaled_optical_depth(tau, phase);
    let scattered = match phase {
        CloudyPhase::Water => p_water(zenith, tau_dni, de),
        CloudyPhase::Ice => p_ice(zenith, tau_dni, de),
    };
    let t = (-tau_dni / mu).exp() + scattered;
    if t.is_finite() {
        t.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// [`tddp`] over a grid.
pub fn phase_transmittance(
    zenith: ArrayViewD<'_, f64>,
    tau: ArrayViewD<'_, f64>,
    de: ArrayViewD<'_, f64>,
    phase: ArrayViewD<'_, CloudPhase>,
) -> Result<ArrayD<f64>, FarmsError> {
    check_shapes(&[
        ("zenith", zenith.shape()),
        ("tau", tau.shape()),
        ("de", de.shape()),
        ("phase", phase.shape()),
    ])?;
    Ok(Zip::from(&zenith)
        .and(&tau)
        .and(&de)
        .and(&phase)
        .par_map_collect(|&z, &t, &d, &p| tddp(z, t, d, p)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn scaled_depth_is_smaller() {
        for phase in [CloudyPhase::Water, CloudyPhase::Ice] {
            assert_eq!(scaled_optical_depth(0.0, phase), 0.0);
            let mut last = 0.0;
            for tau in [0.1, 1.0, 4.0, 7.9, 8.0, 20.0, 30.0] {
                let scaled = scaled_optical_depth(tau, phase);
                assert!(scaled > last && scaled < tau, "{phase:?} {tau} {scaled}");
                last = scaled;
            }
        }
        assert_abs_diff_eq!(
            scaled_optical_depth(THICK_TAU, CloudyPhase::Water),
            2.10871,
            epsilon = 1e-12
        );
    }

    #[test]
    fn reflected_circumsolar() {
        assert_eq!(tdd2(30.0, 500.0, 500.0), 0.0);
        // More first-order than total would be negative
        assert_eq!(tdd2(30.0, 400.0, 500.0), 0.0);
        let fd2 = tdd2(30.0, 600.0, 400.0);
        assert!(fd2 > 0.0 && fd2 < 1.0, "{fd2}");
    }

    #[test]
    fn clear_cells_have_no_circumsolar_scattering() {
        assert_eq!(tddp(30.0, 5.0, 20.0, CloudPhase::Clear), 0.0);
        assert_eq!(tddp(30.0, 5.0, 20.0, CloudPhase::Unknown), 0.0);
        assert_eq!(tddp(30.0, 5.0, 20.0, CloudPhase::Ice), p_ice(30.0, 5.0, 20.0));
    }

    #[test]
    fn beam_transmittance_bounds() {
        for phase in [CloudyPhase::Water, CloudyPhase::Ice] {
            assert_abs_diff_eq!(cloud_beam_transmittance(25.0, 0.0, 20.0, phase), 1.0);
            let mut last = 1.0;
            for tau in [0.5, 1.0, 3.0, 10.0, 30.0, 100.0] {
                let t = cloud_beam_transmittance(25.0, tau, 20.0, phase);
                assert!((0.0..=1.0).contains(&t));
                assert!(t <= last + 1e-12, "{phase:?} tau={tau} t={t} last={last}");
                last = t;
            }
            assert!(last < 1e-3);
        }
    }
}
