//! DISC global-to-direct decomposition.
//!
//! Estimates DNI from GHI through the empirical relationship between the
//! global and direct clearness indices.
//!
//! # References
//!
//! E. L. Maxwell, "A quasi-physical model for converting hourly global
//! horizontal to direct normal insolation", Technical Report No.
//! SERI/TR-215-3087, Golden, CO: Solar Energy Research Institute, 1987.

use log::debug;
use ndarray::{ArrayD, ArrayViewD, Zip};

use crate::config::ModelConfig;
use crate::error::FarmsError;
use crate::grid::{as_slice, check_shapes, standard};
use crate::screen::{count_out_of_range, screen_ghi, ScreenReport};
use crate::solar::extraterrestrial_irradiance;

/// Standard sea-level pressure in Pa.
const STANDARD_PRESSURE: f64 = 101_325.0;

/// GHI below this (W/m²) is too small to split, and yields zero DNI.
const MIN_GHI: f64 = 1.0;

/// Clearness index where the `A`, `B`, `C` fits switch polynomials.
const KT_BREAK: f64 = 0.6;

/// Relative optical air mass (Kasten 1966) at a zenith angle in degrees and a
/// pressure in Pa.
fn air_mass(zenith: f64, pressure: f64) -> f64 {
    1.0 / (zenith.to_radians().cos() + 0.15 * (93.885 - zenith).powf(-1.253)) * pressure
        / STANDARD_PRESSURE
}

/// Coefficients `(A, B, C)` of the clearness index deficit `ΔKn = A + B
/// exp(C AM)`.
fn deficit_coefficients(kt: f64) -> (f64, f64, f64) {
    if kt > KT_BREAK {
        (
            -5.743 + 21.77 * kt - 27.49 * kt.powi(2) + 11.56 * kt.powi(3),
            41.4 - 118.5 * kt + 66.05 * kt.powi(2) + 31.9 * kt.powi(3),
            -47.01 + 184.2 * kt - 222. * kt.powi(2) + 73.81 * kt.powi(3),
        )
    } else {
        (
            0.512 - 1.56 * kt + 2.286 * kt.powi(2) - 2.222 * kt.powi(3),
            0.37 + 0.962 * kt,
            -0.28 + 0.932 * kt - 2.048 * kt.powi(2),
        )
    }
}

/// Direct clearness index of a clear atmosphere for an air mass.
fn clear_direct_clearness(am: f64) -> f64 {
    0.866 - 0.122 * am + 0.0121 * am.powi(2) - 0.000653 * am.powi(3) + 0.000014 * am.powi(4)
}

/// DISC for a single cell.
///
/// `ghi` in W/m², `zenith` in degrees, `pressure` in Pa. Zenith angles beyond
/// `zenith_limit` are evaluated at the limit, so the result is continuous
/// across it. The result is within `[0, I0]` where `I0` is the extraterrestrial
/// irradiance for `doy`.
pub fn disc_point(
    ghi: f64,
    zenith: f64,
    doy: i32,
    pressure: f64,
    zenith_limit: f64,
    solar_constant: f64,
) -> f64 {
    let ghi = screen_ghi(ghi);
    if ghi.is_nan() || ghi < MIN_GHI {
        return 0.0;
    }

    let i0 = extraterrestrial_irradiance(doy, solar_constant);
    let zenith = zenith.clamp(0.0, zenith_limit);
    let i0h = i0 * zenith.to_radians().cos();

    let am = air_mass(zenith, pressure);
    let kt = (ghi / i0h).max(0.0);

    let (a, b, c) = deficit_coefficients(kt);
    let delta_kn = a + b * f64::exp(c * am);
    let kn = clear_direct_clearness(am) - delta_kn;

    let dni = kn * i0;
    if dni.is_finite() {
        dni.clamp(0.0, i0)
    } else {
        0.0
    }
}

/// Clamp counts over the DISC inputs, for any memory layout.
fn screen_inputs(
    ghi: ArrayViewD<'_, f64>,
    zenith: ArrayViewD<'_, f64>,
    zenith_limit: f64,
) -> Result<ScreenReport, FarmsError> {
    let ghi = standard(ghi);
    let zenith = standard(zenith);
    Ok(count_out_of_range(
        as_slice(&ghi)?,
        as_slice(&zenith)?,
        zenith_limit,
        &[],
        0.0,
        &[],
    ))
}

/// Estimate DNI (W/m²) from GHI with the DISC model.
///
/// `ghi` is in W/m², `zenith` in degrees, `day_of_year` in [1, 366], and
/// `pressure` is in the unit given by [`ModelConfig::pressure_unit`]. All grids
/// must have the same shape.
///
/// Negative GHI is clamped to 0 and counted in the log.
pub fn disc(
    ghi: ArrayViewD<'_, f64>,
    zenith: ArrayViewD<'_, f64>,
    day_of_year: ArrayViewD<'_, i32>,
    pressure: ArrayViewD<'_, f64>,
    config: &ModelConfig,
) -> Result<ArrayD<f64>, FarmsError> {
    check_shapes(&[
        ("ghi", ghi.shape()),
        ("zenith", zenith.shape()),
        ("day_of_year", day_of_year.shape()),
        ("pressure", pressure.shape()),
    ])?;

    screen_inputs(ghi.view(), zenith.view(), config.zenith_limit())?.log_warnings();

    let to_pascal = config.pressure_unit().to_pascal();
    let zenith_limit = config.zenith_limit();
    let solar_constant = config.solar_constant();
    debug!(
        "DISC over {} cells, zenith limit {zenith_limit}",
        ghi.len()
    );

    Ok(Zip::from(&ghi)
        .and(&zenith)
        .and(&day_of_year)
        .and(&pressure)
        .par_map_collect(|&ghi, &zenith, &doy, &pressure| {
            disc_point(
                ghi,
                zenith,
                doy,
                pressure * to_pascal,
                zenith_limit,
                solar_constant,
            )
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PressureUnit;
    use crate::solar::SOLAR_CONSTANT;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array, IxDyn};

    const P0: f64 = 101_325.0;

    #[test]
    fn summer_solstice_scenario() {
        let dni = disc_point(800.0, 30.0, 172, 1013.0 * 100.0, 87.0, SOLAR_CONSTANT);
        let i0 = extraterrestrial_irradiance(172, SOLAR_CONSTANT);
        assert!(dni > 0.0, "dni = {dni}");
        assert!(dni < i0, "dni = {dni}");
        // The horizontal share of the beam can't exceed the global
        assert!(dni * 30f64.to_radians().cos() < 800.0);
    }

    #[test]
    fn bounded_by_extraterrestrial() {
        for doy in [1, 90, 172, 266, 366] {
            let i0 = extraterrestrial_irradiance(doy, SOLAR_CONSTANT);
            for zenith in (0..=87).step_by(3) {
                for ghi in (0..=1400).step_by(50) {
                    let dni = disc_point(ghi as f64, zenith as f64, doy, P0, 87.0, SOLAR_CONSTANT);
                    assert!((0.0..=i0).contains(&dni), "ghi={ghi} z={zenith} dni={dni}");
                }
            }
        }
    }

    #[test]
    fn continuous_at_zenith_limit() {
        let at = disc_point(50.0, 87.0, 100, P0, 87.0, SOLAR_CONSTANT);
        let above = disc_point(50.0, 87.0 + 1e-9, 100, P0, 87.0, SOLAR_CONSTANT);
        let far_above = disc_point(50.0, 95.0, 100, P0, 87.0, SOLAR_CONSTANT);
        assert_abs_diff_eq!(at, above, epsilon = 1e-9);
        assert_abs_diff_eq!(at, far_above, epsilon = 1e-9);
        assert!(at.is_finite());
    }

    #[test]
    fn low_and_negative_ghi_give_zero() {
        assert_eq!(disc_point(0.5, 20.0, 100, P0, 87.0, SOLAR_CONSTANT), 0.0);
        assert_eq!(disc_point(-40.0, 20.0, 100, P0, 87.0, SOLAR_CONSTANT), 0.0);
        assert_eq!(disc_point(f64::NAN, 20.0, 100, P0, 87.0, SOLAR_CONSTANT), 0.0);
    }

    #[test]
    fn overcast_has_little_beam() {
        // Clearness index around 0.1
        let dni = disc_point(120.0, 20.0, 100, P0, 87.0, SOLAR_CONSTANT);
        assert!(dni < 50.0, "dni = {dni}");
    }

    #[test]
    fn hpa_and_mbar_agree() {
        let ghi = Array::from_elem(IxDyn(&[2, 3]), 650.0);
        let zenith = Array::from_elem(IxDyn(&[2, 3]), 40.0);
        let doy = Array::from_elem(IxDyn(&[2, 3]), 200);
        let pressure = Array::from_elem(IxDyn(&[2, 3]), 850.0);

        let hpa = ModelConfig::default().with_pressure_unit(PressureUnit::Hectopascal);
        let mbar = ModelConfig::default().with_pressure_unit(PressureUnit::Millibar);
        let pa = ModelConfig::default().with_pressure_unit(PressureUnit::Pascal);

        let a = disc(ghi.view(), zenith.view(), doy.view(), pressure.view(), &hpa).unwrap();
        let b = disc(ghi.view(), zenith.view(), doy.view(), pressure.view(), &mbar).unwrap();
        let pressure_pa = pressure.mapv(|p| p * 100.0);
        let c = disc(ghi.view(), zenith.view(), doy.view(), pressure_pa.view(), &pa).unwrap();

        assert_eq!(a, b);
        for (x, y) in a.iter().zip(c.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-9);
        }
        assert_eq!(a.shape(), &[2, 3]);
    }

    #[test]
    fn clamps_counted_for_any_layout() {
        let ghi =
            Array::from_shape_vec(IxDyn(&[2, 3]), vec![-5.0, 100.0, 200.0, 300.0, -1.0, 400.0])
                .unwrap();
        let zenith =
            Array::from_shape_vec(IxDyn(&[2, 3]), vec![10.0, 88.0, 20.0, 30.0, 40.0, 89.0])
                .unwrap();
        let (ghi_t, zenith_t) = (ghi.t(), zenith.t());
        assert!(!ghi_t.is_standard_layout());

        let report = screen_inputs(ghi_t.clone(), zenith_t.clone(), 87.0).unwrap();
        assert_eq!(report, screen_inputs(ghi.view(), zenith.view(), 87.0).unwrap());
        assert_eq!(report.negative_ghi, 2);
        assert_eq!(report.zenith_above_limit, 2);

        let doy = Array::from_elem(IxDyn(&[3, 2]), 180);
        let pressure = Array::from_elem(IxDyn(&[3, 2]), 1000.0);
        let dni = disc(ghi_t, zenith_t, doy.view(), pressure.view(), &ModelConfig::default())
            .unwrap();
        assert_eq!(dni.shape(), &[3, 2]);
        assert_eq!(dni[&[0, 0][..]], 0.0);
    }

    #[test]
    fn shape_mismatch_is_fatal() {
        let ghi = Array::from_elem(IxDyn(&[10, 5, 5]), 500.0);
        let zenith = Array::from_elem(IxDyn(&[10, 5, 6]), 30.0);
        let doy = Array::from_elem(IxDyn(&[10, 5, 5]), 1);
        let pressure = Array::from_elem(IxDyn(&[10, 5, 5]), 1000.0);

        let err = disc(
            ghi.view(),
            zenith.view(),
            doy.view(),
            pressure.view(),
            &ModelConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FarmsError::InvalidInputShape { name: "zenith", .. }
        ));
    }
}
