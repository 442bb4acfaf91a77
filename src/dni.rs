//! FARMS-DNI: all-sky direct normal irradiance from cloud properties.
//!
//! The direct irradiance reaching a surface normal to the sun has three parts:
//!
//! - `Fd0`, the unscattered beam attenuated by the scaled optical depth,
//! - `Fd1`, cloud-scattered radiation inside the circumsolar region,
//! - `Fd2`, surface-reflected radiation scattered back into that region.
//!
//! # References
//!
//! Xie, Y., Sengupta, M., Liu, Y., Long, H., Min, Q., Liu, W., Habte, A.,
//! 2020. "A physics-based DNI model assessing all-sky circumsolar radiation",
//! iScience 23.
//!
//! Yang, J., Xie, Y., Sengupta, M., Liu, Y., Long, H., 2022.
//! "Parameterization of cloud transmittance for expeditious assessment and
//! forecasting of all-sky DNI", J. Renewable Sustainable Energy 14, 063703.

mod circumsolar;
pub(crate) mod coefficients;
mod phase;


pub use self::circumsolar::{
    cloud_beam_transmittance, phase_transmittance, scaled_optical_depth, tdd2, tddp,
};
pub use self::phase::{ice_weight, p_ice, p_water, water_weight};

use log::debug;
use ndarray::{ArrayD, ArrayViewD};
use rayon::prelude::*;

use crate::config::ModelConfig;
use crate::error::FarmsError;
use crate::grid::{as_slice, check_shapes, from_flat, standard, CloudPhase, CloudyPhase};
use crate::screen::{
    count_out_of_range, non_negative, screen_cloud, screen_ghi, screen_unit, screen_zenith,
};

/// Input grids for [`farms_dni`]. All must have the same shape.
#[derive(Debug)]
pub struct FarmsDniInputs<'a> {
    /// Extraterrestrial normal irradiance `F0` in W/m²
    pub extraterrestrial: ArrayViewD<'a, f64>,
    /// Cloud optical depth
    pub tau: ArrayViewD<'a, f64>,
    /// Solar zenith angle in degrees
    pub zenith: ArrayViewD<'a, f64>,
    /// Effective cloud particle diameter in µm
    pub de: ArrayViewD<'a, f64>,
    /// Cloud phase
    pub phase: ArrayViewD<'a, CloudPhase>,
    /// Clear-sky direct transmittance
    pub tddclr: ArrayViewD<'a, f64>,
    /// All-sky GHI in W/m²
    pub ghi: ArrayViewD<'a, f64>,
    /// First-order FARMS irradiance in W/m²
    pub f1: ArrayViewD<'a, f64>,
}

/// Outputs of [`farms_dni`], in W/m².
#[derive(Debug, Clone, PartialEq)]
pub struct FarmsDniOutputs {
    /// Direct downwelling irradiance on a horizontal surface, including the
    /// circumsolar region
    pub fd: ArrayD<f64>,
    /// Direct normal irradiance, `fd / µ0`
    pub dni: ArrayD<f64>,
    /// Narrow-beam DNI from the Lambert law, without circumsolar radiation
    pub dni0: ArrayD<f64>,
}

/// FARMS-DNI output for a single cell, in W/m².
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DniComponents {
    /// Direct downwelling irradiance on a horizontal surface
    pub fd: f64,
    /// Direct normal irradiance
    pub dni: f64,
    /// Narrow-beam DNI
    pub dni0: f64,
}

/// FARMS-DNI for one cell.
///
/// The inputs must already be screened: `zenith` within the zenith limit,
/// `tddclr` within [0, 1]. Clear and unknown phases have no scaled optical
/// depth, so their beam is `F0 × Tddclr`. A missing (NaN) optical depth gives
/// zeros. Every output is finite and non-negative.
///
/// The direct and circumsolar parts together never exceed the clear-sky beam:
/// `Fd0 + Fd1 = µ0 F0 Tddclr T`, where `T` is [`cloud_beam_transmittance`].
/// Only the surface-reflected `Fd2` can add to it.
#[allow(clippy::too_many_arguments)]
pub fn farms_dni_point(
    f0: f64,
    tau: f64,
    zenith: f64,
    de: f64,
    phase: CloudPhase,
    tddclr: f64,
    ghi: f64,
    f1: f64,
) -> DniComponents {
    let mu = zenith.to_radians().cos();
    if mu.is_nan() || mu <= 0.0 || tau.is_nan() {
        return DniComponents::default();
    }

    let cloud = match phase {
        CloudPhase::Water => cloud_beam_transmittance(zenith, tau, de, CloudyPhase::Water),
        CloudPhase::Ice => cloud_beam_transmittance(zenith, tau, de, CloudyPhase::Ice),
        CloudPhase::Clear | CloudPhase::Unknown => 1.0,
    };

    let dni0 = f0 * tddclr * (-tau / mu).exp();
    let fd = mu * f0 * tddclr * cloud + tdd2(zenith, ghi, f1);

    DniComponents {
        fd: non_negative(fd),
        dni: non_negative(fd / mu),
        dni0: non_negative(dni0),
    }
}

/// Run FARMS-DNI over a grid.
///
/// Zenith angles are clamped to the configured limit, optical depths to
/// `[0, max_optical_depth]`, and `tddclr` to [0, 1]. Each clamp is counted and
/// logged. Cells whose retrieval is missing (NaN optical depth) give 0; use
/// [`crate::all_sky::compute`] to fill those from GHI instead.
pub fn farms_dni(
    inputs: &FarmsDniInputs<'_>,
    config: &ModelConfig,
) -> Result<FarmsDniOutputs, FarmsError> {
    let shape = check_shapes(&[
        ("extraterrestrial", inputs.extraterrestrial.shape()),
        ("tau", inputs.tau.shape()),
        ("zenith", inputs.zenith.shape()),
        ("de", inputs.de.shape()),
        ("phase", inputs.phase.shape()),
        ("tddclr", inputs.tddclr.shape()),
        ("ghi", inputs.ghi.shape()),
        ("f1", inputs.f1.shape()),
    ])?;

    let f0 = standard(inputs.extraterrestrial.view());
    let tau = standard(inputs.tau.view());
    let zenith = standard(inputs.zenith.view());
    let de = standard(inputs.de.view());
    let phase = standard(inputs.phase.view());
    let tddclr = standard(inputs.tddclr.view());
    let ghi = standard(inputs.ghi.view());
    let f1 = standard(inputs.f1.view());

    let f0 = as_slice(&f0)?;
    let tau = as_slice(&tau)?;
    let zenith = as_slice(&zenith)?;
    let de = as_slice(&de)?;
    let phase = as_slice(&phase)?;
    let tddclr = as_slice(&tddclr)?;
    let ghi = as_slice(&ghi)?;
    let f1 = as_slice(&f1)?;

    let zenith_limit = config.zenith_limit();
    let max_optical_depth = config.max_optical_depth();
    count_out_of_range(ghi, zenith, zenith_limit, tau, max_optical_depth, tddclr).log_warnings();
    debug!("FARMS-DNI over {} cells", zenith.len());

    let cells: Vec<DniComponents> = (0..zenith.len())
        .into_par_iter()
        .map(|i| {
            farms_dni_point(
                f0[i],
                screen_cloud(tau[i], max_optical_depth),
                screen_zenith(zenith[i], zenith_limit),
                de[i],
                phase[i],
                screen_unit(tddclr[i]),
                screen_ghi(ghi[i]),
                f1[i],
            )
        })
        .collect();

    Ok(FarmsDniOutputs {
        fd: from_flat(&shape, cells.iter().map(|c| c.fd).collect())?,
        dni: from_flat(&shape, cells.iter().map(|c| c.dni).collect())?,
        dni0: from_flat(&shape, cells.iter().map(|c| c.dni0).collect())?,
    })
}
