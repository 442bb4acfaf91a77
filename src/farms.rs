//! FARMS: Fast All-sky Radiation Model for Solar applications.
//!
//! Computes all-sky GHI, DNI and DHI from cloud properties and clear-sky
//! transmittances. Its first-order irradiance `F1` is also what FARMS-DNI
//! needs for the surface-reflected circumsolar term.
//!
//! # References
//!
//! Xie, Y., Sengupta, M., Dudhia, J., 2016. "A Fast All-sky Radiation Model
//! for Solar applications (FARMS): Algorithm and performance evaluation",
//! Solar Energy 135, 435-445, <https://doi.org/10.1016/j.solener.2016.06.003>.

use log::debug;
use ndarray::{ArrayD, ArrayViewD};
use rayon::prelude::*;

use crate::config::ModelConfig;
use crate::error::FarmsError;
use crate::grid::{as_slice, check_shapes, from_flat, standard, CloudPhase};
use crate::screen::{count_out_of_range, non_negative, screen_cloud, screen_unit, screen_zenith};

/// Clear-sky transmittances and reflectance of one cell, as computed by a
/// clear-sky model such as REST2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearSky {
    /// Direct incident, direct outgoing transmittance
    pub tddclr: f64,
    /// Direct incident, diffuse outgoing transmittance
    pub tduclr: f64,
    /// Diffuse incident, diffuse outgoing transmittance
    pub tuuclr: f64,
    /// Aerosol reflectance for diffuse fluxes
    pub ruuclr: f64,
}

impl ClearSky {
    fn screened(self) -> Self {
        Self {
            tddclr: screen_unit(self.tddclr),
            tduclr: screen_unit(self.tduclr),
            tuuclr: screen_unit(self.tuuclr),
            ruuclr: screen_unit(self.ruuclr),
        }
    }
}

/// FARMS irradiance of one cell, in W/m².
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FarmsIrradiance {
    /// Global horizontal irradiance
    pub ghi: f64,
    /// Direct normal irradiance
    pub dni: f64,
    /// Diffuse horizontal irradiance
    pub dhi: f64,
    /// First-order irradiance, before reflections between cloud and surface
    pub f1: f64,
}

/// Diffuse transmittance of a cloud (Eq. 11).
fn diffuse_transmittance(tau: f64, ptau: f64, pdhi: f64, delta: f64, y: f64) -> f64 {
    let log_ratio = tau.log10() - ptau.log10();
    (1.0 + y.sinh()) * pdhi * (-log_ratio * log_ratio / delta).exp()
}

/// Diffuse reflectance of a cloud (Eqs. 14a and 14b).
fn cloud_reflectance(tau: f64, thin_slope: f64, ceiling: f64, width: f64) -> f64 {
    if tau < 1.0 {
        thin_slope * tau
    } else {
        let x = 0.5 + tau.log10();
        ceiling - (-x * x / width).exp()
    }
}

/// `(Tducld, Ruucld)` of a water cloud (Eqs. 12a-12d).
fn water_optics(tau: f64, de: f64, mu: f64) -> (f64, f64) {
    let ptau = (2.8850 + 0.002 * (de - 60.0)) * mu - 0.007347;
    let pdhi = 0.7846 * (1.0 + 0.0002 * (de - 60.0)) * mu.powf(0.1605);
    let delta = -0.644531 * mu + 1.20117 + 0.129807 / mu - 0.00121096 / mu.powi(2)
        + 1.52587e-07 / mu.powi(3);
    let y = 0.012 * (tau - ptau) * mu;

    (
        diffuse_transmittance(tau, ptau, pdhi, delta, y),
        cloud_reflectance(tau, 0.107359, 1.03, 3.105),
    )
}

/// `(Tducld, Ruucld)` of an ice cloud (Eqs. 13a-13c).
fn ice_optics(tau: f64, de: f64, mu: f64) -> (f64, f64) {
    let ptau = if de <= 26.0 {
        2.8487 * mu - 0.0029
    } else {
        (2.8355 + (100.0 - de) * 0.006) * mu - 0.00612
    };
    let pdhi = 0.756 * mu.powf(0.0883);
    let delta = -0.0549531 * mu + 0.617632 + 0.17876 / mu - 0.002174 / mu.powi(2);
    let y = 0.01 * (tau - ptau) * mu;

    (
        diffuse_transmittance(tau, ptau, pdhi, delta, y),
        cloud_reflectance(tau, 0.094039, 1.02, 3.25),
    )
}

/// FARMS for one cell.
///
/// `tau` is the cloud optical depth, `de` the effective particle diameter in
/// µm, `zenith` in degrees (already within the zenith limit), `f0` the
/// extraterrestrial irradiance in W/m². Cells without a cloud (clear or
/// unknown phase, or no optical depth) are computed as clear sky.
pub fn farms_point(
    tau: f64,
    phase: CloudPhase,
    de: f64,
    zenith: f64,
    f0: f64,
    clear: ClearSky,
    albedo: f64,
) -> FarmsIrradiance {
    let mu = zenith.to_radians().cos();
    if mu.is_nan() || mu <= 0.0 {
        return FarmsIrradiance::default();
    }

    let ClearSky {
        tddclr,
        tduclr,
        tuuclr,
        ruuclr,
    } = clear.screened();
    let albedo = screen_unit(albedo);

    // NaN and non-positive depths mean no cloud
    let tau = if tau > 0.0 { tau } else { 0.0 };
    let (tau, (tducld, ruucld)) = match phase {
        CloudPhase::Water if tau > 0.0 => (tau, water_optics(tau, de, mu)),
        CloudPhase::Ice if tau > 0.0 => (tau, ice_optics(tau, de, mu)),
        _ => (0.0, (0.0, 0.0)),
    };

    let tddcld = (-tau / mu).exp();
    let fd = mu * f0 * tddcld * tddclr;
    let f1 = mu * f0 * (tddcld * (tddclr + tduclr) + tducld * tuuclr);

    // Multiple reflections between the surface and the atmosphere above it
    let denominator = 1.0 - albedo * (ruuclr + ruucld * tuuclr * tuuclr);
    let ghi = if denominator > 0.0 { f1 / denominator } else { f1 };

    FarmsIrradiance {
        ghi: non_negative(ghi),
        dni: non_negative(fd / mu),
        dhi: non_negative(ghi - fd),
        f1: non_negative(f1),
    }
}

/// Input grids for [`farms`]. All must have the same shape.
#[derive(Debug)]
pub struct FarmsInputs<'a> {
    /// Cloud optical depth
    pub tau: ArrayViewD<'a, f64>,
    /// Cloud phase
    pub phase: ArrayViewD<'a, CloudPhase>,
    /// Cloud effective particle radius in µm
    pub cloud_effective_radius: ArrayViewD<'a, f64>,
    /// Solar zenith angle in degrees
    pub zenith: ArrayViewD<'a, f64>,
    /// Sun-earth radius vector in AU
    pub radius: ArrayViewD<'a, f64>,
    /// Diffuse-diffuse clear-sky transmittance
    pub tuuclr: ArrayViewD<'a, f64>,
    /// Diffuse clear-sky reflectance
    pub ruuclr: ArrayViewD<'a, f64>,
    /// Direct-direct clear-sky transmittance
    pub tddclr: ArrayViewD<'a, f64>,
    /// Direct-diffuse clear-sky transmittance
    pub tduclr: ArrayViewD<'a, f64>,
    /// Surface albedo
    pub albedo: ArrayViewD<'a, f64>,
}

/// Output grids of [`farms`], in W/m².
#[derive(Debug, Clone, PartialEq)]
pub struct FarmsOutputs {
    /// Global horizontal irradiance
    pub ghi: ArrayD<f64>,
    /// Direct normal irradiance
    pub dni: ArrayD<f64>,
    /// Diffuse horizontal irradiance
    pub dhi: ArrayD<f64>,
    /// First-order irradiance
    pub f1: ArrayD<f64>,
}

/// Run FARMS over a grid.
///
/// Optical depths are screened to `[0, max_optical_depth]` with a missing
/// (NaN) depth treated as no cloud. Transmittances and albedo are clamped to
/// [0, 1], and zenith angles to the configured limit.
pub fn farms(inputs: &FarmsInputs<'_>, config: &ModelConfig) -> Result<FarmsOutputs, FarmsError> {
    let shape = check_shapes(&[
        ("tau", inputs.tau.shape()),
        ("phase", inputs.phase.shape()),
        ("cloud_effective_radius", inputs.cloud_effective_radius.shape()),
        ("zenith", inputs.zenith.shape()),
        ("radius", inputs.radius.shape()),
        ("tuuclr", inputs.tuuclr.shape()),
        ("ruuclr", inputs.ruuclr.shape()),
        ("tddclr", inputs.tddclr.shape()),
        ("tduclr", inputs.tduclr.shape()),
        ("albedo", inputs.albedo.shape()),
    ])?;

    let tau = standard(inputs.tau.view());
    let phase = standard(inputs.phase.view());
    let reff = standard(inputs.cloud_effective_radius.view());
    let zenith = standard(inputs.zenith.view());
    let radius = standard(inputs.radius.view());
    let tuuclr = standard(inputs.tuuclr.view());
    let ruuclr = standard(inputs.ruuclr.view());
    let tddclr = standard(inputs.tddclr.view());
    let tduclr = standard(inputs.tduclr.view());
    let albedo = standard(inputs.albedo.view());

    let tau = as_slice(&tau)?;
    let phase = as_slice(&phase)?;
    let reff = as_slice(&reff)?;
    let zenith = as_slice(&zenith)?;
    let radius = as_slice(&radius)?;
    let tuuclr = as_slice(&tuuclr)?;
    let ruuclr = as_slice(&ruuclr)?;
    let tddclr = as_slice(&tddclr)?;
    let tduclr = as_slice(&tduclr)?;
    let albedo = as_slice(&albedo)?;

    let zenith_limit = config.zenith_limit();
    let max_optical_depth = config.max_optical_depth();
    let solar_constant = config.solar_constant();

    let mut report =
        count_out_of_range(&[], zenith, zenith_limit, tau, max_optical_depth, tddclr);
    for transmittance in [tduclr, tuuclr, ruuclr] {
        report = report + count_out_of_range(&[], &[], zenith_limit, &[], 0.0, transmittance);
    }
    report.log_warnings();
    debug!("FARMS over {} cells", tau.len());

    let cells: Vec<FarmsIrradiance> = (0..tau.len())
        .into_par_iter()
        .map(|i| {
            let clear = ClearSky {
                tddclr: tddclr[i],
                tduclr: tduclr[i],
                tuuclr: tuuclr[i],
                ruuclr: ruuclr[i],
            };
            farms_point(
                screen_cloud(tau[i], max_optical_depth),
                phase[i],
                2.0 * reff[i],
                screen_zenith(zenith[i], zenith_limit),
                solar_constant / (radius[i] * radius[i]),
                clear,
                albedo[i],
            )
        })
        .collect();

    Ok(FarmsOutputs {
        ghi: from_flat(&shape, cells.iter().map(|c| c.ghi).collect())?,
        dni: from_flat(&shape, cells.iter().map(|c| c.dni).collect())?,
        dhi: from_flat(&shape, cells.iter().map(|c| c.dhi).collect())?,
        f1: from_flat(&shape, cells.iter().map(|c| c.f1).collect())?,
    })
}
