//! Post-processing helpers for irradiance grids.

use std::str::FromStr;

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

use crate::error::FarmsError;
use crate::grid::{as_slice, check_shapes, from_flat, standard, CloudPhase};
use crate::screen::non_negative;

/// Diffuse horizontal irradiance from the global and direct components,
/// `max(ghi − dni cos Z, 0)`.
pub fn calc_dhi(
    dni: ArrayViewD<'_, f64>,
    ghi: ArrayViewD<'_, f64>,
    zenith: ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>, FarmsError> {
    check_shapes(&[
        ("dni", dni.shape()),
        ("ghi", ghi.shape()),
        ("zenith", zenith.shape()),
    ])?;
    Ok(Zip::from(&dni)
        .and(&ghi)
        .and(&zenith)
        .par_map_collect(|&dni, &ghi, &zenith| {
            (ghi - dni * zenith.to_radians().cos()).max(0.0)
        }))
}

/// Zero out irradiance wherever the zenith angle is at or above `zenith_limit`.
pub fn dark_night(
    mut irradiance: ArrayViewMutD<'_, f64>,
    zenith: ArrayViewD<'_, f64>,
    zenith_limit: f64,
) -> Result<(), FarmsError> {
    check_shapes(&[("irradiance", irradiance.shape()), ("zenith", zenith.shape())])?;
    Zip::from(&mut irradiance)
        .and(&zenith)
        .par_for_each(|value, &zenith| {
            if zenith >= zenith_limit {
                *value = 0.0;
            }
        });
    Ok(())
}

/// Flag Rayleigh violations: cells where the all-sky diffuse irradiance is
/// below the clear-sky one. Flagged cells get `flag`, the others are left as
/// they were.
///
/// Returns how many cells were flagged.
pub fn rayleigh(
    dhi: ArrayViewD<'_, f64>,
    clear_dhi: ArrayViewD<'_, f64>,
    mut fill_flag: ArrayViewMutD<'_, i16>,
    flag: i16,
) -> Result<usize, FarmsError> {
    check_shapes(&[
        ("dhi", dhi.shape()),
        ("clear_dhi", clear_dhi.shape()),
        ("fill_flag", fill_flag.shape()),
    ])?;

    let mut flagged = 0;
    Zip::from(&mut fill_flag)
        .and(&dhi)
        .and(&clear_dhi)
        .for_each(|fill, &dhi, &clear| {
            if dhi < 0.999 * clear && clear > 0.0 {
                *fill = flag;
                flagged += 1;
            }
        });
    if flagged > 0 {
        log::debug!("{flagged} cells fail the Rayleigh check");
    }
    Ok(flagged)
}

/// Clear-sky values for clear cells, cloudy-sky values everywhere else.
pub fn merge_clear_cloudy(
    clear: ArrayViewD<'_, f64>,
    cloudy: ArrayViewD<'_, f64>,
    phase: ArrayViewD<'_, CloudPhase>,
) -> Result<ArrayD<f64>, FarmsError> {
    check_shapes(&[
        ("clear", clear.shape()),
        ("cloudy", cloudy.shape()),
        ("phase", phase.shape()),
    ])?;
    Ok(Zip::from(&clear)
        .and(&cloudy)
        .and(&phase)
        .par_map_collect(|&clear, &cloudy, &phase| {
            if phase == CloudPhase::Clear {
                clear
            } else {
                cloudy
            }
        }))
}

/// Random distribution of the cloudy-sky variability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariabilityDistribution {
    /// Uniform in `[-1, 1)` times the maximum variability
    #[default]
    Uniform,
    /// Standard normal times the maximum variability, which acts as one
    /// relative standard deviation
    Normal,
}

impl FromStr for VariabilityDistribution {
    type Err = FarmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(VariabilityDistribution::Uniform),
            "normal" => Ok(VariabilityDistribution::Normal),
            _ => Err(FarmsError::InvalidConfig(
                "variability distribution must be \"uniform\" or \"normal\"",
            )),
        }
    }
}

/// How the maximum variability depends on the clear-sky ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariabilitySpread {
    /// Grows linearly with the clear-sky ratio
    Linear,
    /// Zero at ratios 0 and 1, peaking at `center`
    Triangular {
        /// Clear-sky ratio with the most variability, within (0, 1)
        center: f64,
    },
}

impl Default for VariabilitySpread {
    fn default() -> Self {
        VariabilitySpread::Triangular { center: 0.9 }
    }
}

impl VariabilitySpread {
    /// Largest relative change allowed at clear-sky ratio `csr`, given the
    /// overall maximum `fraction`. Never negative.
    pub fn max_fraction(self, csr: f64, fraction: f64) -> f64 {
        let scale = match self {
            VariabilitySpread::Linear => csr,
            VariabilitySpread::Triangular { center } if csr < center => csr / center,
            VariabilitySpread::Triangular { center } => (1.0 - csr) / (1.0 - center),
        };
        non_negative(fraction * scale)
    }
}

/// Settings for [`cloud_variability`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variability {
    /// Maximum relative variability, 0.05 for 5%. Zero turns it off.
    pub fraction: f64,
    /// Shape of the random draws
    pub distribution: VariabilityDistribution,
    /// Dependence on the clear-sky ratio
    pub spread: VariabilitySpread,
    /// Seed of the random generator, so runs are repeatable
    pub seed: u64,
}

impl Default for Variability {
    fn default() -> Self {
        Self {
            fraction: 0.05,
            distribution: VariabilityDistribution::default(),
            spread: VariabilitySpread::default(),
            seed: 123,
        }
    }
}

impl Variability {
    fn validate(&self) -> Result<(), FarmsError> {
        if !(self.fraction.is_finite() && self.fraction >= 0.0) {
            return Err(FarmsError::InvalidConfig(
                "variability fraction must be finite and non-negative",
            ));
        }
        if let VariabilitySpread::Triangular { center } = self.spread {
            if !(center > 0.0 && center < 1.0) {
                return Err(FarmsError::InvalidConfig(
                    "triangular variability center must be within (0, 1)",
                ));
            }
        }
        Ok(())
    }
}

/// Add seeded synthetic variability to cloudy-sky irradiance.
///
/// Each water or ice cell is scaled by `1 + m × r`, where `r` is a random
/// draw and `m` the maximum variability for the cell's clear-sky ratio
/// `irradiance / clear` (0 where `clear` is 0). Clear and unknown cells are
/// returned unchanged. The draws follow the logical (row-major) order of the
/// grid, so the output depends only on the values and the seed. The result
/// is never negative.
pub fn cloud_variability(
    irradiance: ArrayViewD<'_, f64>,
    clear: ArrayViewD<'_, f64>,
    phase: ArrayViewD<'_, CloudPhase>,
    variability: &Variability,
) -> Result<ArrayD<f64>, FarmsError> {
    let shape = check_shapes(&[
        ("irradiance", irradiance.shape()),
        ("clear", clear.shape()),
        ("phase", phase.shape()),
    ])?;
    variability.validate()?;
    if variability.fraction == 0.0 {
        return Ok(irradiance.to_owned());
    }

    let irradiance = standard(irradiance);
    let clear = standard(clear);
    let phase = standard(phase);
    let irradiance = as_slice(&irradiance)?;
    let clear = as_slice(&clear)?;
    let phase = as_slice(&phase)?;

    let mut rng = ChaCha8Rng::seed_from_u64(variability.seed);
    let draws: Vec<f64> = match variability.distribution {
        VariabilityDistribution::Uniform => (0..irradiance.len())
            .map(|_| rng.random::<f64>() * 2.0 - 1.0)
            .collect(),
        VariabilityDistribution::Normal => (0..irradiance.len())
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect(),
    };

    let values = (0..irradiance.len())
        .into_par_iter()
        .map(|i| {
            if !matches!(phase[i], CloudPhase::Water | CloudPhase::Ice) {
                return irradiance[i];
            }
            let csr = if clear[i] == 0.0 {
                0.0
            } else {
                irradiance[i] / clear[i]
            };
            let max = variability.spread.max_fraction(csr, variability.fraction);
            non_negative(irradiance[i] * (1.0 + max * draws[i]))
        })
        .collect();

    from_flat(&shape, values)
}
