//! All-sky DNI: picks the right model for every cell.
//!
//! Each cell is classified from its cloud retrieval (see [`SkyCondition`]) and
//! then takes one of three paths:
//!
//! - clear sky: the clear-sky beam `etdirn × Tddclr`,
//! - a valid cloud: FARMS-DNI,
//! - no usable retrieval: DISC applied to the observed GHI.

use std::ops::Range;

use log::debug;
use ndarray::{ArrayD, ArrayViewD, Axis, Slice};
use rayon::prelude::*;

use crate::config::ModelConfig;
use crate::disc::disc_point;
use crate::dni::farms_dni_point;
use crate::error::FarmsError;
use crate::grid::{
    as_slice, check_shapes, from_flat, standard, CloudPhase, DniSource, SkyCondition,
};
use crate::screen::{
    count_out_of_range, non_negative, screen_cloud, screen_ghi, screen_unit, screen_zenith,
    ScreenReport,
};

/// Input grids for [`compute`]. All must have the same shape.
#[derive(Debug, Clone)]
pub struct AllSkyInputs<'a> {
    /// All-sky GHI in W/m², used by the fallback and the reflected term
    pub ghi: ArrayViewD<'a, f64>,
    /// Solar zenith angle in degrees
    pub zenith: ArrayViewD<'a, f64>,
    /// Day of year, 1-366
    pub day_of_year: ArrayViewD<'a, i32>,
    /// Surface pressure, in the unit set by [`ModelConfig::pressure_unit`]
    pub pressure: ArrayViewD<'a, f64>,
    /// Extraterrestrial normal irradiance in W/m²
    pub etdirn: ArrayViewD<'a, f64>,
    /// Clear-sky direct transmittance
    pub tddclr: ArrayViewD<'a, f64>,
    /// Cloud optical depth, NaN where the retrieval is missing
    pub tau: ArrayViewD<'a, f64>,
    /// Effective cloud particle diameter in µm
    pub de: ArrayViewD<'a, f64>,
    /// Cloud phase
    pub phase: ArrayViewD<'a, CloudPhase>,
    /// First-order FARMS irradiance in W/m²
    pub f1: ArrayViewD<'a, f64>,
}

impl<'a> AllSkyInputs<'a> {
    /// The shape shared by every input.
    pub fn shape(&self) -> Result<Vec<usize>, FarmsError> {
        check_shapes(&[
            ("ghi", self.ghi.shape()),
            ("zenith", self.zenith.shape()),
            ("day_of_year", self.day_of_year.shape()),
            ("pressure", self.pressure.shape()),
            ("etdirn", self.etdirn.shape()),
            ("tddclr", self.tddclr.shape()),
            ("tau", self.tau.shape()),
            ("de", self.de.shape()),
            ("phase", self.phase.shape()),
            ("f1", self.f1.shape()),
        ])
    }

    /// The same inputs restricted to `rows` along the leading axis.
    ///
    /// # Panics
    ///
    /// If the inputs are zero-dimensional or `rows` is out of bounds.
    pub fn rows(&self, rows: Range<usize>) -> AllSkyInputs<'a> {
        fn slice<'a, A>(view: &ArrayViewD<'a, A>, rows: &Range<usize>) -> ArrayViewD<'a, A> {
            let mut view = view.clone();
            view.slice_axis_inplace(Axis(0), Slice::from(rows.clone()));
            view
        }

        AllSkyInputs {
            ghi: slice(&self.ghi, &rows),
            zenith: slice(&self.zenith, &rows),
            day_of_year: slice(&self.day_of_year, &rows),
            pressure: slice(&self.pressure, &rows),
            etdirn: slice(&self.etdirn, &rows),
            tddclr: slice(&self.tddclr, &rows),
            tau: slice(&self.tau, &rows),
            de: slice(&self.de, &rows),
            phase: slice(&self.phase, &rows),
            f1: slice(&self.f1, &rows),
        }
    }
}

/// Result of [`compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct AllSkyDni {
    /// DNI in W/m², never negative
    pub dni: ArrayD<f64>,
    /// Which model produced each cell
    pub source: ArrayD<DniSource>,
    /// Inputs that were clamped before use
    pub report: ScreenReport,
}

/// One cell of [`AllSkyInputs`], before screening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// GHI in W/m²
    pub ghi: f64,
    /// Zenith angle in degrees
    pub zenith: f64,
    /// Day of year
    pub day_of_year: i32,
    /// Surface pressure in Pa
    pub pressure: f64,
    /// Extraterrestrial normal irradiance in W/m²
    pub etdirn: f64,
    /// Clear-sky direct transmittance
    pub tddclr: f64,
    /// Cloud optical depth
    pub tau: f64,
    /// Effective particle diameter in µm
    pub de: f64,
    /// Cloud phase
    pub phase: CloudPhase,
    /// First-order irradiance in W/m²
    pub f1: f64,
}

/// Zenith angle (degrees) at which the sun sets.
const HORIZON: f64 = 90.0;

/// All-sky DNI for one cell, along with the model that produced it.
///
/// Between `zenith_limit` and the horizon every branch is evaluated at the
/// limit. Once the sun is at or below the horizon the DNI is 0, whatever the
/// clear-sky transmittance says; the source still reports the branch the
/// cell would have taken.
pub fn compute_cell(cell: &Cell, config: &ModelConfig) -> (f64, DniSource) {
    if cell.zenith >= HORIZON {
        let tau = screen_cloud(cell.tau, config.max_optical_depth());
        return (0.0, SkyCondition::resolve(cell.phase, tau, cell.de).into());
    }

    let zenith = screen_zenith(cell.zenith, config.zenith_limit());
    let tddclr = screen_unit(cell.tddclr);
    let ghi = screen_ghi(cell.ghi);
    let tau = screen_cloud(cell.tau, config.max_optical_depth());

    let condition = SkyCondition::resolve(cell.phase, tau, cell.de);
    let dni = match condition {
        SkyCondition::Clear => cell.etdirn * tddclr,
        SkyCondition::Cloudy { tau, de, phase } => {
            farms_dni_point(cell.etdirn, tau, zenith, de, phase.into(), tddclr, ghi, cell.f1).dni
        }
        SkyCondition::Missing => disc_point(
            ghi,
            zenith,
            cell.day_of_year,
            cell.pressure,
            config.zenith_limit(),
            config.solar_constant(),
        ),
    };

    (non_negative(dni), condition.into())
}

/// Compute all-sky DNI over a grid.
///
/// Fails only when the input shapes disagree. Out-of-range inputs are clamped,
/// counted in [`AllSkyDni::report`] and logged.
pub fn compute(inputs: &AllSkyInputs<'_>, config: &ModelConfig) -> Result<AllSkyDni, FarmsError> {
    let shape = inputs.shape()?;

    let ghi = standard(inputs.ghi.view());
    let zenith = standard(inputs.zenith.view());
    let day_of_year = standard(inputs.day_of_year.view());
    let pressure = standard(inputs.pressure.view());
    let etdirn = standard(inputs.etdirn.view());
    let tddclr = standard(inputs.tddclr.view());
    let tau = standard(inputs.tau.view());
    let de = standard(inputs.de.view());
    let phase = standard(inputs.phase.view());
    let f1 = standard(inputs.f1.view());

    let ghi = as_slice(&ghi)?;
    let zenith = as_slice(&zenith)?;
    let day_of_year = as_slice(&day_of_year)?;
    let pressure = as_slice(&pressure)?;
    let etdirn = as_slice(&etdirn)?;
    let tddclr = as_slice(&tddclr)?;
    let tau = as_slice(&tau)?;
    let de = as_slice(&de)?;
    let phase = as_slice(&phase)?;
    let f1 = as_slice(&f1)?;

    let report = count_out_of_range(
        ghi,
        zenith,
        config.zenith_limit(),
        tau,
        config.max_optical_depth(),
        tddclr,
    );
    report.log_warnings();

    let to_pascal = config.pressure_unit().to_pascal();
    let (dni, source): (Vec<f64>, Vec<DniSource>) = (0..ghi.len())
        .into_par_iter()
        .map(|i| {
            let cell = Cell {
                ghi: ghi[i],
                zenith: zenith[i],
                day_of_year: day_of_year[i],
                pressure: pressure[i] * to_pascal,
                etdirn: etdirn[i],
                tddclr: tddclr[i],
                tau: tau[i],
                de: de[i],
                phase: phase[i],
                f1: f1[i],
            };
            compute_cell(&cell, config)
        })
        .unzip();

    let fallback = source.iter().filter(|&&s| s == DniSource::Fallback).count();
    let cloudy = source.iter().filter(|&&s| s == DniSource::Cloudy).count();
    debug!(
        "all-sky DNI over {} cells: {cloudy} cloudy, {fallback} from DISC",
        source.len()
    );

    Ok(AllSkyDni {
        dni: from_flat(&shape, dni)?,
        source: from_flat(&shape, source)?,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dni::tdd2;
    use approx::assert_abs_diff_eq;

    fn cell() -> Cell {
        Cell {
            ghi: 450.0,
            zenith: 35.0,
            day_of_year: 120,
            pressure: 95_000.0,
            etdirn: 1340.0,
            tddclr: 0.78,
            tau: 4.0,
            de: 22.0,
            phase: CloudPhase::Water,
            f1: 400.0,
        }
    }

    #[test]
    fn clear_branch() {
        let c = Cell {
            phase: CloudPhase::Clear,
            ..cell()
        };
        let (dni, source) = compute_cell(&c, &ModelConfig::default());
        assert_eq!(source, DniSource::Clear);
        assert_abs_diff_eq!(dni, 1340.0 * 0.78, epsilon = 1e-9);
    }

    #[test]
    fn cloudy_branch() {
        let (dni, source) = compute_cell(&cell(), &ModelConfig::default());
        assert_eq!(source, DniSource::Cloudy);
        let expected =
            farms_dni_point(1340.0, 4.0, 35.0, 22.0, CloudPhase::Water, 0.78, 450.0, 400.0);
        assert_eq!(dni, expected.dni);
        assert!(dni > 0.0 && dni < 1340.0 * 0.78);
    }

    #[test]
    fn fallback_branch() {
        let config = ModelConfig::default();
        for c in [
            Cell {
                tau: f64::NAN,
                ..cell()
            },
            Cell {
                phase: CloudPhase::Unknown,
                ..cell()
            },
            Cell {
                de: -1.0,
                ..cell()
            },
        ] {
            let (dni, source) = compute_cell(&c, &config);
            assert_eq!(source, DniSource::Fallback);
            assert_eq!(
                dni,
                disc_point(450.0, 35.0, 120, 95_000.0, 87.0, config.solar_constant())
            );
        }
    }

    #[test]
    fn cloud_flag_without_depth() {
        let c = Cell {
            tau: 0.0,
            phase: CloudPhase::Ice,
            ..cell()
        };
        let (dni, source) = compute_cell(&c, &ModelConfig::default());
        assert_eq!(source, DniSource::Clear);
        assert_abs_diff_eq!(dni, 1340.0 * 0.78, epsilon = 1e-9);
    }

    #[test]
    fn small_ice_crystals() {
        let c = Cell {
            tau: 0.05,
            zenith: 6.0,
            de: 2.0,
            phase: CloudPhase::Ice,
            f1: 450.0,
            ..cell()
        };
        let (dni, source) = compute_cell(&c, &ModelConfig::default());
        assert_eq!(source, DniSource::Cloudy);
        assert!(dni < 1340.0 * 0.78, "dni = {dni}");
    }

    #[test]
    fn night_is_dark() {
        let config = ModelConfig::default();
        for c in [
            Cell {
                zenith: 90.0,
                phase: CloudPhase::Clear,
                ..cell()
            },
            Cell {
                zenith: 120.0,
                ..cell()
            },
            Cell {
                zenith: 95.0,
                tau: f64::NAN,
                ..cell()
            },
        ] {
            let (dni, source) = compute_cell(&c, &config);
            assert_eq!(dni, 0.0);
            assert_eq!(source, compute_cell(&Cell { zenith: 30.0, ..c }, &config).1);
        }

        // Twilight is still evaluated at the zenith limit
        let twilight = Cell {
            zenith: 89.0,
            phase: CloudPhase::Clear,
            ..cell()
        };
        assert_abs_diff_eq!(
            compute_cell(&twilight, &config).0,
            1340.0 * 0.78,
            epsilon = 1e-9
        );
    }

    #[test]
    fn negative_inputs_are_screened() {
        let c = Cell {
            tddclr: 1.3,
            phase: CloudPhase::Clear,
            ..cell()
        };
        let (dni, _) = compute_cell(&c, &ModelConfig::default());
        assert_abs_diff_eq!(dni, 1340.0, epsilon = 1e-9);

        let c = Cell {
            etdirn: -5.0,
            phase: CloudPhase::Clear,
            ..cell()
        };
        assert_eq!(compute_cell(&c, &ModelConfig::default()).0, 0.0);
    }

    struct Grid {
        ghi: ArrayD<f64>,
        zenith: ArrayD<f64>,
        day_of_year: ArrayD<i32>,
        pressure: ArrayD<f64>,
        etdirn: ArrayD<f64>,
        tddclr: ArrayD<f64>,
        tau: ArrayD<f64>,
        de: ArrayD<f64>,
        phase: ArrayD<CloudPhase>,
        f1: ArrayD<f64>,
    }

    impl Grid {
        /// A (10, 5, 5) grid cycling through clear, water, ice and missing
        /// retrievals. Pressure is in hPa.
        fn new() -> Self {
            let shape = [10, 5, 5];
            let idx = ndarray::Array::from_iter((0..250).map(|i| i as f64))
                .into_shape_with_order(shape)
                .unwrap()
                .into_dyn();
            let phase = idx.mapv(|i| match i as usize % 4 {
                0 => CloudPhase::Clear,
                1 => CloudPhase::Water,
                2 => CloudPhase::Ice,
                _ => CloudPhase::Unknown,
            });
            Self {
                ghi: idx.mapv(|i| 200.0 + 2.0 * i),
                zenith: idx.mapv(|i| (i * 0.37) % 85.0),
                day_of_year: idx.mapv(|i| 1 + i as i32),
                pressure: idx.mapv(|i| 900.0 + i * 0.4),
                etdirn: idx.mapv(|i| 1320.0 + (i % 80.0)),
                tddclr: idx.mapv(|i| 0.6 + (i % 30.0) * 0.01),
                tau: idx.mapv(|i| {
                    if i as usize % 4 == 3 {
                        f64::NAN
                    } else {
                        (i % 40.0) * 0.5
                    }
                }),
                de: idx.mapv(|i| 8.0 + (i % 50.0)),
                phase,
                f1: idx.mapv(|i| 150.0 + 1.5 * i),
            }
        }

        fn inputs(&self) -> AllSkyInputs<'_> {
            AllSkyInputs {
                ghi: self.ghi.view(),
                zenith: self.zenith.view(),
                day_of_year: self.day_of_year.view(),
                pressure: self.pressure.view(),
                etdirn: self.etdirn.view(),
                tddclr: self.tddclr.view(),
                tau: self.tau.view(),
                de: self.de.view(),
                phase: self.phase.view(),
                f1: self.f1.view(),
            }
        }
    }

    #[test]
    fn grid_matches_cells() {
        let grid = Grid::new();
        let config = ModelConfig::default();
        let out = compute(&grid.inputs(), &config).unwrap();

        assert_eq!(out.dni.shape(), &[10, 5, 5]);
        for (index, &dni) in out.dni.indexed_iter() {
            let cell = Cell {
                ghi: grid.ghi[&index],
                zenith: grid.zenith[&index],
                day_of_year: grid.day_of_year[&index],
                pressure: grid.pressure[&index] * 100.0,
                etdirn: grid.etdirn[&index],
                tddclr: grid.tddclr[&index],
                tau: grid.tau[&index],
                de: grid.de[&index],
                phase: grid.phase[&index],
                f1: grid.f1[&index],
            };
            let (expected, source) = compute_cell(&cell, &config);
            assert_eq!(dni, expected);
            assert_eq!(out.source[&index], source);
            assert!(dni >= 0.0 && dni.is_finite());
            if source == DniSource::Cloudy {
                // Only the surface-reflected part can lift DNI above the clear beam
                let clear = cell.etdirn * cell.tddclr;
                let reflected =
                    tdd2(cell.zenith, cell.ghi, cell.f1) / cell.zenith.to_radians().cos();
                assert!(dni <= clear + reflected + 1e-9, "{index:?}: {dni} > {clear}");
            }
        }
        assert!(out.source.iter().any(|&s| s == DniSource::Fallback));
        assert!(out.source.iter().any(|&s| s == DniSource::Cloudy));
        assert_eq!(out.report, ScreenReport::default());
    }

    #[test]
    fn repeated_runs_agree() {
        let grid = Grid::new();
        let config = ModelConfig::default();
        let first = compute(&grid.inputs(), &config).unwrap();
        let second = compute(&grid.inputs(), &config).unwrap();
        assert_eq!(first.dni, second.dni);
        assert_eq!(first.source, second.source);
    }

    #[test]
    fn chunks_match_whole_grid() {
        let grid = Grid::new();
        let config = ModelConfig::default();
        let inputs = grid.inputs();
        let whole = compute(&inputs, &config).unwrap();

        for rows in [0..3, 3..7, 7..10] {
            let part = compute(&inputs.rows(rows.clone()), &config).unwrap();
            assert_eq!(part.dni.shape(), &[rows.len(), 5, 5]);
            assert_eq!(
                part.dni,
                whole.dni.slice_axis(Axis(0), Slice::from(rows)).to_owned()
            );
        }
    }

    #[test]
    fn shape_mismatch_is_fatal() {
        let mut grid = Grid::new();
        grid.f1 = ArrayD::zeros(vec![10, 5, 6]);
        let err = compute(&grid.inputs(), &ModelConfig::default()).unwrap_err();
        assert_eq!(
            err,
            FarmsError::InvalidInputShape {
                name: "f1",
                expected: vec![10, 5, 5],
                found: vec![10, 5, 6],
            }
        );
    }

    #[test]
    fn thick_overhead_cloud() {
        let c = Cell {
            tau: 50.0,
            zenith: 10.0,
            ghi: 120.0,
            f1: 120.0,
            ..cell()
        };
        let (dni, source) = compute_cell(&c, &ModelConfig::default());
        assert_eq!(source, DniSource::Cloudy);
        assert!(dni < 1.0, "dni = {dni}");
    }
}

