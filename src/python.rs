//! Python bindings.
//!
//! NOTE: this module is the interface between Rust and Python. The real work
//! happens in the other modules, and they do not use `pyo3`, it's only used
//! here.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use log::{debug, info};
use ndarray::{ArrayD, Axis, Slice};
use numpy::{PyArrayDyn, PyReadonlyArrayDyn, ToPyArray};
use pyo3::exceptions::{PyKeyboardInterrupt, PyValueError};
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::all_sky::{self, AllSkyDni, AllSkyInputs};
use crate::config::{ModelConfig, PressureUnit};
use crate::dni::FarmsDniInputs;
use crate::error::FarmsError;
use crate::farms::FarmsInputs;
use crate::grid::CloudPhase;
use crate::screen::ScreenReport;
use crate::utilities::{Variability, VariabilitySpread};

impl From<FarmsError> for PyErr {
    fn from(e: FarmsError) -> Self {
        match e {
            FarmsError::InvalidInputShape { .. } => PyValueError::new_err(e.to_string()),
            FarmsError::UnknownPressureUnit(_) => PyValueError::new_err(e.to_string()),
            FarmsError::InvalidConfig(_) => PyValueError::new_err(e.to_string()),
            FarmsError::NotContiguous => PyValueError::new_err(e.to_string()),
            FarmsError::Cancelled => PyKeyboardInterrupt::new_err(e.to_string()),
        }
    }
}

fn model_config(pressure_unit: &str, zenith_limit: f64) -> Result<ModelConfig, FarmsError> {
    let unit: PressureUnit = pressure_unit.parse()?;
    ModelConfig::default()
        .with_pressure_unit(unit)
        .with_zenith_limit(zenith_limit)
}

/// FARMS irradiance grids, in W/m².
#[pyclass]
#[derive(Debug)]
struct FarmsResult {
    ghi: ArrayD<f64>,
    dni: ArrayD<f64>,
    dhi: ArrayD<f64>,
    f1: ArrayD<f64>,
}

#[pymethods]
impl FarmsResult {
    #[getter]
    fn ghi<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<f64>> {
        self.ghi.to_pyarray(py)
    }

    #[getter]
    fn dni<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<f64>> {
        self.dni.to_pyarray(py)
    }

    #[getter]
    fn dhi<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<f64>> {
        self.dhi.to_pyarray(py)
    }

    #[getter]
    fn f1<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<f64>> {
        self.f1.to_pyarray(py)
    }
}

/// FARMS-DNI grids, in W/m².
#[pyclass]
#[derive(Debug)]
struct FarmsDniResult {
    fd: ArrayD<f64>,
    dni: ArrayD<f64>,
    dni0: ArrayD<f64>,
}

#[pymethods]
impl FarmsDniResult {
    #[getter]
    fn fd<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<f64>> {
        self.fd.to_pyarray(py)
    }

    #[getter]
    fn dni<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<f64>> {
        self.dni.to_pyarray(py)
    }

    #[getter]
    fn dni0<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<f64>> {
        self.dni0.to_pyarray(py)
    }
}

/// All-sky DNI and which model produced each cell (0 clear, 1 FARMS-DNI,
/// 2 DISC).
#[pyclass]
#[derive(Debug)]
struct AllSkyResult {
    dni: ArrayD<f64>,
    source: ArrayD<u8>,
    #[pyo3(get)]
    clamped: usize,
}

#[pymethods]
impl AllSkyResult {
    #[getter]
    fn dni<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<f64>> {
        self.dni.to_pyarray(py)
    }

    #[getter]
    fn source<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<u8>> {
        self.source.to_pyarray(py)
    }
}

impl From<AllSkyDni> for AllSkyResult {
    fn from(out: AllSkyDni) -> Self {
        Self {
            source: out.source.mapv(|s| s as u8),
            dni: out.dni,
            clamped: out.report.total(),
        }
    }
}

/// Estimate DNI from GHI with the DISC model.
///
/// `ghi` in W/m², `zenith` in degrees, `day_of_year` as int32, and `pressure`
/// in `pressure_unit` ("hPa", "mbar" or "Pa"). All arrays must have the same
/// shape.
#[pyfunction]
#[pyo3(signature = (ghi, zenith, day_of_year, pressure, pressure_unit="hPa", zenith_limit=87.0))]
fn disc<'py>(
    py: Python<'py>,
    ghi: PyReadonlyArrayDyn<'py, f64>,
    zenith: PyReadonlyArrayDyn<'py, f64>,
    day_of_year: PyReadonlyArrayDyn<'py, i32>,
    pressure: PyReadonlyArrayDyn<'py, f64>,
    pressure_unit: &str,
    zenith_limit: f64,
) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
    let config = model_config(pressure_unit, zenith_limit)?;
    let (ghi, zenith) = (ghi.as_array(), zenith.as_array());
    let (day_of_year, pressure) = (day_of_year.as_array(), pressure.as_array());

    let dni = py.allow_threads(|| crate::disc::disc(ghi, zenith, day_of_year, pressure, &config))?;
    Ok(dni.to_pyarray(py))
}

/// Run FARMS to get all-sky GHI, DNI, DHI and the first-order irradiance.
///
/// `cloud_type` holds NSRDB cloud type codes (int32). `radius` is the sun-earth
/// distance in AU. The transmittances come from a clear-sky model.
#[pyfunction]
#[pyo3(signature = (tau, cloud_type, cloud_effective_radius, solar_zenith_angle, radius, tuuclr, ruuclr, tddclr, tduclr, albedo, zenith_limit=87.0))]
#[allow(clippy::too_many_arguments)]
fn farms(
    py: Python<'_>,
    tau: PyReadonlyArrayDyn<'_, f64>,
    cloud_type: PyReadonlyArrayDyn<'_, i32>,
    cloud_effective_radius: PyReadonlyArrayDyn<'_, f64>,
    solar_zenith_angle: PyReadonlyArrayDyn<'_, f64>,
    radius: PyReadonlyArrayDyn<'_, f64>,
    tuuclr: PyReadonlyArrayDyn<'_, f64>,
    ruuclr: PyReadonlyArrayDyn<'_, f64>,
    tddclr: PyReadonlyArrayDyn<'_, f64>,
    tduclr: PyReadonlyArrayDyn<'_, f64>,
    albedo: PyReadonlyArrayDyn<'_, f64>,
    zenith_limit: f64,
) -> PyResult<FarmsResult> {
    let config = ModelConfig::default().with_zenith_limit(zenith_limit)?;
    let phase = cloud_type.as_array().mapv(CloudPhase::from_cloud_type);

    let inputs = FarmsInputs {
        tau: tau.as_array(),
        phase: phase.view(),
        cloud_effective_radius: cloud_effective_radius.as_array(),
        zenith: solar_zenith_angle.as_array(),
        radius: radius.as_array(),
        tuuclr: tuuclr.as_array(),
        ruuclr: ruuclr.as_array(),
        tddclr: tddclr.as_array(),
        tduclr: tduclr.as_array(),
        albedo: albedo.as_array(),
    };
    let out = py.allow_threads(|| crate::farms::farms(&inputs, &config))?;

    Ok(FarmsResult {
        ghi: out.ghi,
        dni: out.dni,
        dhi: out.dhi,
        f1: out.f1,
    })
}

/// Run FARMS-DNI.
///
/// `f0` is the extraterrestrial irradiance in W/m², `solar_zenith_angle` in
/// degrees, `de` the effective particle diameter in µm, and `phase` the cloud
/// phase flag as int32 (0 clear, 1 water, 2 ice). `ghi` and `f1` come from
/// FARMS.
#[pyfunction]
#[pyo3(signature = (f0, tau, solar_zenith_angle, de, phase, tddclr, ghi, f1, zenith_limit=87.0))]
#[allow(clippy::too_many_arguments)]
fn farms_dni(
    py: Python<'_>,
    f0: PyReadonlyArrayDyn<'_, f64>,
    tau: PyReadonlyArrayDyn<'_, f64>,
    solar_zenith_angle: PyReadonlyArrayDyn<'_, f64>,
    de: PyReadonlyArrayDyn<'_, f64>,
    phase: PyReadonlyArrayDyn<'_, i32>,
    tddclr: PyReadonlyArrayDyn<'_, f64>,
    ghi: PyReadonlyArrayDyn<'_, f64>,
    f1: PyReadonlyArrayDyn<'_, f64>,
    zenith_limit: f64,
) -> PyResult<FarmsDniResult> {
    let config = ModelConfig::default().with_zenith_limit(zenith_limit)?;
    let phase = phase.as_array().mapv(CloudPhase::from_code);

    let inputs = FarmsDniInputs {
        extraterrestrial: f0.as_array(),
        tau: tau.as_array(),
        zenith: solar_zenith_angle.as_array(),
        de: de.as_array(),
        phase: phase.view(),
        tddclr: tddclr.as_array(),
        ghi: ghi.as_array(),
        f1: f1.as_array(),
    };
    let out = py.allow_threads(|| crate::dni::farms_dni(&inputs, &config))?;

    Ok(FarmsDniResult {
        fd: out.fd,
        dni: out.dni,
        dni0: out.dni0,
    })
}

/// Compute all-sky DNI, choosing per cell between the clear-sky beam,
/// FARMS-DNI, and DISC when the cloud retrieval is missing.
///
/// All arrays share one shape. The leading axis (usually time) is processed in
/// chunks of `chunk_size` rows on a pool of `num_threads` worker threads, or
/// an automatic number of threads if it's `None`. Progress is logged and
/// Ctrl-C cancels the computation.
///
/// `cloud_type` holds NSRDB cloud type codes (int32) and `day_of_year` is
/// int32. `tau` is NaN where the retrieval is missing.
#[pyfunction]
#[pyo3(signature = (ghi, zenith, day_of_year, pressure, etdirn, tddclr, tau, de, cloud_type, f1, pressure_unit="hPa", zenith_limit=87.0, chunk_size=1024, num_threads=None))]
#[allow(clippy::too_many_arguments)]
fn all_sky_dni(
    py: Python<'_>,
    ghi: PyReadonlyArrayDyn<'_, f64>,
    zenith: PyReadonlyArrayDyn<'_, f64>,
    day_of_year: PyReadonlyArrayDyn<'_, i32>,
    pressure: PyReadonlyArrayDyn<'_, f64>,
    etdirn: PyReadonlyArrayDyn<'_, f64>,
    tddclr: PyReadonlyArrayDyn<'_, f64>,
    tau: PyReadonlyArrayDyn<'_, f64>,
    de: PyReadonlyArrayDyn<'_, f64>,
    cloud_type: PyReadonlyArrayDyn<'_, i32>,
    f1: PyReadonlyArrayDyn<'_, f64>,
    pressure_unit: &str,
    zenith_limit: f64,
    chunk_size: usize,
    num_threads: Option<usize>,
) -> PyResult<AllSkyResult> {
    let config = model_config(pressure_unit, zenith_limit)?;
    if chunk_size == 0 {
        return Err(FarmsError::InvalidConfig("chunk size must be positive").into());
    }

    let phase = cloud_type.as_array().mapv(CloudPhase::from_cloud_type);
    let inputs = AllSkyInputs {
        ghi: ghi.as_array(),
        zenith: zenith.as_array(),
        day_of_year: day_of_year.as_array(),
        pressure: pressure.as_array(),
        etdirn: etdirn.as_array(),
        tddclr: tddclr.as_array(),
        tau: tau.as_array(),
        de: de.as_array(),
        phase: phase.view(),
        f1: f1.as_array(),
    };

    // Chunks are cut along the leading axis, so check the shapes first
    let shape = inputs.shape()?;
    let Some(&num_rows) = shape.first() else {
        return Ok(all_sky::compute(&inputs, &config)?.into());
    };
    let chunks: Vec<_> = (0..num_rows)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(num_rows))
        .collect();
    let num_chunks = chunks.len();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads.unwrap_or(0))
        .build()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    // These atomics keep track of how many chunks have finished and whether
    // it's time to cancel the computation or not
    let num_completed = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);

    info!("Computing all-sky DNI for shape {shape:?} in {num_chunks} chunks");

    let mut results = Vec::new();
    pool.in_place_scope(|s| -> PyResult<()> {
        s.spawn(|_| {
            chunks
                .par_iter()
                .map(|rows| -> Result<_, FarmsError> {
                    if cancelled.load(Ordering::Relaxed) {
                        return Err(FarmsError::Cancelled);
                    }
                    all_sky::compute(&inputs.rows(rows.clone()), &config)
                })
                .inspect(|_| {
                    num_completed.fetch_add(1, Ordering::Relaxed);
                })
                .collect_into_vec(&mut results);
        });

        // The chunks run in the thread pool while the main thread reports
        // progress and watches for Ctrl-C
        while !cancelled.load(Ordering::Relaxed) {
            if let Err(e) = py.check_signals() {
                cancelled.store(true, Ordering::Relaxed);
                return Err(e);
            }

            let num_completed = num_completed.load(Ordering::Relaxed);
            let progress = num_completed as f32 / num_chunks as f32 * 100.;
            info!("Completed {num_completed}/{num_chunks} chunks ({progress:0.2}%)");

            if num_completed == num_chunks {
                break;
            }

            py.allow_threads(|| {
                std::thread::sleep(Duration::from_millis(500));
            });
        }

        Ok(())
    })?;

    debug!("copying all-sky DNI output");
    let mut dni = ArrayD::zeros(shape.as_slice());
    let mut source = ArrayD::zeros(shape.as_slice());
    let mut report = ScreenReport::default();
    for (rows, result) in chunks.into_iter().zip(results) {
        let part = result?;
        let rows = Slice::from(rows);
        dni.slice_axis_mut(Axis(0), rows).assign(&part.dni);
        source
            .slice_axis_mut(Axis(0), rows)
            .assign(&part.source.mapv(|s| s as u8));
        report = report + part.report;
    }

    Ok(AllSkyResult {
        dni,
        source,
        clamped: report.total(),
    })
}

/// Diffuse horizontal irradiance, `max(ghi − dni cos(zenith), 0)`.
#[pyfunction]
fn calc_dhi<'py>(
    py: Python<'py>,
    dni: PyReadonlyArrayDyn<'py, f64>,
    ghi: PyReadonlyArrayDyn<'py, f64>,
    zenith: PyReadonlyArrayDyn<'py, f64>,
) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
    let dhi = crate::utilities::calc_dhi(dni.as_array(), ghi.as_array(), zenith.as_array())?;
    Ok(dhi.to_pyarray(py))
}

/// Add seeded synthetic variability to cloudy irradiance.
///
/// `cloud_type` holds NSRDB cloud type codes (int32). `distribution` is
/// "uniform" or "normal" and `option` is "tri" (peaking at `tri_center`) or
/// "linear".
#[pyfunction]
#[pyo3(signature = (irradiance, clear, cloud_type, var_frac=0.05, distribution="uniform", option="tri", tri_center=0.9, random_seed=123))]
#[allow(clippy::too_many_arguments)]
fn cloud_variability<'py>(
    py: Python<'py>,
    irradiance: PyReadonlyArrayDyn<'py, f64>,
    clear: PyReadonlyArrayDyn<'py, f64>,
    cloud_type: PyReadonlyArrayDyn<'py, i32>,
    var_frac: f64,
    distribution: &str,
    option: &str,
    tri_center: f64,
    random_seed: u64,
) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
    let spread = match option {
        "tri" => VariabilitySpread::Triangular { center: tri_center },
        "linear" => VariabilitySpread::Linear,
        _ => {
            return Err(FarmsError::InvalidConfig(
                "variability option must be \"tri\" or \"linear\"",
            )
            .into())
        }
    };
    let variability = Variability {
        fraction: var_frac,
        distribution: distribution.parse()?,
        spread,
        seed: random_seed,
    };
    let phase = cloud_type.as_array().mapv(CloudPhase::from_cloud_type);
    let (irradiance, clear) = (irradiance.as_array(), clear.as_array());

    let out = py.allow_threads(|| {
        crate::utilities::cloud_variability(irradiance, clear, phase.view(), &variability)
    })?;
    Ok(out.to_pyarray(py))
}

/// A Python module implemented in Rust.
#[pymodule]
#[pyo3(name = "farms_dni")]
fn farms_dni_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(disc, m)?)?;
    m.add_function(wrap_pyfunction!(farms, m)?)?;
    m.add_function(wrap_pyfunction!(farms_dni, m)?)?;
    m.add_function(wrap_pyfunction!(all_sky_dni, m)?)?;
    m.add_function(wrap_pyfunction!(calc_dhi, m)?)?;
    m.add_function(wrap_pyfunction!(cloud_variability, m)?)?;
    m.add_class::<FarmsResult>()?;
    m.add_class::<FarmsDniResult>()?;
    m.add_class::<AllSkyResult>()?;
    Ok(())
}
