//! Grid shape checks and the per-cell sky classification.

use ndarray::{ArrayD, ArrayViewD, CowArray, IxDyn};

use crate::error::FarmsError;

/// NSRDB cloud types that are treated as clear sky (clear, probably clear,
/// dust, smoke).
pub const CLEAR_TYPES: [i32; 4] = [0, 1, 11, 12];
/// NSRDB cloud types that are treated as water clouds (fog, water,
/// super-cooled water, mixed, unknown).
pub const WATER_TYPES: [i32; 5] = [2, 3, 4, 5, 10];
/// NSRDB cloud types that are treated as ice clouds (opaque ice, cirrus,
/// overlapping, overshooting).
pub const ICE_TYPES: [i32; 4] = [6, 7, 8, 9];

/// Cloud thermodynamic phase of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudPhase {
    /// No cloud
    Clear,
    /// Liquid water cloud
    Water,
    /// Ice cloud
    Ice,
    /// No usable retrieval
    Unknown,
}

impl CloudPhase {
    /// Map the FARMS phase flag (0 clear, 1 water, 2 ice).
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => CloudPhase::Clear,
            1 => CloudPhase::Water,
            2 => CloudPhase::Ice,
            _ => CloudPhase::Unknown,
        }
    }

    /// Map an NSRDB cloud type.
    pub fn from_cloud_type(cloud_type: i32) -> Self {
        if CLEAR_TYPES.contains(&cloud_type) {
            CloudPhase::Clear
        } else if WATER_TYPES.contains(&cloud_type) {
            CloudPhase::Water
        } else if ICE_TYPES.contains(&cloud_type) {
            CloudPhase::Ice
        } else {
            CloudPhase::Unknown
        }
    }

    /// The FARMS phase flag for this phase, with -1 for unknown.
    pub fn code(self) -> i32 {
        match self {
            CloudPhase::Clear => 0,
            CloudPhase::Water => 1,
            CloudPhase::Ice => 2,
            CloudPhase::Unknown => -1,
        }
    }
}

/// Phase of a cell that actually holds a cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudyPhase {
    /// Liquid water cloud
    Water,
    /// Ice cloud
    Ice,
}

impl From<CloudyPhase> for CloudPhase {
    fn from(phase: CloudyPhase) -> Self {
        match phase {
            CloudyPhase::Water => CloudPhase::Water,
            CloudyPhase::Ice => CloudPhase::Ice,
        }
    }
}

/// What a single grid cell looks like once its cloud retrieval is validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkyCondition {
    /// Clear sky, or a cloud flag with no optical depth.
    Clear,
    /// A valid cloud retrieval.
    Cloudy {
        /// Cloud optical depth, > 0
        tau: f64,
        /// Effective particle diameter in µm, > 0
        de: f64,
        /// Thermodynamic phase
        phase: CloudyPhase,
    },
    /// The retrieval is missing or nonsensical, so the cell has to fall back to
    /// the empirical decomposition.
    Missing,
}

impl SkyCondition {
    /// Classify one cell from its phase, optical depth and effective
    /// particle diameter. `tau` is expected to be screened already.
    pub fn resolve(phase: CloudPhase, tau: f64, de: f64) -> Self {
        let phase = match phase {
            CloudPhase::Clear => return SkyCondition::Clear,
            CloudPhase::Unknown => return SkyCondition::Missing,
            CloudPhase::Water => CloudyPhase::Water,
            CloudPhase::Ice => CloudyPhase::Ice,
        };

        if !tau.is_finite() {
            SkyCondition::Missing
        } else if tau <= 0.0 {
            SkyCondition::Clear
        } else if !(de.is_finite() && de > 0.0) {
            SkyCondition::Missing
        } else {
            SkyCondition::Cloudy { tau, de, phase }
        }
    }
}

/// Which branch of the all-sky model produced a DNI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DniSource {
    /// Clear-sky beam (`etdirn × Tddclr`)
    Clear = 0,
    /// FARMS-DNI cloud transmittance
    Cloudy = 1,
    /// DISC decomposition of GHI
    Fallback = 2,
}

impl From<SkyCondition> for DniSource {
    fn from(condition: SkyCondition) -> Self {
        match condition {
            SkyCondition::Clear => DniSource::Clear,
            SkyCondition::Cloudy { .. } => DniSource::Cloudy,
            SkyCondition::Missing => DniSource::Fallback,
        }
    }
}

/// Check that every named input has the shape of the first one.
///
/// Returns the common shape.
pub fn check_shapes(inputs: &[(&'static str, &[usize])]) -> Result<Vec<usize>, FarmsError> {
    let Some(&(_, expected)) = inputs.first() else {
        return Ok(Vec::new());
    };

    if let Some(&(name, found)) = inputs.iter().find(|(_, shape)| *shape != expected) {
        return Err(FarmsError::InvalidInputShape {
            name,
            expected: expected.to_vec(),
            found: found.to_vec(),
        });
    }
    log::debug!("input shapes are consistent: {expected:?}");
    Ok(expected.to_vec())
}

/// Standard-layout copy (or view) of an array so it can be read as a slice.
pub(crate) fn standard<'a, A: Clone>(view: ArrayViewD<'a, A>) -> CowArray<'a, A, IxDyn> {
    if view.is_standard_layout() {
        CowArray::from(view)
    } else {
        CowArray::from(view.as_standard_layout().into_owned())
    }
}

/// Borrow a standard-layout array as a flat slice.
pub(crate) fn as_slice<'a, A>(array: &'a CowArray<'_, A, IxDyn>) -> Result<&'a [A], FarmsError> {
    array.as_slice().ok_or(FarmsError::NotContiguous)
}

/// Put per-cell results back into a grid of the given shape.
pub(crate) fn from_flat<A>(shape: &[usize], values: Vec<A>) -> Result<ArrayD<A>, FarmsError> {
    let found = vec![values.len()];
    ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| FarmsError::InvalidInputShape {
        name: "output",
        expected: shape.to_vec(),
        found,
    })
}
