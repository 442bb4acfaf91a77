//! Direct normal irradiance under all skies.
//!
//! The FARMS-DNI model computes DNI for cloudy cells from the cloud optical
//! depth, phase, and particle size along with clear-sky transmittances. When
//! the cloud retrieval is missing the DISC model estimates DNI from the
//! measured GHI instead. [`all_sky::compute`] chooses between the two (and the
//! clear-sky beam) for every cell of a grid.
//!
//! All grids are `ndarray` views of any dimension and are processed in
//! parallel with `rayon`. Python bindings are available with the `python`
//! feature.

pub mod all_sky;
pub mod config;
pub mod disc;
pub mod dni;
pub mod error;
pub mod farms;
pub mod grid;
pub mod screen;
pub mod solar;
pub mod utilities;

#[cfg(feature = "python")]
mod python;

pub use all_sky::{AllSkyDni, AllSkyInputs};
pub use config::{ModelConfig, PressureUnit};
pub use dni::{farms_dni, FarmsDniInputs, FarmsDniOutputs};
pub use error::FarmsError;
pub use grid::{CloudPhase, DniSource};
