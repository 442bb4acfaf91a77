//! Model configuration.

use std::str::FromStr;

use crate::error::FarmsError;
use crate::solar::SOLAR_CONSTANT;

/// Default upper limit on the solar zenith angle, in degrees.
pub const DEFAULT_ZENITH_LIMIT: f64 = 87.0;

/// Default upper bound for screened cloud optical depth.
pub const DEFAULT_MAX_OPTICAL_DEPTH: f64 = 160.0;

/// Label for the unit of the surface pressure grid.
///
/// Hectopascals and millibars are the same physical unit under different
/// names, so they share a conversion factor. Nothing is converted between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressureUnit {
    /// hPa
    #[default]
    Hectopascal,
    /// mbar, numerically identical to hPa
    Millibar,
    /// Pa
    Pascal,
}

impl PressureUnit {
    /// Factor that converts a value in this unit to pascals.
    pub fn to_pascal(self) -> f64 {
        match self {
            PressureUnit::Hectopascal | PressureUnit::Millibar => 100.0,
            PressureUnit::Pascal => 1.0,
        }
    }
}

impl FromStr for PressureUnit {
    type Err = FarmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hpa" => Ok(PressureUnit::Hectopascal),
            "mbar" | "mb" => Ok(PressureUnit::Millibar),
            "pa" => Ok(PressureUnit::Pascal),
            _ => Err(FarmsError::UnknownPressureUnit(s.to_string())),
        }
    }
}

/// Parameters shared by every component of the model. These are constant over
/// a whole grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    /// Zenith angles above this (degrees) are clamped to it.
    zenith_limit: f64,
    /// Unit of the pressure grid given to DISC.
    pressure_unit: PressureUnit,
    /// Mean solar irradiance at 1 AU in W/m².
    solar_constant: f64,
    /// Cloud optical depth is screened to `[0, max_optical_depth]`.
    max_optical_depth: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            zenith_limit: DEFAULT_ZENITH_LIMIT,
            pressure_unit: PressureUnit::default(),
            solar_constant: SOLAR_CONSTANT,
            max_optical_depth: DEFAULT_MAX_OPTICAL_DEPTH,
        }
    }
}

impl ModelConfig {
    /// Build a configuration, checking each value.
    pub fn new(
        zenith_limit: f64,
        pressure_unit: PressureUnit,
        solar_constant: f64,
    ) -> Result<Self, FarmsError> {
        Self::default()
            .with_zenith_limit(zenith_limit)?
            .with_pressure_unit(pressure_unit)
            .with_solar_constant(solar_constant)
    }

    /// Replace the zenith limit. It must lie strictly between 0 and 90 degrees,
    /// otherwise the cosine projection can reach zero.
    pub fn with_zenith_limit(mut self, zenith_limit: f64) -> Result<Self, FarmsError> {
        if !(zenith_limit > 0.0 && zenith_limit < 90.0) {
            return Err(FarmsError::InvalidConfig(
                "zenith limit must be within (0, 90) degrees",
            ));
        }
        self.zenith_limit = zenith_limit;
        Ok(self)
    }

    /// Replace the pressure unit.
    pub fn with_pressure_unit(mut self, pressure_unit: PressureUnit) -> Self {
        self.pressure_unit = pressure_unit;
        self
    }

    /// Replace the solar constant (W/m²).
    pub fn with_solar_constant(mut self, solar_constant: f64) -> Result<Self, FarmsError> {
        if !(solar_constant.is_finite() && solar_constant > 0.0) {
            return Err(FarmsError::InvalidConfig(
                "solar constant must be finite and positive",
            ));
        }
        self.solar_constant = solar_constant;
        Ok(self)
    }

    /// Replace the upper bound used when screening cloud optical depth.
    pub fn with_max_optical_depth(mut self, max_optical_depth: f64) -> Result<Self, FarmsError> {
        if !(max_optical_depth.is_finite() && max_optical_depth > 0.0) {
            return Err(FarmsError::InvalidConfig(
                "maximum optical depth must be finite and positive",
            ));
        }
        self.max_optical_depth = max_optical_depth;
        Ok(self)
    }

    /// Zenith limit in degrees.
    pub fn zenith_limit(&self) -> f64 {
        self.zenith_limit
    }

    /// Unit label of the pressure grid.
    pub fn pressure_unit(&self) -> PressureUnit {
        self.pressure_unit
    }

    /// Solar constant in W/m².
    pub fn solar_constant(&self) -> f64 {
        self.solar_constant
    }

    /// Upper bound for cloud optical depth.
    pub fn max_optical_depth(&self) -> f64 {
        self.max_optical_depth
    }
}
