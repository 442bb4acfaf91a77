/// Possible FARMS-DNI errors.
///
/// Only malformed inputs as a whole are errors. Per-cell problems (negative
/// irradiance, missing cloud retrievals, low sun) are recovered locally and
/// never surface here.
#[derive(Debug, Clone, PartialEq)]
pub enum FarmsError {
    /// The input grids don't share a common shape
    InvalidInputShape {
        /// Name of the offending input
        name: &'static str,
        /// Shape of the reference input
        expected: Vec<usize>,
        /// Shape that was actually given
        found: Vec<usize>,
    },
    /// The pressure unit label wasn't recognized
    UnknownPressureUnit(String),
    /// A configuration value is outside its valid range
    InvalidConfig(&'static str),
    /// An array is not contiguous when it was assumed to be
    NotContiguous,
    /// The operation was aborted early
    Cancelled,
}

impl std::fmt::Display for FarmsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FarmsError::InvalidInputShape {
                name,
                expected,
                found,
            } => {
                write!(
                    f,
                    "input \"{name}\" has shape {found:?}, expected {expected:?}"
                )
            }
            FarmsError::UnknownPressureUnit(unit) => {
                write!(f, "unrecognized pressure unit \"{unit}\"")
            }
            FarmsError::InvalidConfig(reason) => write!(f, "invalid configuration: {reason}"),
            FarmsError::NotContiguous => write!(f, "array slice not contiguous in memory"),
            FarmsError::Cancelled => write!(f, "operation cancelled early"),
        }
    }
}

impl std::error::Error for FarmsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_message() {
        let e = FarmsError::InvalidInputShape {
            name: "zenith",
            expected: vec![10, 5, 5],
            found: vec![10, 5, 6],
        };
        assert_eq!(
            e.to_string(),
            "input \"zenith\" has shape [10, 5, 6], expected [10, 5, 5]"
        );
    }

    #[test]
    fn pressure_unit_message() {
        let e = FarmsError::UnknownPressureUnit("psi".to_string());
        assert_eq!(e.to_string(), "unrecognized pressure unit \"psi\"");
    }

    #[test]
    fn error_is_std_error_and_thread_safe() {
        fn assert_impl<T: std::error::Error + Send + Sync>() {}
        assert_impl::<FarmsError>();
    }
}
