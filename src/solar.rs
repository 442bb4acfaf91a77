//! Solar constants and sun-earth geometry.

use std::f64::consts::PI;

/// Mean solar irradiance at one astronomical unit, in W/m².
pub const SOLAR_CONSTANT: f64 = 1361.2;

/// Ratio of the mean to the actual squared sun-earth distance for a day angle
/// `b` in radians (Spencer 1971).
fn eccentricity(b: f64) -> f64 {
    1.00011 + 0.034221 * b.cos() + 0.00128 * b.sin() + 0.000719 * (2.0 * b).cos()
        + 7.7e-5 * (2.0 * b).sin()
}

/// Extraterrestrial normal irradiance in W/m² for day of year `doy`.
///
/// The day angle starts at zero on January 1st.
pub fn extraterrestrial_irradiance(doy: i32, solar_constant: f64) -> f64 {
    let day_angle = 2.0 * PI * f64::from(doy - 1) / 365.0;
    eccentricity(day_angle) * solar_constant
}

/// Sun-earth radius vector in AU for day of year `doy`. It ranges from about
/// 0.983 in January to 1.017 in July.
pub fn sun_earth_radius(doy: i32) -> f64 {
    let day_angle = 2.0 * PI * f64::from(doy) / 365.0;
    eccentricity(day_angle).powf(-0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn perihelion_and_aphelion() {
        assert!(sun_earth_radius(3) < 0.984);
        assert!(sun_earth_radius(185) > 1.016);
        assert!(extraterrestrial_irradiance(3, SOLAR_CONSTANT) > 1400.0);
        assert!(extraterrestrial_irradiance(185, SOLAR_CONSTANT) < 1320.0);
    }

    #[test]
    fn radius_matches_irradiance() {
        // F0 = S / r² so both must agree up to the one-day offset
        let r = sun_earth_radius(99);
        let i0 = extraterrestrial_irradiance(100, SOLAR_CONSTANT);
        assert_abs_diff_eq!(SOLAR_CONSTANT / (r * r), i0, epsilon = 1e-9);
    }
}
