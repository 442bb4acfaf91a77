//! Fitted constants of the FARMS-DNI parameterization.
//!
//! Everything here is empirical data, grouped in tables so the set can be
//! checked or replaced without touching the formulas. Equation numbers refer
//! to:
//!
//! - Xie, Y. et al., 2020: "A physics-based DNI model assessing all-sky
//!   circumsolar radiation", iScience 23, <https://doi.org/10.1016/j.isci.2020.100893>.
//! - Yang, J. et al., 2022: "Parameterization of cloud transmittance for
//!   expeditious assessment and forecasting of all-sky DNI", J. Renewable
//!   Sustainable Energy 14, 063703.
#![allow(clippy::excessive_precision)]

/// Straight line in the effective particle diameter, `slope × De + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    /// A line that doesn't depend on `De`.
    pub const fn flat(intercept: f64) -> Self {
        Self {
            slope: 0.0,
            intercept,
        }
    }

    pub const NEG_INF: Self = Self::flat(f64::NEG_INFINITY);
    pub const INF: Self = Self::flat(f64::INFINITY);

    pub fn at(self, de: f64) -> f64 {
        if self.slope == 0.0 {
            self.intercept
        } else {
            self.slope * de + self.intercept
        }
    }
}

const fn line(slope: f64, intercept: f64) -> Line {
    Line { slope, intercept }
}

/// One cell of the `τp` lookup (Eq. 3, Yang et al. 2022).
///
/// The band applies when `de_min <= De < de_max` and `lower(De) <= µ0 <
/// upper(De)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TaupBand {
    pub de_min: f64,
    pub de_max: f64,
    pub lower: Line,
    pub upper: Line,
    pub value: f64,
}

impl TaupBand {
    pub fn contains(&self, mu: f64, de: f64) -> bool {
        (self.de_min..self.de_max).contains(&de)
            && mu >= self.lower.at(de)
            && mu < self.upper.at(de)
    }
}

const fn band(de: (f64, f64), lower: Line, upper: Line, value: f64) -> TaupBand {
    TaupBand {
        de_min: de.0,
        de_max: de.1,
        lower,
        upper,
        value,
    }
}

const NEG_INF: f64 = f64::NEG_INFINITY;
const INF: f64 = f64::INFINITY;

/// `τp` bands for water clouds. Later bands take precedence.
pub(crate) const WATER_TAUP: [TaupBand; 12] = [
    band((NEG_INF, 10.0), Line::NEG_INF, Line::flat(0.1391), 0.1),
    band((NEG_INF, 10.0), Line::flat(0.1391), Line::flat(0.2419), 0.2),
    band((NEG_INF, 10.0), Line::flat(0.2419), Line::flat(0.3090), 0.3),
    band((NEG_INF, 10.0), Line::flat(0.3090), Line::flat(0.4067), 0.4),
    band((NEG_INF, 10.0), Line::flat(0.4067), Line::flat(0.6156), 0.5),
    band((NEG_INF, 10.0), Line::flat(0.6156), Line::INF, 1.0),
    band((10.0, INF), Line::NEG_INF, Line::flat(0.1391), 0.1),
    band((10.0, INF), Line::flat(0.1391), Line::flat(0.2079), 0.2),
    band((10.0, INF), Line::flat(0.2079), Line::flat(0.3090), 0.3),
    band((10.0, INF), Line::flat(0.3090), Line::flat(0.3746), 0.4),
    band((10.0, INF), Line::flat(0.3746), Line::flat(0.6156), 0.5),
    band((10.0, INF), Line::flat(0.6156), Line::INF, 1.0),
];

/// `τp` bands for ice clouds. Later bands take precedence. Below 5 µm no band
/// applies, `τp` is 0, and the crystals scatter nothing into the circumsolar
/// region.
pub(crate) const ICE_TAUP: [TaupBand; 21] = [
    band((5.0, 14.0), Line::NEG_INF, Line::flat(0.1391), 0.1),
    band((5.0, 14.0), Line::flat(0.1391), Line::flat(0.2079), 0.2),
    band((5.0, 14.0), Line::flat(0.2079), Line::flat(0.3090), 0.3),
    band((5.0, 14.0), Line::flat(0.3090), Line::flat(0.3746), 0.4),
    band((5.0, 14.0), Line::flat(0.3746), Line::flat(0.6156), 0.5),
    band((5.0, 14.0), Line::flat(0.6156), Line::flat(0.9994), 1.0),
    band((5.0, 14.0), Line::flat(0.9994), Line::INF, 1.5),
    band((14.0, 50.0), Line::NEG_INF, Line::flat(0.139173), 0.1),
    band((14.0, 50.0), Line::flat(0.139173), line(-0.0011, 0.2307), 0.2),
    band((14.0, 50.0), line(-0.0011, 0.2307), line(-0.0022, 0.3340), 0.3),
    band((14.0, 50.0), line(-0.0022, 0.3340), line(-0.0020, 0.4096), 0.4),
    band((14.0, 50.0), line(-0.0020, 0.4096), line(-0.0033, 0.6461), 0.5),
    band((14.0, 50.0), line(-0.0033, 0.6461), line(-0.0049, 1.0713), 1.0),
    band((14.0, 50.0), line(-0.0049, 1.0713), Line::INF, 1.5),
    band((50.0, INF), Line::NEG_INF, line(-0.0006, 0.2109), 0.2),
    band((50.0, INF), line(-0.0006, 0.2109), line(-0.0005, 0.2581), 0.3),
    band((50.0, INF), line(-0.0005, 0.2581), line(-0.0010, 0.3907), 0.4),
    band((50.0, INF), line(-0.0010, 0.3907), line(-0.0008, 0.4900), 0.5),
    band((50.0, INF), line(-0.0008, 0.4900), line(-0.0017, 0.8708), 1.0),
    band((50.0, INF), line(-0.0017, 0.8708), line(-0.0006, 1.0367), 1.5),
    band((50.0, INF), line(-0.0006, 1.0367), Line::INF, 2.0),
];

/// Quadratic `c2 µ0² + c1 µ0 + c0`, valid up to `upper` in µ0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct QuadSegment {
    pub upper: f64,
    pub coef: [f64; 3],
}

impl QuadSegment {
    pub fn eval(&self, x: f64) -> f64 {
        let [c2, c1, c0] = self.coef;
        c2 * x * x + c1 * x + c0
    }
}

const fn quad(upper: f64, c2: f64, c1: f64, c0: f64) -> QuadSegment {
    QuadSegment {
        upper,
        coef: [c2, c1, c0],
    }
}

/// First segment with `x < upper`.
pub(crate) fn segment_below(segments: &[QuadSegment], x: f64) -> Option<&QuadSegment> {
    segments.iter().find(|s| x < s.upper)
}

/// First segment with `x <= upper`.
pub(crate) fn segment_up_to(segments: &[QuadSegment], x: f64) -> Option<&QuadSegment> {
    segments.iter().find(|s| x <= s.upper)
}

/// Water cloud peak transmittance shape in µ0 (Eq. 4), scaled by `h(De)`.
/// Upper bounds are exclusive.
pub(crate) const WATER_TDDP: [QuadSegment; 8] = [
    quad(0.342, -0.1787, 0.2207, 0.977),
    quad(0.4694, 0.0, 0.0, 1.0),
    quad(0.7193, 2.6399, -3.2111, 1.9434),
    quad(0.8829, -0.224, 0.0835, 1.056),
    quad(0.9396, -94.381, 170.32, -75.843),
    quad(0.9945, -12.794, 22.686, -8.9392),
    quad(0.999, 11248.61, -22441.07, 11193.59),
    quad(INF, 0.0, 0.0, 0.76),
];

/// `h(De) = a ln(De) + b` for water clouds.
pub(crate) const WATER_H: [f64; 2] = [0.005553, 0.002503];

/// Ice cloud peak transmittance for `De <= 10` µm (Eq. 4). Upper bounds are
/// exclusive.
pub(crate) const ICE_SMALL_TDDP: [QuadSegment; 4] = [
    quad(0.9396, 0.0, 0.0, 0.14991),
    quad(0.9945, -4.5171, 8.3056, -3.6476),
    quad(0.9994, 298.45, -601.33, 303.04),
    quad(INF, 0.0, 0.0, 0.12269),
];

/// Above this µ0, ice clouds larger than 10 µm use the overhead-sun fit.
pub(crate) const ICE_OVERHEAD_MU: f64 = 0.9994;

/// Diameter limit between the two overhead-sun fits for ice clouds.
pub(crate) const ICE_OVERHEAD_DE_BREAK: f64 = 16.0;

/// Overhead-sun ice fit for `10 < De <= 16`: `a De + b`.
pub(crate) const ICE_OVERHEAD_LINEAR: [f64; 2] = [0.0015, 0.1078];

/// Overhead-sun ice fit for `De > 16`: `a exp(b De)`.
pub(crate) const ICE_OVERHEAD_EXP: [f64; 2] = [0.1621, -0.016];

/// Diameter limit between the medium and large ice tables.
pub(crate) const ICE_LARGE_DE: f64 = 30.0;

/// Ice cloud peak transmittance shape for `10 < De <= 30` µm, scaled by
/// `ade(De)`. Upper bounds are inclusive.
pub(crate) const ICE_MEDIUM_TDDP: [QuadSegment; 12] = [
    quad(0.2419, -8.454, 2.4095, 0.8425),
    quad(0.3746, -13.528, 7.8403, -0.1221),
    quad(0.4694, 19.524, -16.5, 4.4612),
    quad(0.5877, 16.737, -17.419, 5.4881),
    quad(0.6691, -39.493, 48.963, -14.175),
    quad(0.7660, 0.4017, -0.243, 0.9609),
    quad(0.8480, -11.183, 18.126, -6.3417),
    quad(0.8987, -163.36, 283.35, -121.91),
    quad(0.9396, -202.72, 368.75, -166.75),
    quad(0.9702, -181.72, 343.59, -161.3),
    quad(0.9945, 127.66, -255.73, 129.03),
    quad(INF, 908.66, -1869.3, 961.63),
];

/// `ade(De)` quadratic coefficients `[c2, c1, c0]`.
pub(crate) const ICE_MEDIUM_SCALE: [f64; 3] = [-0.000232338, 0.012748726, 0.046745083];

/// Ice cloud peak transmittance shape for `De > 30` µm, scaled by `bde(De)`.
/// Upper bounds are inclusive.
pub(crate) const ICE_LARGE_TDDP: [QuadSegment; 12] = [
    quad(0.2419, -4.362, -0.0878, 1.1218),
    quad(0.3746, -49.566, 28.767, -3.1299),
    quad(0.4694, 58.572, -49.5, 11.363),
    quad(0.5877, 62.118, -63.037, 16.875),
    quad(0.6691, -237.68, 293.21, -89.328),
    quad(0.7660, 1.2051, -0.7291, 0.8826),
    quad(0.8480, -55.6, 90.698, -35.905),
    quad(0.8987, -422.36, 733.97, -317.89),
    quad(0.9396, -457.09, 831.11, -376.85),
    quad(0.9702, -344.91, 655.67, -310.5),
    quad(0.9945, 622.85, -1227.6, 605.97),
    quad(INF, 6309.63, -12654.78, 6346.15),
];

/// `bde(De)` quadratic coefficients `[c2, c1, c0]`.
pub(crate) const ICE_LARGE_SCALE: [f64; 3] = [0.0000166112, -0.00410998, 0.352026619];

/// Eq. 6 of Yang et al. (2022): `a = a_coef µ0^a_exp`, `b = b_coef µ0^b_exp`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SlopeFit {
    pub a_coef: f64,
    pub a_exp: f64,
    pub b_coef: f64,
    pub b_exp: f64,
}

pub(crate) const WATER_SLOPE: SlopeFit = SlopeFit {
    a_coef: 2.0339,
    a_exp: -0.927,
    b_coef: 6.6421,
    b_exp: 2.0672,
};

pub(crate) const ICE_SLOPE: SlopeFit = SlopeFit {
    a_coef: 1.7686,
    a_exp: -0.95,
    b_coef: 7.117,
    b_exp: 1.9658,
};

/// Scaling of the cloud optical depth for the direct beam (Eqs. 3a and 3b of
/// Xie et al. 2020).
///
/// Below `THICK_TAU` the scaled depth is the cubic `c1 τ + c2 τ² + c3 τ³`
/// times `1 + boost (THICK_TAU − τ)`; above it, `0.2 (τ − THICK_TAU)^1.5 +
/// thick_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DepthScaling {
    pub cubic: [f64; 3],
    pub boost: f64,
    pub thick_offset: f64,
}

pub(crate) const THICK_TAU: f64 = 8.0;
pub(crate) const THICK_SCALE: f64 = 0.2;

pub(crate) const WATER_DEPTH: DepthScaling = DepthScaling {
    cubic: [0.254825, -0.00232717, 5.19320e-06],
    boost: 0.07,
    thick_offset: 2.10871,
};

pub(crate) const ICE_DEPTH: DepthScaling = DepthScaling {
    cubic: [0.345353, -0.00244671, 4.74263e-06],
    boost: 0.0,
    thick_offset: 2.91345,
};

/// Solid-angle integral of the circumsolar region, parameterizing Eq. S4 of
/// Xie et al. (2020): `µΩ = a exp(−(Z − b)³ / c)` with `Z` in degrees.
pub(crate) const CIRCUMSOLAR_OMEGA: [f64; 3] = [5.94991536e-03, 5.42116600e-01, 331280.9859904468];
