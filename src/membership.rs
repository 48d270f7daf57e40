//! Piecewise-linear fuzzy membership functions.
//!
//! Used to turn a crisp measurement into a fact precision. A function is
//! written as breakpoints `y/x` joined by `-`, for example `0/11-1/13-1/15-0/17`
//! (a trapezoid rising from 11 to 13 and falling from 15 to 17). Outside the
//! breakpoints the first or last `y` holds.

use std::str::FromStr;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum MembershipError {
    #[error("membership function has no breakpoints")]
    #[diagnostic(
        code(qrbs::membership::empty),
        help("Write breakpoints as y/x pairs joined by '-', e.g. \"0/11-1/13-1/15-0/17\".")
    )]
    Empty,

    #[error("malformed breakpoint \"{point}\"")]
    #[diagnostic(
        code(qrbs::membership::malformed),
        help("Each breakpoint is a degree and a position separated by '/', e.g. \"1/13\".")
    )]
    Malformed { point: String },

    #[error("breakpoint degree {degree} is outside [0, 1]")]
    #[diagnostic(code(qrbs::membership::degree))]
    DegreeOutOfRange { degree: f64 },

    #[error("breakpoint positions must not decrease ({previous} then {next})")]
    #[diagnostic(
        code(qrbs::membership::unordered),
        help("List breakpoints from left to right.")
    )]
    Unordered { previous: f64, next: f64 },
}

/// A membership function defined by `(x, y)` breakpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PiecewiseLinear {
    points: Vec<(f64, f64)>,
}

impl PiecewiseLinear {
    /// Build from `(x, y)` breakpoints ordered by `x`.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, MembershipError> {
        if points.is_empty() {
            return Err(MembershipError::Empty);
        }
        for &(x, y) in &points {
            if !x.is_finite() || !y.is_finite() {
                return Err(MembershipError::Malformed {
                    point: format!("{y}/{x}"),
                });
            }
            if !(0.0..=1.0).contains(&y) {
                return Err(MembershipError::DegreeOutOfRange { degree: y });
            }
        }
        for pair in points.windows(2) {
            if pair[1].0 < pair[0].0 {
                return Err(MembershipError::Unordered {
                    previous: pair[0].0,
                    next: pair[1].0,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Degree of membership of `x`, in [0, 1].
    pub fn degree(&self, x: f64) -> f64 {
        let (first_x, first_y) = self.points[0];
        if x <= first_x {
            return first_y;
        }
        for pair in self.points.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            if x >= x0 && x <= x1 {
                if x1 == x0 {
                    return y1;
                }
                return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
            }
        }
        self.points[self.points.len() - 1].1
    }
}

impl FromStr for PiecewiseLinear {
    type Err = MembershipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MembershipError::Empty);
        }
        let points = s
            .split('-')
            .map(|point| {
                let malformed = || MembershipError::Malformed {
                    point: point.to_string(),
                };
                let (y, x) = point.split_once('/').ok_or_else(malformed)?;
                let y: f64 = y.trim().parse().map_err(|_| malformed())?;
                let x: f64 = x.trim().parse().map_err(|_| malformed())?;
                Ok((x, y))
            })
            .collect::<Result<Vec<_>, MembershipError>>()?;
        Self::new(points)
    }
}

impl TryFrom<String> for PiecewiseLinear {
    type Error = MembershipError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PiecewiseLinear> for String {
    fn from(value: PiecewiseLinear) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for PiecewiseLinear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (x, y)) in self.points.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{y}/{x}")?;
        }
        Ok(())
    }
}
