use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;

use super::KnowledgeResult;

/// The smallest unit of knowledge: an attribute holding a value to some
/// degree of precision.
///
/// Equality is structural over all three fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Attribute the fact describes (e.g. `"throw"`).
    pub attribute: String,
    /// Label of the value taken by the attribute (e.g. a linguistic term).
    pub value: String,
    precision: f64,
}

impl Fact {
    /// Create a fact, rejecting precisions outside `[0, 1]` (and NaN).
    pub fn new(
        attribute: impl Into<String>,
        value: impl Into<String>,
        precision: f64,
    ) -> KnowledgeResult<Self> {
        check_unit_interval(precision)?;
        Ok(Self {
            attribute: attribute.into(),
            value: value.into(),
            precision,
        })
    }

    /// Degree to which the attribute holds the value, in `[0, 1]`.
    pub fn precision(&self) -> f64 {
        self.precision
    }

    /// Replace the precision, rejecting values outside `[0, 1]`.
    pub fn set_precision(&mut self, precision: f64) -> KnowledgeResult<()> {
        check_unit_interval(precision)?;
        self.precision = precision;
        Ok(())
    }

    /// Replace the precision, clamping into `[0, 1]`. NaN becomes 0.
    pub(crate) fn set_precision_clamped(&mut self, precision: f64) {
        self.precision = if precision.is_nan() {
            0.0
        } else {
            precision.clamp(0.0, 1.0)
        };
    }
}

impl std::fmt::Display for Fact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={} ({:.4})", self.attribute, self.value, self.precision)
    }
}

fn check_unit_interval(precision: f64) -> KnowledgeResult<()> {
    if (0.0..=1.0).contains(&precision) {
        Ok(())
    } else {
        Err(KnowledgeError::InvalidPrecision { value: precision })
    }
}
