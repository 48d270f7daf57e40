//! Uncertainty encodings.
//!
//! A [`Strategy`] selects a [`GateEncoder`]. All encoders realize the same
//! classical truth tables for AND, OR, NOT and implication when inputs are
//! exactly 0 or 1; they differ only in the rotation used to inject a
//! continuous precision or certainty into a fresh register:
//!
//! - **Certainty factor** (`cf`): `Ry(2·asin √v)`, reading 1 with probability `v`.
//! - **Fuzzy** (`fuzzy`): the real reflection `M(v·π/2)`, reading 1 with
//!   probability `sin²(v·π/2)`, a smooth membership curve.
//! - **Bayesian** (`bayes`): `Rx(2·asin v)`, taking `v` as the amplitude of
//!   the 1 state, so it reads 1 with probability `v²`. Weak evidence is
//!   discounted quadratically while certain evidence stays certain.

use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Circuit, Gate};

/// Uncertainty-propagation model used when compiling an island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    #[default]
    #[serde(rename = "cf", alias = "certainty-factor")]
    CertaintyFactor,
    #[serde(rename = "fuzzy")]
    Fuzzy,
    #[serde(rename = "bayes", alias = "bayesian")]
    Bayesian,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::CertaintyFactor,
        Strategy::Fuzzy,
        Strategy::Bayesian,
    ];

    /// The encoder implementing this strategy.
    pub fn encoder(self) -> &'static dyn GateEncoder {
        match self {
            Strategy::CertaintyFactor => &CertaintyFactorEncoder,
            Strategy::Fuzzy => &FuzzyEncoder,
            Strategy::Bayesian => &BayesianEncoder,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::CertaintyFactor => "cf",
            Strategy::Fuzzy => "fuzzy",
            Strategy::Bayesian => "bayes",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown strategy \"{0}\" (expected cf, fuzzy or bayes)")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cf" | "certainty-factor" | "certainty_factor" => Ok(Strategy::CertaintyFactor),
            "fuzzy" => Ok(Strategy::Fuzzy),
            "bayes" | "bayesian" => Ok(Strategy::Bayesian),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

/// Gate emission for one uncertainty model.
///
/// Combinator and implication gates default to the reversible classical
/// circuits (Toffoli for AND, Toffoli plus two CNOTs for OR, CNOT plus X
/// for NOT). Output registers are assumed to start at 0.
pub trait GateEncoder: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// Single-register rotation preparing `target` from 0 according to `value`.
    fn emit_fact(&self, value: f64, target: usize, circuit: &mut Circuit);

    /// Probability of reading 1 on a register prepared by [`emit_fact`](Self::emit_fact).
    fn injected_probability(&self, value: f64) -> f64;

    fn emit_and(&self, left: usize, right: usize, out: usize, circuit: &mut Circuit) {
        circuit.push(Gate::Toffoli {
            controls: [left, right],
            target: out,
        });
    }

    fn emit_or(&self, left: usize, right: usize, out: usize, circuit: &mut Circuit) {
        circuit.push(Gate::Toffoli {
            controls: [left, right],
            target: out,
        });
        circuit.push(Gate::Cnot {
            control: left,
            target: out,
        });
        circuit.push(Gate::Cnot {
            control: right,
            target: out,
        });
    }

    fn emit_not(&self, input: usize, out: usize, circuit: &mut Circuit) {
        circuit.push(Gate::Cnot {
            control: input,
            target: out,
        });
        circuit.push(Gate::X { target: out });
    }

    /// Implication: the consequent flips when both the antecedent and the
    /// certainty register read 1.
    fn emit_rule(&self, antecedent: usize, certainty: usize, consequent: usize, circuit: &mut Circuit) {
        circuit.push(Gate::Toffoli {
            controls: [antecedent, certainty],
            target: consequent,
        });
    }
}

fn amplitude_angle(value: f64) -> f64 {
    2.0 * value.clamp(0.0, 1.0).sqrt().asin()
}

#[derive(Debug, Clone, Copy)]
pub struct CertaintyFactorEncoder;

impl GateEncoder for CertaintyFactorEncoder {
    fn strategy(&self) -> Strategy {
        Strategy::CertaintyFactor
    }

    fn emit_fact(&self, value: f64, target: usize, circuit: &mut Circuit) {
        circuit.push(Gate::Ry {
            target,
            theta: amplitude_angle(value),
        });
    }

    fn injected_probability(&self, value: f64) -> f64 {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FuzzyEncoder;

impl GateEncoder for FuzzyEncoder {
    fn strategy(&self) -> Strategy {
        Strategy::Fuzzy
    }

    fn emit_fact(&self, value: f64, target: usize, circuit: &mut Circuit) {
        circuit.push(Gate::Reflect {
            target,
            theta: value.clamp(0.0, 1.0) * FRAC_PI_2,
        });
    }

    fn injected_probability(&self, value: f64) -> f64 {
        (value.clamp(0.0, 1.0) * FRAC_PI_2).sin().powi(2)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BayesianEncoder;

impl GateEncoder for BayesianEncoder {
    fn strategy(&self) -> Strategy {
        Strategy::Bayesian
    }

    fn emit_fact(&self, value: f64, target: usize, circuit: &mut Circuit) {
        circuit.push(Gate::Rx {
            target,
            theta: 2.0 * value.clamp(0.0, 1.0).asin(),
        });
    }

    fn injected_probability(&self, value: f64) -> f64 {
        value.clamp(0.0, 1.0).powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_short_and_long_names() {
        assert_eq!("cf".parse::<Strategy>().unwrap(), Strategy::CertaintyFactor);
        assert_eq!(
            "Certainty-Factor".parse::<Strategy>().unwrap(),
            Strategy::CertaintyFactor
        );
        assert_eq!("fuzzy".parse::<Strategy>().unwrap(), Strategy::Fuzzy);
        assert_eq!("bayesian".parse::<Strategy>().unwrap(), Strategy::Bayesian);
        assert!("quantum".parse::<Strategy>().is_err());
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
            assert_eq!(strategy.encoder().strategy(), strategy);
        }
    }

    #[test]
    fn injection_endpoints_are_classical() {
        for strategy in Strategy::ALL {
            let encoder = strategy.encoder();
            assert!(encoder.injected_probability(0.0).abs() < 1e-12);
            assert!((encoder.injected_probability(1.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn fuzzy_injection_is_nonlinear() {
        let p = FuzzyEncoder.injected_probability(0.5);
        assert!((p - 0.5).abs() < 1e-12);
        let p = FuzzyEncoder.injected_probability(0.25);
        assert!(p < 0.25);
    }

    #[test]
    fn encoders_disagree_between_endpoints() {
        for value in [0.25, 0.5, 0.8] {
            let cf = CertaintyFactorEncoder.injected_probability(value);
            let fuzzy = FuzzyEncoder.injected_probability(value);
            let bayes = BayesianEncoder.injected_probability(value);
            assert!((cf - value).abs() < 1e-12);
            assert!((bayes - value * value).abs() < 1e-12);
            assert!((cf - bayes).abs() > 1e-3, "{value}");
        }
        let fuzzy = FuzzyEncoder.injected_probability(0.8);
        assert!((fuzzy - CertaintyFactorEncoder.injected_probability(0.8)).abs() > 1e-3);
    }

    #[test]
    fn serde_uses_short_names() {
        #[derive(Deserialize)]
        struct Holder {
            strategy: Strategy,
        }
        let h: Holder = toml::from_str("strategy = \"bayes\"").unwrap();
        assert_eq!(h.strategy, Strategy::Bayesian);
        let h: Holder = toml::from_str("strategy = \"certainty-factor\"").unwrap();
        assert_eq!(h.strategy, Strategy::CertaintyFactor);
    }
}
