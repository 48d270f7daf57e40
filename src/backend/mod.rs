//! Simulation backends.
//!
//! A [`Backend`] consumes a [`Circuit`] and returns a [`Distribution`] over
//! the `2^register_count` basis outcomes. Register `i` is bit `i` of an
//! outcome's state label. With `trials == 0` the backend is asked for the
//! exact distribution; otherwise it returns `trials` individual draws, each
//! weighted `1 / trials`.
//!
//! The distribution is a lazy, finite, single-pass sequence: it is consumed
//! once by the decoder and cannot be restarted.

pub mod statevector;

use crate::circuit::Circuit;
use crate::error::BackendError;

pub use statevector::StateVectorBackend;

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A probabilistic execution service for register circuits.
pub trait Backend: Send + Sync {
    /// Human-readable backend name for logs and reports.
    fn name(&self) -> &str;

    /// Largest circuit width (in registers) the backend accepts.
    fn max_registers(&self) -> usize;

    /// Run `circuit` and return its outcome distribution.
    ///
    /// Blocking; there are no partial results and no cancellation.
    fn submit(&self, circuit: &Circuit, trials: u64) -> BackendResult<Distribution>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn max_registers(&self) -> usize {
        (**self).max_registers()
    }

    fn submit(&self, circuit: &Circuit, trials: u64) -> BackendResult<Distribution> {
        (**self).submit(circuit, trials)
    }
}

/// Probability mass attached to one basis state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    /// Basis state label; bit `i` is the reading of register `i`.
    pub state: u64,
    pub probability: f64,
}

impl Outcome {
    pub fn new(state: u64, probability: f64) -> Self {
        Self { state, probability }
    }

    /// Whether `register` reads 1 in this outcome.
    pub fn reads_one(&self, register: usize) -> bool {
        register < 64 && (self.state >> register) & 1 == 1
    }
}

/// Outcome sequence returned by [`Backend::submit`].
pub struct Distribution {
    register_count: usize,
    exact: bool,
    outcomes: Box<dyn Iterator<Item = Outcome> + Send>,
}

impl Distribution {
    /// An analytic distribution: each outcome carries its exact probability.
    pub fn exact<I>(register_count: usize, outcomes: I) -> Self
    where
        I: IntoIterator<Item = Outcome>,
        I::IntoIter: Send + 'static,
    {
        Self {
            register_count,
            exact: true,
            outcomes: Box::new(outcomes.into_iter()),
        }
    }

    /// An empirical distribution: a stream of individual draws.
    pub fn sampled<I>(register_count: usize, draws: I) -> Self
    where
        I: IntoIterator<Item = Outcome>,
        I::IntoIter: Send + 'static,
    {
        Self {
            register_count,
            exact: false,
            outcomes: Box::new(draws.into_iter()),
        }
    }

    pub fn register_count(&self) -> usize {
        self.register_count
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }
}

impl Iterator for Distribution {
    type Item = Outcome;

    fn next(&mut self) -> Option<Outcome> {
        self.outcomes.next()
    }
}

impl std::fmt::Debug for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Distribution")
            .field("register_count", &self.register_count)
            .field("exact", &self.exact)
            .finish_non_exhaustive()
    }
}
