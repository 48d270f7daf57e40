//! Dense state-vector reference simulator.
//!
//! Holds all `2^n` complex amplitudes, so it is only suitable for small
//! circuits; the default limit of 20 registers keeps the vector at 16 MiB.

use std::sync::atomic::{AtomicU64, Ordering};

use num_complex::Complex64;
use rand::SeedableRng;
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::rngs::StdRng;

use crate::circuit::{Circuit, Gate};
use crate::error::BackendError;

use super::{Backend, BackendResult, Distribution, Outcome};

/// Default register limit of the reference simulator.
pub const DEFAULT_MAX_REGISTERS: usize = 20;

/// Widest circuit the simulator will allocate a state for (16 GiB of
/// amplitudes). Configured limits above this are rejected.
pub const REGISTER_CEILING: usize = 30;

/// Amplitudes below this probability are left out of exact distributions.
const NEGLIGIBLE: f64 = 1e-15;

type Matrix = [[Complex64; 2]; 2];

/// Pure state of `n` registers.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    register_count: usize,
    amplitudes: Vec<Complex64>,
}

impl StateVector {
    /// All registers in state 0.
    pub fn zero(register_count: usize) -> Self {
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1 << register_count];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            register_count,
            amplitudes,
        }
    }

    pub fn register_count(&self) -> usize {
        self.register_count
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    pub fn apply(&mut self, gate: &Gate) {
        match *gate {
            Gate::Ry { target, theta } => {
                let (s, c) = (theta / 2.0).sin_cos();
                self.apply_single(
                    target,
                    [
                        [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
                        [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
                    ],
                );
            }
            Gate::Rx { target, theta } => {
                let (s, c) = (theta / 2.0).sin_cos();
                self.apply_single(
                    target,
                    [
                        [Complex64::new(c, 0.0), Complex64::new(0.0, -s)],
                        [Complex64::new(0.0, -s), Complex64::new(c, 0.0)],
                    ],
                );
            }
            Gate::Reflect { target, theta } => {
                let (s, c) = theta.sin_cos();
                self.apply_single(
                    target,
                    [
                        [Complex64::new(c, 0.0), Complex64::new(s, 0.0)],
                        [Complex64::new(s, 0.0), Complex64::new(-c, 0.0)],
                    ],
                );
            }
            Gate::X { target } => self.apply_controlled_x(0, target),
            Gate::Cnot { control, target } => self.apply_controlled_x(1 << control, target),
            Gate::Toffoli { controls, target } => {
                self.apply_controlled_x((1 << controls[0]) | (1 << controls[1]), target)
            }
        }
    }

    fn apply_single(&mut self, target: usize, m: Matrix) {
        let mask = 1usize << target;
        for i in 0..self.amplitudes.len() {
            if i & mask != 0 {
                continue;
            }
            let j = i | mask;
            let (a0, a1) = (self.amplitudes[i], self.amplitudes[j]);
            self.amplitudes[i] = m[0][0] * a0 + m[0][1] * a1;
            self.amplitudes[j] = m[1][0] * a0 + m[1][1] * a1;
        }
    }

    /// Flip `target` on every basis state where all `controls` bits are set.
    fn apply_controlled_x(&mut self, controls: usize, target: usize) {
        let mask = 1usize << target;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 && i & controls == controls {
                self.amplitudes.swap(i, i | mask);
            }
        }
    }

    /// Born-rule probability of each basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }
}

/// In-process simulator backend.
#[derive(Debug)]
pub struct StateVectorBackend {
    max_registers: usize,
    seed: Option<u64>,
    submissions: AtomicU64,
}

impl StateVectorBackend {
    pub fn new(max_registers: usize) -> Self {
        Self {
            max_registers,
            seed: None,
            submissions: AtomicU64::new(0),
        }
    }

    /// Make sampled runs reproducible. The n-th submission draws from a
    /// generator seeded with `seed + n`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Number of circuits submitted so far.
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::Relaxed)
    }

    /// Run `circuit` from the all-zero state.
    pub fn simulate(&self, circuit: &Circuit) -> BackendResult<StateVector> {
        let n = circuit.register_count();
        let limit = self.max_registers.min(REGISTER_CEILING);
        if n > limit {
            return Err(BackendError::TooManyRegisters { required: n, limit });
        }
        let mut state = StateVector::zero(n);
        for (i, gate) in circuit.instructions().iter().enumerate() {
            if gate.max_register() >= n {
                return Err(BackendError::Submission {
                    message: format!("instruction {i} ({gate}) addresses a register beyond {n}"),
                });
            }
            state.apply(gate);
        }
        Ok(state)
    }

    fn rng(&self, submission: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(submission)),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for StateVectorBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REGISTERS)
    }
}

impl Backend for StateVectorBackend {
    fn name(&self) -> &str {
        "statevector"
    }

    fn max_registers(&self) -> usize {
        self.max_registers.min(REGISTER_CEILING)
    }

    fn submit(&self, circuit: &Circuit, trials: u64) -> BackendResult<Distribution> {
        let submission = self.submissions.fetch_add(1, Ordering::Relaxed);
        let state = self.simulate(circuit)?;
        let register_count = state.register_count();
        let probabilities = state.probabilities();
        tracing::debug!(
            backend = self.name(),
            registers = register_count,
            instructions = circuit.len(),
            trials,
            "simulated circuit"
        );

        if trials == 0 {
            let outcomes = probabilities
                .into_iter()
                .enumerate()
                .filter(|(_, p)| *p > NEGLIGIBLE)
                .map(|(state, p)| Outcome::new(state as u64, p));
            return Ok(Distribution::exact(register_count, outcomes));
        }

        let weights = WeightedIndex::new(&probabilities).map_err(|e| BackendError::Submission {
            message: format!("cannot sample from the final state: {e}"),
        })?;
        let mut rng = self.rng(submission);
        let weight = 1.0 / trials as f64;
        let draws = std::iter::repeat_with(move || {
            Outcome::new(weights.sample(&mut rng) as u64, weight)
        })
        .take(trials as usize);
        Ok(Distribution::sampled(register_count, draws))
    }
}
