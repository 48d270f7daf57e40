//! Execution of knowledge islands on a simulation backend.
//!
//! [`Qpu`] pairs a [`Backend`] with an [`ExecutionConfig`] and runs the
//! compile, submit, decode and write-back loop over a [`Qrbs`]:
//!
//! 1. every requested island is checked for membership, then compiled once
//!    to check register capacity (fail-fast, before any submission). Facts
//!    an earlier stage will write are sized by id, so the check still holds
//!    after write-back changes their precision;
//! 2. islands are grouped into stages of mutually independent islands,
//!    preserving the requested order;
//! 3. each stage is compiled (in parallel with rayon when enabled) against
//!    the precisions written by earlier stages, then each island is
//!    submitted, its consequent registers decoded and written back.
//!
//! Write-back is all-or-nothing per island: a backend failure or a
//! malformed distribution leaves that island's consequents untouched.

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::{Backend, Distribution};
use crate::circuit::{CompiledIsland, IslandCompiler, Strategy};
use crate::error::{BackendError, CompileError, QpuError};
use crate::id::{FactId, IslandId};
use crate::qrbs::Qrbs;

/// Result type for execution and evaluation.
pub type QpuResult<T> = std::result::Result<T, QpuError>;

/// Slack allowed on the total probability mass of a distribution.
const MASS_TOLERANCE: f64 = 1e-6;

/// Plain execution parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub strategy: Strategy,
    /// Sampled trials per island; 0 requests the exact distribution.
    pub trials: u64,
    /// Compile independent islands on the rayon thread pool.
    pub parallel_compile: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            trials: 0,
            parallel_compile: true,
        }
    }
}

/// Register demand of one island against the backend limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IslandCapacity {
    pub island: IslandId,
    pub required: usize,
    pub limit: usize,
    pub instructions: usize,
}

impl IslandCapacity {
    pub fn fits(&self) -> bool {
        self.required <= self.limit
    }
}

/// A consequent precision written by execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactUpdate {
    pub fact: FactId,
    pub precision: f64,
}

/// What happened to one island during [`Qpu::execute`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IslandRun {
    pub island: IslandId,
    /// Index of the dependency stage the island ran in.
    pub stage: usize,
    pub registers: usize,
    pub instructions: usize,
    pub updates: Vec<FactUpdate>,
}

/// Summary of an [`Qpu::execute`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub backend: String,
    pub strategy: Strategy,
    pub trials: u64,
    pub islands: Vec<IslandRun>,
}

impl ExecutionReport {
    /// Last precision written for `fact`, if any island updated it.
    pub fn precision_of(&self, fact: FactId) -> Option<f64> {
        self.islands
            .iter()
            .rev()
            .flat_map(|run| run.updates.iter())
            .find(|u| u.fact == fact)
            .map(|u| u.precision)
    }
}

/// Backend register limit.
pub fn max_registers(backend: &impl Backend) -> usize {
    backend.max_registers()
}

/// Registers needed to run `island` under `strategy` with the graph's
/// current precisions.
pub fn required_registers(qrbs: &Qrbs, island: IslandId, strategy: Strategy) -> QpuResult<usize> {
    if qrbs.island(island).is_none() {
        return Err(QpuError::UnknownIsland { island });
    }
    IslandCompiler::new(qrbs, strategy)
        .compile(island)
        .map(|c| c.register_count())
        .map_err(|source| QpuError::Compile { island, source })
}

/// Group `islands` into stages that can run without ordering constraints.
///
/// An island joins the current stage unless it reads or writes a fact that
/// a member of the stage writes, or writes a fact a member reads; otherwise
/// it opens a new stage. Requested order is preserved.
pub fn plan_stages(qrbs: &Qrbs, islands: &[IslandId]) -> Vec<Vec<IslandId>> {
    let mut stages: Vec<Vec<IslandId>> = Vec::new();
    let mut stage_reads: BTreeSet<FactId> = BTreeSet::new();
    let mut stage_writes: BTreeSet<FactId> = BTreeSet::new();

    for &island in islands {
        let (reads, writes) = footprint(qrbs, island);
        let conflicts = !stage_writes.is_disjoint(&reads)
            || !stage_writes.is_disjoint(&writes)
            || !stage_reads.is_disjoint(&writes)
            || stages.last().is_some_and(|stage| stage.contains(&island));

        match stages.last_mut() {
            Some(stage) if !conflicts => stage.push(island),
            _ => {
                stages.push(vec![island]);
                stage_reads.clear();
                stage_writes.clear();
            }
        }
        stage_reads.extend(reads);
        stage_writes.extend(writes);
    }
    stages
}

/// Facts read by antecedents and facts written as consequents.
fn footprint(qrbs: &Qrbs, island: IslandId) -> (BTreeSet<FactId>, BTreeSet<FactId>) {
    let mut reads = BTreeSet::new();
    let mut writes = BTreeSet::new();
    let rules = qrbs.island(island).map(|i| i.rules()).unwrap_or_default();
    for rule in rules.iter().filter_map(|id| qrbs.rule(*id)) {
        reads.extend(rule.left_hand_side.leaves());
        writes.insert(rule.right_hand_side);
    }
    (reads, writes)
}

/// A backend plus execution parameters.
pub struct Qpu<B: Backend> {
    backend: B,
    config: ExecutionConfig,
}

impl<B: Backend> Qpu<B> {
    /// Bind a backend. A backend that accepts no registers cannot run
    /// anything and is rejected as a configuration error.
    pub fn new(backend: B, config: ExecutionConfig) -> QpuResult<Self> {
        if backend.max_registers() == 0 {
            return Err(QpuError::InvalidConfig {
                message: format!("backend `{}` accepts no registers", backend.name()),
            });
        }
        Ok(Self { backend, config })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Register demand of every requested island (all islands when `None`),
    /// in execution order. Pure: nothing is submitted or written.
    ///
    /// `required` is an upper bound over the whole run: a fact written by an
    /// earlier stage is counted apart from every other fact, whatever
    /// precision it receives.
    pub fn capacity(
        &self,
        qrbs: &Qrbs,
        islands: Option<&[IslandId]>,
    ) -> QpuResult<Vec<IslandCapacity>> {
        let selected = select(qrbs, islands)?;
        let limit = max_registers(&self.backend);
        let mut written = BTreeSet::new();
        let mut capacities = Vec::with_capacity(selected.len());
        for stage in plan_stages(qrbs, &selected) {
            let compiled = self.compile_all(qrbs, &stage, &written)?;
            capacities.extend(compiled.into_iter().map(|(island, c)| IslandCapacity {
                island,
                required: c.register_count(),
                limit,
                instructions: c.circuit.len(),
            }));
            for &island in &stage {
                written.extend(footprint(qrbs, island).1);
            }
        }
        Ok(capacities)
    }

    /// Whether every requested island fits the backend.
    ///
    /// Returns `Ok(true)` when all fit; the first island that does not is
    /// reported as [`QpuError::CapacityExceeded`].
    pub fn evaluate(&self, qrbs: &Qrbs, islands: Option<&[IslandId]>) -> QpuResult<bool> {
        for capacity in self.capacity(qrbs, islands)? {
            if !capacity.fits() {
                return Err(QpuError::CapacityExceeded {
                    island: capacity.island,
                    required: capacity.required,
                    limit: capacity.limit,
                });
            }
        }
        Ok(true)
    }

    /// Run the requested islands (all islands when `None`) and write the
    /// decoded consequent precisions back into `qrbs`.
    pub fn execute(
        &self,
        qrbs: &mut Qrbs,
        islands: Option<&[IslandId]>,
    ) -> QpuResult<ExecutionReport> {
        let selected = select(qrbs, islands)?;
        self.evaluate(qrbs, Some(selected.as_slice()))?;

        let stages = plan_stages(qrbs, &selected);
        tracing::info!(
            backend = self.backend.name(),
            strategy = %self.config.strategy,
            trials = self.config.trials,
            islands = selected.len(),
            stages = stages.len(),
            "executing knowledge islands"
        );

        let mut report = ExecutionReport {
            backend: self.backend.name().to_string(),
            strategy: self.config.strategy,
            trials: self.config.trials,
            islands: Vec::with_capacity(selected.len()),
        };

        let settled = BTreeSet::new();
        for (stage, members) in stages.iter().enumerate() {
            // Compiled after the previous stage's write-back.
            let compiled = self.compile_all(qrbs, members, &settled)?;
            for (island, compiled) in compiled {
                let run = self.run_island(qrbs, island, stage, &compiled)?;
                report.islands.push(run);
            }
        }
        Ok(report)
    }

    fn compile_all(
        &self,
        qrbs: &Qrbs,
        islands: &[IslandId],
        pending: &BTreeSet<FactId>,
    ) -> QpuResult<Vec<(IslandId, CompiledIsland)>> {
        let compiler =
            IslandCompiler::new(qrbs, self.config.strategy).with_pending(pending.iter().copied());
        let compile_one = |island: IslandId| {
            compiler
                .compile(island)
                .map(|c| (island, c))
                .map_err(|source| QpuError::Compile { island, source })
        };
        if self.config.parallel_compile && islands.len() > 1 {
            islands.par_iter().map(|&i| compile_one(i)).collect()
        } else {
            islands.iter().map(|&i| compile_one(i)).collect()
        }
    }

    fn run_island(
        &self,
        qrbs: &mut Qrbs,
        island: IslandId,
        stage: usize,
        compiled: &CompiledIsland,
    ) -> QpuResult<IslandRun> {
        let required = compiled.register_count();
        let limit = max_registers(&self.backend);
        if required > limit {
            return Err(QpuError::CapacityExceeded {
                island,
                required,
                limit,
            });
        }

        let distribution = self
            .backend
            .submit(&compiled.circuit, self.config.trials)
            .map_err(|source| QpuError::Backend { island, source })?;
        let updates = decode(island, compiled, distribution)
            .map_err(|source| QpuError::Backend { island, source })?;

        for update in &updates {
            qrbs.write_precision(update.fact, update.precision)
                .map_err(|_| QpuError::Compile {
                    island,
                    source: CompileError::UnknownFact { fact: update.fact },
                })?;
        }

        tracing::info!(
            island = %island,
            stage,
            registers = required,
            updated = updates.len(),
            "island executed"
        );
        Ok(IslandRun {
            island,
            stage,
            registers: required,
            instructions: compiled.circuit.len(),
            updates,
        })
    }
}

/// Requested islands, or all islands in assertion order.
fn select(qrbs: &Qrbs, islands: Option<&[IslandId]>) -> QpuResult<Vec<IslandId>> {
    match islands {
        None => Ok(qrbs.engine().island_ids()),
        Some(requested) => {
            if let Some(&island) = requested.iter().find(|i| qrbs.island(**i).is_none()) {
                return Err(QpuError::UnknownIsland { island });
            }
            Ok(requested.to_vec())
        }
    }
}

/// Marginal probability of reading 1 on each consequent register.
fn decode(
    island: IslandId,
    compiled: &CompiledIsland,
    distribution: Distribution,
) -> Result<Vec<FactUpdate>, BackendError> {
    let register_count = compiled.register_count();
    if distribution.register_count() != register_count {
        return Err(BackendError::MalformedDistribution {
            message: format!(
                "distribution covers {} registers, circuit has {register_count}",
                distribution.register_count()
            ),
        });
    }

    let targets: Vec<(FactId, usize)> = compiled.symbols.consequents().collect();
    let mut mass = vec![0.0_f64; targets.len()];
    let mut total = 0.0_f64;
    for outcome in distribution {
        if register_count < 64 && outcome.state >> register_count != 0 {
            return Err(BackendError::MalformedDistribution {
                message: format!(
                    "outcome {:#b} is outside {register_count} registers",
                    outcome.state
                ),
            });
        }
        if !outcome.probability.is_finite() || outcome.probability < 0.0 {
            return Err(BackendError::MalformedDistribution {
                message: format!(
                    "outcome {:#b} has probability {}",
                    outcome.state, outcome.probability
                ),
            });
        }
        total += outcome.probability;
        for (slot, (_, register)) in mass.iter_mut().zip(&targets) {
            if outcome.reads_one(*register) {
                *slot += outcome.probability;
            }
        }
    }
    if total > 1.0 + MASS_TOLERANCE {
        return Err(BackendError::MalformedDistribution {
            message: format!("total probability mass {total} exceeds 1"),
        });
    }

    Ok(targets
        .into_iter()
        .zip(mass)
        .map(|((fact, _), p)| {
            let precision = p.clamp(0.0, 1.0);
            if (precision - p).abs() > MASS_TOLERANCE {
                tracing::warn!(island = %island, fact = %fact, mass = p, "clamped consequent probability");
            }
            FactUpdate { fact, precision }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendResult, Outcome, StateVectorBackend};
    use crate::circuit::Circuit;
    use crate::knowledge::LeftHandSide;

    fn exact_qpu(strategy: Strategy) -> Qpu<StateVectorBackend> {
        let config = ExecutionConfig {
            strategy,
            ..ExecutionConfig::default()
        };
        Qpu::new(StateVectorBackend::default(), config).unwrap()
    }

    struct FailingBackend;

    impl Backend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }
        fn max_registers(&self) -> usize {
            20
        }
        fn submit(&self, _: &Circuit, _: u64) -> BackendResult<Distribution> {
            Err(BackendError::Submission {
                message: "timeout".into(),
            })
        }
    }

    /// Returns the same outcomes whatever the circuit.
    struct ScriptedBackend(Vec<Outcome>);

    impl Backend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }
        fn max_registers(&self) -> usize {
            20
        }
        fn submit(&self, circuit: &Circuit, _: u64) -> BackendResult<Distribution> {
            Ok(Distribution::exact(circuit.register_count(), self.0.clone()))
        }
    }

    struct ZeroBackend;

    impl Backend for ZeroBackend {
        fn name(&self) -> &str {
            "zero"
        }
        fn max_registers(&self) -> usize {
            0
        }
        fn submit(&self, _: &Circuit, _: u64) -> BackendResult<Distribution> {
            unreachable!()
        }
    }

    #[test]
    fn single_rule_round_trip() {
        let mut qrbs = Qrbs::new();
        let p = qrbs.assert_fact("p", "t", 0.8).unwrap();
        let q = qrbs.assert_fact("q", "t", 0.0).unwrap();
        let r = qrbs.assert_rule(p, q, 1.0).unwrap();
        let island = qrbs.assert_island([r]).unwrap();

        let report = exact_qpu(Strategy::CertaintyFactor)
            .execute(&mut qrbs, None)
            .unwrap();
        let q_precision = qrbs.precision(q).unwrap();
        assert!((q_precision - 0.8).abs() < 1e-9);
        assert_eq!(report.islands.len(), 1);
        assert_eq!(report.islands[0].island, island);
        assert_eq!(report.precision_of(q), Some(q_precision));
        assert_eq!(qrbs.precision(p), Some(0.8));
    }

    #[test]
    fn rule_identity_law_holds_for_every_strategy() {
        for strategy in Strategy::ALL {
            for (certainty, expected) in [(1.0, 1.0), (0.0, 0.0)] {
                let mut qrbs = Qrbs::new();
                let a = qrbs.assert_fact("a", "t", 1.0).unwrap();
                let b = qrbs.assert_fact("b", "t", 0.5).unwrap();
                let r = qrbs.assert_rule(a, b, certainty).unwrap();
                qrbs.assert_island([r]).unwrap();
                exact_qpu(strategy).execute(&mut qrbs, None).unwrap();
                let got = qrbs.precision(b).unwrap();
                assert!((got - expected).abs() < 1e-9, "{strategy} c={certainty}");
            }
        }
    }

    #[test]
    fn chained_islands_run_in_dependency_stages() {
        let mut qrbs = Qrbs::new();
        let p = qrbs.assert_fact("p", "t", 0.8).unwrap();
        let q = qrbs.assert_fact("q", "t", 0.0).unwrap();
        let s = qrbs.assert_fact("s", "t", 0.0).unwrap();
        let r1 = qrbs.assert_rule(p, q, 1.0).unwrap();
        let r2 = qrbs.assert_rule(q, s, 0.5).unwrap();
        let first = qrbs.assert_island([r1]).unwrap();
        let second = qrbs.assert_island([r2]).unwrap();

        assert_eq!(plan_stages(&qrbs, &[first, second]), vec![vec![first], vec![second]]);

        let report = exact_qpu(Strategy::CertaintyFactor)
            .execute(&mut qrbs, None)
            .unwrap();
        assert!((qrbs.precision(q).unwrap() - 0.8).abs() < 1e-9);
        assert!((qrbs.precision(s).unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(report.islands[1].stage, 1);
    }

    #[test]
    fn independent_islands_share_a_stage() {
        let mut qrbs = Qrbs::new();
        let a = qrbs.assert_fact("a", "t", 0.3).unwrap();
        let b = qrbs.assert_fact("b", "t", 0.0).unwrap();
        let x = qrbs.assert_fact("x", "t", 0.6).unwrap();
        let y = qrbs.assert_fact("y", "t", 0.0).unwrap();
        let r1 = qrbs.assert_rule(a, b, 1.0).unwrap();
        let r2 = qrbs.assert_rule(x, y, 1.0).unwrap();
        let i1 = qrbs.assert_island([r1]).unwrap();
        let i2 = qrbs.assert_island([r2]).unwrap();
        assert_eq!(plan_stages(&qrbs, &[i1, i2]), vec![vec![i1, i2]]);

        exact_qpu(Strategy::Bayesian).execute(&mut qrbs, None).unwrap();
        assert!((qrbs.precision(b).unwrap() - 0.09).abs() < 1e-9);
        assert!((qrbs.precision(y).unwrap() - 0.36).abs() < 1e-9);
    }

    #[test]
    fn capacity_violation_fails_before_submission() {
        let mut qrbs = Qrbs::new();
        let a = qrbs.assert_fact("a", "t", 0.5).unwrap();
        let b = qrbs.assert_fact("b", "t", 0.5).unwrap();
        let c = qrbs.assert_fact("c", "t", 0.0).unwrap();
        let small = qrbs.assert_rule(a, c, 1.0).unwrap();
        let x = qrbs.assert_fact("x", "t", 0.0).unwrap();
        let wide = qrbs
            .assert_rule(LeftHandSide::or(LeftHandSide::and(a, b), c), x, 1.0)
            .unwrap();
        let fits = qrbs.assert_island([small]).unwrap();
        let too_wide = qrbs.assert_island([small, wide]).unwrap();

        let qpu = Qpu::new(StateVectorBackend::new(4), ExecutionConfig::default()).unwrap();
        assert!(qpu.evaluate(&qrbs, Some(&[fits][..])).unwrap());

        let before = qrbs.clone();
        let err = qpu.execute(&mut qrbs, None).unwrap_err();
        assert!(matches!(
            err,
            QpuError::CapacityExceeded { island, limit: 4, .. } if island == too_wide
        ));
        assert_eq!(qpu.backend().submissions(), 0);
        assert_eq!(qrbs, before);
    }

    #[test]
    fn capacity_accounts_for_earlier_write_back() {
        let mut qrbs = Qrbs::new();
        let p = qrbs.assert_fact("p", "t", 0.8).unwrap();
        let q = qrbs.assert_fact("q", "t", 0.0).unwrap();
        let twin = qrbs.assert_fact("q", "t", 0.0).unwrap();
        let s = qrbs.assert_fact("s", "t", 0.0).unwrap();
        let produce = qrbs.assert_rule(p, q, 1.0).unwrap();
        let consume = qrbs.assert_rule(LeftHandSide::and(q, twin), s, 1.0).unwrap();
        let first = qrbs.assert_island([produce]).unwrap();
        let second = qrbs.assert_island([consume]).unwrap();

        // Alone, q and its twin share a register: 4 fit.
        assert_eq!(required_registers(&qrbs, second, Strategy::CertaintyFactor).unwrap(), 4);

        // Once `first` writes q the two split, so the run needs 5.
        let qpu = Qpu::new(StateVectorBackend::new(4), ExecutionConfig::default()).unwrap();
        let capacities = qpu.capacity(&qrbs, None).unwrap();
        assert_eq!(capacities[1].island, second);
        assert_eq!(capacities[1].required, 5);
        assert!(matches!(
            qpu.evaluate(&qrbs, None),
            Err(QpuError::CapacityExceeded { island, required: 5, limit: 4 }) if island == second
        ));

        let before = qrbs.clone();
        assert!(matches!(
            qpu.execute(&mut qrbs, None),
            Err(QpuError::CapacityExceeded { .. })
        ));
        assert_eq!(qpu.backend().submissions(), 0);
        assert_eq!(qrbs, before);

        let roomy = Qpu::new(StateVectorBackend::new(5), ExecutionConfig::default()).unwrap();
        let report = roomy.execute(&mut qrbs, None).unwrap();
        assert_eq!(report.islands[1].registers, 5);
        assert!((qrbs.precision(q).unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(qrbs.precision(s), Some(0.0));
    }

    #[test]
    fn unknown_island_rejected() {
        let mut qrbs = Qrbs::new();
        let ghost = IslandId::new(3).unwrap();
        let qpu = exact_qpu(Strategy::Fuzzy);
        assert!(matches!(
            qpu.evaluate(&qrbs, Some(&[ghost][..])),
            Err(QpuError::UnknownIsland { island }) if island == ghost
        ));
        assert!(matches!(
            qpu.execute(&mut qrbs, Some(&[ghost][..])),
            Err(QpuError::UnknownIsland { .. })
        ));
    }

    #[test]
    fn backend_failure_leaves_consequents_untouched() {
        let mut qrbs = Qrbs::new();
        let p = qrbs.assert_fact("p", "t", 0.8).unwrap();
        let q = qrbs.assert_fact("q", "t", 0.25).unwrap();
        let r = qrbs.assert_rule(p, q, 1.0).unwrap();
        qrbs.assert_island([r]).unwrap();

        let qpu = Qpu::new(FailingBackend, ExecutionConfig::default()).unwrap();
        let err = qpu.execute(&mut qrbs, None).unwrap_err();
        assert!(matches!(err, QpuError::Backend { .. }));
        assert_eq!(qrbs.precision(q), Some(0.25));
    }

    #[test]
    fn malformed_distributions_rejected() {
        let mut qrbs = Qrbs::new();
        let p = qrbs.assert_fact("p", "t", 0.8).unwrap();
        let q = qrbs.assert_fact("q", "t", 0.25).unwrap();
        let r = qrbs.assert_rule(p, q, 1.0).unwrap();
        qrbs.assert_island([r]).unwrap();

        let cases = [
            vec![Outcome::new(1 << 5, 1.0)],
            vec![Outcome::new(0, f64::NAN)],
            vec![Outcome::new(0, 0.7), Outcome::new(2, 0.7)],
        ];
        for outcomes in cases {
            let qpu = Qpu::new(ScriptedBackend(outcomes), ExecutionConfig::default()).unwrap();
            let err = qpu.execute(&mut qrbs, None).unwrap_err();
            assert!(matches!(
                err,
                QpuError::Backend {
                    source: BackendError::MalformedDistribution { .. },
                    ..
                }
            ));
            assert_eq!(qrbs.precision(q), Some(0.25));
        }
    }

    #[test]
    fn zero_capacity_backend_is_a_config_error() {
        assert!(matches!(
            Qpu::new(ZeroBackend, ExecutionConfig::default()),
            Err(QpuError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn sampled_execution_approximates_exact() {
        let mut qrbs = Qrbs::new();
        let p = qrbs.assert_fact("p", "t", 0.6).unwrap();
        let q = qrbs.assert_fact("q", "t", 0.0).unwrap();
        let r = qrbs.assert_rule(p, q, 1.0).unwrap();
        qrbs.assert_island([r]).unwrap();

        let config = ExecutionConfig {
            trials: 5000,
            ..ExecutionConfig::default()
        };
        let qpu = Qpu::new(StateVectorBackend::default().with_seed(11), config).unwrap();
        qpu.execute(&mut qrbs, None).unwrap();
        assert!((qrbs.precision(q).unwrap() - 0.6).abs() < 0.05);
    }

    #[test]
    fn required_registers_grow_with_the_chain() {
        let mut qrbs = Qrbs::new();
        let a = qrbs.assert_fact("a", "t", 0.5).unwrap();
        let b = qrbs.assert_fact("b", "t", 0.0).unwrap();
        let c = qrbs.assert_fact("c", "t", 0.0).unwrap();
        let r1 = qrbs.assert_rule(a, b, 1.0).unwrap();
        let r2 = qrbs.assert_rule(LeftHandSide::negate(b), c, 1.0).unwrap();
        let short = qrbs.assert_island([r1]).unwrap();
        let long = qrbs.assert_island([r1, r2]).unwrap();

        for strategy in Strategy::ALL {
            let small = required_registers(&qrbs, short, strategy).unwrap();
            let large = required_registers(&qrbs, long, strategy).unwrap();
            assert!(large >= small);
        }
    }
}
