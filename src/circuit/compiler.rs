//! Island compiler: lowers a knowledge island to a register circuit.
//!
//! Register allocation is fixed up front and fully deterministic:
//!
//! 1. rules are put in dependency order (producers before consumers, ties
//!    broken by position in the island);
//! 2. every fact read by some antecedent but produced by no rule of the
//!    island gets a register, injected from its current precision;
//! 3. every consequent gets a register, left at 0 until a rule writes it;
//! 4. each antecedent is lowered bottom-up, reusing any structurally equal
//!    sub-expression already lowered in this build;
//! 5. each rule gets a certainty register and its implication gate.
//!
//! Precision values are read at compile time and baked into rotation
//! angles, so an island must be compiled after every island it depends on
//! has written its consequents. To size an island before that happens, mark
//! the facts still to be written with [`IslandCompiler::with_pending`]: they
//! are keyed by id instead of by precision, which can only add registers.

use std::collections::BTreeSet;

use crate::error::CompileError;
use crate::id::{FactId, IslandId, RuleId};
use crate::knowledge::{ExprKey, LeftHandSide, Rule};
use crate::memory::WorkingMemory;
use crate::qrbs::Qrbs;

use super::strategy::{GateEncoder, Strategy};
use super::{Circuit, RegisterRole, SymbolTable};

/// Result type for compilation.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Output of compiling one island.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledIsland {
    pub circuit: Circuit,
    pub symbols: SymbolTable,
    /// Rules in the order they were emitted.
    pub order: Vec<RuleId>,
}

impl CompiledIsland {
    pub fn register_count(&self) -> usize {
        self.circuit.register_count()
    }
}

/// Compiles islands of one [`Qrbs`] under one [`Strategy`].
///
/// Compilation only reads the graph, so one compiler can be shared across
/// threads to compile independent islands in parallel.
pub struct IslandCompiler<'a> {
    qrbs: &'a Qrbs,
    encoder: &'static dyn GateEncoder,
    pending: BTreeSet<FactId>,
}

impl<'a> IslandCompiler<'a> {
    pub fn new(qrbs: &'a Qrbs, strategy: Strategy) -> Self {
        Self {
            qrbs,
            encoder: strategy.encoder(),
            pending: BTreeSet::new(),
        }
    }

    /// Facts whose precision will change before the compiled circuit runs.
    ///
    /// Each is kept apart from every other fact, so the register count is
    /// an upper bound for any precision those facts end up with.
    pub fn with_pending(mut self, facts: impl IntoIterator<Item = FactId>) -> Self {
        self.pending.extend(facts);
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.encoder.strategy()
    }

    /// Compile an island asserted on the graph.
    pub fn compile(&self, island: IslandId) -> CompileResult<CompiledIsland> {
        let rules = self
            .qrbs
            .island(island)
            .ok_or(CompileError::UnknownIsland { island })?
            .rules();
        let compiled = self.compile_rules(rules)?;
        tracing::debug!(
            island = %island,
            strategy = %self.strategy(),
            registers = compiled.register_count(),
            instructions = compiled.circuit.len(),
            "compiled island"
        );
        Ok(compiled)
    }

    /// Compile an arbitrary list of asserted rules as if it were an island.
    pub fn compile_rules(&self, rule_ids: &[RuleId]) -> CompileResult<CompiledIsland> {
        let memory = self.qrbs.memory();
        let mut rules: Vec<(RuleId, &Rule)> = Vec::with_capacity(rule_ids.len());
        for &id in rule_ids {
            let rule = self
                .qrbs
                .rule(id)
                .ok_or(CompileError::UnknownRule { rule: id })?;
            rules.push((id, rule));
        }

        let order: Vec<(RuleId, &Rule)> = dependency_order(&rules, memory)
            .into_iter()
            .map(|i| rules[i])
            .collect();

        let mut build = Build {
            memory,
            pending: &self.pending,
            encoder: self.encoder,
            circuit: Circuit::new(0),
            symbols: SymbolTable::default(),
        };

        let mut consequent_keys = Vec::with_capacity(order.len());
        for (_, rule) in &order {
            consequent_keys.push(build.fact_key(rule.right_hand_side)?);
        }

        // Inputs: antecedent facts no rule of the island produces.
        for (_, rule) in &order {
            for fact in rule.left_hand_side.leaves() {
                let key = build.fact_key(fact)?;
                if consequent_keys.contains(&key) || build.symbols.register_of(&key).is_some() {
                    continue;
                }
                let precision = build.precision(fact)?;
                let register = build.symbols.allocate(RegisterRole::Input(key));
                build.encoder.emit_fact(precision, register, &mut build.circuit);
            }
        }

        // Consequents: one register per distinct fact, never initialized.
        for ((_, rule), key) in order.iter().zip(consequent_keys) {
            let register = match build.symbols.register_of(&key) {
                Some(register) => register,
                None => build.symbols.allocate(RegisterRole::Consequent(key)),
            };
            build.symbols.bind_consequent(rule.right_hand_side, register);
        }

        for (id, rule) in &order {
            let (antecedent, _) = build.lower(&rule.left_hand_side)?;
            let certainty = build.symbols.allocate(RegisterRole::Certainty(*id));
            build
                .encoder
                .emit_fact(rule.certainty(), certainty, &mut build.circuit);
            let consequent = build
                .symbols
                .consequent_register(rule.right_hand_side)
                .ok_or(CompileError::UnknownFact {
                    fact: rule.right_hand_side,
                })?;
            build
                .encoder
                .emit_rule(antecedent, certainty, consequent, &mut build.circuit);
        }

        build.circuit.reserve_registers(build.symbols.len());
        Ok(CompiledIsland {
            circuit: build.circuit,
            symbols: build.symbols,
            order: order.into_iter().map(|(id, _)| id).collect(),
        })
    }
}

struct Build<'a> {
    memory: &'a WorkingMemory,
    pending: &'a BTreeSet<FactId>,
    encoder: &'static dyn GateEncoder,
    circuit: Circuit,
    symbols: SymbolTable,
}

impl Build<'_> {
    fn fact_key(&self, id: FactId) -> CompileResult<ExprKey> {
        let fact = self
            .memory
            .get(id)
            .ok_or(CompileError::UnknownFact { fact: id })?;
        Ok(if self.pending.contains(&id) {
            ExprKey::pending(id, fact)
        } else {
            ExprKey::fact(fact)
        })
    }

    fn precision(&self, fact: FactId) -> CompileResult<f64> {
        self.memory
            .get(fact)
            .map(|f| f.precision())
            .ok_or(CompileError::UnknownFact { fact })
    }

    /// Lower an expression, returning its register and canonical key.
    fn lower(&mut self, lhs: &LeftHandSide) -> CompileResult<(usize, ExprKey)> {
        match lhs {
            LeftHandSide::Fact(fact) => {
                let key = self.fact_key(*fact)?;
                if let Some(register) = self.symbols.register_of(&key) {
                    return Ok((register, key));
                }
                let precision = self.precision(*fact)?;
                let register = self.symbols.allocate(RegisterRole::Input(key.clone()));
                self.encoder.emit_fact(precision, register, &mut self.circuit);
                Ok((register, key))
            }
            LeftHandSide::And(l, r) | LeftHandSide::Or(l, r) => {
                let (left, left_key) = self.lower(l)?;
                let (right, right_key) = self.lower(r)?;
                let is_and = matches!(lhs, LeftHandSide::And(..));
                let key = if is_and {
                    ExprKey::And(Box::new(left_key), Box::new(right_key))
                } else {
                    ExprKey::Or(Box::new(left_key), Box::new(right_key))
                };
                if let Some(register) = self.symbols.register_of(&key) {
                    return Ok((register, key));
                }
                let out = self.symbols.allocate(RegisterRole::Combinator(key.clone()));
                if is_and {
                    self.encoder.emit_and(left, right, out, &mut self.circuit);
                } else {
                    self.encoder.emit_or(left, right, out, &mut self.circuit);
                }
                Ok((out, key))
            }
            LeftHandSide::Not(c) => {
                let (input, child_key) = self.lower(c)?;
                let key = ExprKey::Not(Box::new(child_key));
                if let Some(register) = self.symbols.register_of(&key) {
                    return Ok((register, key));
                }
                let out = self.symbols.allocate(RegisterRole::Combinator(key.clone()));
                self.encoder.emit_not(input, out, &mut self.circuit);
                Ok((out, key))
            }
        }
    }
}

/// Stable dependency order of `rules`, as indices into the slice.
///
/// A rule is emitted once every other rule it depends on (whose consequent
/// appears in its antecedent) has been emitted; among ready rules the
/// earliest listed goes first. Rules caught in a dependency cycle are
/// appended in listed order.
pub fn dependency_order(rules: &[(RuleId, &Rule)], memory: &WorkingMemory) -> Vec<usize> {
    let n = rules.len();
    let depends: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i && rules[i].1.depends_on(rules[j].1, memory))
                .collect()
        })
        .collect();

    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);
    while order.len() < n {
        let ready = (0..n).find(|&i| !emitted[i] && depends[i].iter().all(|&j| emitted[j]));
        let next = match ready {
            Some(i) => i,
            None => {
                let Some(i) = (0..n).find(|&i| !emitted[i]) else {
                    break;
                };
                tracing::warn!(rule = %rules[i].0, "dependency cycle in island, keeping listed order");
                i
            }
        };
        emitted[next] = true;
        order.push(next);
    }
    order
}
