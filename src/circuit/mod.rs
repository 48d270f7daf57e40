//! Register circuits: the instruction set the knowledge graph compiles to.
//!
//! A [`Circuit`] is an ordered list of [`Gate`]s over `register_count`
//! two-state registers, all starting in state 0. The [`compiler`] lowers a
//! knowledge island into a circuit plus a [`SymbolTable`] recording which
//! register holds which fact, sub-expression or certainty weight; the
//! [`strategy`] decides how continuous precision values become rotations.

pub mod compiler;
pub mod strategy;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::id::{FactId, RuleId};
use crate::knowledge::ExprKey;

pub use compiler::{CompileResult, CompiledIsland, IslandCompiler, dependency_order};
pub use strategy::{GateEncoder, ParseStrategyError, Strategy};

/// One instruction of a register circuit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum Gate {
    /// Rotation about the Y axis by `theta` radians.
    Ry { target: usize, theta: f64 },
    /// Rotation about the X axis by `theta` radians.
    Rx { target: usize, theta: f64 },
    /// Real reflection `[[cos t, sin t], [sin t, -cos t]]`.
    Reflect { target: usize, theta: f64 },
    /// Bit flip.
    X { target: usize },
    /// Flip `target` when `control` reads 1.
    Cnot { control: usize, target: usize },
    /// Flip `target` when both controls read 1.
    Toffoli { controls: [usize; 2], target: usize },
}

impl Gate {
    /// Largest register index the gate touches.
    pub fn max_register(&self) -> usize {
        match *self {
            Gate::Ry { target, .. }
            | Gate::Rx { target, .. }
            | Gate::Reflect { target, .. }
            | Gate::X { target } => target,
            Gate::Cnot { control, target } => control.max(target),
            Gate::Toffoli { controls, target } => controls[0].max(controls[1]).max(target),
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gate::Ry { target, theta } => write!(f, "ry({theta:.6}) r{target}"),
            Gate::Rx { target, theta } => write!(f, "rx({theta:.6}) r{target}"),
            Gate::Reflect { target, theta } => write!(f, "m({theta:.6}) r{target}"),
            Gate::X { target } => write!(f, "x r{target}"),
            Gate::Cnot { control, target } => write!(f, "cnot r{control}, r{target}"),
            Gate::Toffoli { controls, target } => {
                write!(f, "ccnot r{}, r{}, r{target}", controls[0], controls[1])
            }
        }
    }
}

/// An instruction sequence over a fixed number of registers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Circuit {
    instructions: Vec<Gate>,
    register_count: usize,
}

impl Circuit {
    pub fn new(register_count: usize) -> Self {
        Self {
            instructions: Vec::new(),
            register_count,
        }
    }

    pub fn push(&mut self, gate: Gate) {
        self.register_count = self.register_count.max(gate.max_register() + 1);
        self.instructions.push(gate);
    }

    pub fn instructions(&self) -> &[Gate] {
        &self.instructions
    }

    pub fn register_count(&self) -> usize {
        self.register_count
    }

    /// Widen the circuit to at least `count` registers.
    pub fn reserve_registers(&mut self, count: usize) {
        self.register_count = self.register_count.max(count);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl std::fmt::Display for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "registers: {}", self.register_count)?;
        for (i, gate) in self.instructions.iter().enumerate() {
            writeln!(f, "  {i:>4}: {gate}")?;
        }
        Ok(())
    }
}

/// What a register holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterRole {
    /// A fact read from working memory and injected from its precision.
    Input(ExprKey),
    /// A rule consequent; its value comes only from simulation.
    Consequent(ExprKey),
    /// Output of an AND/OR/NOT combinator.
    Combinator(ExprKey),
    /// Certainty weight of a rule.
    Certainty(RuleId),
}

impl std::fmt::Display for RegisterRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterRole::Input(key) => write!(f, "input {key}"),
            RegisterRole::Consequent(key) => write!(f, "consequent {key}"),
            RegisterRole::Combinator(key) => write!(f, "expr {key}"),
            RegisterRole::Certainty(rule) => write!(f, "certainty of {rule}"),
        }
    }
}

/// Mapping between graph nodes and register indices for one compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    roles: Vec<RegisterRole>,
    expressions: HashMap<ExprKey, usize>,
    consequents: BTreeMap<FactId, usize>,
    certainties: BTreeMap<RuleId, usize>,
}

impl SymbolTable {
    /// Allocate the next register for `role`.
    pub(crate) fn allocate(&mut self, role: RegisterRole) -> usize {
        let register = self.roles.len();
        match &role {
            RegisterRole::Input(key)
            | RegisterRole::Consequent(key)
            | RegisterRole::Combinator(key) => {
                self.expressions.insert(key.clone(), register);
            }
            RegisterRole::Certainty(rule) => {
                self.certainties.insert(*rule, register);
            }
        }
        self.roles.push(role);
        register
    }

    pub(crate) fn bind_consequent(&mut self, fact: FactId, register: usize) {
        self.consequents.insert(fact, register);
    }

    /// Register holding a structurally-equal expression or fact.
    pub fn register_of(&self, key: &ExprKey) -> Option<usize> {
        self.expressions.get(key).copied()
    }

    pub fn consequent_register(&self, fact: FactId) -> Option<usize> {
        self.consequents.get(&fact).copied()
    }

    pub fn certainty_register(&self, rule: RuleId) -> Option<usize> {
        self.certainties.get(&rule).copied()
    }

    /// Consequent facts and their registers, ordered by fact id.
    pub fn consequents(&self) -> impl Iterator<Item = (FactId, usize)> {
        self.consequents.iter().map(|(fact, reg)| (*fact, *reg))
    }

    pub fn role(&self, register: usize) -> Option<&RegisterRole> {
        self.roles.get(register)
    }

    /// Registers with their roles, in allocation order.
    pub fn roles(&self) -> impl Iterator<Item = (usize, &RegisterRole)> {
        self.roles.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl std::fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (register, role) in self.roles() {
            writeln!(f, "  r{register:<4} {role}")?;
        }
        Ok(())
    }
}
