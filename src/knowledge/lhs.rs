use serde::{Deserialize, Serialize};

use crate::id::FactId;
use crate::memory::WorkingMemory;

use super::Fact;

/// Antecedent expression of a rule.
///
/// A closed composite over fact leaves. Combinators own their children, so
/// a shared sub-expression is simply a structurally equal subtree; the
/// circuit compiler deduplicates those through [`ExprKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeftHandSide {
    Fact(FactId),
    And(Box<LeftHandSide>, Box<LeftHandSide>),
    Or(Box<LeftHandSide>, Box<LeftHandSide>),
    Not(Box<LeftHandSide>),
}

impl LeftHandSide {
    pub fn fact(id: FactId) -> Self {
        LeftHandSide::Fact(id)
    }

    pub fn and(left: impl Into<Self>, right: impl Into<Self>) -> Self {
        LeftHandSide::And(Box::new(left.into()), Box::new(right.into()))
    }

    pub fn or(left: impl Into<Self>, right: impl Into<Self>) -> Self {
        LeftHandSide::Or(Box::new(left.into()), Box::new(right.into()))
    }

    pub fn negate(child: impl Into<Self>) -> Self {
        LeftHandSide::Not(Box::new(child.into()))
    }

    /// In-order iteration over the fact leaves, left to right.
    ///
    /// A fact mentioned twice is yielded twice.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    /// Canonical structural form, resolving every leaf through `memory`.
    ///
    /// Returns `None` if a leaf refers to a fact that is not in memory.
    pub fn key(&self, memory: &WorkingMemory) -> Option<ExprKey> {
        Some(match self {
            LeftHandSide::Fact(id) => ExprKey::fact(memory.get(*id)?),
            LeftHandSide::And(l, r) => {
                ExprKey::And(Box::new(l.key(memory)?), Box::new(r.key(memory)?))
            }
            LeftHandSide::Or(l, r) => {
                ExprKey::Or(Box::new(l.key(memory)?), Box::new(r.key(memory)?))
            }
            LeftHandSide::Not(c) => ExprKey::Not(Box::new(c.key(memory)?)),
        })
    }

    /// Structural equality: same shape, and leaves equal as facts.
    pub fn structurally_eq(&self, other: &LeftHandSide, memory: &WorkingMemory) -> bool {
        match (self.key(memory), other.key(memory)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Whether `needle` is part of this expression (or equal to it),
    /// compared structurally.
    pub fn contains(&self, needle: &LeftHandSide, memory: &WorkingMemory) -> bool {
        match (self.key(memory), needle.key(memory)) {
            (Some(hay), Some(needle)) => hay.contains(&needle),
            _ => false,
        }
    }
}

impl From<FactId> for LeftHandSide {
    fn from(id: FactId) -> Self {
        LeftHandSide::Fact(id)
    }
}

/// In-order leaf iterator returned by [`LeftHandSide::leaves`].
pub struct Leaves<'a> {
    stack: Vec<&'a LeftHandSide>,
}

impl Iterator for Leaves<'_> {
    type Item = FactId;

    fn next(&mut self) -> Option<FactId> {
        while let Some(node) = self.stack.pop() {
            match node {
                LeftHandSide::Fact(id) => return Some(*id),
                LeftHandSide::And(l, r) | LeftHandSide::Or(l, r) => {
                    self.stack.push(r);
                    self.stack.push(l);
                }
                LeftHandSide::Not(c) => self.stack.push(c),
            }
        }
        None
    }
}

/// Canonical structural form of an expression.
///
/// Leaves carry the fact's attribute, value and the bit pattern of its
/// precision, so two keys are equal exactly when the expressions are
/// structurally equal. Used for containment tests and as the memo key
/// while lowering an island.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExprKey {
    Fact {
        attribute: String,
        value: String,
        precision_bits: u64,
    },
    /// A fact whose precision will be rewritten before the circuit runs.
    /// Keyed by id, so it never merges with another fact.
    Pending {
        fact: FactId,
        attribute: String,
        value: String,
    },
    And(Box<ExprKey>, Box<ExprKey>),
    Or(Box<ExprKey>, Box<ExprKey>),
    Not(Box<ExprKey>),
}

impl ExprKey {
    pub fn fact(fact: &Fact) -> Self {
        // -0.0 and 0.0 compare equal as floats; keep them equal here too.
        let precision = if fact.precision() == 0.0 {
            0.0
        } else {
            fact.precision()
        };
        ExprKey::Fact {
            attribute: fact.attribute.clone(),
            value: fact.value.clone(),
            precision_bits: precision.to_bits(),
        }
    }

    pub fn pending(id: FactId, fact: &Fact) -> Self {
        ExprKey::Pending {
            fact: id,
            attribute: fact.attribute.clone(),
            value: fact.value.clone(),
        }
    }

    /// Whether `needle` equals this key or any of its subtrees.
    pub fn contains(&self, needle: &ExprKey) -> bool {
        if self == needle {
            return true;
        }
        match self {
            ExprKey::Fact { .. } | ExprKey::Pending { .. } => false,
            ExprKey::And(l, r) | ExprKey::Or(l, r) => l.contains(needle) || r.contains(needle),
            ExprKey::Not(c) => c.contains(needle),
        }
    }
}

impl std::fmt::Display for ExprKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExprKey::Fact {
                attribute, value, ..
            }
            | ExprKey::Pending {
                attribute, value, ..
            } => write!(f, "{attribute}={value}"),
            ExprKey::And(l, r) => write!(f, "({l} & {r})"),
            ExprKey::Or(l, r) => write!(f, "({l} | {r})"),
            ExprKey::Not(c) => write!(f, "!{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_with(facts: &[(&str, &str, f64)]) -> (WorkingMemory, Vec<FactId>) {
        let mut memory = WorkingMemory::new();
        let ids = facts
            .iter()
            .map(|(a, v, p)| memory.assert_fact(Fact::new(*a, *v, *p).unwrap()))
            .collect();
        (memory, ids)
    }

    #[test]
    fn leaves_are_in_order_and_repeat() {
        let (_, ids) = memory_with(&[("a", "x", 0.1), ("b", "x", 0.2), ("c", "x", 0.3)]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        let expr = LeftHandSide::or(
            LeftHandSide::and(a, LeftHandSide::negate(b)),
            LeftHandSide::and(c, a),
        );
        let leaves: Vec<_> = expr.leaves().collect();
        assert_eq!(leaves, vec![a, b, c, a]);
    }

    #[test]
    fn structurally_equal_facts_are_interchangeable() {
        let (memory, ids) = memory_with(&[("a", "x", 0.5), ("a", "x", 0.5), ("b", "y", 0.5)]);
        let first = LeftHandSide::and(ids[0], ids[2]);
        let twin = LeftHandSide::and(ids[1], ids[2]);
        assert_ne!(first, twin);
        assert!(first.structurally_eq(&twin, &memory));
        assert!(first.contains(&LeftHandSide::fact(ids[1]), &memory));
    }

    #[test]
    fn containment_is_recursive() {
        let (memory, ids) = memory_with(&[("a", "x", 0.1), ("b", "x", 0.2), ("c", "x", 0.3)]);
        let inner = LeftHandSide::or(ids[1], ids[2]);
        let expr = LeftHandSide::negate(LeftHandSide::and(ids[0], inner.clone()));
        assert!(expr.contains(&inner, &memory));
        assert!(expr.contains(&expr, &memory));
        assert!(!inner.contains(&expr, &memory));
        assert!(!expr.contains(&LeftHandSide::and(ids[1], ids[2]), &memory));
    }

    #[test]
    fn dangling_leaf_has_no_key() {
        let (memory, _) = memory_with(&[]);
        let expr = LeftHandSide::fact(FactId::new(99).unwrap());
        assert!(expr.key(&memory).is_none());
        assert!(!expr.structurally_eq(&expr, &memory));
    }

    #[test]
    fn negative_zero_precision_matches_zero() {
        let zero = Fact::new("a", "x", 0.0).unwrap();
        let neg = Fact::new("a", "x", -0.0).unwrap();
        assert_eq!(ExprKey::fact(&zero), ExprKey::fact(&neg));
    }

    #[test]
    fn pending_facts_never_merge() {
        let (memory, ids) = memory_with(&[("q", "t", 0.0), ("q", "t", 0.0)]);
        let (q, twin) = (memory.get(ids[0]).unwrap(), memory.get(ids[1]).unwrap());
        assert_eq!(ExprKey::fact(q), ExprKey::fact(twin));
        assert_ne!(ExprKey::pending(ids[0], q), ExprKey::pending(ids[1], twin));
        assert_ne!(ExprKey::pending(ids[0], q), ExprKey::fact(q));
        assert_eq!(ExprKey::pending(ids[0], q).to_string(), "q=t");
    }

    #[test]
    fn key_display_is_readable() {
        let (memory, ids) = memory_with(&[("a", "x", 0.1), ("b", "y", 0.2)]);
        let expr = LeftHandSide::or(ids[0], LeftHandSide::negate(ids[1]));
        assert_eq!(expr.key(&memory).unwrap().to_string(), "(a=x | !b=y)");
    }
}
