use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;
use crate::id::{FactId, RuleId};
use crate::memory::WorkingMemory;

use super::{ExprKey, KnowledgeResult, LeftHandSide};

/// Weighted implication from an antecedent expression to a consequent fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Antecedent (precedent) expression.
    pub left_hand_side: LeftHandSide,
    /// Consequent fact.
    pub right_hand_side: FactId,
    certainty: f64,
}

impl Rule {
    /// Create a rule, rejecting certainties outside `[0, 1]` (and NaN).
    pub fn new(
        left_hand_side: LeftHandSide,
        right_hand_side: FactId,
        certainty: f64,
    ) -> KnowledgeResult<Self> {
        if !(0.0..=1.0).contains(&certainty) {
            return Err(KnowledgeError::InvalidCertainty { value: certainty });
        }
        Ok(Self {
            left_hand_side,
            right_hand_side,
            certainty,
        })
    }

    /// Certainty weight of the implication, in `[0, 1]`.
    pub fn certainty(&self) -> f64 {
        self.certainty
    }

    /// Whether this rule consumes what `other` produces: `other`'s consequent
    /// appears (structurally) in this rule's antecedent.
    ///
    /// When true, `other` has to be evaluated before `self`.
    pub fn depends_on(&self, other: &Rule, memory: &WorkingMemory) -> bool {
        let (Some(consequent), Some(antecedent)) = (
            memory.get(other.right_hand_side).map(ExprKey::fact),
            self.left_hand_side.key(memory),
        ) else {
            return false;
        };
        antecedent.contains(&consequent)
    }

    /// Whether the two rules are linked in either direction.
    pub fn is_linked(&self, other: &Rule, memory: &WorkingMemory) -> bool {
        self.depends_on(other, memory) || other.depends_on(self, memory)
    }
}

/// An ordered group of chained rules reasoning toward one hypothesis.
///
/// Chaining is validated when the island is asserted into the
/// [`InferenceEngine`](crate::engine::InferenceEngine); a bare value of this
/// type carries no guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeIsland {
    rules: Vec<RuleId>,
}

impl KnowledgeIsland {
    pub fn new(rules: Vec<RuleId>) -> Self {
        Self { rules }
    }

    /// Rules in the order they were listed.
    pub fn rules(&self) -> &[RuleId] {
        &self.rules
    }

    pub fn contains(&self, rule: RuleId) -> bool {
        self.rules.contains(&rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
