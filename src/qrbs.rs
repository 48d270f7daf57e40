//! The QRBS aggregate: public API for building a rule-based system.
//!
//! A [`Qrbs`] owns the [`WorkingMemory`] (facts) and the graph-side
//! [`InferenceEngine`] (rules and islands) and keeps the references between
//! them consistent: rules may only mention asserted facts, facts in use by a
//! rule cannot be retracted, and rules in use by an island cannot either.

use crate::engine::InferenceEngine;
use crate::error::KnowledgeError;
use crate::id::{FactId, IslandId, RuleId};
use crate::knowledge::{ExprKey, Fact, KnowledgeIsland, KnowledgeResult, LeftHandSide, Rule};
use crate::memory::WorkingMemory;

/// A quantum rule-based system.
///
/// Facts are shared by id between working memory and every rule that
/// mentions them; writing a fact's precision (directly or through execution)
/// is observed by every downstream rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Qrbs {
    memory: WorkingMemory,
    engine: InferenceEngine,
}

impl Qrbs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fact and assert it into working memory.
    pub fn assert_fact(
        &mut self,
        attribute: impl Into<String>,
        value: impl Into<String>,
        precision: f64,
    ) -> KnowledgeResult<FactId> {
        let fact = Fact::new(attribute, value, precision)?;
        Ok(self.memory.assert_fact(fact))
    }

    /// Retract a fact no rule refers to.
    ///
    /// The check is structural: a fact equal in attribute, value and
    /// precision to one used by a rule counts as used.
    pub fn retract_fact(&mut self, id: FactId) -> KnowledgeResult<Fact> {
        let fact = self
            .memory
            .get(id)
            .ok_or(KnowledgeError::UnknownFact { fact: id })?;
        if let Some(rule) = self.rule_using(fact) {
            return Err(KnowledgeError::InUse {
                element: id.to_string(),
                referenced_by: rule.to_string(),
            });
        }
        self.memory
            .retract_fact(id)
            .ok_or(KnowledgeError::UnknownFact { fact: id })
    }

    /// Create a rule and assert it into the inference engine.
    pub fn assert_rule(
        &mut self,
        left_hand_side: impl Into<LeftHandSide>,
        right_hand_side: FactId,
        certainty: f64,
    ) -> KnowledgeResult<RuleId> {
        let left_hand_side = left_hand_side.into();
        for fact in left_hand_side.leaves().chain([right_hand_side]) {
            if !self.memory.contains(fact) {
                return Err(KnowledgeError::UnknownFact { fact });
            }
        }
        let rule = Rule::new(left_hand_side, right_hand_side, certainty)?;
        Ok(self.engine.assert_rule(rule))
    }

    pub fn retract_rule(&mut self, id: RuleId) -> KnowledgeResult<Rule> {
        self.engine.retract_rule(id)
    }

    /// Create a knowledge island from already-asserted, chained rules.
    pub fn assert_island(
        &mut self,
        rules: impl IntoIterator<Item = RuleId>,
    ) -> KnowledgeResult<IslandId> {
        self.engine
            .assert_island(rules.into_iter().collect(), &self.memory)
    }

    pub fn retract_island(&mut self, id: IslandId) -> KnowledgeResult<KnowledgeIsland> {
        self.engine.retract_island(id)
    }

    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.memory.get(id)
    }

    /// Current precision of a fact, if it exists.
    pub fn precision(&self, id: FactId) -> Option<f64> {
        self.memory.get(id).map(Fact::precision)
    }

    /// Overwrite a fact's precision, e.g. to re-seed inputs between runs.
    pub fn set_precision(&mut self, id: FactId, precision: f64) -> KnowledgeResult<()> {
        self.memory
            .get_mut(id)
            .ok_or(KnowledgeError::UnknownFact { fact: id })?
            .set_precision(precision)
    }

    /// Clamped write used by execution write-back.
    pub(crate) fn write_precision(&mut self, id: FactId, precision: f64) -> KnowledgeResult<()> {
        self.memory
            .get_mut(id)
            .ok_or(KnowledgeError::UnknownFact { fact: id })?
            .set_precision_clamped(precision);
        Ok(())
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.engine.rule(id)
    }

    pub fn island(&self, id: IslandId) -> Option<&KnowledgeIsland> {
        self.engine.island(id)
    }

    pub fn memory(&self) -> &WorkingMemory {
        &self.memory
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Facts in assertion order.
    pub fn facts(&self) -> impl Iterator<Item = (FactId, &Fact)> {
        self.memory.iter()
    }

    /// Rules in assertion order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.engine.rules()
    }

    /// Islands in assertion order.
    pub fn islands(&self) -> impl Iterator<Item = (IslandId, &KnowledgeIsland)> {
        self.engine.islands()
    }

    fn rule_using(&self, fact: &Fact) -> Option<RuleId> {
        let needle = ExprKey::fact(fact);
        self.engine
            .rules()
            .find(|(_, rule)| {
                let consequent = self.memory.get(rule.right_hand_side).map(ExprKey::fact);
                consequent.as_ref() == Some(&needle)
                    || rule
                        .left_hand_side
                        .key(&self.memory)
                        .is_some_and(|antecedent| antecedent.contains(&needle))
            })
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_systems_are_equal() {
        assert_eq!(Qrbs::new(), Qrbs::new());
    }

    #[test]
    fn fact_in_use_cannot_be_retracted() {
        let mut qrbs = Qrbs::new();
        let f = qrbs.assert_fact("f", "yes", 0.3).unwrap();
        let g = qrbs.assert_fact("g", "yes", 0.0).unwrap();
        let r = qrbs.assert_rule(f, g, 1.0).unwrap();

        assert!(matches!(
            qrbs.retract_fact(f),
            Err(KnowledgeError::InUse { .. })
        ));
        assert!(matches!(
            qrbs.retract_fact(g),
            Err(KnowledgeError::InUse { .. })
        ));

        qrbs.retract_rule(r).unwrap();
        assert!(qrbs.retract_fact(f).is_ok());
        assert!(qrbs.retract_fact(g).is_ok());
        assert!(qrbs.memory().is_empty());
    }

    #[test]
    fn structural_twin_of_used_fact_is_in_use() {
        let mut qrbs = Qrbs::new();
        let f = qrbs.assert_fact("f", "yes", 0.3).unwrap();
        let twin = qrbs.assert_fact("f", "yes", 0.3).unwrap();
        let g = qrbs.assert_fact("g", "yes", 0.0).unwrap();
        qrbs.assert_rule(LeftHandSide::negate(f), g, 1.0).unwrap();
        assert!(qrbs.retract_fact(twin).is_err());
    }

    #[test]
    fn rule_over_unknown_fact_rejected() {
        let mut qrbs = Qrbs::new();
        let f = qrbs.assert_fact("f", "yes", 0.3).unwrap();
        let ghost = FactId::new(42).unwrap();
        assert!(matches!(
            qrbs.assert_rule(LeftHandSide::and(f, ghost), f, 1.0),
            Err(KnowledgeError::UnknownFact { fact }) if fact == ghost
        ));
        assert!(qrbs.assert_rule(f, ghost, 1.0).is_err());
    }

    #[test]
    fn precision_writes_are_validated_or_clamped() {
        let mut qrbs = Qrbs::new();
        let f = qrbs.assert_fact("f", "yes", 0.3).unwrap();
        assert!(qrbs.set_precision(f, 1.2).is_err());
        qrbs.set_precision(f, 0.7).unwrap();
        assert_eq!(qrbs.precision(f), Some(0.7));
        qrbs.write_precision(f, 1.2).unwrap();
        assert_eq!(qrbs.precision(f), Some(1.0));
    }

    #[test]
    fn systems_with_same_content_are_equal() {
        let build = || {
            let mut qrbs = Qrbs::new();
            let a = qrbs.assert_fact("a", "t", 0.5).unwrap();
            let b = qrbs.assert_fact("b", "t", 0.0).unwrap();
            let r = qrbs.assert_rule(a, b, 0.9).unwrap();
            qrbs.assert_island([r]).unwrap();
            qrbs
        };
        assert_eq!(build(), build());
    }
}
