//! Graph-side inference engine: the registry of rules and knowledge islands.
//!
//! The engine owns every asserted [`Rule`] and [`KnowledgeIsland`] and enforces
//! the structural invariants between them: an island may only list asserted
//! rules, those rules must form a single chain, and a rule cannot be retracted
//! while an island still lists it. Executing islands is the job of
//! [`qpu`](crate::qpu).

use std::collections::BTreeMap;

use petgraph::algo::connected_components;
use petgraph::graph::UnGraph;

use crate::error::{IslandViolation, KnowledgeError};
use crate::id::{IdAllocator, IslandId, RuleId};
use crate::knowledge::{KnowledgeIsland, KnowledgeResult, Rule};
use crate::memory::WorkingMemory;

/// Owns the asserted rules and knowledge islands, in assertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceEngine {
    rules: BTreeMap<RuleId, Rule>,
    islands: BTreeMap<IslandId, KnowledgeIsland>,
    rule_ids: IdAllocator,
    island_ids: IdAllocator,
}

impl InferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. Fact references are validated by the caller.
    pub fn assert_rule(&mut self, rule: Rule) -> RuleId {
        let id = self.rule_ids.next_id();
        self.rules.insert(id, rule);
        id
    }

    /// Remove a rule that no island lists.
    pub fn retract_rule(&mut self, id: RuleId) -> KnowledgeResult<Rule> {
        if let Some((island, _)) = self.islands.iter().find(|(_, i)| i.contains(id)) {
            return Err(KnowledgeError::InUse {
                element: id.to_string(),
                referenced_by: island.to_string(),
            });
        }
        self.rules
            .remove(&id)
            .ok_or(KnowledgeError::UnknownRule { rule: id })
    }

    /// Register an island after checking membership and chaining.
    ///
    /// Repeated rule ids are collapsed to their first occurrence.
    pub fn assert_island(
        &mut self,
        rules: Vec<RuleId>,
        memory: &WorkingMemory,
    ) -> KnowledgeResult<IslandId> {
        let mut unique: Vec<RuleId> = Vec::with_capacity(rules.len());
        for rule in rules {
            if !unique.contains(&rule) {
                unique.push(rule);
            }
        }

        self.check_chained(&unique, memory)
            .map_err(|reason| KnowledgeError::InvalidIsland { reason })?;

        let id = self.island_ids.next_id();
        tracing::debug!(island = %id, rules = unique.len(), "asserted knowledge island");
        self.islands.insert(id, KnowledgeIsland::new(unique));
        Ok(id)
    }

    pub fn retract_island(&mut self, id: IslandId) -> KnowledgeResult<KnowledgeIsland> {
        self.islands
            .remove(&id)
            .ok_or(KnowledgeError::UnknownIsland { island: id })
    }

    /// Membership and connectivity check for a prospective island.
    ///
    /// Two rules are linked when one's consequent appears in the other's
    /// antecedent. The island is chained when the linked-rules graph is
    /// connected, independent of the order the rules are listed in.
    pub fn check_chained(
        &self,
        rules: &[RuleId],
        memory: &WorkingMemory,
    ) -> Result<(), IslandViolation> {
        if rules.is_empty() {
            return Err(IslandViolation::Empty);
        }

        let mut resolved: Vec<&Rule> = Vec::with_capacity(rules.len());
        for id in rules {
            let rule = self
                .rules
                .get(id)
                .ok_or(IslandViolation::UnassertedRule(*id))?;
            resolved.push(rule);
        }

        let mut graph: UnGraph<RuleId, ()> = UnGraph::new_undirected();
        let nodes: Vec<_> = rules.iter().map(|id| graph.add_node(*id)).collect();
        for i in 0..resolved.len() {
            for j in (i + 1)..resolved.len() {
                if resolved[i].is_linked(resolved[j], memory) {
                    graph.add_edge(nodes[i], nodes[j], ());
                }
            }
        }

        let components = connected_components(&graph);
        tracing::debug!(rules = rules.len(), components, "checked island chaining");
        if components > 1 {
            return Err(IslandViolation::NotChained { components });
        }
        Ok(())
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    pub fn island(&self, id: IslandId) -> Option<&KnowledgeIsland> {
        self.islands.get(&id)
    }

    /// Rules in assertion order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().map(|(id, rule)| (*id, rule))
    }

    /// Islands in assertion order.
    pub fn islands(&self) -> impl Iterator<Item = (IslandId, &KnowledgeIsland)> {
        self.islands.iter().map(|(id, island)| (*id, island))
    }

    /// Ids of islands in assertion order.
    pub fn island_ids(&self) -> Vec<IslandId> {
        self.islands.keys().copied().collect()
    }

    pub fn island_count(&self) -> usize {
        self.islands.len()
    }
}
