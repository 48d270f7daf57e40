//! Working memory: the arena of asserted facts.

use std::collections::BTreeMap;

use crate::id::{FactId, IdAllocator};
use crate::knowledge::Fact;

/// Owns every asserted [`Fact`], keyed by id.
///
/// Ids are allocated monotonically, so iteration order is assertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingMemory {
    facts: BTreeMap<FactId, Fact>,
    ids: IdAllocator,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact and return its id.
    pub fn assert_fact(&mut self, fact: Fact) -> FactId {
        let id = self.ids.next_id();
        self.facts.insert(id, fact);
        id
    }

    /// Remove a fact, returning it if it was present.
    ///
    /// This does not check references; the [`Qrbs`](crate::qrbs::Qrbs)
    /// aggregate guards retraction against rules still using the fact.
    pub fn retract_fact(&mut self, id: FactId) -> Option<Fact> {
        self.facts.remove(&id)
    }

    pub fn get(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(&id)
    }

    pub fn get_mut(&mut self, id: FactId) -> Option<&mut Fact> {
        self.facts.get_mut(&id)
    }

    pub fn contains(&self, id: FactId) -> bool {
        self.facts.contains_key(&id)
    }

    /// Facts in assertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FactId, &Fact)> {
        self.facts.iter().map(|(id, fact)| (*id, fact))
    }

    /// First fact (in assertion order) structurally equal to `fact`.
    pub fn find(&self, fact: &Fact) -> Option<FactId> {
        self.iter().find(|(_, f)| *f == fact).map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut memory = WorkingMemory::new();
        let b = memory.assert_fact(Fact::new("b", "x", 0.2).unwrap());
        let a = memory.assert_fact(Fact::new("a", "x", 0.1).unwrap());
        let order: Vec<_> = memory.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn retract_removes_and_ids_are_not_reused() {
        let mut memory = WorkingMemory::new();
        let a = memory.assert_fact(Fact::new("a", "x", 0.1).unwrap());
        assert!(memory.retract_fact(a).is_some());
        assert!(memory.retract_fact(a).is_none());
        let b = memory.assert_fact(Fact::new("a", "x", 0.1).unwrap());
        assert_ne!(a, b);
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn find_is_structural() {
        let mut memory = WorkingMemory::new();
        let a = memory.assert_fact(Fact::new("a", "x", 0.1).unwrap());
        memory.assert_fact(Fact::new("a", "x", 0.1).unwrap());
        assert_eq!(memory.find(&Fact::new("a", "x", 0.1).unwrap()), Some(a));
        assert_eq!(memory.find(&Fact::new("a", "x", 0.2).unwrap()), None);
    }

    #[test]
    fn memories_compare_by_content() {
        let mut left = WorkingMemory::new();
        let mut right = WorkingMemory::new();
        assert_eq!(left, right);
        left.assert_fact(Fact::new("a", "x", 0.1).unwrap());
        assert_ne!(left, right);
        right.assert_fact(Fact::new("a", "x", 0.1).unwrap());
        assert_eq!(left, right);
    }
}
