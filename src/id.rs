//! Identifier types for knowledge elements.
//!
//! Facts, rules and knowledge islands live in arenas owned by the [`Qrbs`]
//! aggregate and are referenced everywhere else by id. Every id wraps a
//! `NonZeroU64` so that `Option<FactId>` costs nothing extra, and ids are
//! handed out by an [`IdAllocator`] in strictly increasing order, which makes
//! id order equal to assertion order.
//!
//! [`Qrbs`]: crate::qrbs::Qrbs

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Create an id from a raw `u64`. Returns `None` for zero.
            pub fn new(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map($name)
            }

            /// Get the underlying `u64` value.
            pub fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl From<NonZeroU64> for $name {
            fn from(raw: NonZeroU64) -> Self {
                $name(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Fact`](crate::knowledge::Fact) in working memory.
    FactId,
    "fact"
);
define_id!(
    /// Identifier of a [`Rule`](crate::knowledge::Rule) in the inference engine.
    RuleId,
    "rule"
);
define_id!(
    /// Identifier of a [`KnowledgeIsland`](crate::knowledge::KnowledgeIsland).
    IslandId,
    "island"
);

/// Monotonic id allocator starting at 1.
///
/// Single-owner counterpart of a shared atomic allocator: the containers that
/// use it are mutated through `&mut self` anyway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: NonZeroU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: NonZeroU64::MIN,
        }
    }

    /// Allocate the next id.
    ///
    /// Saturates at `u64::MAX`; exhausting 2^64 ids is not a practical concern.
    pub fn next_id<T: From<NonZeroU64>>(&mut self) -> T {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        T::from(id)
    }

    /// Return the next raw id that *would* be allocated, without consuming it.
    pub fn peek_next(&self) -> u64 {
        self.next.get()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<FactId>>(),
            std::mem::size_of::<FactId>()
        );
    }

    #[test]
    fn zero_is_not_an_id() {
        assert!(RuleId::new(0).is_none());
        assert_eq!(RuleId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn allocator_produces_sequential_ids() {
        let mut alloc = IdAllocator::new();
        let a: FactId = alloc.next_id();
        let b: FactId = alloc.next_id();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert_eq!(alloc.peek_next(), 3);
        assert!(a < b);
    }

    #[test]
    fn display_carries_kind_prefix() {
        assert_eq!(FactId::new(3).unwrap().to_string(), "fact:3");
        assert_eq!(IslandId::new(1).unwrap().to_string(), "island:1");
    }
}
