//! Knowledge representation: facts, antecedent expressions, rules and islands.
//!
//! The left hand side of a rule is a closed composite: a [`LeftHandSide`] is
//! either a fact leaf or an AND/OR/NOT combinator over further left hand
//! sides. Leaves refer to facts by [`FactId`]; the facts themselves live in
//! [`WorkingMemory`](crate::memory::WorkingMemory), so a precision written by
//! the execution engine is observed by every rule that mentions the fact.
//!
//! Fact identity is structural. Two facts with the same attribute, value and
//! precision are interchangeable wherever membership is tested, which is what
//! [`ExprKey`] captures.

mod fact;
mod lhs;
mod rule;

pub use fact::Fact;
pub use lhs::{ExprKey, Leaves, LeftHandSide};
pub use rule::{KnowledgeIsland, Rule};

use crate::error::KnowledgeError;

/// Result type for knowledge-graph operations.
pub type KnowledgeResult<T> = std::result::Result<T, KnowledgeError>;
