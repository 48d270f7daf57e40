//! Rich diagnostic error types for the qrbs engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::id::{FactId, IslandId, RuleId};

/// Top-level error type for the qrbs engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum QrbsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Qpu(#[from] QpuError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),
}

// ---------------------------------------------------------------------------
// Knowledge graph errors
// ---------------------------------------------------------------------------

/// Why a knowledge island was rejected at assertion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IslandViolation {
    /// The island has no rules.
    Empty,
    /// A listed rule was never asserted into the engine.
    UnassertedRule(RuleId),
    /// The rules split into more than one dependency-connected group.
    NotChained { components: usize },
}

impl std::fmt::Display for IslandViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IslandViolation::Empty => write!(f, "the island has no rules"),
            IslandViolation::UnassertedRule(rule) => {
                write!(f, "{rule} is not asserted in the inference engine")
            }
            IslandViolation::NotChained { components } => write!(
                f,
                "the rules are not chained ({components} disconnected groups)"
            ),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum KnowledgeError {
    #[error("{element} cannot be retracted: it is referenced by {referenced_by}")]
    #[diagnostic(
        code(qrbs::knowledge::in_use),
        help(
            "Retract the referencing element first. Facts are held by rules, \
             and rules are held by knowledge islands."
        )
    )]
    InUse {
        element: String,
        referenced_by: String,
    },

    #[error("invalid knowledge island: {reason}")]
    #[diagnostic(
        code(qrbs::knowledge::invalid_island),
        help(
            "Every rule of an island must be asserted first, and the rules must \
             form one chain: each rule's consequent or antecedent has to link to \
             another rule of the island."
        )
    )]
    InvalidIsland { reason: IslandViolation },

    #[error("unknown fact {fact}")]
    #[diagnostic(
        code(qrbs::knowledge::unknown_fact),
        help("Assert the fact into working memory before referencing it.")
    )]
    UnknownFact { fact: FactId },

    #[error("unknown rule {rule}")]
    #[diagnostic(
        code(qrbs::knowledge::unknown_rule),
        help("Assert the rule into the inference engine before referencing it.")
    )]
    UnknownRule { rule: RuleId },

    #[error("unknown knowledge island {island}")]
    #[diagnostic(
        code(qrbs::knowledge::unknown_island),
        help("The island was never asserted or has already been retracted.")
    )]
    UnknownIsland { island: IslandId },

    #[error("precision {value} is outside [0, 1]")]
    #[diagnostic(
        code(qrbs::knowledge::invalid_precision),
        help("A fact's precision is a probability-like degree and must lie in [0, 1].")
    )]
    InvalidPrecision { value: f64 },

    #[error("certainty {value} is outside [0, 1]")]
    #[diagnostic(
        code(qrbs::knowledge::invalid_certainty),
        help("A rule's certainty weight must lie in [0, 1].")
    )]
    InvalidCertainty { value: f64 },
}

// ---------------------------------------------------------------------------
// Circuit compilation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error("cannot compile unknown island {island}")]
    #[diagnostic(
        code(qrbs::compile::unknown_island),
        help("Only islands asserted on the graph being compiled can be lowered.")
    )]
    UnknownIsland { island: IslandId },

    #[error("island references unknown rule {rule}")]
    #[diagnostic(
        code(qrbs::compile::unknown_rule),
        help("The island refers to a rule that no longer exists in the engine.")
    )]
    UnknownRule { rule: RuleId },

    #[error("rule references unknown fact {fact}")]
    #[diagnostic(
        code(qrbs::compile::unknown_fact),
        help("The rule refers to a fact that no longer exists in working memory.")
    )]
    UnknownFact { fact: FactId },
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum BackendError {
    #[error("backend submission failed: {message}")]
    #[diagnostic(
        code(qrbs::backend::submission),
        help(
            "The simulation backend could not run the circuit. The core does not \
             retry; resubmit from the caller if the failure is transient."
        )
    )]
    Submission { message: String },

    #[error("backend returned a malformed distribution: {message}")]
    #[diagnostic(
        code(qrbs::backend::malformed),
        help(
            "Outcomes must index one of the 2^n basis states and carry finite, \
             non-negative probabilities summing to at most 1."
        )
    )]
    MalformedDistribution { message: String },

    #[error("circuit needs {required} registers, backend supports {limit}")]
    #[diagnostic(
        code(qrbs::backend::too_many_registers),
        help("Run the capacity gate (`evaluate`) before submitting circuits.")
    )]
    TooManyRegisters { required: usize, limit: usize },
}

// ---------------------------------------------------------------------------
// Execution errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QpuError {
    #[error("knowledge island {island} is not part of this graph")]
    #[diagnostic(
        code(qrbs::qpu::unknown_island),
        help("Pass only islands returned by `assert_island` on the same graph.")
    )]
    UnknownIsland { island: IslandId },

    #[error("{island} needs {required} registers but the backend supports {limit}")]
    #[diagnostic(
        code(qrbs::qpu::capacity_exceeded),
        help(
            "Split the island into smaller chained islands, or run it on a \
             backend with more registers."
        )
    )]
    CapacityExceeded {
        island: IslandId,
        required: usize,
        limit: usize,
    },

    #[error("invalid execution configuration: {message}")]
    #[diagnostic(code(qrbs::qpu::invalid_config), help("Check the execution parameters. {message}"))]
    InvalidConfig { message: String },

    #[error("failed to compile {island}")]
    #[diagnostic(code(qrbs::qpu::compile))]
    Compile {
        island: IslandId,
        #[source]
        source: CompileError,
    },

    #[error("backend failed while executing {island}")]
    #[diagnostic(
        code(qrbs::qpu::backend),
        help("No consequent of this island was updated.")
    )]
    Backend {
        island: IslandId,
        #[source]
        source: BackendError,
    },
}

/// Convenience alias for functions returning qrbs results.
pub type QrbsResult<T> = std::result::Result<T, QrbsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_error_converts_to_qrbs_error() {
        let err = KnowledgeError::InvalidIsland {
            reason: IslandViolation::Empty,
        };
        let top: QrbsError = err.into();
        assert!(matches!(
            top,
            QrbsError::Knowledge(KnowledgeError::InvalidIsland { .. })
        ));
    }

    #[test]
    fn capacity_message_carries_counts() {
        let err = QpuError::CapacityExceeded {
            island: IslandId::new(2).unwrap(),
            required: 31,
            limit: 20,
        };
        let msg = format!("{err}");
        assert!(msg.contains("island:2"));
        assert!(msg.contains("31"));
        assert!(msg.contains("20"));
    }

    #[test]
    fn chaining_violation_is_descriptive() {
        let err = KnowledgeError::InvalidIsland {
            reason: IslandViolation::NotChained { components: 3 },
        };
        assert!(format!("{err}").contains("3 disconnected groups"));
    }

    #[test]
    fn backend_error_keeps_source_chain() {
        let err = QpuError::Backend {
            island: IslandId::new(1).unwrap(),
            source: BackendError::Submission {
                message: "timeout".into(),
            },
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("backend submission failed: timeout"));
    }
}
