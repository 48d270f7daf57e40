//! Knowledge-base documents.
//!
//! A [`KnowledgeBase`] describes facts, rules and islands by name, in TOML or
//! JSON (chosen by file extension):
//!
//! ```toml
//! [[facts]]
//! name = "tall"
//! attribute = "height"
//! value = "tall"
//! membership = "0/170-1/190"
//! input = 185.0
//!
//! [[facts]]
//! name = "scores"
//! precision = 0.0
//!
//! [[rules]]
//! name = "tall_scores"
//! when = "tall & !tired"
//! then = "scores"
//! certainty = 0.9
//!
//! [[islands]]
//! name = "scoring"
//! rules = ["tall_scores"]
//! ```
//!
//! [`KnowledgeBase::build`] asserts everything, in document order, into a
//! fresh [`Qrbs`].

pub mod expr;

use std::collections::BTreeMap;
use std::path::Path;

use miette::{Diagnostic, SourceSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::KnowledgeError;
use crate::id::{FactId, IslandId, RuleId};
use crate::membership::PiecewiseLinear;
use crate::qrbs::Qrbs;

/// Errors from loading or building a knowledge-base document.
#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error("failed to read knowledge base: {path}")]
    #[diagnostic(code(qrbs::document::read), help("Ensure the file exists and is readable."))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse knowledge base: {path}")]
    #[diagnostic(code(qrbs::document::parse), help("{message}"))]
    Parse { path: String, message: String },

    #[error("unsupported knowledge-base format: {path}")]
    #[diagnostic(
        code(qrbs::document::format),
        help("Use a .toml or .json file.")
    )]
    UnsupportedFormat { path: String },

    #[error("duplicate {kind} name \"{name}\"")]
    #[diagnostic(code(qrbs::document::duplicate), help("Names must be unique per section."))]
    DuplicateName { kind: &'static str, name: String },

    #[error("{referenced_by} refers to unknown {kind} \"{name}\"")]
    #[diagnostic(
        code(qrbs::document::unknown_name),
        help("Declare the {kind} before referring to it by name.")
    )]
    UnknownName {
        kind: &'static str,
        name: String,
        referenced_by: String,
    },

    #[error("fact \"{fact}\" has an invalid precision source: {message}")]
    #[diagnostic(
        code(qrbs::document::precision),
        help("Give either `precision`, or `membership` together with `input`.")
    )]
    PrecisionSource { fact: String, message: String },

    #[error("invalid expression in rule \"{rule}\"")]
    #[diagnostic(
        code(qrbs::document::expression),
        help("Combine fact names with &, | and !, grouping with parentheses.")
    )]
    Expression {
        rule: String,
        message: String,
        #[source_code]
        src: String,
        #[label("{message}")]
        span: SourceSpan,
    },

    #[error("rule \"{rule}\" refers to unknown fact \"{name}\"")]
    #[diagnostic(
        code(qrbs::document::unknown_fact),
        help("Declare the fact in the [[facts]] section.")
    )]
    UnknownFact {
        rule: String,
        name: String,
        #[source_code]
        src: String,
        #[label("not a declared fact")]
        span: SourceSpan,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Knowledge(#[from] KnowledgeError),
}

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// A fact declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSpec {
    pub name: String,
    /// Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default = "default_value")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership: Option<PiecewiseLinear>,
    /// Crisp measurement fed through `membership`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<f64>,
}

fn default_value() -> String {
    "true".into()
}

fn default_certainty() -> f64 {
    1.0
}

impl FactSpec {
    /// Initial precision: explicit, derived from membership, or 0.
    pub fn initial_precision(&self) -> DocumentResult<f64> {
        let invalid = |message: &str| DocumentError::PrecisionSource {
            fact: self.name.clone(),
            message: message.to_string(),
        };
        match (self.precision, &self.membership, self.input) {
            (Some(_), Some(_), _) => Err(invalid("both `precision` and `membership` are set")),
            (Some(p), None, None) => Ok(p),
            (Some(_), None, Some(_)) => Err(invalid("`input` requires `membership`")),
            (None, Some(f), Some(x)) => Ok(f.degree(x)),
            (None, Some(_), None) => Err(invalid("`membership` requires `input`")),
            (None, None, Some(_)) => Err(invalid("`input` requires `membership`")),
            (None, None, None) => Ok(0.0),
        }
    }
}

/// A rule declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    /// Antecedent expression over fact names.
    pub when: String,
    /// Consequent fact name.
    pub then: String,
    #[serde(default = "default_certainty")]
    pub certainty: f64,
}

/// An island declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandSpec {
    pub name: String,
    pub rules: Vec<String>,
}

/// A named knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub facts: Vec<FactSpec>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub islands: Vec<IslandSpec>,
}

/// A built knowledge base and its name tables.
#[derive(Debug, Clone)]
pub struct Built {
    pub qrbs: Qrbs,
    pub facts: BTreeMap<String, FactId>,
    pub rules: BTreeMap<String, RuleId>,
    pub islands: BTreeMap<String, IslandId>,
}

impl Built {
    pub fn fact_name(&self, id: FactId) -> Option<&str> {
        self.facts
            .iter()
            .find(|(_, f)| **f == id)
            .map(|(n, _)| n.as_str())
    }

    pub fn island_name(&self, id: IslandId) -> Option<&str> {
        self.islands
            .iter()
            .find(|(_, i)| **i == id)
            .map(|(n, _)| n.as_str())
    }
}

enum Format {
    Toml,
    Json,
}

impl KnowledgeBase {
    /// Load from a `.toml` or `.json` file.
    pub fn load(path: &Path) -> DocumentResult<Self> {
        let display = path.display().to_string();
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Format::Toml,
            Some("json") => Format::Json,
            _ => return Err(DocumentError::UnsupportedFormat { path: display }),
        };
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
            path: display.clone(),
            source: e,
        })?;
        match format {
            Format::Toml => Self::from_toml(&content),
            Format::Json => Self::from_json(&content),
        }
        .map_err(|message| DocumentError::Parse {
            path: display,
            message,
        })
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// Assert every fact, rule and island into a fresh graph.
    pub fn build(&self) -> DocumentResult<Built> {
        let mut qrbs = Qrbs::new();

        let mut facts = BTreeMap::new();
        for spec in &self.facts {
            let precision = spec.initial_precision()?;
            let attribute = spec.attribute.clone().unwrap_or_else(|| spec.name.clone());
            let id = qrbs.assert_fact(attribute, spec.value.clone(), precision)?;
            if facts.insert(spec.name.clone(), id).is_some() {
                return Err(DocumentError::DuplicateName {
                    kind: "fact",
                    name: spec.name.clone(),
                });
            }
        }

        let mut rules = BTreeMap::new();
        for spec in &self.rules {
            let parsed = expr::parse(&spec.when).map_err(|e| DocumentError::Expression {
                rule: spec.name.clone(),
                message: e.message,
                src: spec.when.clone(),
                span: (e.offset, e.len).into(),
            })?;
            let lookup = |name: &str| facts.get(name).copied();
            let lhs = parsed
                .resolve(&lookup)
                .map_err(|(name, offset)| DocumentError::UnknownFact {
                    rule: spec.name.clone(),
                    src: spec.when.clone(),
                    span: (offset, name.len()).into(),
                    name,
                })?;
            let then = lookup(&spec.then).ok_or_else(|| DocumentError::UnknownName {
                kind: "fact",
                name: spec.then.clone(),
                referenced_by: format!("rule \"{}\"", spec.name),
            })?;
            let id = qrbs.assert_rule(lhs, then, spec.certainty)?;
            if rules.insert(spec.name.clone(), id).is_some() {
                return Err(DocumentError::DuplicateName {
                    kind: "rule",
                    name: spec.name.clone(),
                });
            }
        }

        let mut islands = BTreeMap::new();
        for spec in &self.islands {
            let members = spec
                .rules
                .iter()
                .map(|name| {
                    rules.get(name).copied().ok_or_else(|| DocumentError::UnknownName {
                        kind: "rule",
                        name: name.clone(),
                        referenced_by: format!("island \"{}\"", spec.name),
                    })
                })
                .collect::<DocumentResult<Vec<_>>>()?;
            let id = qrbs.assert_island(members)?;
            if islands.insert(spec.name.clone(), id).is_some() {
                return Err(DocumentError::DuplicateName {
                    kind: "island",
                    name: spec.name.clone(),
                });
            }
        }

        tracing::debug!(
            facts = facts.len(),
            rules = rules.len(),
            islands = islands.len(),
            "built knowledge base"
        );
        Ok(Built {
            qrbs,
            facts,
            rules,
            islands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASKET: &str = r#"
[[facts]]
name = "tall"
attribute = "height"
value = "tall"
membership = "0/170-1/190"
input = 185.0

[[facts]]
name = "tired"
precision = 0.2

[[facts]]
name = "scores"

[[rules]]
name = "tall_scores"
when = "tall & !tired"
then = "scores"
certainty = 0.9

[[islands]]
name = "scoring"
rules = ["tall_scores"]
"#;

    #[test]
    fn builds_from_toml() {
        let kb: KnowledgeBase = toml::from_str(BASKET).unwrap();
        let built = kb.build().unwrap();
        let tall = built.facts["tall"];
        assert!((built.qrbs.precision(tall).unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(built.qrbs.fact(tall).unwrap().attribute, "height");
        let scores = built.facts["scores"];
        assert_eq!(built.qrbs.fact(scores).unwrap().value, "true");
        assert_eq!(built.qrbs.rule(built.rules["tall_scores"]).unwrap().certainty(), 0.9);
        assert_eq!(built.fact_name(scores), Some("scores"));
        assert_eq!(built.island_name(built.islands["scoring"]), Some("scoring"));
    }

    #[test]
    fn loads_by_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let kb: KnowledgeBase = toml::from_str(BASKET).unwrap();

        let json = tmp.path().join("kb.json");
        std::fs::write(&json, serde_json::to_string_pretty(&kb).unwrap()).unwrap();
        assert_eq!(KnowledgeBase::load(&json).unwrap(), kb);

        let toml_path = tmp.path().join("kb.toml");
        std::fs::write(&toml_path, BASKET).unwrap();
        assert_eq!(KnowledgeBase::load(&toml_path).unwrap(), kb);

        let yaml = tmp.path().join("kb.yaml");
        std::fs::write(&yaml, "").unwrap();
        assert!(matches!(
            KnowledgeBase::load(&yaml),
            Err(DocumentError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn expression_errors_point_into_source() {
        let mut kb: KnowledgeBase = toml::from_str(BASKET).unwrap();
        kb.rules[0].when = "tall & ghost".into();
        match kb.build().unwrap_err() {
            DocumentError::UnknownFact { name, span, .. } => {
                assert_eq!(name, "ghost");
                assert_eq!(span.offset(), 7);
                assert_eq!(span.len(), 5);
            }
            other => panic!("unexpected error: {other}"),
        }

        kb.rules[0].when = "tall &".into();
        assert!(matches!(kb.build(), Err(DocumentError::Expression { .. })));
    }

    #[test]
    fn unchained_island_is_rejected() {
        let mut kb: KnowledgeBase = toml::from_str(BASKET).unwrap();
        kb.facts.push(FactSpec {
            name: "other".into(),
            attribute: None,
            value: "true".into(),
            precision: Some(0.5),
            membership: None,
            input: None,
        });
        kb.rules.push(RuleSpec {
            name: "unrelated".into(),
            when: "tired".into(),
            then: "other".into(),
            certainty: 1.0,
        });
        kb.islands[0].rules.push("unrelated".into());
        assert!(matches!(
            kb.build(),
            Err(DocumentError::Knowledge(KnowledgeError::InvalidIsland { .. }))
        ));
    }

    #[test]
    fn conflicting_precision_sources_rejected() {
        let mut kb: KnowledgeBase = toml::from_str(BASKET).unwrap();
        kb.facts[0].precision = Some(0.1);
        assert!(matches!(
            kb.build(),
            Err(DocumentError::PrecisionSource { .. })
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut kb: KnowledgeBase = toml::from_str(BASKET).unwrap();
        let dup = kb.facts[1].clone();
        kb.facts.push(dup);
        assert!(matches!(
            kb.build(),
            Err(DocumentError::DuplicateName { kind: "fact", .. })
        ));
    }
}
