// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # qrbs
//!
//! A quantum rule-based system: uncertain expert-system rules compiled to
//! register circuits and executed on a probabilistic simulation backend.
//!
//! ## Architecture
//!
//! - **Knowledge graph** (`knowledge`, `memory`, `engine`, `qrbs`): facts with a
//!   precision in [0, 1], AND/OR/NOT antecedents, weighted rules, and chained
//!   knowledge islands
//! - **Circuit compiler** (`circuit`): lowers an island to gates over freshly
//!   allocated registers under a certainty-factor, fuzzy or Bayesian encoding
//! - **Backends** (`backend`): the `Backend` trait and a dense state-vector
//!   reference simulator
//! - **Execution** (`qpu`): capacity gate, dependency staging, decode and
//!   write-back of consequent precisions
//!
//! ## Library usage
//!
//! ```no_run
//! use qrbs::backend::StateVectorBackend;
//! use qrbs::qpu::{ExecutionConfig, Qpu};
//! use qrbs::qrbs::Qrbs;
//!
//! let mut kb = Qrbs::new();
//! let p = kb.assert_fact("p", "true", 0.8).unwrap();
//! let q = kb.assert_fact("q", "true", 0.0).unwrap();
//! let rule = kb.assert_rule(p, q, 1.0).unwrap();
//! kb.assert_island([rule]).unwrap();
//!
//! let qpu = Qpu::new(StateVectorBackend::default(), ExecutionConfig::default()).unwrap();
//! qpu.execute(&mut kb, None).unwrap();
//! assert!((kb.precision(q).unwrap() - 0.8).abs() < 1e-9);
//! ```

pub mod backend;
pub mod circuit;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod id;
pub mod knowledge;
pub mod membership;
pub mod memory;
pub mod qpu;
pub mod qrbs;
