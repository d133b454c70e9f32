//! # arch-conform-core
//!
//! Core framework for architecture conformance checks over a pre-built,
//! language-agnostic symbol graph.
//!
//! This crate provides:
//!
//! - [`SymbolGraph`] and [`GraphBuilder`] for the checked code graph
//! - [`Rule`], [`Selection`], [`Assertion`] and [`Predicate`] for rules as data
//! - [`DependencyAnalyzer`] for dependency restrictions and slice cycles
//! - [`Checker`] for evaluating a batch of rules into a [`ConformanceReport`]
//! - [`declarative`] for loading rules from TOML
//!
//! ## Example
//!
//! ```ignore
//! use arch_conform_core::{
//!     Assertion, Checker, EmptySelection, Predicate, Rule, Selection, SymbolGraph,
//! };
//!
//! let graph = SymbolGraph::from_json(&std::fs::read_to_string("symbols.json")?)?;
//!
//! let rule = Rule::new(
//!     "controllers-only-depend-on-services",
//!     Selection::Classes(Predicate::resides_in("..controller..")?),
//!     Assertion::only_depend_on(["..service..", "java..", "..controller.."])?,
//!     EmptySelection::Allow,
//! )?;
//!
//! let report = Checker::builder().rule(rule).build()?.check(&graph)?;
//! assert!(report.is_conformant());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod checker;
mod config;
mod dependency;
mod evaluator;
mod pattern;
mod predicate;
mod report;
mod rule;
mod types;

/// Declarative rule definitions.
pub mod declarative;

/// The symbol graph.
pub mod graph;

pub use checker::{CheckError, Checker, CheckerBuilder};
pub use config::{Config, ConfigError, EvaluationConfig, GraphConfig, RuleConfig};
pub use dependency::{DependencyAnalyzer, SliceCycle};
pub use evaluator::{evaluate, evaluate_until, Deadline};
pub use graph::{
    DependencyEdge, EdgeKind, EdgeTarget, GraphBuilder, GraphError, Symbol, SymbolGraph, SymbolId,
    SymbolKind,
};
pub use pattern::{NamePattern, PackagePattern, PatternError, SlicePattern};
pub use predicate::Predicate;
pub use report::{ConformanceReport, RuleOutcome};
pub use rule::{Assertion, EmptySelection, Rule, RuleDefinitionError, Selection};
pub use types::{Severity, Subject, Violation};
