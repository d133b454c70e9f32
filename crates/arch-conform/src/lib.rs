//! # arch-conform
//!
//! Architecture conformance checks over a language-agnostic symbol graph.
//!
//! This is the main facade crate that re-exports the core and provides the
//! `check!` test harness.
//!
//! ## Quick Start: `cargo test` Integration
//!
//! ```toml
//! [dev-dependencies]
//! arch-conform = "0.1"
//! ```
//!
//! ```rust,ignore
//! // tests/architecture.rs
//! arch_conform::check!();
//! ```
//!
//! This loads `arch-conform.toml` from the workspace root, reads the symbol
//! graph named by `[graph] path`, evaluates every `[[rule]]` and fails the
//! test with a readable report when violations reach `fail_on`.
//!
//! ```toml
//! fail_on = "error"
//!
//! [graph]
//! path = "target/arch-conform/symbols.json"
//!
//! [[rule]]
//! name = "controllers-only-depend-on-services"
//! classes = { resides-in = "..controller.." }
//! should = { only-depend-on = ["..service..", "java..", "..controller.."] }
//! on-empty = "allow"
//! ```
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use arch_conform::{Checker, SymbolGraph};
//! use arch_conform::declarative::load_rules_from_toml;
//!
//! let graph = SymbolGraph::from_json(&json)?;
//! let checker = Checker::builder()
//!     .rules(load_rules_from_toml(&toml)?)
//!     .build()?;
//!
//! let report = checker.check(&graph)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// Re-export core types
pub use arch_conform_core::*;

mod runner;

/// Items used by `check!` expansions. Not public API.
#[doc(hidden)]
pub mod __internal {
    pub use crate::runner::run_check;
}

/// Generates a `#[test]` that checks the project's architecture rules.
///
/// Both arguments are optional:
///
/// - `config`: path of the configuration file, relative to the workspace
///   root (default: `arch-conform.toml` or `.arch-conform.toml`).
/// - `fail_on`: lowest severity that fails the test (`error`, `warning`
///   or `info`); overrides `fail_on` in the configuration.
///
/// ```rust,ignore
/// arch_conform::check!(config = "tests/arch-conform.toml", fail_on = "warning");
/// ```
#[macro_export]
macro_rules! check {
    (@run $config:expr, $fail_on:expr) => {
        #[test]
        fn arch_conform_check() {
            $crate::__internal::run_check($config, $fail_on);
        }
    };
    () => {
        $crate::check!(@run None, None);
    };
    (config = $config:literal $(,)?) => {
        $crate::check!(@run Some($config), None);
    };
    (fail_on = $fail_on:literal $(,)?) => {
        $crate::check!(@run None, Some($fail_on));
    };
    (config = $config:literal, fail_on = $fail_on:literal $(,)?) => {
        $crate::check!(@run Some($config), Some($fail_on));
    };
    (fail_on = $fail_on:literal, config = $config:literal $(,)?) => {
        $crate::check!(@run Some($config), Some($fail_on));
    };
}
