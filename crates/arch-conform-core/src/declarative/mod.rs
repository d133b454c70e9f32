//! Declarative conformance rules driven by TOML configuration.
//!
//! # Architecture
//!
//! ```text
//! TOML text
//!   ↓ serde (DTO layer)
//! config_dto types
//!   ↓ validate + convert
//! Vec<Rule> (pure domain model)
//! ```

pub mod config_dto;
pub mod loader;

use crate::rule::Rule;

/// Errors from parsing TOML and loading declarative rules.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum LoadRulesError {
    /// TOML deserialization failed.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(arch_conform::declarative::toml))]
    Toml(#[from] toml::de::Error),

    /// Domain model validation failed.
    #[error("{0}")]
    #[diagnostic(transparent)]
    Load(#[from] loader::LoadError),
}

/// Parses TOML content and builds the `[[rule]]` definitions in file order.
///
/// Returns `Ok(vec![])` if no rules are present.
///
/// # Errors
///
/// Returns an error if TOML parsing or rule validation fails.
pub fn load_rules_from_toml(content: &str) -> Result<Vec<Rule>, LoadRulesError> {
    let dto: config_dto::RuleFileDto = toml::from_str(content)?;
    Ok(loader::load(dto)?)
}
