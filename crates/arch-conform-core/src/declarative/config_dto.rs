//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization.
//! They are converted to domain model types via the loader.

use serde::Deserialize;

/// Raw TOML representation of a rule file.
///
/// Only the `[[rule]]` array is read; the remaining `arch-conform.toml`
/// tables belong to [`crate::Config`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleFileDto {
    /// Rule definitions in file order.
    #[serde(rename = "rule", default)]
    pub rules: Vec<RuleDto>,
}

/// TOML representation of one rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleDto {
    /// Rule name (e.g., "controllers-named-correctly").
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Class selection (mutually exclusive with the other selections).
    #[serde(default)]
    pub classes: Option<PredicateDto>,
    /// Field selection.
    #[serde(default)]
    pub fields: Option<PredicateDto>,
    /// Method selection.
    #[serde(default)]
    pub methods: Option<PredicateDto>,
    /// Slice pattern selection.
    #[serde(default)]
    pub slices: Option<String>,
    /// The assertion.
    pub should: AssertionDto,
    /// Empty-selection policy. Required; kept optional here so the loader
    /// can report it with context.
    #[serde(default)]
    pub on_empty: Option<String>,
    /// Severity (default: "error").
    #[serde(default = "default_severity_str")]
    pub severity: String,
}

/// TOML representation of a predicate.
///
/// `"any"` or a single-key table such as `{ resides-in = "..service.." }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredicateDto {
    /// Always true.
    Any,
    /// Package pattern.
    ResidesIn(String),
    /// Any of several package patterns.
    ResidesInAny(Vec<String>),
    /// Simple name suffix.
    SimpleNameEndsWith(String),
    /// Simple name prefix.
    SimpleNameStartsWith(String),
    /// Simple name glob.
    SimpleNameMatches(String),
    /// Annotation name.
    AnnotatedWith(String),
    /// Type name.
    AssignableTo(String),
    /// Predicate on the declaring class.
    DeclaredIn(Box<PredicateDto>),
    /// Conjunction.
    All(Vec<PredicateDto>),
    /// Disjunction.
    AnyOf(Vec<PredicateDto>),
    /// Negation.
    Not(Box<PredicateDto>),
}

/// TOML representation of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionDto {
    /// Candidates satisfy the predicate.
    Satisfy(PredicateDto),
    /// Allowed dependency packages.
    OnlyDependOn(Vec<String>),
    /// Forbidden dependency packages.
    OnlyAccessOutsideOf(Vec<String>),
    /// `"be-free-of-cycles"`.
    BeFreeOfCycles,
}

fn default_severity_str() -> String {
    "error".to_string()
}
