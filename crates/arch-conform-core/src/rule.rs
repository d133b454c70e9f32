//! Rule model: what to select, what to assert, and what an empty selection
//! means.
//!
//! Rules are plain data built from tagged variants, so they can be
//! constructed in code, loaded from TOML (see [`crate::declarative`]) and
//! serialized without a fluent builder syntax.

use crate::graph::SymbolKind;
use crate::pattern::{PackagePattern, PatternError, SlicePattern};
use crate::predicate::Predicate;
use crate::types::Severity;

use serde::Serialize;
use std::fmt;

/// What an empty candidate set means for a rule.
///
/// Has no default; every rule states its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptySelection {
    /// Zero candidates pass trivially.
    Allow,
    /// Zero candidates produce one violation.
    Fail,
}

/// Which graph elements a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Selection {
    /// Class symbols matching the predicate.
    Classes(Predicate),
    /// Field symbols matching the predicate.
    Fields(Predicate),
    /// Method symbols matching the predicate.
    Methods(Predicate),
    /// The set of slices defined by the pattern.
    Slices(SlicePattern),
}

impl Selection {
    /// Returns the selected symbol kind, or `None` for slices.
    #[must_use]
    pub fn symbol_kind(&self) -> Option<SymbolKind> {
        match self {
            Self::Classes(_) => Some(SymbolKind::Class),
            Self::Fields(_) => Some(SymbolKind::Field),
            Self::Methods(_) => Some(SymbolKind::Method),
            Self::Slices(_) => None,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classes(p) => write!(f, "classes that {p}"),
            Self::Fields(p) => write!(f, "fields that {p}"),
            Self::Methods(p) => write!(f, "methods that {p}"),
            Self::Slices(pattern) => write!(f, "slices matching {pattern}"),
        }
    }
}

/// The condition every selected candidate must meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Assertion {
    /// The candidate satisfies the predicate.
    Satisfy(Predicate),
    /// Every dependency target resides in one of the packages.
    OnlyDependOn(Vec<PackagePattern>),
    /// No dependency target resides in any of the packages.
    OnlyAccessOutsideOf(Vec<PackagePattern>),
    /// The selected slices have no dependency cycle.
    BeFreeOfCycles,
}

impl Assertion {
    /// Builds [`Assertion::OnlyDependOn`] from package patterns.
    ///
    /// # Errors
    ///
    /// Returns the first malformed pattern's error.
    pub fn only_depend_on<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        parse_patterns(patterns).map(Self::OnlyDependOn)
    }

    /// Builds [`Assertion::OnlyAccessOutsideOf`] from package patterns.
    ///
    /// # Errors
    ///
    /// Returns the first malformed pattern's error.
    pub fn only_access_outside_of<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        parse_patterns(patterns).map(Self::OnlyAccessOutsideOf)
    }

    fn applies_to_slices(&self) -> bool {
        matches!(self, Self::BeFreeOfCycles)
    }
}

fn parse_patterns<I, S>(patterns: I) -> Result<Vec<PackagePattern>, PatternError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| PackagePattern::new(p.as_ref()))
        .collect()
}

fn list(patterns: &[PackagePattern]) -> String {
    patterns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Satisfy(p) => write!(f, "{p}"),
            Self::OnlyDependOn(patterns) => {
                write!(f, "only depend on packages [{}]", list(patterns))
            }
            Self::OnlyAccessOutsideOf(patterns) => {
                write!(f, "only access packages outside of [{}]", list(patterns))
            }
            Self::BeFreeOfCycles => write!(f, "be free of cycles"),
        }
    }
}

/// A named conformance rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    selection: Selection,
    assertion: Assertion,
    on_empty: EmptySelection,
    severity: Severity,
}

impl Rule {
    /// Creates a rule with [`Severity::Error`].
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty, or if a cycle assertion is paired
    /// with a symbol selection (or a symbol assertion with slices).
    pub fn new(
        name: impl Into<String>,
        selection: Selection,
        assertion: Assertion,
        on_empty: EmptySelection,
    ) -> Result<Self, RuleDefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RuleDefinitionError::EmptyName);
        }

        let slices = matches!(selection, Selection::Slices(_));
        if slices != assertion.applies_to_slices() {
            return Err(RuleDefinitionError::Incompatible {
                rule: name,
                selection: selection.to_string(),
                assertion: assertion.to_string(),
            });
        }

        Ok(Self {
            name,
            description: None,
            selection,
            assertion,
            on_empty,
            severity: Severity::Error,
        })
    }

    /// Sets a human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the severity of violations.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the selection.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Returns the assertion.
    #[must_use]
    pub fn assertion(&self) -> &Assertion {
        &self.assertion
    }

    /// Returns the empty-selection policy.
    #[must_use]
    pub fn on_empty(&self) -> EmptySelection {
        self.on_empty
    }

    /// Returns the severity.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} should {}", self.selection, self.assertion)
    }
}

/// Errors in rule construction. Always raised before any graph is read.
#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
pub enum RuleDefinitionError {
    /// A pattern inside the rule is malformed.
    #[error(transparent)]
    #[diagnostic(code(arch_conform::rule::pattern))]
    Pattern(#[from] PatternError),

    /// The rule has no name.
    #[error("rule name must not be empty")]
    #[diagnostic(code(arch_conform::rule::empty_name))]
    EmptyName,

    /// Selection and assertion do not fit together.
    #[error("{rule}: cannot assert `{assertion}` on {selection}")]
    #[diagnostic(
        code(arch_conform::rule::incompatible),
        help("cycle freedom applies to slices only; every other assertion applies to classes, fields or methods")
    )]
    Incompatible {
        /// The rule name.
        rule: String,
        /// The selection, described.
        selection: String,
        /// The assertion, described.
        assertion: String,
    },
}
