//! Predicate engine: side-effect free selection functions over symbols.

use crate::graph::{DependencyEdge, EdgeKind, SymbolGraph, SymbolId, SymbolKind};
use crate::pattern::{NamePattern, PackagePattern, PatternError};

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A composable boolean condition over a symbol.
///
/// Patterns inside a predicate are validated when the predicate is built,
/// so evaluation itself cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Predicate {
    /// Always true.
    Any,
    /// Package matches the pattern.
    ResidesIn(PackagePattern),
    /// Package matches at least one of the patterns.
    ResidesInAny(Vec<PackagePattern>),
    /// Simple name ends with the suffix.
    SimpleNameEndsWith(String),
    /// Simple name starts with the prefix.
    SimpleNameStartsWith(String),
    /// Simple name matches the glob.
    SimpleNameMatches(NamePattern),
    /// Declares the annotation (qualified or simple name).
    AnnotatedWith(String),
    /// The symbol's type or a transitive supertype is the named type.
    AssignableTo(String),
    /// The declaring class of a field/method satisfies the inner predicate.
    DeclaredIn(Box<Predicate>),
    /// All inner predicates hold.
    All(Vec<Predicate>),
    /// At least one inner predicate holds.
    AnyOf(Vec<Predicate>),
    /// The inner predicate does not hold.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Package matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is malformed.
    pub fn resides_in(pattern: &str) -> Result<Self, PatternError> {
        PackagePattern::new(pattern).map(Self::ResidesIn)
    }

    /// Package matches any of `patterns`.
    ///
    /// # Errors
    ///
    /// Returns the first malformed pattern's error.
    pub fn resides_in_any<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|p| PackagePattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::ResidesInAny)
    }

    /// Simple name ends with `suffix`.
    #[must_use]
    pub fn simple_name_ends_with(suffix: impl Into<String>) -> Self {
        Self::SimpleNameEndsWith(suffix.into())
    }

    /// Simple name starts with `prefix`.
    #[must_use]
    pub fn simple_name_starts_with(prefix: impl Into<String>) -> Self {
        Self::SimpleNameStartsWith(prefix.into())
    }

    /// Simple name matches `glob`.
    ///
    /// # Errors
    ///
    /// Returns error if the glob is malformed.
    pub fn simple_name_matches(glob: &str) -> Result<Self, PatternError> {
        NamePattern::new(glob).map(Self::SimpleNameMatches)
    }

    /// Declares `annotation`.
    #[must_use]
    pub fn annotated_with(annotation: impl Into<String>) -> Self {
        Self::AnnotatedWith(annotation.into())
    }

    /// Type is, or transitively extends, `type_name`.
    #[must_use]
    pub fn assignable_to(type_name: impl Into<String>) -> Self {
        Self::AssignableTo(type_name.into())
    }

    /// Declaring class satisfies `class_predicate`.
    #[must_use]
    pub fn declared_in(class_predicate: Predicate) -> Self {
        Self::DeclaredIn(Box::new(class_predicate))
    }

    /// Conjunction with another predicate.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::All(mut inner) => {
                inner.push(other);
                Self::All(inner)
            }
            this => Self::All(vec![this, other]),
        }
    }

    /// Disjunction with another predicate.
    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Self::AnyOf(mut inner) => {
                inner.push(other);
                Self::AnyOf(inner)
            }
            this => Self::AnyOf(vec![this, other]),
        }
    }

    /// Negation.
    #[must_use]
    pub fn negated(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluates the predicate for a symbol of `graph`.
    #[must_use]
    pub fn matches(&self, graph: &SymbolGraph, id: SymbolId) -> bool {
        let symbol = graph.symbol(id);
        match self {
            Self::Any => true,
            Self::ResidesIn(pattern) => pattern.matches(symbol.package()),
            Self::ResidesInAny(patterns) => patterns.iter().any(|p| p.matches(symbol.package())),
            Self::SimpleNameEndsWith(suffix) => symbol.simple_name().ends_with(suffix.as_str()),
            Self::SimpleNameStartsWith(prefix) => {
                symbol.simple_name().starts_with(prefix.as_str())
            }
            Self::SimpleNameMatches(glob) => glob.matches(symbol.simple_name()),
            Self::AnnotatedWith(annotation) => symbol.is_annotated_with(annotation),
            Self::AssignableTo(type_name) => is_assignable(graph, id, type_name),
            Self::DeclaredIn(inner) => graph
                .declaring_class(id)
                .is_some_and(|class| inner.matches(graph, class)),
            Self::All(inner) => inner.iter().all(|p| p.matches(graph, id)),
            Self::AnyOf(inner) => inner.iter().any(|p| p.matches(graph, id)),
            Self::Not(inner) => !inner.matches(graph, id),
        }
    }

    /// Returns the most specific sub-predicate that does not hold, or
    /// `None` if the predicate matches.
    ///
    /// Conjunctions are descended into; disjunctions and negations are
    /// reported whole.
    #[must_use]
    pub fn failing_part(&self, graph: &SymbolGraph, id: SymbolId) -> Option<&Predicate> {
        match self {
            Self::All(inner) => inner.iter().find_map(|p| p.failing_part(graph, id)),
            _ if self.matches(graph, id) => None,
            _ => Some(self),
        }
    }
}

fn names_equal(qualified: &str, wanted: &str) -> bool {
    qualified == wanted
        || (!wanted.contains('.') && qualified.rsplit('.').next() == Some(wanted))
}

/// The type a symbol stands for: a class is its own type; a member has its
/// declared type, or else the targets of its field-type/return-type edges.
fn symbol_types(graph: &SymbolGraph, id: SymbolId) -> Vec<&str> {
    let symbol = graph.symbol(id);
    let type_edge = match symbol.kind() {
        SymbolKind::Class => return vec![symbol.qualified_name()],
        SymbolKind::Field => EdgeKind::FieldType,
        SymbolKind::Method => EdgeKind::ReturnType,
    };
    match symbol.type_name() {
        Some(type_name) => vec![type_name],
        None => graph
            .outgoing(id)
            .filter(|edge| edge.kind() == type_edge)
            .map(DependencyEdge::target_name)
            .collect(),
    }
}

/// Walks the supertype closure of the symbol's type. Supertypes outside the
/// graph are compared by name only; repeated names are skipped so cyclic
/// supertype data terminates.
fn is_assignable(graph: &SymbolGraph, id: SymbolId, wanted: &str) -> bool {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue = symbol_types(graph, id);

    while let Some(name) = queue.pop() {
        if !seen.insert(name) {
            continue;
        }
        if names_equal(name, wanted) {
            return true;
        }
        if let Some(resolved) = graph.lookup(name) {
            queue.extend(resolved.supertypes().iter().map(String::as_str));
        }
    }

    false
}

fn join_patterns(patterns: &[PackagePattern]) -> String {
    patterns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_predicates(predicates: &[Predicate], separator: &str) -> String {
    predicates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "is any symbol"),
            Self::ResidesIn(pattern) => write!(f, "resides in package {pattern}"),
            Self::ResidesInAny(patterns) => {
                write!(f, "resides in any package [{}]", join_patterns(patterns))
            }
            Self::SimpleNameEndsWith(suffix) => {
                write!(f, "has simple name ending with '{suffix}'")
            }
            Self::SimpleNameStartsWith(prefix) => {
                write!(f, "has simple name starting with '{prefix}'")
            }
            Self::SimpleNameMatches(glob) => write!(f, "has simple name matching {glob}"),
            Self::AnnotatedWith(annotation) => write!(f, "is annotated with @{annotation}"),
            Self::AssignableTo(type_name) => write!(f, "is assignable to {type_name}"),
            Self::DeclaredIn(inner) => write!(f, "is declared in a class that {inner}"),
            Self::All(inner) => write!(f, "({})", join_predicates(inner, " and ")),
            Self::AnyOf(inner) => write!(f, "({})", join_predicates(inner, " or ")),
            Self::Not(inner) => write!(f, "not ({inner})"),
        }
    }
}
