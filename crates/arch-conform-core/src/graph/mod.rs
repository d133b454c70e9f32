//! The symbol graph consumed by every check.
//!
//! A graph is produced once by an external frontend (compiler, bytecode
//! reader, AST indexer) through [`GraphBuilder`] or the JSON interchange
//! format, and is immutable afterwards. Every dependency edge resolves to a
//! loaded [`Symbol`], a built-in, or a reference the loader explicitly marked
//! as external.

mod builder;
mod json;

pub use builder::GraphBuilder;

use crate::pattern::{PackagePattern, PatternError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// ────────────────────────────────────────────
// Symbols
// ────────────────────────────────────────────

/// Kind of a symbol node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// A class, interface, enum or record.
    Class,
    /// A field declared in a class.
    Field,
    /// A method or constructor declared in a class.
    Method,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::Field => write!(f, "field"),
            Self::Method => write!(f, "method"),
        }
    }
}

/// Index of a symbol within its [`SymbolGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(usize);

/// Splits `a.b.C` into (`a.b`, `C`).
fn split_qualified(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or(("", name))
}

/// A named node of the code graph: a class, field or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    qualified_name: String,
    simple_name: String,
    kind: SymbolKind,
    package: String,
    annotations: BTreeSet<String>,
    supertypes: BTreeSet<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    declaring_class: Option<String>,
}

impl Symbol {
    /// Creates a class symbol. Package and simple name derive from the
    /// qualified name (`com.example.Foo` → `com.example`, `Foo`).
    #[must_use]
    pub fn class(qualified_name: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        let (package, simple) = split_qualified(&qualified_name);
        Self {
            package: package.to_string(),
            simple_name: simple.to_string(),
            qualified_name,
            kind: SymbolKind::Class,
            annotations: BTreeSet::new(),
            supertypes: BTreeSet::new(),
            type_name: None,
            declaring_class: None,
        }
    }

    /// Creates a field symbol named `<declaring_class>.<name>`.
    #[must_use]
    pub fn field(declaring_class: &str, name: &str) -> Self {
        Self::member(SymbolKind::Field, declaring_class, name)
    }

    /// Creates a method symbol named `<declaring_class>.<name>`.
    ///
    /// Overloads must be disambiguated by the loader, e.g. `find(long)`.
    #[must_use]
    pub fn method(declaring_class: &str, name: &str) -> Self {
        Self::member(SymbolKind::Method, declaring_class, name)
    }

    fn member(kind: SymbolKind, declaring_class: &str, name: &str) -> Self {
        let (package, _) = split_qualified(declaring_class);
        Self {
            qualified_name: format!("{declaring_class}.{name}"),
            simple_name: name.to_string(),
            kind,
            package: package.to_string(),
            annotations: BTreeSet::new(),
            supertypes: BTreeSet::new(),
            type_name: None,
            declaring_class: Some(declaring_class.to_string()),
        }
    }

    /// Adds a declared annotation (qualified or simple name).
    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    /// Adds a direct supertype by qualified name.
    #[must_use]
    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.insert(supertype.into());
        self
    }

    /// Sets the declared type of a field or the return type of a method.
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Returns the fully qualified name.
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Returns the unqualified name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    /// Returns the symbol kind.
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    /// Returns the owning package.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns the declared annotations.
    #[must_use]
    pub fn annotations(&self) -> &BTreeSet<String> {
        &self.annotations
    }

    /// Returns the direct supertypes.
    #[must_use]
    pub fn supertypes(&self) -> &BTreeSet<String> {
        &self.supertypes
    }

    /// Returns the declared type of a member, if the loader supplied one.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Returns the declaring class for fields and methods.
    #[must_use]
    pub fn declaring_class(&self) -> Option<&str> {
        self.declaring_class.as_deref()
    }

    /// Tests for an annotation by qualified or simple name.
    ///
    /// `Autowired` matches a declared `org.springframework.Autowired` and
    /// vice versa.
    #[must_use]
    pub fn is_annotated_with(&self, annotation: &str) -> bool {
        let wanted_simple = split_qualified(annotation).1;
        self.annotations.iter().any(|declared| {
            declared == annotation
                || (!annotation.contains('.') && split_qualified(declared).1 == wanted_simple)
                || (!declared.contains('.') && declared == wanted_simple)
        })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.kind, self.qualified_name)
    }
}

// ────────────────────────────────────────────
// Edges
// ────────────────────────────────────────────

/// What a dependency edge represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// Declared type of a field.
    FieldType,
    /// Return type of a method.
    ReturnType,
    /// A method call.
    MethodCall,
    /// A field read or write.
    FieldAccess,
    /// Extends/implements.
    Supertype,
    /// Use of an annotation.
    Annotation,
    /// Anything else the frontend reports.
    #[default]
    Other,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::FieldType => "field type",
            Self::ReturnType => "return type",
            Self::MethodCall => "method call",
            Self::FieldAccess => "field access",
            Self::Supertype => "supertype",
            Self::Annotation => "annotation",
            Self::Other => "reference",
        };
        f.write_str(text)
    }
}

/// Resolved end of a dependency edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeTarget {
    /// A loaded symbol.
    Symbol(SymbolId),
    /// A standard-library type, always allowed.
    Builtin,
    /// A reference the loader marked as unresolvable; always allowed.
    External,
}

/// A directed reference `source → target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub(crate) source: SymbolId,
    pub(crate) target: EdgeTarget,
    pub(crate) target_name: String,
    pub(crate) kind: EdgeKind,
}

impl DependencyEdge {
    /// Returns the referencing symbol.
    #[must_use]
    pub fn source(&self) -> SymbolId {
        self.source
    }

    /// Returns the resolved target.
    #[must_use]
    pub fn target(&self) -> &EdgeTarget {
        &self.target
    }

    /// Returns the target's qualified name as reported by the loader.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Returns the edge kind.
    #[must_use]
    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// Returns the target symbol id, if the target is a loaded symbol.
    #[must_use]
    pub fn target_symbol(&self) -> Option<SymbolId> {
        match self.target {
            EdgeTarget::Symbol(id) => Some(id),
            EdgeTarget::Builtin | EdgeTarget::External => None,
        }
    }
}

// ────────────────────────────────────────────
// Graph
// ────────────────────────────────────────────

/// Immutable symbol graph. `Send + Sync`, safe to share across rule workers.
#[derive(Debug, Clone)]
pub struct SymbolGraph {
    symbols: Vec<Symbol>,
    index: HashMap<String, SymbolId>,
    edges: Vec<DependencyEdge>,
    /// Edge indices per source symbol.
    outgoing: Vec<Vec<usize>>,
    /// Member ids per class symbol.
    members: Vec<Vec<SymbolId>>,
    owners: Vec<Option<SymbolId>>,
    builtins: Vec<PackagePattern>,
    builtin_types: BTreeSet<String>,
}

impl SymbolGraph {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    /// Parses a graph from the JSON interchange format.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the graph fails
    /// validation (see [`GraphBuilder::build`]).
    pub fn from_json(content: &str) -> Result<Self, GraphError> {
        json::parse(content)
    }

    /// Returns the number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if the graph has no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates over all symbols in load order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols.iter().enumerate().map(|(i, s)| (SymbolId(i), s))
    }

    /// Returns the symbol for an id of this graph.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    /// Looks up a symbol id by qualified name.
    #[must_use]
    pub fn id_of(&self, qualified_name: &str) -> Option<SymbolId> {
        self.index.get(qualified_name).copied()
    }

    /// Looks up a symbol by qualified name.
    #[must_use]
    pub fn lookup(&self, qualified_name: &str) -> Option<&Symbol> {
        self.id_of(qualified_name).map(|id| self.symbol(id))
    }

    /// Returns all edges in load order.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Iterates over the direct outgoing edges of a symbol.
    pub fn outgoing(&self, id: SymbolId) -> impl Iterator<Item = &DependencyEdge> {
        self.outgoing[id.0].iter().map(|&e| &self.edges[e])
    }

    /// Returns the declared members of a class (empty for members).
    #[must_use]
    pub fn members(&self, id: SymbolId) -> &[SymbolId] {
        &self.members[id.0]
    }

    /// Returns the declaring class of a field or method.
    #[must_use]
    pub fn declaring_class(&self, id: SymbolId) -> Option<SymbolId> {
        self.owners[id.0]
    }

    /// Returns the class a symbol belongs to: itself for classes, the
    /// declaring class for members.
    #[must_use]
    pub fn owning_class(&self, id: SymbolId) -> SymbolId {
        self.owners[id.0].unwrap_or(id)
    }

    /// Returns the built-in package patterns.
    #[must_use]
    pub fn builtins(&self) -> &[PackagePattern] {
        &self.builtins
    }

    /// Returns the built-in type names (e.g. `int`, `void`).
    #[must_use]
    pub fn builtin_types(&self) -> &BTreeSet<String> {
        &self.builtin_types
    }

    /// Tests whether a package holds language/runtime built-ins.
    #[must_use]
    pub fn is_builtin_package(&self, package: &str) -> bool {
        self.builtins.iter().any(|p| p.matches(package))
    }
}

// ────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────

/// Errors while building or loading a symbol graph.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GraphError {
    /// Two symbols share a qualified name.
    #[error("duplicate symbol `{name}`")]
    #[diagnostic(code(arch_conform::graph::duplicate_symbol))]
    DuplicateSymbol {
        /// The duplicated name.
        name: String,
    },

    /// An edge target is neither loaded, built-in, nor marked external.
    #[error("unresolved reference from `{from}` to `{target}`")]
    #[diagnostic(
        code(arch_conform::graph::unresolved_reference),
        help("load the target symbol, declare a built-in package or type, or mark the edge external")
    )]
    UnresolvedReference {
        /// The referencing symbol.
        from: String,
        /// The unresolved target name.
        target: String,
    },

    /// An edge starts at a symbol that was never loaded.
    #[error("edge to `{target}` starts at unknown symbol `{from}`")]
    #[diagnostic(code(arch_conform::graph::unknown_source))]
    UnknownSource {
        /// The unknown source name.
        from: String,
        /// The edge target.
        target: String,
    },

    /// A member names a declaring class that is not a loaded class.
    #[error("{member}: declaring class `{class}` is not a loaded class")]
    #[diagnostic(code(arch_conform::graph::unknown_declaring_class))]
    UnknownDeclaringClass {
        /// The member symbol.
        member: String,
        /// The missing class.
        class: String,
    },

    /// A field or method without a declaring class.
    #[error("{kind} `{member}` has no declaring class")]
    #[diagnostic(code(arch_conform::graph::missing_declaring_class))]
    MissingDeclaringClass {
        /// The member kind.
        kind: SymbolKind,
        /// The member name.
        member: String,
    },

    /// A built-in package pattern failed to parse.
    #[error("invalid built-in package pattern: {0}")]
    #[diagnostic(code(arch_conform::graph::invalid_builtin))]
    InvalidBuiltin(#[source] PatternError),

    /// The JSON interchange document is malformed.
    #[error("invalid graph document: {0}")]
    #[diagnostic(code(arch_conform::graph::parse))]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_derives_package_and_simple_name() {
        let s = Symbol::class("com.example.service.OrderService");
        assert_eq!(s.package(), "com.example.service");
        assert_eq!(s.simple_name(), "OrderService");
        assert_eq!(s.kind(), SymbolKind::Class);
        assert!(s.declaring_class().is_none());
    }

    #[test]
    fn class_in_default_package() {
        let s = Symbol::class("Main");
        assert_eq!(s.package(), "");
        assert_eq!(s.simple_name(), "Main");
    }

    #[test]
    fn member_takes_package_of_declaring_class() {
        let f = Symbol::field("com.example.controller.OrderController", "orderService");
        assert_eq!(
            f.qualified_name(),
            "com.example.controller.OrderController.orderService"
        );
        assert_eq!(f.package(), "com.example.controller");
        assert_eq!(f.simple_name(), "orderService");
        assert_eq!(
            f.declaring_class(),
            Some("com.example.controller.OrderController")
        );
    }

    #[test]
    fn annotation_matches_simple_or_qualified() {
        let f = Symbol::field("a.B", "c")
            .with_annotation("org.springframework.beans.factory.annotation.Autowired");
        assert!(f.is_annotated_with("Autowired"));
        assert!(f.is_annotated_with("org.springframework.beans.factory.annotation.Autowired"));
        assert!(!f.is_annotated_with("Inject"));
        assert!(!f.is_annotated_with("other.pkg.Autowired"));

        let g = Symbol::field("a.B", "d").with_annotation("Autowired");
        assert!(g.is_annotated_with("org.springframework.beans.factory.annotation.Autowired"));
    }

    #[test]
    fn member_type_is_optional() {
        let f = Symbol::field("a.B", "repo");
        assert_eq!(f.type_name(), None);
        let m = Symbol::method("a.B", "find(long)").with_type("a.Order");
        assert_eq!(m.type_name(), Some("a.Order"));
    }

    #[test]
    fn display_names_kind_and_symbol() {
        let s = Symbol::class("a.b.C");
        assert_eq!(s.to_string(), "class <a.b.C>");
    }
}
