//! Validating construction of a [`SymbolGraph`].

use super::{DependencyEdge, EdgeKind, EdgeTarget, GraphError, Symbol, SymbolGraph, SymbolId};
use super::{split_qualified, SymbolKind};
use crate::pattern::PackagePattern;

use std::collections::{BTreeSet, HashMap};
use tracing::debug;

struct PendingEdge {
    from: String,
    to: String,
    kind: EdgeKind,
    external: bool,
}

/// Builder for a [`SymbolGraph`].
///
/// Collects symbols, edges and built-in package patterns, then validates
/// the whole graph in [`GraphBuilder::build`]. Nothing is resolved until
/// then, so symbols and edges may be added in any order.
#[derive(Default)]
pub struct GraphBuilder {
    symbols: Vec<Symbol>,
    edges: Vec<PendingEdge>,
    builtins: Vec<String>,
    builtin_types: BTreeSet<String>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol.
    #[must_use]
    pub fn symbol(mut self, symbol: Symbol) -> Self {
        self.symbols.push(symbol);
        self
    }

    /// Adds a dependency edge whose target must resolve to a loaded symbol
    /// or a built-in.
    #[must_use]
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>, kind: EdgeKind) -> Self {
        self.edges.push(PendingEdge {
            from: from.into(),
            to: to.into(),
            kind,
            external: false,
        });
        self
    }

    /// Adds a dependency edge the loader could not resolve. If the target
    /// is not loaded, it is kept as [`EdgeTarget::External`] instead of
    /// failing the build.
    #[must_use]
    pub fn external_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: EdgeKind,
    ) -> Self {
        self.edges.push(PendingEdge {
            from: from.into(),
            to: to.into(),
            kind,
            external: true,
        });
        self
    }

    /// Declares a package pattern holding language/runtime built-ins
    /// (e.g. `java..`).
    #[must_use]
    pub fn builtin(mut self, pattern: impl Into<String>) -> Self {
        self.builtins.push(pattern.into());
        self
    }

    /// Declares a built-in type by exact name, for primitives and other
    /// types outside any package (e.g. `int`, `void`).
    #[must_use]
    pub fn builtin_type(mut self, name: impl Into<String>) -> Self {
        self.builtin_types.insert(name.into());
        self
    }

    /// Validates and builds the graph.
    ///
    /// # Errors
    ///
    /// - [`GraphError::InvalidBuiltin`] for a malformed built-in pattern
    /// - [`GraphError::DuplicateSymbol`] for repeated qualified names
    /// - [`GraphError::MissingDeclaringClass`] / [`GraphError::UnknownDeclaringClass`]
    ///   for members without a loaded declaring class
    /// - [`GraphError::UnknownSource`] for an edge from an unknown symbol
    /// - [`GraphError::UnresolvedReference`] for an edge target that is not
    ///   loaded, not built-in and not marked external
    pub fn build(self) -> Result<SymbolGraph, GraphError> {
        let builtins = self
            .builtins
            .iter()
            .map(|p| PackagePattern::new(p).map_err(GraphError::InvalidBuiltin))
            .collect::<Result<Vec<_>, _>>()?;

        let mut index = HashMap::with_capacity(self.symbols.len());
        for (i, symbol) in self.symbols.iter().enumerate() {
            if index
                .insert(symbol.qualified_name.clone(), SymbolId(i))
                .is_some()
            {
                return Err(GraphError::DuplicateSymbol {
                    name: symbol.qualified_name.clone(),
                });
            }
        }

        let mut members = vec![Vec::new(); self.symbols.len()];
        let mut owners = vec![None; self.symbols.len()];
        for (i, symbol) in self.symbols.iter().enumerate() {
            if symbol.kind == SymbolKind::Class {
                continue;
            }
            let Some(class_name) = symbol.declaring_class.as_deref() else {
                return Err(GraphError::MissingDeclaringClass {
                    kind: symbol.kind,
                    member: symbol.qualified_name.clone(),
                });
            };
            let owner = index
                .get(class_name)
                .copied()
                .filter(|id: &SymbolId| self.symbols[id.0].kind == SymbolKind::Class)
                .ok_or_else(|| GraphError::UnknownDeclaringClass {
                    member: symbol.qualified_name.clone(),
                    class: class_name.to_string(),
                })?;
            members[owner.0].push(SymbolId(i));
            owners[i] = Some(owner);
        }

        let mut edges = Vec::with_capacity(self.edges.len());
        let mut outgoing = vec![Vec::new(); self.symbols.len()];
        for pending in self.edges {
            let Some(&source) = index.get(&pending.from) else {
                return Err(GraphError::UnknownSource {
                    from: pending.from,
                    target: pending.to,
                });
            };

            let target = if let Some(&id) = index.get(&pending.to) {
                EdgeTarget::Symbol(id)
            } else if self.builtin_types.contains(&pending.to)
                || builtins
                    .iter()
                    .any(|p| p.matches(split_qualified(&pending.to).0))
            {
                EdgeTarget::Builtin
            } else if pending.external {
                EdgeTarget::External
            } else {
                return Err(GraphError::UnresolvedReference {
                    from: pending.from,
                    target: pending.to,
                });
            };

            outgoing[source.0].push(edges.len());
            edges.push(DependencyEdge {
                source,
                target,
                target_name: pending.to,
                kind: pending.kind,
            });
        }

        debug!(
            "Built symbol graph: {} symbols, {} edges, {} built-in patterns, {} built-in types",
            self.symbols.len(),
            edges.len(),
            builtins.len(),
            self.builtin_types.len()
        );

        Ok(SymbolGraph {
            symbols: self.symbols,
            index,
            edges,
            outgoing,
            members,
            owners,
            builtins,
            builtin_types: self.builtin_types,
        })
    }
}
