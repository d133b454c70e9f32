//! Dependency analysis: restriction queries and slice cycle detection.

use crate::graph::{DependencyEdge, SymbolGraph, SymbolId, SymbolKind};
use crate::pattern::{PackagePattern, SlicePattern};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

/// A dependency cycle among package slices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceCycle {
    /// All slices of the strongly connected component, sorted by name.
    pub slices: Vec<String>,
    /// A closed path starting and ending at the smallest slice name.
    pub path: Vec<String>,
    /// One sample symbol dependency per step of `path`.
    pub evidence: Vec<String>,
}

/// Read-only queries over the dependency edges of a [`SymbolGraph`].
pub struct DependencyAnalyzer<'g> {
    graph: &'g SymbolGraph,
}

impl<'g> DependencyAnalyzer<'g> {
    /// Creates an analyzer over `graph`.
    #[must_use]
    pub fn new(graph: &'g SymbolGraph) -> Self {
        Self { graph }
    }

    /// Returns the outgoing edges of a symbol.
    ///
    /// For classes this includes the edges of declared members. Edges back
    /// into the symbol's own class (or its members) are left out.
    #[must_use]
    pub fn dependencies_of(&self, id: SymbolId) -> Vec<&'g DependencyEdge> {
        let graph = self.graph;
        let own_class = graph.owning_class(id);

        let mut sources = vec![id];
        if graph.symbol(id).kind() == SymbolKind::Class {
            sources.extend_from_slice(graph.members(id));
        }

        sources
            .into_iter()
            .flat_map(|source| graph.outgoing(source))
            .filter(|edge| {
                edge.target_symbol()
                    .map_or(true, |target| graph.owning_class(target) != own_class)
            })
            .collect()
    }

    /// Returns the package of a symbol target that is subject to checks,
    /// or `None` for built-in and external targets.
    fn checked_target_package(&self, edge: &DependencyEdge) -> Option<&'g str> {
        let target = self.graph.symbol(edge.target_symbol()?);
        if self.graph.is_builtin_package(target.package()) {
            None
        } else {
            Some(target.package())
        }
    }

    /// Edges whose target resides outside every allowed pattern.
    ///
    /// Built-in and external targets are always allowed.
    #[must_use]
    pub fn disallowed_dependencies(
        &self,
        id: SymbolId,
        allowed: &[PackagePattern],
    ) -> Vec<&'g DependencyEdge> {
        self.dependencies_of(id)
            .into_iter()
            .filter(|edge| {
                self.checked_target_package(edge)
                    .is_some_and(|package| !allowed.iter().any(|p| p.matches(package)))
            })
            .collect()
    }

    /// True iff every checked target resides in an allowed pattern.
    #[must_use]
    pub fn only_depends_on(&self, id: SymbolId, allowed: &[PackagePattern]) -> bool {
        self.disallowed_dependencies(id, allowed).is_empty()
    }

    /// Edges whose target resides in one of the disallowed patterns.
    #[must_use]
    pub fn forbidden_accesses(
        &self,
        id: SymbolId,
        disallowed: &[PackagePattern],
    ) -> Vec<&'g DependencyEdge> {
        self.dependencies_of(id)
            .into_iter()
            .filter(|edge| {
                self.checked_target_package(edge)
                    .is_some_and(|package| disallowed.iter().any(|p| p.matches(package)))
            })
            .collect()
    }

    /// True iff no checked target resides in a disallowed pattern.
    #[must_use]
    pub fn only_accesses_outside_of(&self, id: SymbolId, disallowed: &[PackagePattern]) -> bool {
        self.forbidden_accesses(id, disallowed).is_empty()
    }

    /// Renders an edge as `source -> target (kind)`.
    #[must_use]
    pub fn describe(&self, edge: &DependencyEdge) -> String {
        format!(
            "{} -> {} ({})",
            self.graph.symbol(edge.source()).qualified_name(),
            edge.target_name(),
            edge.kind()
        )
    }

    /// Groups symbols by slice key. Symbols whose package matches no slice
    /// are left out.
    #[must_use]
    pub fn slices(&self, pattern: &SlicePattern) -> BTreeMap<String, Vec<SymbolId>> {
        let mut slices: BTreeMap<String, Vec<SymbolId>> = BTreeMap::new();
        for (id, symbol) in self.graph.symbols() {
            if let Some(key) = pattern.slice_of(symbol.package()) {
                slices.entry(key.to_string()).or_default().push(id);
            }
        }
        slices
    }

    /// Detects dependency cycles between the slices of `pattern`.
    ///
    /// Cycles are strongly connected components with more than one slice,
    /// reported in slice-name order.
    #[must_use]
    pub fn slice_cycles(&self, pattern: &SlicePattern) -> Vec<SliceCycle> {
        let slices = self.slices(pattern);

        let slice_of: HashMap<SymbolId, &str> = slices
            .iter()
            .flat_map(|(name, ids)| ids.iter().map(move |&id| (id, name.as_str())))
            .collect();

        // One sample edge per ordered slice pair, first in load order.
        let mut samples: BTreeMap<(&str, &str), &DependencyEdge> = BTreeMap::new();
        for (name, ids) in &slices {
            for &id in ids {
                for edge in self.graph.outgoing(id) {
                    let Some(target_slice) = edge.target_symbol().and_then(|t| slice_of.get(&t))
                    else {
                        continue;
                    };
                    if *target_slice != name.as_str() {
                        samples.entry((name.as_str(), *target_slice)).or_insert(edge);
                    }
                }
            }
        }

        let mut slice_graph: DiGraph<&str, ()> = DiGraph::new();
        let nodes: BTreeMap<&str, NodeIndex> = slices
            .keys()
            .map(|name| (name.as_str(), slice_graph.add_node(name.as_str())))
            .collect();
        let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for &(from, to) in samples.keys() {
            slice_graph.add_edge(nodes[from], nodes[to], ());
            adjacency.entry(from).or_default().insert(to);
        }

        let mut cycles: Vec<SliceCycle> = tarjan_scc(&slice_graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut members: Vec<&str> = scc.into_iter().map(|n| slice_graph[n]).collect();
                members.sort_unstable();
                self.describe_cycle(&members, &adjacency, &samples)
            })
            .collect();
        cycles.sort_by(|a, b| a.slices.cmp(&b.slices));

        debug!(
            "Slice pattern {}: {} slices, {} cycles",
            pattern,
            slices.len(),
            cycles.len()
        );
        cycles
    }

    fn describe_cycle(
        &self,
        members: &[&str],
        adjacency: &BTreeMap<&str, BTreeSet<&str>>,
        samples: &BTreeMap<(&str, &str), &DependencyEdge>,
    ) -> SliceCycle {
        let path = shortest_cycle(members, adjacency).unwrap_or_else(|| {
            let mut fallback: Vec<&str> = members.to_vec();
            fallback.extend(members.first());
            fallback
        });

        let evidence = path
            .windows(2)
            .filter_map(|step| samples.get(&(step[0], step[1])))
            .map(|edge| self.describe(edge))
            .collect();

        SliceCycle {
            slices: members.iter().map(ToString::to_string).collect(),
            path: path.into_iter().map(ToString::to_string).collect(),
            evidence,
        }
    }
}

/// Breadth-first search for the shortest closed path through the first
/// member, visiting neighbours in name order and staying inside `members`.
fn shortest_cycle<'a>(
    members: &[&'a str],
    adjacency: &BTreeMap<&'a str, BTreeSet<&'a str>>,
) -> Option<Vec<&'a str>> {
    let start = *members.first()?;
    let inside: HashSet<&str> = members.iter().copied().collect();

    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        for &next in adjacency.get(current).into_iter().flatten() {
            if !inside.contains(next) {
                continue;
            }
            if next == start {
                let mut middle = Vec::new();
                let mut node = current;
                while node != start {
                    middle.push(node);
                    node = parent[node];
                }
                middle.reverse();

                let mut path = vec![start];
                path.extend(middle);
                path.push(start);
                return Some(path);
            }
            if !parent.contains_key(next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, Symbol};

    fn layered() -> SymbolGraph {
        SymbolGraph::builder()
            .builtin("java..")
            .symbol(Symbol::class("app.controller.OrderController"))
            .symbol(Symbol::field("app.controller.OrderController", "service"))
            .symbol(Symbol::method("app.controller.OrderController", "list"))
            .symbol(Symbol::class("app.service.OrderService"))
            .symbol(Symbol::class("app.repository.OrderRepository"))
            .edge(
                "app.controller.OrderController.service",
                "app.service.OrderService",
                EdgeKind::FieldType,
            )
            .edge(
                "app.controller.OrderController.list",
                "java.util.List",
                EdgeKind::MethodCall,
            )
            .edge(
                "app.controller.OrderController.list",
                "app.controller.OrderController.service",
                EdgeKind::FieldAccess,
            )
            .external_edge(
                "app.controller.OrderController",
                "org.springframework.web.bind.annotation.RestController",
                EdgeKind::Annotation,
            )
            .edge(
                "app.service.OrderService",
                "app.repository.OrderRepository",
                EdgeKind::FieldType,
            )
            .build()
            .unwrap()
    }

    fn patterns(raw: &[&str]) -> Vec<PackagePattern> {
        raw.iter().map(|p| PackagePattern::new(p).unwrap()).collect()
    }

    #[test]
    fn class_dependencies_include_members_but_not_self() {
        let g = layered();
        let analyzer = DependencyAnalyzer::new(&g);
        let controller = g.id_of("app.controller.OrderController").unwrap();

        let targets: Vec<&str> = analyzer
            .dependencies_of(controller)
            .iter()
            .map(|e| e.target_name())
            .collect();
        assert_eq!(
            targets,
            vec![
                "org.springframework.web.bind.annotation.RestController",
                "app.service.OrderService",
                "java.util.List",
            ]
        );
    }

    #[test]
    fn only_depends_on_ignores_builtins_and_externals() {
        let g = layered();
        let analyzer = DependencyAnalyzer::new(&g);
        let controller = g.id_of("app.controller.OrderController").unwrap();
        assert!(analyzer.only_depends_on(controller, &patterns(&["..service.."])));
    }

    #[test]
    fn extra_repository_edge_is_the_only_disallowed_dependency() {
        let g = SymbolGraph::builder()
            .builtin("java..")
            .symbol(Symbol::class("app.controller.OrderController"))
            .symbol(Symbol::class("app.service.OrderService"))
            .symbol(Symbol::class("app.repository.OrderRepository"))
            .edge("app.controller.OrderController", "app.service.OrderService", EdgeKind::FieldType)
            .edge("app.controller.OrderController", "java.lang.String", EdgeKind::MethodCall)
            .edge(
                "app.controller.OrderController",
                "app.repository.OrderRepository",
                EdgeKind::MethodCall,
            )
            .build()
            .unwrap();
        let analyzer = DependencyAnalyzer::new(&g);
        let controller = g.id_of("app.controller.OrderController").unwrap();

        let bad = analyzer.disallowed_dependencies(controller, &patterns(&["..service.."]));
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].target_name(), "app.repository.OrderRepository");
    }

    #[test]
    fn forbidden_accesses_names_disallowed_targets() {
        let g = layered();
        let analyzer = DependencyAnalyzer::new(&g);
        let service = g.id_of("app.service.OrderService").unwrap();

        assert!(analyzer.only_accesses_outside_of(service, &patterns(&["..controller.."])));
        let hits = analyzer.forbidden_accesses(service, &patterns(&["..repository.."]));
        assert_eq!(hits.len(), 1);
        assert!(!analyzer.only_accesses_outside_of(service, &patterns(&["..repository.."])));
    }

    fn ring(edges: &[(&str, &str)]) -> SymbolGraph {
        let mut builder = SymbolGraph::builder();
        for name in ["a", "b", "c"] {
            builder = builder.symbol(Symbol::class(format!("root.{name}.Type")));
        }
        for (from, to) in edges {
            builder = builder.edge(
                format!("root.{from}.Type"),
                format!("root.{to}.Type"),
                EdgeKind::Other,
            );
        }
        builder.build().unwrap()
    }

    #[test]
    fn three_slice_ring_is_one_cycle() {
        let g = ring(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let pattern = SlicePattern::new("root.(*)..").unwrap();
        let cycles = DependencyAnalyzer::new(&g).slice_cycles(&pattern);

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].slices, vec!["a", "b", "c"]);
        assert_eq!(cycles[0].path, vec!["a", "b", "c", "a"]);
        assert_eq!(
            cycles[0].evidence,
            vec![
                "root.a.Type -> root.b.Type (reference)",
                "root.b.Type -> root.c.Type (reference)",
                "root.c.Type -> root.a.Type (reference)",
            ]
        );
    }

    #[test]
    fn chain_without_return_edge_has_no_cycle() {
        let g = ring(&[("a", "b"), ("b", "c")]);
        let pattern = SlicePattern::new("root.(*)..").unwrap();
        assert!(DependencyAnalyzer::new(&g).slice_cycles(&pattern).is_empty());
    }

    #[test]
    fn cycle_reporting_is_stable() {
        let g = ring(&[("c", "a"), ("a", "c"), ("b", "a"), ("a", "b")]);
        let pattern = SlicePattern::new("root.(*)..").unwrap();
        let analyzer = DependencyAnalyzer::new(&g);

        let first = analyzer.slice_cycles(&pattern);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].slices, vec!["a", "b", "c"]);
        assert_eq!(first[0].path, vec!["a", "b", "a"]);
        assert_eq!(first, analyzer.slice_cycles(&pattern));
    }

    #[test]
    fn slices_skip_unmatched_packages() {
        let g = layered();
        let pattern = SlicePattern::new("app.(*)..").unwrap();
        let slices = DependencyAnalyzer::new(&g).slices(&pattern);
        let keys: Vec<&str> = slices.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["controller", "repository", "service"]);
        assert_eq!(slices["controller"].len(), 3);
    }
}
