//! Rule evaluation: selection → candidates → assertion → violations.

use crate::checker::CheckError;
use crate::dependency::{DependencyAnalyzer, SliceCycle};
use crate::graph::{SymbolGraph, SymbolId, SymbolKind};
use crate::pattern::SlicePattern;
use crate::predicate::Predicate;
use crate::rule::{Assertion, EmptySelection, Rule, Selection};
use crate::types::{Subject, Violation};

use std::time::{Duration, Instant};
use tracing::debug;

/// A point in time after which evaluation stops.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
    limit: Duration,
}

impl Deadline {
    /// Starts a deadline that expires `limit` from now.
    #[must_use]
    pub fn after(limit: Duration) -> Self {
        Self {
            expires_at: Instant::now() + limit,
            limit,
        }
    }

    /// Returns true once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn check(&self, rule: &str) -> Result<(), CheckError> {
        if self.is_expired() {
            return Err(CheckError::Timeout {
                rule: rule.to_string(),
                limit: self.limit,
            });
        }
        Ok(())
    }
}

/// Evaluates one rule against a graph.
///
/// Pure: repeated evaluation on the same graph yields identical output.
#[must_use]
pub fn evaluate(rule: &Rule, graph: &SymbolGraph) -> Vec<Violation> {
    // Without a deadline the run cannot time out.
    Evaluation::new(rule, graph, None).run().unwrap_or_default()
}

/// Evaluates one rule, checking `deadline` before starting and between
/// candidates.
///
/// # Errors
///
/// Returns [`CheckError::Timeout`] once the deadline has passed. No
/// partial result is returned.
pub fn evaluate_until(
    rule: &Rule,
    graph: &SymbolGraph,
    deadline: Option<&Deadline>,
) -> Result<Vec<Violation>, CheckError> {
    Evaluation::new(rule, graph, deadline).run()
}

struct Evaluation<'a> {
    rule: &'a Rule,
    graph: &'a SymbolGraph,
    analyzer: DependencyAnalyzer<'a>,
    deadline: Option<&'a Deadline>,
}

impl<'a> Evaluation<'a> {
    fn new(rule: &'a Rule, graph: &'a SymbolGraph, deadline: Option<&'a Deadline>) -> Self {
        Self {
            rule,
            graph,
            analyzer: DependencyAnalyzer::new(graph),
            deadline,
        }
    }

    fn check_deadline(&self) -> Result<(), CheckError> {
        self.deadline
            .map_or(Ok(()), |deadline| deadline.check(self.rule.name()))
    }

    fn run(&self) -> Result<Vec<Violation>, CheckError> {
        self.check_deadline()?;

        let (kind, predicate) = match self.rule.selection() {
            Selection::Classes(p) => (SymbolKind::Class, p),
            Selection::Fields(p) => (SymbolKind::Field, p),
            Selection::Methods(p) => (SymbolKind::Method, p),
            Selection::Slices(pattern) => return self.evaluate_slices(pattern),
        };

        let candidates = self.select(kind, predicate);
        debug!(
            "Rule {}: {} candidate {}(s)",
            self.rule.name(),
            candidates.len(),
            kind
        );
        if candidates.is_empty() {
            return Ok(self.empty_selection());
        }

        let mut violations = Vec::new();
        for id in candidates {
            self.check_deadline()?;
            violations.extend(self.check_candidate(id));
        }

        debug!(
            "Rule {}: {} violation(s)",
            self.rule.name(),
            violations.len()
        );
        Ok(violations)
    }

    fn select(&self, kind: SymbolKind, predicate: &Predicate) -> Vec<SymbolId> {
        self.graph
            .symbols()
            .filter(|(id, symbol)| symbol.kind() == kind && predicate.matches(self.graph, *id))
            .map(|(id, _)| id)
            .collect()
    }

    fn empty_selection(&self) -> Vec<Violation> {
        match self.rule.on_empty() {
            EmptySelection::Allow => Vec::new(),
            EmptySelection::Fail => vec![Violation::new(
                self.rule.name(),
                self.rule.severity(),
                Subject::EmptySelection,
                format!("no candidates matched: {}", self.rule.selection()),
                "selection must not be empty",
            )],
        }
    }

    fn check_candidate(&self, id: SymbolId) -> Option<Violation> {
        let symbol = self.graph.symbol(id);
        let violation = |message: String, failed: String| {
            Violation::new(
                self.rule.name(),
                self.rule.severity(),
                Subject::Symbol {
                    name: symbol.qualified_name().to_string(),
                    kind: symbol.kind(),
                },
                message,
                failed,
            )
        };

        match self.rule.assertion() {
            Assertion::Satisfy(predicate) => {
                let failed = predicate.failing_part(self.graph, id)?;
                Some(violation(
                    format!("{symbol} does not satisfy: {failed}"),
                    failed.to_string(),
                ))
            }
            Assertion::OnlyDependOn(allowed) => {
                let edges = self.analyzer.disallowed_dependencies(id, allowed);
                if edges.is_empty() {
                    return None;
                }
                Some(
                    violation(
                        format!(
                            "{symbol} depends on {} target(s) outside the allowed packages",
                            edges.len()
                        ),
                        self.rule.assertion().to_string(),
                    )
                    .with_details(edges.iter().map(|e| self.analyzer.describe(e))),
                )
            }
            Assertion::OnlyAccessOutsideOf(disallowed) => {
                let edges = self.analyzer.forbidden_accesses(id, disallowed);
                if edges.is_empty() {
                    return None;
                }
                Some(
                    violation(
                        format!(
                            "{symbol} accesses {} target(s) in forbidden packages",
                            edges.len()
                        ),
                        self.rule.assertion().to_string(),
                    )
                    .with_details(edges.iter().map(|e| self.analyzer.describe(e))),
                )
            }
            // Rule::new only pairs cycle freedom with slice selections.
            Assertion::BeFreeOfCycles => None,
        }
    }

    fn evaluate_slices(&self, pattern: &SlicePattern) -> Result<Vec<Violation>, CheckError> {
        let slice_count = self.analyzer.slices(pattern).len();
        debug!("Rule {}: {} slice(s)", self.rule.name(), slice_count);
        if slice_count == 0 {
            return Ok(self.empty_selection());
        }

        self.check_deadline()?;
        let cycles = self.analyzer.slice_cycles(pattern);
        self.check_deadline()?;

        Ok(cycles
            .into_iter()
            .map(|cycle| self.cycle_violation(cycle))
            .collect())
    }

    fn cycle_violation(&self, cycle: SliceCycle) -> Violation {
        let message = format!(
            "slices [{}] form a cycle: {}",
            cycle.slices.join(", "),
            cycle.path.join(" -> ")
        );
        let details = cycle.evidence.clone();
        Violation::new(
            self.rule.name(),
            self.rule.severity(),
            Subject::Cycle(cycle),
            message,
            self.rule.assertion().to_string(),
        )
        .with_details(details)
    }
}
