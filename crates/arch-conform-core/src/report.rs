//! Aggregation of per-rule results into a conformance report.

use crate::types::{Severity, Violation};

use serde::Serialize;
use std::fmt::Write;

/// Violations of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    /// Rule name.
    pub rule: String,
    /// Violations in evaluation order. Empty if the rule is satisfied.
    pub violations: Vec<Violation>,
}

impl RuleOutcome {
    /// Returns true if the rule produced no violations.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Aggregated result for a batch of rules, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConformanceReport {
    /// One outcome per evaluated rule.
    pub outcomes: Vec<RuleOutcome>,
    /// Number of symbols in the checked graph.
    pub symbols_checked: usize,
}

impl ConformanceReport {
    /// Builds a report from results tagged with their rule index.
    ///
    /// Results may arrive in any order; they are sorted by index so the
    /// report always follows rule order.
    #[must_use]
    pub fn aggregate(
        mut results: Vec<(usize, RuleOutcome)>,
        symbols_checked: usize,
    ) -> Self {
        results.sort_by_key(|(index, _)| *index);
        Self {
            outcomes: results.into_iter().map(|(_, outcome)| outcome).collect(),
            symbols_checked,
        }
    }

    /// Returns true iff every rule is satisfied.
    #[must_use]
    pub fn is_conformant(&self) -> bool {
        self.outcomes.iter().all(RuleOutcome::is_satisfied)
    }

    /// Looks up the outcome of a rule by name.
    #[must_use]
    pub fn get(&self, rule: &str) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| o.rule == rule)
    }

    /// Names of satisfied rules, in rule order.
    #[must_use]
    pub fn satisfied_rules(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_satisfied())
            .map(|o| o.rule.as_str())
            .collect()
    }

    /// Names of violated rules, in rule order.
    #[must_use]
    pub fn violated_rules(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_satisfied())
            .map(|o| o.rule.as_str())
            .collect()
    }

    /// Iterates over all violations in rule order.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.outcomes.iter().flat_map(|o| o.violations.iter())
    }

    /// Counts violations by severity.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let count = |severity| self.violations().filter(|v| v.severity == severity).count();
        (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        )
    }

    /// Checks if any violations meet or exceed the given severity threshold.
    #[must_use]
    pub fn has_violations_at(&self, severity: Severity) -> bool {
        self.violations().any(|v| v.severity >= severity)
    }

    /// Formats violations at or above `fail_on` as a test failure report.
    ///
    /// Produces a human-readable multi-line report suitable for `panic!()`
    /// messages in `cargo test` integration.
    #[must_use]
    pub fn format_test_report(&self, fail_on: Severity) -> String {
        let failing: Vec<&Violation> = self
            .violations()
            .filter(|v| v.severity >= fail_on)
            .collect();

        let mut report = String::new();
        let _ = writeln!(
            report,
            "\n=== arch-conform: {} violation(s) ===\n",
            failing.len()
        );

        for v in &failing {
            let _ = writeln!(report, "{}", v.format());
        }

        let (errors, warnings, infos) = self.count_by_severity();
        let _ = writeln!(
            report,
            "Total: {} error(s), {} warning(s), {} info(s) across {} rule(s), {} symbol(s)",
            errors,
            warnings,
            infos,
            self.outcomes.len(),
            self.symbols_checked
        );

        report
    }

    /// Serializes the report as pretty-printed JSON for external formatters.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
