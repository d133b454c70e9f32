//! Batch runner that applies configuration and evaluates rules.

use crate::config::Config;
use crate::evaluator::{evaluate_until, Deadline};
use crate::graph::SymbolGraph;
use crate::report::{ConformanceReport, RuleOutcome};
use crate::rule::Rule;
use crate::types::Violation;

use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Errors that abort a check run. No partial report is produced.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CheckError {
    /// Two rules in one batch share a name.
    #[error("duplicate rule name `{name}`")]
    #[diagnostic(
        code(arch_conform::check::duplicate_rule),
        help("rule names key the report; rename one of the rules")
    )]
    DuplicateRule {
        /// The duplicated name.
        name: String,
    },

    /// The global deadline passed during evaluation.
    #[error("evaluation exceeded the {limit:?} deadline while checking `{rule}`")]
    #[diagnostic(code(arch_conform::check::timeout))]
    Timeout {
        /// The rule being evaluated when the deadline passed.
        rule: String,
        /// The configured limit.
        limit: Duration,
    },
}

/// Builder for configuring a [`Checker`].
#[derive(Default)]
pub struct CheckerBuilder {
    rules: Vec<Rule>,
    config: Option<Config>,
    timeout: Option<Duration>,
    parallel: Option<bool>,
}

impl CheckerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds multiple rules.
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the global deadline, overriding `[evaluation] timeout_ms`.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets parallel evaluation, overriding `[evaluation] parallel`.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Builds the checker.
    ///
    /// # Errors
    ///
    /// Returns an error if two rules share a name.
    pub fn build(self) -> Result<Checker, CheckError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.name()) {
                return Err(CheckError::DuplicateRule {
                    name: rule.name().to_string(),
                });
            }
        }

        let config = self.config.unwrap_or_default();
        for name in config.rules.keys() {
            if !seen.contains(name.as_str()) {
                warn!("Configuration overrides unknown rule: {}", name);
            }
        }

        Ok(Checker {
            timeout: self.timeout.or_else(|| config.evaluation.timeout()),
            parallel: self.parallel.unwrap_or(config.evaluation.parallel),
            rules: self.rules,
            config,
        })
    }
}

/// Evaluates a batch of rules against a symbol graph.
///
/// Use [`Checker::builder()`] to construct an instance.
pub struct Checker {
    rules: Vec<Rule>,
    config: Config,
    timeout: Option<Duration>,
    parallel: bool,
}

impl Checker {
    /// Creates a new builder for configuring a checker.
    #[must_use]
    pub fn builder() -> CheckerBuilder {
        CheckerBuilder::new()
    }

    /// Returns the registered rules in order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluates every enabled rule and aggregates the results in rule
    /// order. Disabled rules are left out of the report.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::Timeout`] if the deadline passes before every
    /// rule is evaluated.
    pub fn check(&self, graph: &SymbolGraph) -> Result<ConformanceReport, CheckError> {
        info!(
            "Checking {} rule(s) against {} symbol(s)",
            self.rules.len(),
            graph.len()
        );

        let deadline = self.timeout.map(Deadline::after);
        let enabled: Vec<(usize, &Rule)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| {
                let enabled = self.config.is_rule_enabled(rule.name());
                if !enabled {
                    debug!("Skipping disabled rule: {}", rule.name());
                }
                enabled
            })
            .collect();

        let run = |&(index, rule): &(usize, &Rule)| -> Result<(usize, RuleOutcome), CheckError> {
            let violations = evaluate_until(rule, graph, deadline.as_ref())?;
            Ok((
                index,
                RuleOutcome {
                    rule: rule.name().to_string(),
                    violations: self.apply_severity_override(rule.name(), violations),
                },
            ))
        };

        let results: Result<Vec<_>, CheckError> = if self.parallel {
            enabled.par_iter().map(run).collect()
        } else {
            enabled.iter().map(run).collect()
        };
        let results = match results {
            Ok(results) => results,
            Err(e) => {
                warn!("Check aborted: {}", e);
                return Err(e);
            }
        };

        let report = ConformanceReport::aggregate(results, graph.len());
        info!(
            "Check complete: {} violation(s) in {} of {} rule(s)",
            report.violations().count(),
            report.violated_rules().len(),
            report.outcomes.len()
        );
        Ok(report)
    }

    /// Applies severity overrides from configuration.
    fn apply_severity_override(
        &self,
        rule_name: &str,
        mut violations: Vec<Violation>,
    ) -> Vec<Violation> {
        if let Some(severity) = self.config.rule_severity(rule_name) {
            for v in &mut violations {
                v.severity = severity;
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, Symbol};
    use crate::predicate::Predicate;
    use crate::rule::{Assertion, EmptySelection, Selection};
    use crate::types::Severity;

    fn graph() -> SymbolGraph {
        SymbolGraph::builder()
            .symbol(Symbol::class("app.controller.OrderHandler"))
            .symbol(Symbol::class("app.service.OrderService"))
            .edge(
                "app.controller.OrderHandler",
                "app.service.OrderService",
                EdgeKind::FieldType,
            )
            .build()
            .unwrap()
    }

    fn naming(name: &str, package: &str, suffix: &str) -> Rule {
        Rule::new(
            name,
            Selection::Classes(Predicate::resides_in(package).unwrap()),
            Assertion::Satisfy(Predicate::simple_name_ends_with(suffix)),
            EmptySelection::Allow,
        )
        .unwrap()
    }

    fn rules() -> Vec<Rule> {
        vec![
            naming("controllers-named-correctly", "..controller..", "Controller"),
            naming("services-named-correctly", "..service..", "Service"),
            naming("repositories-named-correctly", "..repository..", "Repository"),
        ]
    }

    #[test]
    fn duplicate_rule_names_rejected() {
        let result = Checker::builder()
            .rule(naming("a", "..x..", "X"))
            .rule(naming("a", "..y..", "Y"))
            .build();
        assert!(matches!(result, Err(CheckError::DuplicateRule { ref name }) if name == "a"));
    }

    #[test]
    fn report_follows_rule_order() {
        let checker = Checker::builder().rules(rules()).build().unwrap();
        let report = checker.check(&graph()).unwrap();

        assert_eq!(checker.rule_count(), 3);
        assert_eq!(
            report.violated_rules(),
            vec!["controllers-named-correctly"]
        );
        assert_eq!(
            report.satisfied_rules(),
            vec!["services-named-correctly", "repositories-named-correctly"]
        );
        assert_eq!(report.symbols_checked, 2);
    }

    #[test]
    fn parallel_and_sequential_reports_match() {
        let graph = graph();
        let parallel = Checker::builder().rules(rules()).parallel(true).build().unwrap();
        let sequential = Checker::builder().rules(rules()).parallel(false).build().unwrap();
        assert_eq!(
            parallel.check(&graph).unwrap(),
            sequential.check(&graph).unwrap()
        );
    }

    #[test]
    fn config_disables_and_overrides_severity() {
        let config = Config::parse(
            r#"
[rules.services-named-correctly]
enabled = false

[rules.controllers-named-correctly]
severity = "warning"
"#,
        )
        .unwrap();
        let checker = Checker::builder().rules(rules()).config(config).build().unwrap();
        let report = checker.check(&graph()).unwrap();

        assert!(report.get("services-named-correctly").is_none());
        assert_eq!(report.outcomes.len(), 2);
        let outcome = report.get("controllers-named-correctly").unwrap();
        assert_eq!(outcome.violations[0].severity, Severity::Warning);
        assert!(!report.has_violations_at(Severity::Error));
    }

    #[test]
    fn zero_timeout_fails_without_report() {
        let checker = Checker::builder()
            .rules(rules())
            .timeout(Duration::ZERO)
            .build()
            .unwrap();
        assert!(matches!(
            checker.check(&graph()),
            Err(CheckError::Timeout { .. })
        ));
    }

    #[test]
    fn timeout_from_config() {
        let config = Config::parse("[evaluation]\ntimeout_ms = 0\nparallel = false").unwrap();
        let checker = Checker::builder().rules(rules()).config(config).build().unwrap();
        assert!(matches!(
            checker.check(&graph()),
            Err(CheckError::Timeout { .. })
        ));
    }
}
