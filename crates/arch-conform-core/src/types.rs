//! Core types for conformance violations.

use crate::dependency::SliceCycle;
use crate::graph::SymbolKind;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for rule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail the check.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown severity `{other}` (expected info, warning or error)"
            )),
        }
    }
}

/// What a violation is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Subject {
    /// An offending class, field or method.
    Symbol {
        /// Qualified name of the symbol.
        name: String,
        /// Kind of the symbol.
        kind: SymbolKind,
    },
    /// A dependency cycle among slices.
    Cycle(SliceCycle),
    /// The rule itself, when its selection matched nothing.
    EmptySelection,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol { name, kind } => write!(f, "{kind} <{name}>"),
            Self::Cycle(cycle) => write!(f, "cycle {}", cycle.path.join(" -> ")),
            Self::EmptySelection => write!(f, "empty selection"),
        }
    }
}

/// A conformance violation. Immutable once reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Rule name.
    pub rule: String,
    /// Severity of this violation.
    pub severity: Severity,
    /// What the violation is about.
    pub subject: Subject,
    /// Human-readable message.
    pub message: String,
    /// Description of the predicate or assertion that failed.
    pub failed: String,
    /// Supporting evidence, e.g. offending dependency edges.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl Violation {
    /// Creates a new violation without details.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        severity: Severity,
        subject: Subject,
        message: impl Into<String>,
        failed: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            severity,
            subject,
            message: message.into(),
            failed: failed.into(),
            details: Vec::new(),
        }
    }

    /// Adds supporting details.
    #[must_use]
    pub fn with_details(mut self, details: impl IntoIterator<Item = String>) -> Self {
        self.details.extend(details);
        self
    }

    /// Formats the violation for multi-line output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!("{} at {}\n", self.rule, self.subject);
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        let _ = writeln!(output, "  = failed: {}", self.failed);
        for detail in &self.details {
            let _ = writeln!(output, "  - {detail}");
        }
        output
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.rule, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_violation() -> Violation {
        Violation::new(
            "no-field-injection",
            Severity::Error,
            Subject::Symbol {
                name: "app.controller.OrderController.service".into(),
                kind: SymbolKind::Field,
            },
            "field <app.controller.OrderController.service> is annotated with @Autowired",
            "not (is annotated with @Autowired)",
        )
    }

    #[test]
    fn severity_orders_and_parses() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warning));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn display_is_single_line() {
        let v = field_violation();
        assert_eq!(
            v.to_string(),
            "error [no-field-injection] field <app.controller.OrderController.service> is annotated with @Autowired"
        );
    }

    #[test]
    fn format_lists_details() {
        let v = Violation::new(
            "controllers-only-depend-on-services",
            Severity::Warning,
            Subject::Symbol {
                name: "app.controller.OrderController".into(),
                kind: SymbolKind::Class,
            },
            "class <app.controller.OrderController> depends on 1 disallowed target(s)",
            "only depend on packages ['..service..']",
        )
        .with_details(["app.controller.OrderController -> app.repository.OrderRepository (field type)".to_string()]);

        insta::assert_snapshot!(v.format(), @r"
        controllers-only-depend-on-services at class <app.controller.OrderController>
          warning: class <app.controller.OrderController> depends on 1 disallowed target(s)
          = failed: only depend on packages ['..service..']
          - app.controller.OrderController -> app.repository.OrderRepository (field type)
        ");
    }

    #[test]
    fn cycle_subject_shows_path() {
        let subject = Subject::Cycle(SliceCycle {
            slices: vec!["a".into(), "b".into()],
            path: vec!["a".into(), "b".into(), "a".into()],
            evidence: Vec::new(),
        });
        assert_eq!(subject.to_string(), "cycle a -> b -> a");
    }

    #[test]
    fn subject_serializes_with_type_tag() {
        let json = serde_json::to_value(field_violation()).unwrap();
        assert_eq!(json["subject"]["type"], "symbol");
        assert_eq!(json["subject"]["kind"], "field");
        assert!(json.get("details").is_none());
    }
}
