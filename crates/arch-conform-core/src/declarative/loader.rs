//! DTO → Domain model conversion with validation.

use crate::pattern::{PackagePattern, PatternError, SlicePattern};
use crate::predicate::Predicate;
use crate::rule::{Assertion, EmptySelection, Rule, RuleDefinitionError, Selection};
use crate::types::Severity;

use super::config_dto::{AssertionDto, PredicateDto, RuleDto, RuleFileDto};

/// Errors during DTO → Domain conversion.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum LoadError {
    /// A pattern or rule-level validation error.
    #[error("{context}: {source}")]
    #[diagnostic(code(arch_conform::declarative::validation))]
    Validation {
        /// Where the error occurred (e.g., "rule[2].should.only-depend-on[0]").
        context: String,
        /// The underlying definition error.
        source: RuleDefinitionError,
    },

    /// Zero or several of `classes`, `fields`, `methods`, `slices` are set.
    #[error("{context}: exactly one of `classes`, `fields`, `methods` or `slices` must be set")]
    #[diagnostic(code(arch_conform::declarative::ambiguous_selection))]
    AmbiguousSelection {
        /// The offending rule.
        context: String,
    },

    /// `on-empty` is missing.
    #[error("{context}: `on-empty` is required, expected: allow, fail")]
    #[diagnostic(
        code(arch_conform::declarative::missing_on_empty),
        help("state whether an empty selection passes (`allow`) or fails (`fail`)")
    )]
    MissingOnEmpty {
        /// The offending rule.
        context: String,
    },

    /// Unknown `on-empty` policy.
    #[error("{context}: unknown on-empty policy `{value}`, expected: allow, fail")]
    #[diagnostic(code(arch_conform::declarative::unknown_on_empty))]
    UnknownOnEmpty {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// Unknown severity string.
    #[error("{context}: unknown severity `{value}`, expected: error, warning, info")]
    #[diagnostic(code(arch_conform::declarative::unknown_severity))]
    UnknownSeverity {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
    },
}

fn invalid(context: String, source: impl Into<RuleDefinitionError>) -> LoadError {
    LoadError::Validation {
        context,
        source: source.into(),
    }
}

/// Converts a `RuleFileDto` to validated rules, in file order.
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load(dto: RuleFileDto) -> Result<Vec<Rule>, LoadError> {
    dto.rules
        .into_iter()
        .enumerate()
        .map(|(i, rule)| convert_rule(rule, i))
        .collect()
}

fn convert_rule(dto: RuleDto, index: usize) -> Result<Rule, LoadError> {
    let ctx = format!("rule[{index}]");

    let selection = convert_selection(dto.classes, dto.fields, dto.methods, dto.slices, &ctx)?;
    let assertion = convert_assertion(dto.should, &format!("{ctx}.should"))?;
    let on_empty = parse_on_empty(dto.on_empty.as_deref(), &ctx)?;
    let severity = parse_severity(&dto.severity, &format!("{ctx}.severity"))?;

    let rule = Rule::new(dto.name, selection, assertion, on_empty)
        .map_err(|e| invalid(ctx, e))?
        .with_severity(severity);

    Ok(match dto.description {
        Some(description) => rule.with_description(description),
        None => rule,
    })
}

fn convert_selection(
    classes: Option<PredicateDto>,
    fields: Option<PredicateDto>,
    methods: Option<PredicateDto>,
    slices: Option<String>,
    ctx: &str,
) -> Result<Selection, LoadError> {
    match (classes, fields, methods, slices) {
        (Some(p), None, None, None) => Ok(Selection::Classes(convert_predicate(
            p,
            &format!("{ctx}.classes"),
        )?)),
        (None, Some(p), None, None) => Ok(Selection::Fields(convert_predicate(
            p,
            &format!("{ctx}.fields"),
        )?)),
        (None, None, Some(p), None) => Ok(Selection::Methods(convert_predicate(
            p,
            &format!("{ctx}.methods"),
        )?)),
        (None, None, None, Some(pattern)) => SlicePattern::new(&pattern)
            .map(Selection::Slices)
            .map_err(|e| invalid(format!("{ctx}.slices"), e)),
        _ => Err(LoadError::AmbiguousSelection {
            context: ctx.to_string(),
        }),
    }
}

fn convert_predicate(dto: PredicateDto, ctx: &str) -> Result<Predicate, LoadError> {
    let pattern_error = |key: &str, e: PatternError| invalid(format!("{ctx}.{key}"), e);

    Ok(match dto {
        PredicateDto::Any => Predicate::Any,
        PredicateDto::ResidesIn(pattern) => {
            Predicate::resides_in(&pattern).map_err(|e| pattern_error("resides-in", e))?
        }
        PredicateDto::ResidesInAny(patterns) => Predicate::ResidesInAny(convert_patterns(
            &patterns,
            &format!("{ctx}.resides-in-any"),
        )?),
        PredicateDto::SimpleNameEndsWith(suffix) => Predicate::simple_name_ends_with(suffix),
        PredicateDto::SimpleNameStartsWith(prefix) => Predicate::simple_name_starts_with(prefix),
        PredicateDto::SimpleNameMatches(glob) => Predicate::simple_name_matches(&glob)
            .map_err(|e| pattern_error("simple-name-matches", e))?,
        PredicateDto::AnnotatedWith(annotation) => Predicate::annotated_with(annotation),
        PredicateDto::AssignableTo(type_name) => Predicate::assignable_to(type_name),
        PredicateDto::DeclaredIn(inner) => {
            Predicate::declared_in(convert_predicate(*inner, &format!("{ctx}.declared-in"))?)
        }
        PredicateDto::All(inner) => Predicate::All(convert_predicates(inner, &format!("{ctx}.all"))?),
        PredicateDto::AnyOf(inner) => {
            Predicate::AnyOf(convert_predicates(inner, &format!("{ctx}.any-of"))?)
        }
        PredicateDto::Not(inner) => convert_predicate(*inner, &format!("{ctx}.not"))?.negated(),
    })
}

fn convert_predicates(items: Vec<PredicateDto>, ctx: &str) -> Result<Vec<Predicate>, LoadError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, p)| convert_predicate(p, &format!("{ctx}[{i}]")))
        .collect()
}

fn convert_patterns(patterns: &[String], ctx: &str) -> Result<Vec<PackagePattern>, LoadError> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, p)| PackagePattern::new(p).map_err(|e| invalid(format!("{ctx}[{i}]"), e)))
        .collect()
}

fn convert_assertion(dto: AssertionDto, ctx: &str) -> Result<Assertion, LoadError> {
    match dto {
        AssertionDto::Satisfy(predicate) => Ok(Assertion::Satisfy(convert_predicate(
            predicate,
            &format!("{ctx}.satisfy"),
        )?)),
        AssertionDto::OnlyDependOn(patterns) => Ok(Assertion::OnlyDependOn(convert_patterns(
            &patterns,
            &format!("{ctx}.only-depend-on"),
        )?)),
        AssertionDto::OnlyAccessOutsideOf(patterns) => Ok(Assertion::OnlyAccessOutsideOf(
            convert_patterns(&patterns, &format!("{ctx}.only-access-outside-of"))?,
        )),
        AssertionDto::BeFreeOfCycles => Ok(Assertion::BeFreeOfCycles),
    }
}

fn parse_on_empty(value: Option<&str>, context: &str) -> Result<EmptySelection, LoadError> {
    match value {
        Some("allow") => Ok(EmptySelection::Allow),
        Some("fail") => Ok(EmptySelection::Fail),
        Some(other) => Err(LoadError::UnknownOnEmpty {
            context: format!("{context}.on-empty"),
            value: other.to_string(),
        }),
        None => Err(LoadError::MissingOnEmpty {
            context: context.to_string(),
        }),
    }
}

fn parse_severity(value: &str, context: &str) -> Result<Severity, LoadError> {
    value.parse().map_err(|_| LoadError::UnknownSeverity {
        context: context.to_string(),
        value: value.to_string(),
    })
}
