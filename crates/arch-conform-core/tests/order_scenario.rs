//! End-to-end checks of the layering rules against the Order application
//! graph.

use arch_conform_core::declarative::load_rules_from_toml;
use arch_conform_core::{
    evaluate, Assertion, CheckError, Checker, Config, EmptySelection, Predicate, Rule, Selection,
    Severity, Subject, SymbolGraph, SymbolKind,
};
use std::time::Duration;

const RULES: &str = include_str!("fixtures/spring-layers.toml");
const GRAPH: &str = include_str!("fixtures/order-app.json");

fn graph() -> SymbolGraph {
    SymbolGraph::from_json(GRAPH).unwrap()
}

fn checker() -> Checker {
    Checker::builder()
        .rules(load_rules_from_toml(RULES).unwrap())
        .config(Config::parse(RULES).unwrap())
        .build()
        .unwrap()
}

#[test]
fn all_eight_rules_load_in_order() {
    let rules = load_rules_from_toml(RULES).unwrap();
    let names: Vec<&str> = rules.iter().map(Rule::name).collect();
    assert_eq!(
        names,
        [
            "controllers-named-correctly",
            "services-named-correctly",
            "repositories-named-correctly",
            "controllers-only-depend-on-services",
            "no-field-injection",
            "no-cycles",
            "services-do-not-access-controllers",
            "exceptions-named-correctly",
        ]
    );
    assert!(rules.iter().all(|r| r.on_empty() == EmptySelection::Allow));
}

#[test]
fn only_field_injection_is_violated() {
    let report = checker().check(&graph()).unwrap();

    assert!(!report.is_conformant());
    assert_eq!(report.violated_rules(), ["no-field-injection"]);
    assert_eq!(report.satisfied_rules().len(), 7);

    let outcome = report.get("no-field-injection").unwrap();
    assert_eq!(outcome.violations.len(), 1);
    assert_eq!(
        outcome.violations[0].subject,
        Subject::Symbol {
            name: "com.example.ArchUnit.controller.OrderController.orderService".into(),
            kind: SymbolKind::Field,
        }
    );
}

#[test]
fn test_report_names_the_injected_field() {
    let report = checker().check(&graph()).unwrap();
    let text = report.format_test_report(Severity::Error);

    insta::assert_snapshot!(text.trim(), @r"
    === arch-conform: 1 violation(s) ===

    no-field-injection at field <com.example.ArchUnit.controller.OrderController.orderService>
      error: field <com.example.ArchUnit.controller.OrderController.orderService> does not satisfy: not (is annotated with @Autowired)
      = failed: not (is annotated with @Autowired)

    Total: 1 error(s), 0 warning(s), 0 info(s) across 8 rule(s), 11 symbol(s)
    ");
}

#[test]
fn evaluation_is_idempotent() {
    let graph = graph();
    let checker = checker();
    assert_eq!(checker.check(&graph).unwrap(), checker.check(&graph).unwrap());
}

#[test]
fn parallel_and_sequential_reports_match() {
    let graph = graph();
    let rules = load_rules_from_toml(RULES).unwrap();

    let parallel = Checker::builder()
        .rules(rules.clone())
        .parallel(true)
        .build()
        .unwrap();
    let sequential = Checker::builder()
        .rules(rules)
        .parallel(false)
        .build()
        .unwrap();

    assert_eq!(
        parallel.check(&graph).unwrap(),
        sequential.check(&graph).unwrap()
    );
}

#[test]
fn rule_built_in_code_matches_declarative_rule() {
    let graph = graph();
    let in_code = Rule::new(
        "no-field-injection",
        Selection::Fields(Predicate::declared_in(
            Predicate::resides_in("..controller..").unwrap(),
        )),
        Assertion::Satisfy(Predicate::annotated_with("Autowired").negated()),
        EmptySelection::Allow,
    )
    .unwrap();

    let declarative = load_rules_from_toml(RULES)
        .unwrap()
        .into_iter()
        .find(|r| r.name() == "no-field-injection")
        .unwrap();

    assert_eq!(evaluate(&in_code, &graph), evaluate(&declarative, &graph));
}

#[test]
fn controller_reaching_into_repository_is_reported() {
    let json = GRAPH.replace(
        r#""to": "java.lang.String", "kind": "method-call" },"#,
        r#""to": "java.lang.String", "kind": "method-call" },
    { "from": "com.example.ArchUnit.controller.OrderController.getOrder(long)",
      "to": "com.example.ArchUnit.repository.OrderRepository", "kind": "method-call" },"#,
    );
    let graph = SymbolGraph::from_json(&json).unwrap();
    let report = checker().check(&graph).unwrap();

    let outcome = report.get("controllers-only-depend-on-services").unwrap();
    assert_eq!(outcome.violations.len(), 1);
    assert_eq!(
        outcome.violations[0].details,
        [
            "com.example.ArchUnit.controller.OrderController.getOrder(long) -> com.example.ArchUnit.repository.OrderRepository (method call)"
        ]
    );
}

#[test]
fn service_calling_back_into_controller_creates_cycle() {
    let json = GRAPH.replace(
        r#""to": "com.example.ArchUnit.exception.OrderNotFoundException" },"#,
        r#""to": "com.example.ArchUnit.exception.OrderNotFoundException" },
    { "from": "com.example.ArchUnit.service.OrderService",
      "to": "com.example.ArchUnit.controller.OrderController" },"#,
    );
    let graph = SymbolGraph::from_json(&json).unwrap();
    let report = checker().check(&graph).unwrap();

    assert_eq!(
        report.violated_rules(),
        [
            "no-field-injection",
            "no-cycles",
            "services-do-not-access-controllers"
        ]
    );
    let cycle = &report.get("no-cycles").unwrap().violations[0];
    assert_eq!(
        cycle.message,
        "slices [controller, service] form a cycle: controller -> service -> controller"
    );
}

#[test]
fn severity_override_lowers_failure() {
    let config = Config::parse(
        r#"
[rules.no-field-injection]
severity = "warning"
"#,
    )
    .unwrap();
    let checker = Checker::builder()
        .rules(load_rules_from_toml(RULES).unwrap())
        .config(config)
        .build()
        .unwrap();
    let report = checker.check(&graph()).unwrap();

    assert!(!report.has_violations_at(Severity::Error));
    assert!(report.has_violations_at(Severity::Warning));
}

#[test]
fn zero_timeout_yields_timeout_error() {
    let checker = Checker::builder()
        .rules(load_rules_from_toml(RULES).unwrap())
        .timeout(Duration::ZERO)
        .build()
        .unwrap();
    assert!(matches!(
        checker.check(&graph()),
        Err(CheckError::Timeout { .. })
    ));
}

#[test]
fn report_serializes_for_external_formatters() {
    let report = checker().check(&graph()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["outcomes"].as_array().map(Vec::len), Some(8));
    assert_eq!(json["outcomes"][4]["rule"], "no-field-injection");
    assert_eq!(
        json["outcomes"][4]["violations"][0]["subject"]["name"],
        "com.example.ArchUnit.controller.OrderController.orderService"
    );
}
