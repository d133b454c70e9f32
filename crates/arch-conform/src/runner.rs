//! Internal runner for `check!()` macro integration.
//!
//! This module is `#[doc(hidden)]` and not part of the public API.
//! It is called by the generated test function from `arch_conform::check!()`.

use arch_conform_core::declarative::load_rules_from_toml;
use arch_conform_core::{Checker, Config, Rule, Severity, SymbolGraph};
use std::path::{Path, PathBuf};

/// Config file names to search for, in priority order.
const CONFIG_CANDIDATES: &[&str] = &["arch-conform.toml", ".arch-conform.toml"];

/// Runs the conformance check as part of `cargo test`.
///
/// Called by the `check!()` macro-generated test function.
/// Panics with a formatted report if violations are found.
///
/// # Panics
///
/// Panics if violations at or above `fail_on` severity are found, or if
/// the configuration, graph or rules cannot be loaded.
pub fn run_check(config_path: Option<&str>, fail_on: Option<&str>) {
    let root = find_project_root();
    let content = read_config_content(&root, config_path);
    let config = parse_config(&content);

    let effective_fail_on = resolve_fail_on(fail_on, &config);
    let graph = load_graph(&root, &config);
    let rules = load_declarative_rules(&content);

    let checker = Checker::builder()
        .rules(rules)
        .config(config)
        .build()
        .unwrap_or_else(|e| panic!("arch-conform: failed to build checker: {e}"));

    let report = checker
        .check(&graph)
        .unwrap_or_else(|e| panic!("arch-conform: check failed: {e}"));

    if report.has_violations_at(effective_fail_on) {
        let report = report.format_test_report(effective_fail_on);
        panic!("{report}");
    }
}

fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Reads the raw TOML content from the config file.
///
/// Returns an empty string if no config file is found.
fn read_config_content(root: &Path, explicit_path: Option<&str>) -> String {
    if let Some(path) = explicit_path {
        let full_path = resolve_path(root, Path::new(path));
        return std::fs::read_to_string(&full_path).unwrap_or_else(|e| {
            panic!(
                "arch-conform: failed to read config from {}: {e}",
                full_path.display()
            );
        });
    }

    for candidate in CONFIG_CANDIDATES {
        let path = root.join(candidate);
        if path.exists() {
            return std::fs::read_to_string(&path).unwrap_or_else(|e| {
                panic!(
                    "arch-conform: failed to read config from {}: {e}",
                    path.display()
                );
            });
        }
    }

    String::new()
}

/// Parses a `Config` from TOML content.
fn parse_config(content: &str) -> Config {
    if content.is_empty() {
        return Config::default();
    }
    Config::parse(content).unwrap_or_else(|e| {
        panic!("arch-conform: failed to parse config: {e}");
    })
}

/// Loads the symbol graph named by `[graph] path`.
fn load_graph(root: &Path, config: &Config) -> SymbolGraph {
    let path = resolve_path(root, &config.graph.path);
    let json = std::fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!(
            "arch-conform: failed to read symbol graph from {}: {e}",
            path.display()
        );
    });
    SymbolGraph::from_json(&json).unwrap_or_else(|e| {
        panic!(
            "arch-conform: invalid symbol graph {}: {e}",
            path.display()
        );
    })
}

/// Loads declarative rules from TOML content.
///
/// Returns an empty vec if no `[[rule]]` tables are present.
fn load_declarative_rules(content: &str) -> Vec<Rule> {
    if content.is_empty() {
        return vec![];
    }
    load_rules_from_toml(content)
        .unwrap_or_else(|e| panic!("arch-conform: declarative rule error: {e}"))
}

/// Checks whether a `Cargo.toml` file defines a `[workspace]` section
/// by parsing as TOML, avoiding false positives from comments or strings.
fn has_workspace_section(cargo_toml: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(cargo_toml) else {
        return false;
    };
    let Ok(table) = content.parse::<toml::Table>() else {
        return false;
    };
    table.contains_key("workspace")
}

/// Finds the project root by looking for `Cargo.toml` from `CARGO_MANIFEST_DIR`.
fn find_project_root() -> PathBuf {
    // CARGO_MANIFEST_DIR points to the crate containing the test,
    // which may be a workspace member. Walk up to find workspace root.
    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let manifest_path = PathBuf::from(&manifest_dir);

        let mut candidate = manifest_path.as_path();
        loop {
            let cargo_toml = candidate.join("Cargo.toml");
            if cargo_toml.exists() && has_workspace_section(&cargo_toml) {
                return candidate.to_path_buf();
            }
            match candidate.parent() {
                Some(parent) => candidate = parent,
                None => break,
            }
        }

        // No workspace root found, use manifest dir itself
        return manifest_path;
    }

    // Fallback: current directory
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolves the effective `fail_on` severity.
///
/// Priority: explicit macro arg > config file > default ("error").
fn resolve_fail_on(macro_arg: Option<&str>, config: &Config) -> Severity {
    match macro_arg {
        Some(name) => name
            .parse()
            .unwrap_or_else(|e| panic!("arch-conform: {e}")),
        None => config.fail_on(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GRAPH: &str = r#"{
        "builtins": ["java.."],
        "symbols": [
            { "kind": "class", "name": "app.controller.OrderController" },
            { "kind": "class", "name": "app.service.OrderService" }
        ],
        "edges": [
            { "from": "app.controller.OrderController", "to": "app.service.OrderService" }
        ]
    }"#;

    // ── fail_on resolution ──

    #[test]
    fn resolve_fail_on_defaults_to_error() {
        let config = Config::default();
        assert_eq!(resolve_fail_on(None, &config), Severity::Error);
    }

    #[test]
    fn resolve_fail_on_from_config() {
        let mut config = Config::default();
        config.fail_on = Some(Severity::Warning);
        assert_eq!(resolve_fail_on(None, &config), Severity::Warning);
    }

    #[test]
    fn resolve_fail_on_macro_arg_overrides_config() {
        let mut config = Config::default();
        config.fail_on = Some(Severity::Info);
        assert_eq!(resolve_fail_on(Some("warning"), &config), Severity::Warning);
    }

    #[test]
    fn resolve_fail_on_explicit_error_overrides_config() {
        let mut config = Config::default();
        config.fail_on = Some(Severity::Warning);
        assert_eq!(resolve_fail_on(Some("error"), &config), Severity::Error);
    }

    #[test]
    #[should_panic(expected = "unknown severity")]
    fn resolve_fail_on_invalid_panics() {
        let config = Config::default();
        resolve_fail_on(Some("critical"), &config);
    }

    // ── Config and graph files ──

    #[test]
    fn read_config_content_finds_default_candidate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".arch-conform.toml"), "fail_on = \"info\"").unwrap();

        let content = read_config_content(dir.path(), None);
        assert_eq!(parse_config(&content).fail_on(), Severity::Info);
    }

    #[test]
    fn read_config_content_without_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_config_content(dir.path(), None).is_empty());
    }

    #[test]
    #[should_panic(expected = "failed to read config")]
    fn read_config_content_missing_explicit_path_panics() {
        let dir = tempfile::tempdir().unwrap();
        read_config_content(dir.path(), Some("missing.toml"));
    }

    #[test]
    fn load_graph_resolves_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/graph.json"), GRAPH).unwrap();

        let config = parse_config("[graph]\npath = \"build/graph.json\"");
        let graph = load_graph(dir.path(), &config);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    #[should_panic(expected = "invalid symbol graph")]
    fn load_graph_rejects_unresolved_reference() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("graph.json"),
            r#"{ "symbols": [ { "kind": "class", "name": "a.A" } ],
                 "edges": [ { "from": "a.A", "to": "b.Missing" } ] }"#,
        )
        .unwrap();

        let config = parse_config("[graph]\npath = \"graph.json\"");
        load_graph(dir.path(), &config);
    }

    #[test]
    fn has_workspace_section_ignores_comments() {
        let dir = tempfile::tempdir().unwrap();
        let member = dir.path().join("Cargo.toml");
        fs::write(&member, "# [workspace]\n[package]\nname = \"x\"\n").unwrap();
        assert!(!has_workspace_section(&member));

        fs::write(&member, "[workspace]\nmembers = []\n").unwrap();
        assert!(has_workspace_section(&member));
    }

    // ── Declarative rules loading ──

    #[test]
    fn load_declarative_rules_empty_content() {
        assert!(load_declarative_rules("").is_empty());
    }

    #[test]
    fn load_declarative_rules_no_rule_tables() {
        let toml = r#"
fail_on = "error"

[graph]
path = "symbols.json"
"#;
        assert!(load_declarative_rules(toml).is_empty());
    }

    #[test]
    fn load_declarative_rules_creates_rules() {
        let toml = r#"
[[rule]]
name = "controllers-only-depend-on-services"
classes = { resides-in = "..controller.." }
should = { only-depend-on = ["..service..", "java.."] }
on-empty = "fail"
"#;
        let rules = load_declarative_rules(toml);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name(), "controllers-only-depend-on-services");
    }

    #[test]
    #[should_panic(expected = "declarative rule error")]
    fn load_declarative_rules_without_on_empty_panics() {
        let toml = r#"
[[rule]]
name = "naming"
classes = "any"
should = { satisfy = { simple-name-ends-with = "X" } }
"#;
        load_declarative_rules(toml);
    }
}
