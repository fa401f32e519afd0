// End-to-end: rule text in, violations out, against a populated store.

use girder_core::sqlite::AstStore;
use girder_engine::QueryEngine;
use girder_rules::parse_rules;

use crate::common::{batch, call, method_node};

#[test]
fn test_forbid_relationship_violation() {
    let store = AstStore::in_memory().unwrap();
    let ctrl = method_node(1, "app.go", "controller", "List");
    let repo = method_node(2, "app.go", "repository", "FindAll");
    store
        .replace_file("app.go", &batch(vec![ctrl, repo], vec![call(1, Some(2), 12)]))
        .unwrap();

    let rules = parse_rules(
        r#"RULE "r" { FORBID(controller.* -> repository.*) }"#,
        "arch.aql",
    )
    .unwrap();
    let violations = QueryEngine::new(&store).execute(&rules).unwrap();

    assert_eq!(violations.len(), 1);
    let v = &violations[0];
    assert_eq!(v.file, "app.go");
    assert_eq!(v.line, 12);
    assert_eq!(v.source, "aql");
    assert_eq!(v.rule, "r");
}

#[test]
fn test_require_relationship_missing_dependency() {
    let store = AstStore::in_memory().unwrap();
    let ctrl = method_node(1, "app.go", "controller", "List");
    let svc = method_node(2, "app.go", "service", "Load");
    store
        .replace_file("app.go", &batch(vec![ctrl, svc], vec![call(1, Some(2), 7)]))
        .unwrap();

    let rules = parse_rules(
        r#"RULE "r" { REQUIRE(controller.* -> repository.*) }"#,
        "arch.aql",
    )
    .unwrap();
    let violations = QueryEngine::new(&store).execute(&rules).unwrap();

    assert_eq!(violations.len(), 1);
    let v = &violations[0];
    assert_eq!(v.file, "app.go");
    assert_eq!(v.line, 10); // the controller node's start line
    assert!(v.message.contains("missing required dependency"));
}

#[test]
fn test_limit_metric_comparison() {
    let store = AstStore::in_memory().unwrap();
    let mut low = method_node(1, "app.go", "m", "low");
    low.cyclomatic_complexity = 2;
    let mut mid = method_node(2, "app.go", "m", "mid");
    mid.cyclomatic_complexity = 5;
    let mut high = method_node(3, "app.go", "m", "high");
    high.cyclomatic_complexity = 25;
    store
        .replace_file("app.go", &batch(vec![low, mid, high], vec![]))
        .unwrap();

    let rules = parse_rules(r#"RULE "r" { LIMIT(*.cyclomatic > 10) }"#, "arch.aql").unwrap();
    let violations = QueryEngine::new(&store).execute(&rules).unwrap();

    assert_eq!(violations.len(), 1);
    assert!(violations[0].message.contains("high"));
}

#[test]
fn test_violations_are_values_not_errors() {
    let store = AstStore::in_memory().unwrap();
    let mut hot = method_node(1, "app.go", "m", "hot");
    hot.cyclomatic_complexity = 99;
    store
        .replace_file("app.go", &batch(vec![hot], vec![]))
        .unwrap();

    let rules = parse_rules(r#"RULE "r" { LIMIT(*.cyclomatic > 1) }"#, "arch.aql").unwrap();
    let result = QueryEngine::new(&store).execute(&rules);
    // Finding violations is a successful evaluation.
    assert!(result.is_ok());
    assert_eq!(result.unwrap().len(), 1);
}

#[test]
fn test_combined_rule_reports_per_statement() {
    let store = AstStore::in_memory().unwrap();
    let mut ctrl = method_node(1, "app.go", "controller", "List");
    ctrl.cyclomatic_complexity = 30;
    let repo = method_node(2, "app.go", "repository", "FindAll");
    store
        .replace_file("app.go", &batch(vec![ctrl, repo], vec![call(1, Some(2), 12)]))
        .unwrap();

    let rules = parse_rules(
        r#"
        RULE "layering" {
            LIMIT(controller.*.cyclomatic > 15)
            FORBID(controller.* -> repository.*)
            REQUIRE(controller.* -> service.*)
            ALLOW(service.* -> repository.*)
        }
        "#,
        "arch.aql",
    )
    .unwrap();
    let violations = QueryEngine::new(&store).execute(&rules).unwrap();

    // LIMIT, FORBID, and REQUIRE each fire once; ALLOW never does.
    assert_eq!(violations.len(), 3);
    assert!(violations[0].message.contains("cyclomatic"));
    assert!(violations[1].message.contains("forbidden"));
    assert!(violations[2].message.contains("missing required dependency"));
}
