// Violation order is deterministic: rule order, statement order, then
// (file, line, column) within a statement.

use girder_core::sqlite::AstStore;
use girder_engine::{CancelFlag, EngineError, QueryEngine};
use girder_rules::{parse_rules, RuleSet};

use crate::common::{batch, method_node};

fn populated_store() -> AstStore {
    let store = AstStore::in_memory().unwrap();
    for (file, lines) in [("b.go", [40u32, 8]), ("a.go", [22, 3])] {
        let nodes = lines
            .iter()
            .enumerate()
            .map(|(i, &line)| {
                let mut n = method_node(i as i64 + 1, file, "m", &format!("f{line}"));
                n.start_line = line;
                n.end_line = line + 5;
                n.cyclomatic_complexity = 50;
                n
            })
            .collect();
        store.replace_file(file, &batch(nodes, vec![])).unwrap();
    }
    store
}

#[test]
fn test_repeated_execution_is_stable() {
    let store = populated_store();
    let rules = parse_rules(
        r#"
        RULE "first" { LIMIT(*.cyclomatic > 10) }
        RULE "second" { FORBID(m.*) }
        "#,
        "arch.aql",
    )
    .unwrap();
    let engine = QueryEngine::new(&store);

    let first = engine.execute(&rules).unwrap();
    let second = engine.execute(&rules).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_order_is_rule_then_statement_then_location() {
    let store = populated_store();
    let rules = parse_rules(
        r#"
        RULE "first" { LIMIT(*.cyclomatic > 10) }
        RULE "second" { FORBID(m.*) }
        "#,
        "arch.aql",
    )
    .unwrap();
    let violations = QueryEngine::new(&store).execute(&rules).unwrap();
    assert_eq!(violations.len(), 8);

    // All of rule "first" precedes all of rule "second".
    let boundary = violations.iter().position(|v| v.rule == "second").unwrap();
    assert!(violations[..boundary].iter().all(|v| v.rule == "first"));
    assert!(violations[boundary..].iter().all(|v| v.rule == "second"));

    // Within a statement, ascending (file, line).
    let locations: Vec<(String, u32)> = violations[..boundary]
        .iter()
        .map(|v| (v.file.clone(), v.line))
        .collect();
    assert_eq!(
        locations,
        vec![
            ("a.go".to_string(), 3),
            ("a.go".to_string(), 22),
            ("b.go".to_string(), 8),
            ("b.go".to_string(), 40),
        ]
    );
}

#[test]
fn test_empty_rule_set_evaluates_to_nothing() {
    let store = populated_store();
    let violations = QueryEngine::new(&store).execute(&RuleSet::default()).unwrap();
    assert!(violations.is_empty());
}

#[test]
fn test_cancelled_flag_aborts_evaluation() {
    let store = populated_store();
    let rules = parse_rules(r#"RULE "r" { LIMIT(*.cyclomatic > 10) }"#, "arch.aql").unwrap();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = QueryEngine::new(&store).execute_with_cancel(&rules, &cancel);
    assert!(matches!(result, Err(EngineError::Cancelled)));
}
