// Incremental replace: round-trip, identity preservation, orphan cleanup.

use girder_core::sqlite::AstStore;
use girder_core::store::AstSource;

use crate::common::{batch, method_node, node};

#[test]
fn test_roundtrip_identity_tuples() {
    let store = AstStore::in_memory().unwrap();
    let nodes = vec![
        node("x.go", "m", "", "", ""),
        node("x.go", "m", "T", "", ""),
        node("x.go", "m", "T", "f", ""),
        node("x.go", "m", "T", "", "g"),
    ];
    store.replace_file("x.go", &batch(nodes.clone(), vec![])).unwrap();

    let stored = store.nodes_of_file("x.go").unwrap();
    let mut expected: Vec<_> = nodes.iter().map(|n| n.key()).collect();
    let mut actual: Vec<_> = stored.iter().map(|n| n.key()).collect();
    expected.sort_by_key(|k| format!("{k:?}"));
    actual.sort_by_key(|k| format!("{k:?}"));
    assert_eq!(expected, actual);
}

#[test]
fn test_identity_preserved_and_fresh_ids_for_new_nodes() {
    let store = AstStore::in_memory().unwrap();

    // First batch: A (method f) and B (field g).
    let a = method_node(1, "x.go", "m", "f");
    let mut b = node("x.go", "m", "", "", "g");
    b.id = 2;
    store
        .replace_file("x.go", &batch(vec![a.clone(), b.clone()], vec![]))
        .unwrap();

    let stored = store.nodes_of_file("x.go").unwrap();
    let p_a = stored.iter().find(|n| n.method_name == "f").unwrap().id;
    let p_b = stored.iter().find(|n| n.field_name == "g").unwrap().id;

    // Second batch: same identities plus a new node C, with A's span grown.
    let mut a2 = a.clone();
    a2.end_line = 50;
    let c = method_node(3, "x.go", "m", "h");
    store
        .replace_file("x.go", &batch(vec![a2, b.clone(), c], vec![]))
        .unwrap();

    let stored = store.nodes_of_file("x.go").unwrap();
    assert_eq!(stored.len(), 3);

    let a_after = stored.iter().find(|n| n.method_name == "f").unwrap();
    assert_eq!(a_after.id, p_a, "A keeps its persistent id");
    assert_eq!(a_after.line_count, 41, "A carries the updated line count");

    let b_after = stored.iter().find(|n| n.field_name == "g").unwrap();
    assert_eq!(b_after.id, p_b, "B keeps its persistent id");

    let c_after = stored.iter().find(|n| n.method_name == "h").unwrap();
    assert_ne!(c_after.id, p_a);
    assert_ne!(c_after.id, p_b);
}

#[test]
fn test_orphan_deletion() {
    let store = AstStore::in_memory().unwrap();
    store
        .replace_file(
            "x.go",
            &batch(
                vec![
                    method_node(1, "x.go", "m", "f1"),
                    method_node(2, "x.go", "m", "f2"),
                    method_node(3, "x.go", "m", "f3"),
                ],
                vec![],
            ),
        )
        .unwrap();

    store
        .replace_file(
            "x.go",
            &batch(
                vec![
                    method_node(1, "x.go", "m", "f1"),
                    method_node(3, "x.go", "m", "f3"),
                ],
                vec![],
            ),
        )
        .unwrap();

    let stored = store.nodes_of_file("x.go").unwrap();
    assert_eq!(stored.len(), 2);
    let mut names: Vec<&str> = stored.iter().map(|n| n.method_name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["f1", "f3"]);
}

#[test]
fn test_replace_different_files_is_independent() {
    let store = AstStore::in_memory().unwrap();
    store
        .replace_file("a.go", &batch(vec![method_node(1, "a.go", "m", "fa")], vec![]))
        .unwrap();
    store
        .replace_file("b.go", &batch(vec![method_node(1, "b.go", "m", "fb")], vec![]))
        .unwrap();

    // Re-analyzing a.go leaves b.go untouched.
    store
        .replace_file("a.go", &batch(vec![method_node(1, "a.go", "m", "fa2")], vec![]))
        .unwrap();
    assert_eq!(store.nodes_of_file("b.go").unwrap().len(), 1);
    assert_eq!(
        store.nodes_of_file("a.go").unwrap()[0].method_name,
        "fa2"
    );
}
