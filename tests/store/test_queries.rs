// Read accessors: span queries, aggregates, not-found conditions.

use girder_core::sqlite::AstStore;
use girder_core::store::AstSource;
use girder_core::types::{NodeKind, RelationKind, StoreError};

use crate::common::{batch, call, library_use, method_node, node};

#[test]
fn test_find_by_line_specificity() {
    let store = AstStore::in_memory().unwrap();
    let mut package = node("x.go", "m", "", "", "");
    package.start_line = 1;
    package.end_line = 100;
    let mut type_node = node("x.go", "m", "T", "", "");
    type_node.start_line = 10;
    type_node.end_line = 50;
    let mut method = node("x.go", "m", "T", "f", "");
    method.start_line = 20;
    method.end_line = 30;
    let mut field = node("x.go", "m", "T", "", "g");
    field.start_line = 15;
    field.end_line = 15;
    store
        .replace_file("x.go", &batch(vec![package, type_node, method, field], vec![]))
        .unwrap();

    let cases = [
        (25, NodeKind::Method),
        (35, NodeKind::Type),
        (75, NodeKind::Package),
        (15, NodeKind::Field),
    ];
    for (line, expected) in cases {
        let found = store.find_by_line("x.go", line).unwrap().unwrap();
        assert_eq!(found.kind, expected, "line {line}");
    }
}

#[test]
fn test_get_node_not_found() {
    let store = AstStore::in_memory().unwrap();
    assert!(matches!(
        store.get_node(999),
        Err(StoreError::NodeNotFound(999))
    ));
}

#[test]
fn test_relationships_filtered_by_kind() {
    let store = AstStore::in_memory().unwrap();
    let a = method_node(1, "x.go", "m", "f");
    let b = method_node(2, "x.go", "m", "g");
    let mut import = call(1, Some(2), 1);
    import.kind = RelationKind::Import;
    store
        .replace_file("x.go", &batch(vec![a, b], vec![import, call(1, Some(2), 2)]))
        .unwrap();

    let from = store
        .nodes_of_file("x.go")
        .unwrap()
        .into_iter()
        .find(|n| n.method_name == "f")
        .unwrap();
    assert_eq!(store.relationships_of(from.id, None).unwrap().len(), 2);
    assert_eq!(
        store
            .relationships_of(from.id, Some(RelationKind::Call))
            .unwrap()
            .len(),
        1
    );
    assert_eq!(store.count_imports(from.id).unwrap(), 1);
}

#[test]
fn test_count_imports_includes_library_uses() {
    let store = AstStore::in_memory().unwrap();
    let mut b = batch(vec![method_node(1, "x.go", "m", "f")], vec![]);
    b.library_uses.push(library_use(1, "net/http", "Client", 3));
    store.replace_file("x.go", &b).unwrap();

    let id = store.nodes_of_file("x.go").unwrap()[0].id;
    assert_eq!(store.count_imports(id).unwrap(), 1);

    let lib_rels = store.library_relationships_of(id, None).unwrap();
    assert_eq!(lib_rels.len(), 1);
    let lib = store.get_library_node(lib_rels[0].library_id).unwrap();
    assert_eq!(lib.package, "net/http");
    assert_eq!(lib.class_name, "Client");
}

#[test]
fn test_count_external_calls_counts_unresolved_and_cross_package() {
    let store = AstStore::in_memory().unwrap();
    let caller = method_node(1, "x.go", "alpha", "f");
    let local = method_node(2, "x.go", "alpha", "g");
    let remote = method_node(3, "x.go", "beta", "h");
    store
        .replace_file(
            "x.go",
            &batch(
                vec![caller, local, remote],
                vec![call(1, Some(2), 1), call(1, Some(3), 2), call(1, None, 3)],
            ),
        )
        .unwrap();

    let id = store
        .nodes_of_file("x.go")
        .unwrap()
        .into_iter()
        .find(|n| n.method_name == "f")
        .unwrap()
        .id;
    assert_eq!(store.count_external_calls(id).unwrap(), 2);
}
