// Concurrent replacements: distinct files all land; same-file races end in
// exactly one batch's state.

use std::sync::Arc;
use std::thread;

use girder_core::sqlite::AstStore;
use girder_core::store::AstSource;

use crate::common::{batch, method_node};

#[test]
fn test_concurrent_replacements_of_distinct_files_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(AstStore::open(&dir.path().join("ast.db")).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let file = format!("file{i}.go");
                let nodes = (0..5i64)
                    .map(|j| method_node(j + 1, &file, "m", &format!("f{i}_{j}")))
                    .collect();
                store.replace_file(&file, &batch(nodes, vec![])).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for i in 0..8 {
        let nodes = store.nodes_of_file(&format!("file{i}.go")).unwrap();
        assert_eq!(nodes.len(), 5, "file{i}.go lost nodes");
    }
    assert_eq!(store.stats().unwrap().nodes, 40);
}

#[test]
fn test_concurrent_same_file_last_committer_wins_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(AstStore::open(&dir.path().join("ast.db")).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                // Each writer proposes a different set of method names.
                let nodes = (0..3i64)
                    .map(|j| method_node(j + 1, "same.go", "m", &format!("w{i}_f{j}")))
                    .collect();
                store.replace_file("same.go", &batch(nodes, vec![])).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // The surviving state corresponds to exactly one writer's batch, never a
    // mixture.
    let nodes = store.nodes_of_file("same.go").unwrap();
    assert_eq!(nodes.len(), 3);
    let writers: std::collections::HashSet<char> = nodes
        .iter()
        .map(|n| n.method_name.chars().nth(1).unwrap())
        .collect();
    assert_eq!(writers.len(), 1, "state mixes batches: {nodes:?}");
}

#[test]
fn test_readers_run_alongside_writer() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(AstStore::open(&dir.path().join("ast.db")).unwrap());
    store
        .replace_file(
            "base.go",
            &batch(vec![method_node(1, "base.go", "m", "f")], vec![]),
        )
        .unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..20 {
                let nodes = vec![method_node(1, "hot.go", "m", &format!("f{i}"))];
                store.replace_file("hot.go", &batch(nodes, vec![])).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    // Reads observe committed snapshots only.
                    let nodes = store.nodes_of_file("base.go").unwrap();
                    assert_eq!(nodes.len(), 1);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
