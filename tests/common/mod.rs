//! Shared builders for integration tests.

use girder_core::extract::{FileBatch, FileFingerprint, LibraryUse};
use girder_core::types::{AstNode, AstRelationship, LibraryNode, NodeKind, RelationKind};

pub fn node(file: &str, package: &str, type_name: &str, method: &str, field: &str) -> AstNode {
    let kind = if !field.is_empty() {
        NodeKind::Field
    } else if !method.is_empty() {
        NodeKind::Method
    } else if !type_name.is_empty() {
        NodeKind::Type
    } else {
        NodeKind::Package
    };
    AstNode {
        id: 0,
        file_path: file.to_string(),
        package_name: package.to_string(),
        type_name: type_name.to_string(),
        method_name: method.to_string(),
        field_name: field.to_string(),
        kind,
        start_line: 1,
        end_line: 0,
        line_count: 1,
        cyclomatic_complexity: 0,
        parameter_count: 0,
        return_count: 0,
        parameters: vec![],
        return_values: vec![],
        file_hash: String::new(),
        last_modified: 0,
    }
}

pub fn method_node(advisory: i64, file: &str, package: &str, name: &str) -> AstNode {
    let mut n = node(file, package, "", name, "");
    n.id = advisory;
    n.start_line = 10;
    n.end_line = 20;
    n
}

pub fn call(from: i64, to: Option<i64>, line: u32) -> AstRelationship {
    AstRelationship {
        id: 0,
        from_id: from,
        to_id: to,
        line_no: line,
        kind: RelationKind::Call,
        text: "callee()".to_string(),
    }
}

pub fn batch(mut nodes: Vec<AstNode>, relationships: Vec<AstRelationship>) -> FileBatch {
    // Advisory ids must be distinct within a batch; give unnumbered nodes
    // negative ids so they cannot collide with explicit ones.
    for (i, n) in nodes.iter_mut().enumerate() {
        if n.id == 0 {
            n.id = -(i as i64) - 1;
        }
    }
    FileBatch {
        nodes,
        relationships,
        library_uses: vec![],
        fingerprint: FileFingerprint {
            hash: "deadbeef".to_string(),
            size: 1,
            modified: 1,
        },
    }
}

#[allow(dead_code)]
pub fn library_use(from: i64, package: &str, class: &str, line: u32) -> LibraryUse {
    LibraryUse {
        from_id: from,
        library: LibraryNode {
            id: 0,
            package: package.to_string(),
            class_name: class.to_string(),
            method_name: String::new(),
            field_name: String::new(),
            kind: NodeKind::Type,
            language: "go".to_string(),
            framework: String::new(),
        },
        line_no: line,
        kind: RelationKind::Import,
        text: format!("import {package}"),
    }
}
