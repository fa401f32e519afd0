use rusqlite::{params, Connection, Row};

use crate::sqlite::AstStore;
use crate::store::AstSource;
use crate::types::{
    AstNode, AstRelationship, LibraryNode, LibraryRelationship, NodeKind, RelationKind, StoreError,
};

fn row_to_node(row: &Row) -> rusqlite::Result<AstNode> {
    let kind_str: String = row.get("node_type")?;
    let parameters: String = row.get("parameters_blob")?;
    let return_values: String = row.get("return_values_blob")?;
    Ok(AstNode {
        id: row.get("id")?,
        file_path: row.get("file_path")?,
        package_name: row.get("package_name")?,
        type_name: row.get("type_name")?,
        method_name: row.get("method_name")?,
        field_name: row.get("field_name")?,
        kind: NodeKind::parse(&kind_str).unwrap_or(NodeKind::Variable),
        start_line: row.get("start_line")?,
        end_line: row.get("end_line")?,
        line_count: row.get("line_count")?,
        cyclomatic_complexity: row.get("cyclomatic_complexity")?,
        parameter_count: row.get("parameter_count")?,
        return_count: row.get("return_count")?,
        parameters: serde_json::from_str(&parameters).unwrap_or_default(),
        return_values: serde_json::from_str(&return_values).unwrap_or_default(),
        file_hash: row.get("file_hash")?,
        last_modified: row.get("last_modified")?,
    })
}

fn row_to_relationship(row: &Row) -> rusqlite::Result<AstRelationship> {
    let kind_str: String = row.get("relationship_type")?;
    Ok(AstRelationship {
        id: row.get("id")?,
        from_id: row.get("from_ast_id")?,
        to_id: row.get("to_ast_id")?,
        line_no: row.get("line_no")?,
        kind: RelationKind::parse(&kind_str).unwrap_or(RelationKind::Reference),
        text: row.get("text")?,
    })
}

fn query_nodes(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<AstNode>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, row_to_node)?;
    let mut nodes = Vec::new();
    for row in rows {
        nodes.push(row?);
    }
    Ok(nodes)
}

impl AstSource for AstStore {
    fn get_node(&self, id: i64) -> Result<AstNode, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM ast_nodes WHERE id = ?1")?;
            let mut rows = stmt.query_map(params![id], row_to_node)?;
            match rows.next() {
                Some(node) => Ok(node?),
                None => Err(StoreError::NodeNotFound(id)),
            }
        })
    }

    fn all_nodes(&self) -> Result<Vec<AstNode>, StoreError> {
        self.with_conn(|conn| {
            query_nodes(
                conn,
                "SELECT * FROM ast_nodes ORDER BY file_path, start_line, id",
                [],
            )
        })
    }

    fn nodes_of_file(&self, path: &str) -> Result<Vec<AstNode>, StoreError> {
        self.with_conn(|conn| {
            query_nodes(
                conn,
                "SELECT * FROM ast_nodes WHERE file_path = ?1 ORDER BY start_line, id",
                params![path],
            )
        })
    }

    fn relationships_of(
        &self,
        from_id: i64,
        kind: Option<RelationKind>,
    ) -> Result<Vec<AstRelationship>, StoreError> {
        self.with_conn(|conn| {
            let mut out = Vec::new();
            match kind {
                Some(kind) => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM ast_relationships
                         WHERE from_ast_id = ?1 AND relationship_type = ?2
                         ORDER BY line_no, id",
                    )?;
                    let rows =
                        stmt.query_map(params![from_id, kind.as_str()], row_to_relationship)?;
                    for row in rows {
                        out.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM ast_relationships WHERE from_ast_id = ?1
                         ORDER BY line_no, id",
                    )?;
                    let rows = stmt.query_map(params![from_id], row_to_relationship)?;
                    for row in rows {
                        out.push(row?);
                    }
                }
            }
            Ok(out)
        })
    }

    fn all_relationships(&self) -> Result<Vec<AstRelationship>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM ast_relationships ORDER BY from_ast_id, line_no, id")?;
            let rows = stmt.query_map([], row_to_relationship)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    fn library_relationships_of(
        &self,
        from_id: i64,
        kind: Option<RelationKind>,
    ) -> Result<Vec<LibraryRelationship>, StoreError> {
        self.with_conn(|conn| {
            let sql = match kind {
                Some(_) => {
                    "SELECT id, ast_id, library_id, line_no, relationship_type, text
                     FROM library_relationships
                     WHERE ast_id = ?1 AND relationship_type = ?2
                     ORDER BY line_no, id"
                }
                None => {
                    "SELECT id, ast_id, library_id, line_no, relationship_type, text
                     FROM library_relationships WHERE ast_id = ?1
                     ORDER BY line_no, id"
                }
            };
            let map = |row: &Row| -> rusqlite::Result<LibraryRelationship> {
                let kind_str: String = row.get(4)?;
                Ok(LibraryRelationship {
                    id: row.get(0)?,
                    from_id: row.get(1)?,
                    library_id: row.get(2)?,
                    line_no: row.get(3)?,
                    kind: RelationKind::parse(&kind_str).unwrap_or(RelationKind::Reference),
                    text: row.get(5)?,
                })
            };
            let mut stmt = conn.prepare(sql)?;
            let mut out = Vec::new();
            match kind {
                Some(kind) => {
                    let rows = stmt.query_map(params![from_id, kind.as_str()], map)?;
                    for row in rows {
                        out.push(row?);
                    }
                }
                None => {
                    let rows = stmt.query_map(params![from_id], map)?;
                    for row in rows {
                        out.push(row?);
                    }
                }
            }
            Ok(out)
        })
    }

    fn get_library_node(&self, id: i64) -> Result<LibraryNode, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, package, class, method, field, node_type, language, framework
                 FROM library_nodes WHERE id = ?1",
            )?;
            let mut rows = stmt.query_map(params![id], |row| {
                let kind_str: String = row.get(5)?;
                Ok(LibraryNode {
                    id: row.get(0)?,
                    package: row.get(1)?,
                    class_name: row.get(2)?,
                    method_name: row.get(3)?,
                    field_name: row.get(4)?,
                    kind: NodeKind::parse(&kind_str).unwrap_or(NodeKind::Type),
                    language: row.get(6)?,
                    framework: row.get(7)?,
                })
            })?;
            match rows.next() {
                Some(node) => Ok(node?),
                None => Err(StoreError::NodeNotFound(id)),
            }
        })
    }

    fn find_by_line(&self, path: &str, line: u32) -> Result<Option<AstNode>, StoreError> {
        let covering = self.with_conn(|conn| {
            query_nodes(
                conn,
                "SELECT * FROM ast_nodes
                 WHERE file_path = ?1
                   AND start_line <= ?2
                   AND (CASE WHEN end_line = 0 THEN start_line ELSE end_line END) >= ?2",
                params![path, line],
            )
        })?;
        // Minimum span wins; equal spans fall back to kind specificity.
        Ok(covering.into_iter().min_by(|a, b| {
            let span_a = a.effective_end_line() - a.start_line;
            let span_b = b.effective_end_line() - b.start_line;
            span_a
                .cmp(&span_b)
                .then_with(|| b.kind.span_precedence().cmp(&a.kind.span_precedence()))
        }))
    }

    fn count_imports(&self, id: i64) -> Result<u32, StoreError> {
        self.with_conn(|conn| {
            let internal: u32 = conn.query_row(
                "SELECT COUNT(*) FROM ast_relationships
                 WHERE from_ast_id = ?1 AND relationship_type = 'import'",
                params![id],
                |row| row.get(0),
            )?;
            let library: u32 = conn.query_row(
                "SELECT COUNT(*) FROM library_relationships
                 WHERE ast_id = ?1 AND relationship_type = 'import'",
                params![id],
                |row| row.get(0),
            )?;
            Ok(internal + library)
        })
    }

    fn count_external_calls(&self, id: i64) -> Result<u32, StoreError> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM ast_relationships r
                 JOIN ast_nodes s ON s.id = r.from_ast_id
                 LEFT JOIN ast_nodes t ON t.id = r.to_ast_id
                 WHERE r.from_ast_id = ?1 AND r.relationship_type = 'call'
                   AND (r.to_ast_id IS NULL OR t.package_name != s.package_name)",
                params![id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}
