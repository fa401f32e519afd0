use crate::types::{
    AstNode, AstRelationship, LibraryNode, LibraryRelationship, RelationKind, StoreError,
};

/// Read accessors the query engine evaluates rules against.
///
/// Implemented by [`AstStore`](crate::sqlite::AstStore); kept as a trait so
/// the engine depends only on the accessor surface, not on the SQLite
/// backing.
pub trait AstSource {
    /// Look up a node by its persistent id. Absent ids are a distinct
    /// [`StoreError::NodeNotFound`] condition, not a generic failure.
    fn get_node(&self, id: i64) -> Result<AstNode, StoreError>;

    /// All stored nodes, across all files.
    fn all_nodes(&self) -> Result<Vec<AstNode>, StoreError>;

    /// All stored nodes of one file.
    fn nodes_of_file(&self, path: &str) -> Result<Vec<AstNode>, StoreError>;

    /// Outgoing relationships of a node, optionally filtered by kind.
    fn relationships_of(
        &self,
        from_id: i64,
        kind: Option<RelationKind>,
    ) -> Result<Vec<AstRelationship>, StoreError>;

    /// All stored relationships, across all files.
    fn all_relationships(&self) -> Result<Vec<AstRelationship>, StoreError>;

    /// Outgoing library relationships of a node, optionally filtered by kind.
    fn library_relationships_of(
        &self,
        from_id: i64,
        kind: Option<RelationKind>,
    ) -> Result<Vec<LibraryRelationship>, StoreError>;

    /// Look up a library node by id.
    fn get_library_node(&self, id: i64) -> Result<LibraryNode, StoreError>;

    /// The most specific node whose span contains `line`: minimum span among
    /// covering nodes, ties broken by kind precedence
    /// (field > method > type > package > variable).
    fn find_by_line(&self, path: &str, line: u32) -> Result<Option<AstNode>, StoreError>;

    /// Number of import relationships (internal and library) originating at
    /// the node.
    fn count_imports(&self, id: i64) -> Result<u32, StoreError>;

    /// Number of external calls originating at the node: call relationships
    /// whose target is outside the analyzed set or in a different package.
    fn count_external_calls(&self, id: i64) -> Result<u32, StoreError>;
}
