use serde::{Deserialize, Serialize};

/// Declaration kinds in the AST model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Package,
    Type,
    Method,
    Field,
    Variable,
}

impl NodeKind {
    /// Returns the lowercase string representation of this node kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Package => "package",
            NodeKind::Type => "type",
            NodeKind::Method => "method",
            NodeKind::Field => "field",
            NodeKind::Variable => "variable",
        }
    }

    /// Parse the database representation back into a kind.
    pub fn parse(s: &str) -> Option<NodeKind> {
        match s {
            "package" => Some(NodeKind::Package),
            "type" => Some(NodeKind::Type),
            "method" => Some(NodeKind::Method),
            "field" => Some(NodeKind::Field),
            "variable" => Some(NodeKind::Variable),
            _ => None,
        }
    }

    /// Tie-break precedence for span queries: when two nodes cover the same
    /// line with equal span length, the more specific kind wins.
    pub fn span_precedence(&self) -> u8 {
        match self {
            NodeKind::Field => 4,
            NodeKind::Method => 3,
            NodeKind::Type => 2,
            NodeKind::Package => 1,
            NodeKind::Variable => 0,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship kinds between declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Call,
    Reference,
    Inheritance,
    Implements,
    Import,
}

impl RelationKind {
    /// Returns the lowercase string representation of this relationship kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Call => "call",
            RelationKind::Reference => "reference",
            RelationKind::Inheritance => "inheritance",
            RelationKind::Implements => "implements",
            RelationKind::Import => "import",
        }
    }

    /// Parse the database representation back into a kind.
    pub fn parse(s: &str) -> Option<RelationKind> {
        match s {
            "call" => Some(RelationKind::Call),
            "reference" => Some(RelationKind::Reference),
            "inheritance" => Some(RelationKind::Inheritance),
            "implements" => Some(RelationKind::Implements),
            "import" => Some(RelationKind::Import),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five-component identity of a declaration. Globally unique within a
/// store; unused components are the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub file_path: String,
    pub package: String,
    pub type_name: String,
    pub method: String,
    pub field: String,
}

/// A declaration extracted from a source file.
///
/// The `id` is assigned by the store on first insert and preserved across
/// re-analyses of the same file as long as the identity tuple is unchanged.
/// Inside a [`FileBatch`](crate::extract::FileBatch) the id is advisory: a
/// batch-local value used only to link relationships, rewritten to the
/// persistent id during `replace_file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub id: i64,
    pub file_path: String,
    pub package_name: String,
    pub type_name: String,
    pub method_name: String,
    pub field_name: String,
    pub kind: NodeKind,
    /// First line of the declaration (1-based).
    pub start_line: u32,
    /// Last line of the declaration (1-based); 0 means single-line.
    pub end_line: u32,
    pub line_count: u32,
    pub cyclomatic_complexity: u32,
    pub parameter_count: u32,
    pub return_count: u32,
    pub parameters: Vec<ParamInfo>,
    pub return_values: Vec<ParamInfo>,
    pub file_hash: String,
    /// Source file mtime, unix seconds.
    pub last_modified: i64,
}

impl AstNode {
    /// The identity tuple this node is keyed on.
    pub fn key(&self) -> NodeKey {
        NodeKey {
            file_path: self.file_path.clone(),
            package: self.package_name.clone(),
            type_name: self.type_name.clone(),
            method: self.method_name.clone(),
            field: self.field_name.clone(),
        }
    }

    /// Joined identity `package:type:method:field`, used in messages and by
    /// the name-length metric.
    pub fn qualified_name(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.package_name, self.type_name, self.method_name, self.field_name
        )
    }

    /// End line with the single-line convention (`end_line = 0`) resolved.
    pub fn effective_end_line(&self) -> u32 {
        if self.end_line == 0 {
            self.start_line
        } else {
            self.end_line
        }
    }

    /// Check the structural invariants required of every stored node.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.start_line < 1 {
            return Err(StoreError::InvalidNode(format!(
                "{}: start_line must be >= 1",
                self.qualified_name()
            )));
        }
        if self.end_line != 0 && self.end_line < self.start_line {
            return Err(StoreError::InvalidNode(format!(
                "{}: end_line {} precedes start_line {}",
                self.qualified_name(),
                self.end_line,
                self.start_line
            )));
        }
        match self.kind {
            NodeKind::Method if self.method_name.is_empty() => {
                return Err(StoreError::InvalidNode(format!(
                    "{}: method node requires a method name",
                    self.qualified_name()
                )));
            }
            NodeKind::Field if self.field_name.is_empty() => {
                return Err(StoreError::InvalidNode(format!(
                    "{}: field node requires a field name",
                    self.qualified_name()
                )));
            }
            NodeKind::Package
                if !(self.type_name.is_empty()
                    && self.method_name.is_empty()
                    && self.field_name.is_empty()) =>
            {
                return Err(StoreError::InvalidNode(format!(
                    "{}: package node must have empty type/method/field",
                    self.qualified_name()
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Per-parameter metadata, persisted as an opaque JSON blob on the node row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub type_name: String,
    pub ordinal: u32,
}

/// A directed edge between two stored declarations.
///
/// `to_id` is `None` for calls whose target lies outside the analyzed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstRelationship {
    pub id: i64,
    pub from_id: i64,
    pub to_id: Option<i64>,
    /// Source line where the relationship appears (1-based).
    pub line_no: u32,
    pub kind: RelationKind,
    /// Verbatim source fragment, for diagnostics.
    pub text: String,
}

/// An external declaration (outside the analyzed source), deduplicated on
/// `(package, class, method, field)` and shared across files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryNode {
    pub id: i64,
    pub package: String,
    pub class_name: String,
    pub method_name: String,
    pub field_name: String,
    pub kind: NodeKind,
    pub language: String,
    pub framework: String,
}

/// A directed edge from an internal declaration to a library node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryRelationship {
    pub id: i64,
    pub from_id: i64,
    pub library_id: i64,
    pub line_no: u32,
    pub kind: RelationKind,
    pub text: String,
}

/// Per-file analysis metadata used for cache validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: i64,
    pub file_path: String,
    /// SHA-256 of the file content, lowercase hex.
    pub file_hash: String,
    pub file_size: u64,
    pub last_modified: i64,
    pub last_analyzed: i64,
    pub analysis_version: u32,
}

/// Aggregate store counts, for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub files: u64,
    pub nodes: u64,
    pub relationships: u64,
    pub library_nodes: u64,
    pub library_relationships: u64,
}

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("node not found: {0}")]
    NodeNotFound(i64),

    #[error("invalid node: {0}")]
    InvalidNode(String),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("database error: {0}")]
    Storage(String),

    #[error("schema migration to v{version} failed: {message}")]
    Migration { version: u32, message: String },

    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}
