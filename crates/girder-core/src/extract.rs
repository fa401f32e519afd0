//! The contract between language extractors and the AST cache.
//!
//! An extractor parses one file and delivers a [`FileBatch`] of nodes,
//! relationships, and library uses. Node ids in the batch are advisory
//! (batch-local); the store rewrites them to persistent ids during
//! [`replace_file`](crate::sqlite::AstStore::replace_file). Extractors
//! receive a read-only [`StoreView`] for id lookups and must not attempt to
//! mutate the store.

use std::path::Path;

use crate::types::{AstNode, AstRelationship, LibraryNode, NodeKey, RelationKind, StoreError};

/// Everything one extraction of one file produces.
///
/// Relationship `from_id`/`to_id` values reference advisory node ids within
/// this batch; `to_id` may also carry a persistent id obtained through the
/// [`StoreView`], or be `None` for targets outside the analyzed set.
#[derive(Debug, Clone, Default)]
pub struct FileBatch {
    pub nodes: Vec<AstNode>,
    pub relationships: Vec<AstRelationship>,
    pub library_uses: Vec<LibraryUse>,
    /// Fingerprint of the analyzed content, recorded as file metadata.
    pub fingerprint: FileFingerprint,
}

/// Content hash, size, and mtime of the file the batch was extracted from.
#[derive(Debug, Clone, Default)]
pub struct FileFingerprint {
    /// SHA-256 of the content, lowercase hex.
    pub hash: String,
    pub size: u64,
    pub modified: i64,
}

/// One use of an external library declaration: the library-node descriptor
/// (its `id` is ignored; identity is `(package, class, method, field)`) plus
/// the edge fields. `from_id` is the advisory id of the using node.
#[derive(Debug, Clone)]
pub struct LibraryUse {
    pub from_id: i64,
    pub library: LibraryNode,
    pub line_no: u32,
    pub kind: RelationKind,
    pub text: String,
}

/// Read-only view of the store handed to extractors, allowing them to look
/// up persistent ids already present under specific identity keys for
/// cross-file resolution.
pub trait StoreView {
    /// Persistent id stored under `key`, if any.
    fn lookup_id(&self, key: &NodeKey) -> Result<Option<i64>, StoreError>;

    /// All stored nodes of a file.
    fn nodes_of_file(&self, path: &str) -> Result<Vec<AstNode>, StoreError>;
}

/// A per-language extractor: an opaque producer of one file's batch.
///
/// Implementors must be `Send + Sync` so analysis can fan out across
/// threads. Extractors are free to launch subprocesses or parse binary
/// blobs; the store treats them as opaque and only consumes the batch.
pub trait Extractor: Send + Sync {
    /// Canonical language name (e.g. "go", "python").
    fn language(&self) -> &str;

    /// Parse `content` of the file at `path` into a batch.
    fn extract(
        &self,
        view: &dyn StoreView,
        path: &Path,
        content: &str,
    ) -> Result<FileBatch, ExtractError>;
}

/// Errors produced at the extractor boundary. Extraction failures leave the
/// store unmodified for the file.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("extraction failed for {path}: {message}")]
    Failed { path: String, message: String },

    #[error("i/o error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
