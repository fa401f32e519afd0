//! Core types, AST cache, and extractor contract for girder.
//!
//! This crate provides the foundational pieces used across all girder crates:
//! - [`types`] — Declaration nodes, relationships, library nodes, and error types
//! - [`store`] — The [`AstSource`](store::AstSource) read trait the engine evaluates against
//! - [`sqlite`] — The [`AstStore`](sqlite::AstStore), a SQLite-backed AST cache
//!   with atomic per-file replacement and identity-preserving incremental upsert
//! - [`extract`] — The contract language extractors fulfil to feed the cache
//! - [`hash`] — SHA-256 content hashing for cache validation

pub mod extract;
pub mod hash;
pub mod sqlite;
pub mod sqlite_queries;
pub mod store;
pub mod types;
