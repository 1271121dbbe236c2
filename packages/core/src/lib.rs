//! TaxoTree Core - Tree-Invariant Engine and Database Layer
//!
//! This crate maintains a single-rooted, named hierarchical tree (a taxonomy)
//! in a persistent relational store. Every mutation preserves the structural
//! invariants atomically:
//!
//! - Exactly one root node (`parent_id IS NULL`), never deleted
//! - The parent relation is a tree (acyclic, no orphans)
//! - Sibling names are unique under every parent
//! - Node ids are assigned by the store and never reused
//!
//! # Architecture
//!
//! - **libsql/Turso**: Embedded SQLite-compatible database, WAL mode
//! - **Store abstraction**: [`db::NodeStore`] / [`db::StoreTransaction`] traits
//!   keep the invariant logic portable across backends
//! - **Scoped transactions**: every mutation runs inside one transaction with
//!   commit-on-success and rollback on every other exit path
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, SubtreeEntry, NameConflict)
//! - [`db`] - Database layer with libsql integration
//! - [`services`] - Mutation and traversal engines plus validation

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseError, DatabaseService, NodeStore, StoreTransaction, TursoStore};
pub use models::{NameConflict, Node, NodeId, SubtreeEntry};
pub use services::{MutationEngine, TraversalEngine, TreeError};
