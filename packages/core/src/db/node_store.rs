//! NodeStore Trait - Database Abstraction Layer
//!
//! This module defines the `NodeStore` and `StoreTransaction` traits that
//! abstract node persistence for TaxoTree. The traits keep the tree-invariant
//! logic in the engines portable across backends: the engines compute subtree
//! and ancestor closures themselves and only ask the store for point lookups,
//! child sets, and batch writes.
//!
//! # Design Decisions
//!
//! 1. **Async-first**: all methods are async so embedded and networked
//!    backends fit the same contract
//! 2. **Transaction-scoped**: every read or write happens on a
//!    [`StoreTransaction`]. Mutations get commit-on-success semantics;
//!    traversals get a single consistent snapshot
//! 3. **Rollback on every exit path**: dropping a transaction without
//!    committing rolls it back, so early `?` returns can never leave partial
//!    writes behind
//! 4. **Typed errors**: `DatabaseError` only; tree semantics live in the
//!    service layer

use crate::db::error::DatabaseError;
use crate::models::{Node, NodeId};
use async_trait::async_trait;

/// Abstraction layer for node persistence
///
/// Implementations must be `Send + Sync` so engines can be shared across
/// async tasks.
#[async_trait]
pub trait NodeStore: Send + Sync {
    type Transaction: StoreTransaction;

    /// Begin a write transaction
    ///
    /// The write lock is taken up front so validation reads and the writes
    /// that depend on them observe the same state.
    async fn begin_write(&self) -> Result<Self::Transaction, DatabaseError>;

    /// Begin a read-only snapshot transaction
    ///
    /// Traversal queries run inside one of these so a concurrent mutation can
    /// never be observed mid-flight.
    async fn begin_read(&self) -> Result<Self::Transaction, DatabaseError>;
}

/// A scoped store transaction
///
/// Commit and rollback consume the transaction. A transaction dropped without
/// either is rolled back by the backend.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Point lookup by id
    async fn get(&self, id: NodeId) -> Result<Option<Node>, DatabaseError>;

    /// The unique node with `parent_id IS NULL`, if any
    async fn root(&self) -> Result<Option<Node>, DatabaseError>;

    /// Direct children of `parent_id`, ordered by ascending id
    async fn children_of(&self, parent_id: NodeId) -> Result<Vec<Node>, DatabaseError>;

    /// Insert a node; the store assigns and returns the id
    async fn insert(&self, name: &str, parent_id: NodeId) -> Result<NodeId, DatabaseError>;

    /// Delete a single node by id
    async fn delete_one(&self, id: NodeId) -> Result<(), DatabaseError>;

    /// Delete a set of nodes in one batch statement; returns the removed count
    async fn delete_many(&self, ids: &[NodeId]) -> Result<u64, DatabaseError>;

    /// Reassign `parent_id` for a set of nodes in one batch statement
    async fn reparent(&self, child_ids: &[NodeId], new_parent_id: NodeId)
        -> Result<(), DatabaseError>;

    /// Commit the transaction, making its writes visible to later reads
    async fn commit(self) -> Result<(), DatabaseError>;

    /// Roll the transaction back explicitly
    ///
    /// Dropping without commit has the same effect; the explicit form exists
    /// so callers can surface a failed rollback instead of swallowing it.
    async fn rollback(self) -> Result<(), DatabaseError>;
}
