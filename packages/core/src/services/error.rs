//! Tree Engine Error Types
//!
//! The full error taxonomy for mutation and traversal operations. Every
//! variant except `Database` is an expected, validated-for condition: when
//! one is returned, no write has been committed and the tree is unchanged.
//! `Database` wraps store-level failures (connection, SQL, lock timeout,
//! inconsistent rows) surfaced after rollback.

use crate::db::DatabaseError;
use crate::models::{NameConflict, NodeId};
use thiserror::Error;

/// Tree operation errors
#[derive(Error, Debug)]
pub enum TreeError {
    /// Name is blank after trimming
    #[error("Invalid name: must be non-empty after trimming")]
    InvalidName,

    /// Node not found by id
    #[error("Node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// Candidate parent not found (specialization of NodeNotFound for adds)
    #[error("Parent node not found: {parent_id}")]
    ParentNotFound { parent_id: NodeId },

    /// Operation would delete or re-parent the root
    #[error("Node {id} is the root and cannot be deleted")]
    RootProtected { id: NodeId },

    /// Leaf deletion requested for a node with children
    #[error("Node {id} is not a leaf: it has {child_count} children")]
    NotALeaf { id: NodeId, child_count: usize },

    /// Name already taken among the candidate siblings
    #[error("A node named '{name}' already exists under parent {parent_id}")]
    DuplicateSibling { name: String, parent_id: NodeId },

    /// Re-parenting the children would duplicate sibling names under the
    /// grandparent; the move has been rolled back
    #[error("Re-parenting would duplicate sibling names under parent {parent_id}: {}", format_conflicts(.conflicts))]
    DuplicateAfterReparent {
        parent_id: NodeId,
        conflicts: Vec<NameConflict>,
    },

    /// Store-level failure (I/O, SQL, lock timeout, corrupt rows)
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),
}

impl TreeError {
    /// Create a node not found error
    pub fn node_not_found(id: NodeId) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create a parent not found error
    pub fn parent_not_found(parent_id: NodeId) -> Self {
        Self::ParentNotFound { parent_id }
    }

    /// Create a duplicate sibling error
    pub fn duplicate_sibling(name: impl Into<String>, parent_id: NodeId) -> Self {
        Self::DuplicateSibling {
            name: name.into(),
            parent_id,
        }
    }
}

fn format_conflicts(conflicts: &[NameConflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
