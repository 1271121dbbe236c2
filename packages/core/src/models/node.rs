//! Node Data Structures
//!
//! Defines the core `Node` struct plus the small value types returned by the
//! tree engines.
//!
//! # Examples
//!
//! ```rust
//! use taxotree_core::models::Node;
//! use chrono::Utc;
//!
//! let root = Node {
//!     id: 1,
//!     name: "Animalia".to_string(),
//!     parent_id: None,
//!     created_at: Utc::now(),
//! };
//! assert!(root.is_root());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the store on insertion.
///
/// Ids are monotonic and never reused: the backing table uses SQLite
/// `AUTOINCREMENT`, so a deleted node's id stays retired.
pub type NodeId = i64;

/// A single taxonomy tree node.
///
/// Exactly one node per tree has `parent_id = None` (the root). Names are
/// stored trimmed and are unique among siblings, never globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Store-assigned identifier, immutable once assigned
    pub id: NodeId,

    /// Non-empty, surrounding whitespace trimmed
    pub name: String,

    /// Parent reference; `None` only for the root
    pub parent_id: Option<NodeId>,

    /// Set by the store at insertion, never updated afterwards
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// True iff this node is the tree root (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// One entry of a depth-first pre-order subtree listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeEntry {
    pub node: Node,

    /// Distance from the subtree anchor; the anchor itself is depth 0
    pub depth: usize,
}

/// A sibling name that would be duplicated by a re-parenting move.
///
/// Carried by `TreeError::DuplicateAfterReparent` so callers can report every
/// conflicting name together with how many children would share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConflict {
    pub name: String,

    /// How many children of the new parent would carry `name`
    pub count: usize,
}

impl fmt::Display for NameConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({} duplicates)", self.name, self.count)
    }
}
