//! Data Models
//!
//! This module contains the core data structures used throughout TaxoTree:
//!
//! - `Node` - a single taxonomy tree entry
//! - `SubtreeEntry` - one row of a depth-first subtree listing
//! - `NameConflict` - a duplicate sibling name detected after re-parenting
//!
//! All entities map onto the single `nodes` relation
//! `(id, name, parent_id, created_at)`.

mod node;

pub use node::{NameConflict, Node, NodeId, SubtreeEntry};
