//! Traversal Engine - Read-Only Tree Queries
//!
//! Queries over the tree shape: direct children, direct parent, full subtree
//! (depth-first pre-order), and root path (ancestor chain, root-first).
//!
//! Every query runs inside one read transaction so it observes a single
//! consistent snapshot; a concurrent mutation can never produce a child list
//! that reflects only part of a batch deletion. Subtree and ancestor sets are
//! computed by explicit closure walks in the engine, not by recursive store
//! queries, keeping the logic portable across backends.

use crate::db::{DatabaseError, NodeStore, StoreTransaction};
use crate::models::{Node, NodeId, SubtreeEntry};
use crate::services::error::TreeError;
use std::collections::HashSet;
use std::sync::Arc;

/// Engine for read-only tree queries
pub struct TraversalEngine<S: NodeStore> {
    store: Arc<S>,
}

impl<S: NodeStore> TraversalEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Direct children of a node, ordered by ascending id
    ///
    /// Empty if the node is a leaf. Fails with `NodeNotFound` for an absent
    /// id.
    pub async fn direct_children(&self, id: NodeId) -> Result<Vec<Node>, TreeError> {
        let txn = self.store.begin_read().await?;

        require_node(&txn, id).await?;
        let children = txn.children_of(id).await?;

        txn.commit().await?;
        Ok(children)
    }

    /// Direct parent of a node, or `None` for the root
    ///
    /// Fails with `NodeNotFound` for an absent id.
    pub async fn direct_parent(&self, id: NodeId) -> Result<Option<Node>, TreeError> {
        let txn = self.store.begin_read().await?;

        let node = require_node(&txn, id).await?;
        let parent = match node.parent_id {
            Some(parent_id) => Some(txn.get(parent_id).await?.ok_or_else(|| {
                DatabaseError::inconsistent(format!(
                    "parent {} of node {} is missing",
                    parent_id, id
                ))
            })?),
            None => None,
        };

        txn.commit().await?;
        Ok(parent)
    }

    /// Full subtree of a node in depth-first pre-order
    ///
    /// The anchor appears first at depth 0; children are visited in
    /// ascending id order at every level. The listing is materialized within
    /// one snapshot, so re-invoking on an unmodified tree yields an identical
    /// sequence. A visited set turns corrupt cyclic data into a store error
    /// instead of an infinite loop.
    pub async fn full_subtree(&self, id: NodeId) -> Result<Vec<SubtreeEntry>, TreeError> {
        let txn = self.store.begin_read().await?;

        let anchor = require_node(&txn, id).await?;

        let mut entries = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut stack = vec![(anchor, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let children = txn.children_of(node.id).await?;
            entries.push(SubtreeEntry { node, depth });
            // Reversed push so the smallest id is popped first
            for child in children.into_iter().rev() {
                if !seen.insert(child.id) {
                    return Err(DatabaseError::inconsistent(format!(
                        "cycle in child relation at node {}",
                        child.id
                    ))
                    .into());
                }
                stack.push((child, depth + 1));
            }
        }

        txn.commit().await?;
        Ok(entries)
    }

    /// Ancestor chain of a node, root-first, excluding the node itself
    ///
    /// Empty for the root. Computed by walking the parent relation to the
    /// root and reversing; a visited set turns corrupt cyclic data into a
    /// store error instead of an infinite loop.
    pub async fn root_path(&self, id: NodeId) -> Result<Vec<Node>, TreeError> {
        let txn = self.store.begin_read().await?;

        let mut current = require_node(&txn, id).await?;
        let mut ancestors = Vec::new();
        let mut seen = HashSet::from([id]);

        while let Some(parent_id) = current.parent_id {
            if !seen.insert(parent_id) {
                return Err(DatabaseError::inconsistent(format!(
                    "cycle in parent chain at node {}",
                    parent_id
                ))
                .into());
            }

            let parent = txn.get(parent_id).await?.ok_or_else(|| {
                DatabaseError::inconsistent(format!(
                    "parent {} of node {} is missing",
                    parent_id, current.id
                ))
            })?;
            ancestors.push(parent.clone());
            current = parent;
        }

        ancestors.reverse();
        txn.commit().await?;
        Ok(ancestors)
    }
}

/// Fetch a node or fail with `NodeNotFound`.
async fn require_node<T: StoreTransaction>(txn: &T, id: NodeId) -> Result<Node, TreeError> {
    txn.get(id)
        .await
        .map_err(TreeError::from)?
        .ok_or(TreeError::NodeNotFound { id })
}
