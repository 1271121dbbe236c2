//! Mutation Engine - Structural Tree Mutations
//!
//! Implements the add/delete/re-parent operations. Every operation runs
//! inside a single write transaction: validation reads, structural writes,
//! and post-condition checks all observe the same state, and any failure
//! path rolls the whole transaction back. A typed error therefore always
//! means the tree is exactly as it was before the call.
//!
//! The delicate operation is [`MutationEngine::delete_node_without_subtree`]:
//! a sibling-name conflict at the grandparent only becomes visible after the
//! children have tentatively moved, so the engine performs move, check, and
//! (on conflict) explicit rollback as one atomic unit.

use crate::db::{DatabaseError, NodeStore, StoreTransaction};
use crate::models::{NameConflict, Node, NodeId};
use crate::services::error::TreeError;
use crate::services::validator;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine for structural tree mutations
///
/// Generic over the store backend; holds the store behind an `Arc` so it can
/// be shared with the traversal engine.
pub struct MutationEngine<S: NodeStore> {
    store: Arc<S>,
}

impl<S: NodeStore> MutationEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Add a new leaf under an existing parent
    ///
    /// The name is trimmed before storage. Returns the store-assigned id.
    ///
    /// # Errors
    ///
    /// - `InvalidName` - name is blank after trimming
    /// - `ParentNotFound` - no node with `parent_id` exists
    /// - `DuplicateSibling` - a child of `parent_id` already has this name
    pub async fn add_leaf(&self, name: &str, parent_id: NodeId) -> Result<NodeId, TreeError> {
        if !validator::name_is_valid(name) {
            return Err(TreeError::InvalidName);
        }
        let name = name.trim();

        let txn = self.store.begin_write().await?;

        if !validator::node_exists(&txn, parent_id).await? {
            return Err(TreeError::parent_not_found(parent_id));
        }
        if validator::sibling_name_conflict(&txn, name, parent_id).await? {
            return Err(TreeError::duplicate_sibling(name, parent_id));
        }

        let id = txn.insert(name, parent_id).await?;
        txn.commit().await?;

        debug!(id, parent_id, name, "added leaf");
        Ok(id)
    }

    /// Delete a single leaf node
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` - no node with this id
    /// - `RootProtected` - the node is the root
    /// - `NotALeaf` - the node has at least one child
    pub async fn delete_leaf(&self, id: NodeId) -> Result<(), TreeError> {
        let txn = self.store.begin_write().await?;

        let node = require_node(&txn, id).await?;
        require_not_root(&node)?;

        let child_count = txn.children_of(id).await?.len();
        if child_count > 0 {
            return Err(TreeError::NotALeaf { id, child_count });
        }

        txn.delete_one(id).await?;
        txn.commit().await?;

        debug!(id, "deleted leaf");
        Ok(())
    }

    /// Delete a node and every transitive descendant
    ///
    /// The subtree id set is computed as the closure of `id` under the child
    /// relation (iterative breadth-first walk), then removed in one batch so
    /// no partial removal is ever observable. Returns the number of nodes
    /// removed. A visited set turns corrupt cyclic rows into a store error
    /// instead of an unbounded walk.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` - no node with this id
    /// - `RootProtected` - the node is the root
    pub async fn delete_subtree(&self, id: NodeId) -> Result<u64, TreeError> {
        let txn = self.store.begin_write().await?;

        let node = require_node(&txn, id).await?;
        require_not_root(&node)?;

        // Transitive reflexive closure under the child relation
        let mut ids = vec![id];
        let mut seen = HashSet::from([id]);
        let mut cursor = 0;
        while cursor < ids.len() {
            let current = ids[cursor];
            cursor += 1;
            for child in txn.children_of(current).await? {
                if !seen.insert(child.id) {
                    return Err(DatabaseError::inconsistent(format!(
                        "cycle in child relation at node {}",
                        child.id
                    ))
                    .into());
                }
                ids.push(child.id);
            }
        }

        let deleted = txn.delete_many(&ids).await?;
        txn.commit().await?;

        info!(id, deleted, "deleted subtree");
        Ok(deleted)
    }

    /// Delete a node while keeping its descendants
    ///
    /// Direct children are re-parented to the deleted node's own parent. If
    /// that move would leave the grandparent with duplicate child names, the
    /// whole operation is rolled back and fails with
    /// `DuplicateAfterReparent`, listing every conflicting name and its
    /// duplicate count; the tree is left exactly as before the call.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` - no node with this id
    /// - `RootProtected` - the node is the root
    /// - `DuplicateAfterReparent` - re-parenting would violate sibling-name
    ///   uniqueness at the grandparent
    pub async fn delete_node_without_subtree(&self, id: NodeId) -> Result<(), TreeError> {
        let txn = self.store.begin_write().await?;

        let node = require_node(&txn, id).await?;
        let Some(parent_id) = node.parent_id else {
            return Err(TreeError::RootProtected { id });
        };

        let children = txn.children_of(id).await?;
        if children.is_empty() {
            txn.delete_one(id).await?;
            txn.commit().await?;
            debug!(id, "deleted childless node");
            return Ok(());
        }

        let child_ids: Vec<NodeId> = children.iter().map(|child| child.id).collect();
        txn.reparent(&child_ids, parent_id).await?;

        // The conflict is only visible after the tentative move. Scan the
        // grandparent's full child-name set, excluding the node being
        // deleted: it still hangs under the grandparent here but is gone
        // once the operation commits.
        let new_siblings: Vec<Node> = txn
            .children_of(parent_id)
            .await?
            .into_iter()
            .filter(|sibling| sibling.id != id)
            .collect();
        let conflicts = duplicate_names(&new_siblings);

        if !conflicts.is_empty() {
            warn!(
                id,
                parent_id,
                conflict_count = conflicts.len(),
                "rolling back re-parenting: duplicate sibling names"
            );
            txn.rollback().await?;
            return Err(TreeError::DuplicateAfterReparent {
                parent_id,
                conflicts,
            });
        }

        txn.delete_one(id).await?;
        txn.commit().await?;

        info!(id, parent_id, reparented = child_ids.len(), "deleted node, children re-parented");
        Ok(())
    }
}

/// Fetch a node or fail with `NodeNotFound`.
async fn require_node<T: StoreTransaction>(txn: &T, id: NodeId) -> Result<Node, TreeError> {
    txn.get(id)
        .await
        .map_err(TreeError::from)?
        .ok_or(TreeError::NodeNotFound { id })
}

fn require_not_root(node: &Node) -> Result<(), TreeError> {
    if node.is_root() {
        return Err(TreeError::RootProtected { id: node.id });
    }
    Ok(())
}

/// Names carried by more than one node in the set, with their counts,
/// name-sorted.
fn duplicate_names(siblings: &[Node]) -> Vec<NameConflict> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for node in siblings {
        *counts.entry(node.name.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, count)| NameConflict {
            name: name.to_string(),
            count,
        })
        .collect()
}
