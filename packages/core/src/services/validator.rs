//! Precondition Checks
//!
//! Pure validation shared by the engines. The store-backed checks take the
//! transaction the caller is already inside: validating outside the
//! transaction that performs the write would race with concurrent mutations.

use crate::db::{DatabaseError, StoreTransaction};
use crate::models::NodeId;

/// True iff the name is non-empty after trimming surrounding whitespace.
pub fn name_is_valid(name: &str) -> bool {
    !name.trim().is_empty()
}

/// True iff a node with this id exists in the store.
pub async fn node_exists<T: StoreTransaction>(
    txn: &T,
    id: NodeId,
) -> Result<bool, DatabaseError> {
    Ok(txn.get(id).await?.is_some())
}

/// True iff a child of `parent_id` already carries the trimmed `name`.
pub async fn sibling_name_conflict<T: StoreTransaction>(
    txn: &T,
    name: &str,
    parent_id: NodeId,
) -> Result<bool, DatabaseError> {
    let name = name.trim();
    let children = txn.children_of(parent_id).await?;
    Ok(children.iter().any(|child| child.name == name))
}
