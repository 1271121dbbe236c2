//! Integration tests for the tree engines
//!
//! Exercises every mutation and traversal operation against a real libsql
//! database, with a focus on the structural invariants: single protected
//! root, sibling-name uniqueness, atomicity of the re-parenting delete, and
//! completeness of batch subtree deletion.

use std::sync::Arc;

use taxotree_core::db::{DatabaseService, NodeStore, StoreTransaction, TursoStore};
use taxotree_core::models::NodeId;
use taxotree_core::services::{MutationEngine, TraversalEngine, TreeError};

struct Fixture {
    mutation: MutationEngine<TursoStore>,
    traversal: TraversalEngine<TursoStore>,
    store: Arc<TursoStore>,
    db: Arc<DatabaseService>,
    root_id: NodeId,
    _temp_dir: tempfile::TempDir,
}

/// Fresh tree seeded with root "Animalia".
async fn fixture() -> anyhow::Result<Fixture> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let temp_dir = tempfile::TempDir::new()?;
    let db = Arc::new(DatabaseService::new(temp_dir.path().join("test.db")).await?);
    let root_id = db.seed_root("Animalia").await?;
    let store = Arc::new(TursoStore::new(db.clone()));

    Ok(Fixture {
        mutation: MutationEngine::new(store.clone()),
        traversal: TraversalEngine::new(store.clone()),
        store,
        db,
        root_id,
        _temp_dir: temp_dir,
    })
}

/// Structure snapshot for atomicity checks: (id, name, parent_id) for every
/// node, in id order.
async fn snapshot(f: &Fixture) -> anyhow::Result<Vec<(NodeId, String, Option<NodeId>)>> {
    let entries = f.traversal.full_subtree(f.root_id).await?;
    let mut rows: Vec<_> = entries
        .into_iter()
        .map(|entry| (entry.node.id, entry.node.name, entry.node.parent_id))
        .collect();
    rows.sort();
    Ok(rows)
}

#[tokio::test]
async fn test_add_leaf_assigns_ids_and_trims_names() -> anyhow::Result<()> {
    let f = fixture().await?;

    let felidae = f.mutation.add_leaf("  Felidae  ", f.root_id).await?;
    let canidae = f.mutation.add_leaf("Canidae", f.root_id).await?;
    assert!(canidae > felidae);

    let children = f.traversal.direct_children(f.root_id).await?;
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].name, "Felidae");
    assert_eq!(children[1].name, "Canidae");

    Ok(())
}

#[tokio::test]
async fn test_add_leaf_rejects_blank_name() -> anyhow::Result<()> {
    let f = fixture().await?;

    assert!(matches!(
        f.mutation.add_leaf("   ", f.root_id).await,
        Err(TreeError::InvalidName)
    ));

    Ok(())
}

#[tokio::test]
async fn test_add_leaf_rejects_missing_parent() -> anyhow::Result<()> {
    let f = fixture().await?;

    assert!(matches!(
        f.mutation.add_leaf("Felidae", 9999).await,
        Err(TreeError::ParentNotFound { parent_id: 9999 })
    ));

    Ok(())
}

#[tokio::test]
async fn test_add_leaf_rejects_duplicate_sibling() -> anyhow::Result<()> {
    let f = fixture().await?;

    f.mutation.add_leaf("Felidae", f.root_id).await?;
    let err = f.mutation.add_leaf("Felidae", f.root_id).await.unwrap_err();
    assert!(matches!(err, TreeError::DuplicateSibling { .. }));

    // Trimmed duplicate is still a duplicate
    let err = f.mutation.add_leaf(" Felidae ", f.root_id).await.unwrap_err();
    assert!(matches!(err, TreeError::DuplicateSibling { .. }));

    Ok(())
}

#[tokio::test]
async fn test_same_name_allowed_under_different_parents() -> anyhow::Result<()> {
    let f = fixture().await?;

    let felidae = f.mutation.add_leaf("Felidae", f.root_id).await?;
    let canidae = f.mutation.add_leaf("Canidae", f.root_id).await?;
    f.mutation.add_leaf("Hybrid", felidae).await?;
    f.mutation.add_leaf("Hybrid", canidae).await?;

    Ok(())
}

#[tokio::test]
async fn test_delete_leaf_guards() -> anyhow::Result<()> {
    let f = fixture().await?;

    let canidae = f.mutation.add_leaf("Canidae", f.root_id).await?;
    let wolf = f.mutation.add_leaf("Wolf", canidae).await?;

    assert!(matches!(
        f.mutation.delete_leaf(9999).await,
        Err(TreeError::NodeNotFound { id: 9999 })
    ));
    assert!(matches!(
        f.mutation.delete_leaf(f.root_id).await,
        Err(TreeError::RootProtected { .. })
    ));
    assert!(matches!(
        f.mutation.delete_leaf(canidae).await,
        Err(TreeError::NotALeaf { child_count: 1, .. })
    ));

    // The failed attempts removed nothing
    assert_eq!(f.traversal.full_subtree(f.root_id).await?.len(), 3);

    f.mutation.delete_leaf(wolf).await?;
    f.mutation.delete_leaf(canidae).await?;
    assert_eq!(f.traversal.full_subtree(f.root_id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_subtree_removes_every_descendant() -> anyhow::Result<()> {
    let f = fixture().await?;

    let felidae = f.mutation.add_leaf("Felidae", f.root_id).await?;
    let canidae = f.mutation.add_leaf("Canidae", f.root_id).await?;
    let wolf = f.mutation.add_leaf("Wolf", canidae).await?;
    let fox = f.mutation.add_leaf("Fox", canidae).await?;
    let arctic_fox = f.mutation.add_leaf("Arctic Fox", fox).await?;

    let deleted = f.mutation.delete_subtree(canidae).await?;
    assert_eq!(deleted, 4);

    let children = f.traversal.direct_children(f.root_id).await?;
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, felidae);

    // No node of the pre-call subtree remains
    for id in [canidae, wolf, fox, arctic_fox] {
        assert!(matches!(
            f.traversal.direct_children(id).await,
            Err(TreeError::NodeNotFound { .. })
        ));
    }

    Ok(())
}

#[tokio::test]
async fn test_delete_subtree_guards() -> anyhow::Result<()> {
    let f = fixture().await?;

    assert!(matches!(
        f.mutation.delete_subtree(9999).await,
        Err(TreeError::NodeNotFound { .. })
    ));
    assert!(matches!(
        f.mutation.delete_subtree(f.root_id).await,
        Err(TreeError::RootProtected { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_node_without_subtree_on_childless_node() -> anyhow::Result<()> {
    let f = fixture().await?;

    let felidae = f.mutation.add_leaf("Felidae", f.root_id).await?;
    f.mutation.delete_node_without_subtree(felidae).await?;

    assert!(f.traversal.direct_children(f.root_id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_delete_node_without_subtree_reparents_children() -> anyhow::Result<()> {
    let f = fixture().await?;

    let mammalia = f.mutation.add_leaf("Mammalia", f.root_id).await?;
    let cat = f.mutation.add_leaf("Cat", mammalia).await?;
    let dog = f.mutation.add_leaf("Dog", mammalia).await?;

    f.mutation.delete_node_without_subtree(mammalia).await?;

    let children = f.traversal.direct_children(f.root_id).await?;
    let ids: Vec<NodeId> = children.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![cat, dog]);
    assert!(children.iter().all(|n| n.parent_id == Some(f.root_id)));

    assert!(matches!(
        f.traversal.direct_parent(mammalia).await,
        Err(TreeError::NodeNotFound { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_node_without_subtree_conflict_is_atomic() -> anyhow::Result<()> {
    let f = fixture().await?;

    // Root already has a direct child "Cat"; Mammalia's children include
    // another "Cat" that would collide after the move.
    let mammalia = f.mutation.add_leaf("Mammalia", f.root_id).await?;
    f.mutation.add_leaf("Cat", mammalia).await?;
    f.mutation.add_leaf("Dog", mammalia).await?;
    f.mutation.add_leaf("Cat", f.root_id).await?;

    let before = snapshot(&f).await?;

    let err = f
        .mutation
        .delete_node_without_subtree(mammalia)
        .await
        .unwrap_err();
    match err {
        TreeError::DuplicateAfterReparent {
            parent_id,
            conflicts,
        } => {
            assert_eq!(parent_id, f.root_id);
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].name, "Cat");
            assert_eq!(conflicts[0].count, 2);
        }
        other => panic!("expected DuplicateAfterReparent, got {other:?}"),
    }

    // Byte-for-byte identical structure: node 'Mammalia' and its children
    // are still present and unmoved.
    let after = snapshot(&f).await?;
    assert_eq!(before, after);

    Ok(())
}

#[tokio::test]
async fn test_deleted_node_name_does_not_block_reparent() -> anyhow::Result<()> {
    let f = fixture().await?;

    // A child named like its doomed parent is not a conflict: the parent is
    // gone once the operation commits.
    let mammalia = f.mutation.add_leaf("Mammalia", f.root_id).await?;
    f.mutation.add_leaf("Mammalia", mammalia).await?;

    f.mutation.delete_node_without_subtree(mammalia).await?;

    let children = f.traversal.direct_children(f.root_id).await?;
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "Mammalia");

    Ok(())
}

#[tokio::test]
async fn test_full_subtree_preorder() -> anyhow::Result<()> {
    let f = fixture().await?;

    let felidae = f.mutation.add_leaf("Felidae", f.root_id).await?;
    let canidae = f.mutation.add_leaf("Canidae", f.root_id).await?;
    let cat = f.mutation.add_leaf("Cat", felidae).await?;
    let lion = f.mutation.add_leaf("Lion", felidae).await?;
    let wolf = f.mutation.add_leaf("Wolf", canidae).await?;

    let entries = f.traversal.full_subtree(f.root_id).await?;
    let listing: Vec<(NodeId, usize)> = entries
        .iter()
        .map(|entry| (entry.node.id, entry.depth))
        .collect();

    assert_eq!(
        listing,
        vec![
            (f.root_id, 0),
            (felidae, 1),
            (cat, 2),
            (lion, 2),
            (canidae, 1),
            (wolf, 2),
        ]
    );

    // Anchored below the root
    let entries = f.traversal.full_subtree(felidae).await?;
    let listing: Vec<(NodeId, usize)> = entries
        .iter()
        .map(|entry| (entry.node.id, entry.depth))
        .collect();
    assert_eq!(listing, vec![(felidae, 0), (cat, 1), (lion, 1)]);

    Ok(())
}

#[tokio::test]
async fn test_root_path() -> anyhow::Result<()> {
    let f = fixture().await?;

    let canidae = f.mutation.add_leaf("Canidae", f.root_id).await?;
    let fox = f.mutation.add_leaf("Fox", canidae).await?;
    let arctic_fox = f.mutation.add_leaf("Arctic Fox", fox).await?;

    let path = f.traversal.root_path(arctic_fox).await?;
    let ids: Vec<NodeId> = path.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![f.root_id, canidae, fox]);

    assert!(f.traversal.root_path(f.root_id).await?.is_empty());
    assert!(matches!(
        f.traversal.root_path(9999).await,
        Err(TreeError::NodeNotFound { .. })
    ));

    Ok(())
}

/// Corrupt the parent relation into a two-node cycle via a raw connection.
async fn inject_cycle(f: &Fixture) -> anyhow::Result<(NodeId, NodeId)> {
    let a = f.mutation.add_leaf("Mammalia", f.root_id).await?;
    let b = f.mutation.add_leaf("Felidae", a).await?;

    let conn = f.db.connect_with_timeout().await?;
    conn.execute("UPDATE nodes SET parent_id = ? WHERE id = ?", [b, a])
        .await?;

    Ok((a, b))
}

#[tokio::test]
async fn test_root_path_on_cyclic_rows_fails_instead_of_looping() -> anyhow::Result<()> {
    let f = fixture().await?;
    let (a, b) = inject_cycle(&f).await?;

    assert!(matches!(
        f.traversal.root_path(b).await,
        Err(TreeError::Database(_))
    ));
    assert!(matches!(
        f.traversal.root_path(a).await,
        Err(TreeError::Database(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_subtree_walks_on_cyclic_rows_fail_instead_of_looping() -> anyhow::Result<()> {
    let f = fixture().await?;
    let (a, _b) = inject_cycle(&f).await?;

    assert!(matches!(
        f.traversal.full_subtree(a).await,
        Err(TreeError::Database(_))
    ));
    assert!(matches!(
        f.mutation.delete_subtree(a).await,
        Err(TreeError::Database(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_direct_parent() -> anyhow::Result<()> {
    let f = fixture().await?;

    let canidae = f.mutation.add_leaf("Canidae", f.root_id).await?;
    let wolf = f.mutation.add_leaf("Wolf", canidae).await?;

    let parent = f.traversal.direct_parent(wolf).await?.expect("has parent");
    assert_eq!(parent.id, canidae);

    assert!(f.traversal.direct_parent(f.root_id).await?.is_none());
    assert!(matches!(
        f.traversal.direct_parent(9999).await,
        Err(TreeError::NodeNotFound { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_reads_are_idempotent() -> anyhow::Result<()> {
    let f = fixture().await?;

    let felidae = f.mutation.add_leaf("Felidae", f.root_id).await?;
    f.mutation.add_leaf("Cat", felidae).await?;
    f.mutation.add_leaf("Lion", felidae).await?;

    assert_eq!(
        f.traversal.direct_children(felidae).await?,
        f.traversal.direct_children(felidae).await?
    );
    assert_eq!(
        f.traversal.full_subtree(f.root_id).await?,
        f.traversal.full_subtree(f.root_id).await?
    );
    assert_eq!(
        f.traversal.root_path(felidae).await?,
        f.traversal.root_path(felidae).await?
    );

    Ok(())
}

#[tokio::test]
async fn test_ids_are_never_reused() -> anyhow::Result<()> {
    let f = fixture().await?;

    let felidae = f.mutation.add_leaf("Felidae", f.root_id).await?;
    f.mutation.delete_leaf(felidae).await?;

    let canidae = f.mutation.add_leaf("Canidae", f.root_id).await?;
    assert!(canidae > felidae);

    Ok(())
}

#[tokio::test]
async fn test_single_root_is_preserved() -> anyhow::Result<()> {
    let f = fixture().await?;

    let felidae = f.mutation.add_leaf("Felidae", f.root_id).await?;
    f.mutation.add_leaf("Cat", felidae).await?;
    let _ = f.mutation.delete_node_without_subtree(felidae).await;
    let _ = f.mutation.delete_leaf(f.root_id).await;
    let _ = f.mutation.delete_subtree(f.root_id).await;

    let txn = f.store.begin_read().await?;
    let root = txn.root().await?.expect("root must survive");
    assert_eq!(root.id, f.root_id);
    assert_eq!(root.name, "Animalia");

    Ok(())
}
