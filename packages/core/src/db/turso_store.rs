//! TursoStore - NodeStore Implementation for the libsql Backend
//!
//! Implements the [`NodeStore`] / [`StoreTransaction`] contract on top of
//! [`DatabaseService`]. All row-to-model conversion happens in one central
//! helper; the SQL here is deliberately plain so the engines own every piece
//! of tree logic.
//!
//! # Transactions
//!
//! Write transactions use `BEGIN IMMEDIATE` so the write lock is taken before
//! the validation reads, not upgraded afterwards. Read transactions are
//! deferred snapshots. libsql rolls an uncommitted transaction back when it is
//! dropped, which gives early-return error paths rollback for free.

use crate::db::database::DatabaseService;
use crate::db::error::DatabaseError;
use crate::db::node_store::{NodeStore, StoreTransaction};
use crate::models::{Node, NodeId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Row, Transaction, TransactionBehavior};
use std::sync::Arc;

const NODE_COLUMNS: &str = "id, name, parent_id, created_at";

/// libsql-backed node store
///
/// # Examples
///
/// ```no_run
/// use taxotree_core::db::{DatabaseService, NodeStore, StoreTransaction, TursoStore};
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/taxotree.db")).await?);
///     let store = TursoStore::new(db);
///     let txn = store.begin_read().await?;
///     let root = txn.root().await?;
///     println!("{root:?}");
///     Ok(())
/// }
/// ```
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    /// Create a new TursoStore over an initialized database service
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    async fn begin(&self, behavior: TransactionBehavior) -> Result<TursoTransaction, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        let txn = conn
            .transaction_with_behavior(behavior)
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e)))?;
        Ok(TursoTransaction { txn })
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    type Transaction = TursoTransaction;

    async fn begin_write(&self) -> Result<TursoTransaction, DatabaseError> {
        self.begin(TransactionBehavior::Immediate).await
    }

    async fn begin_read(&self) -> Result<TursoTransaction, DatabaseError> {
        self.begin(TransactionBehavior::Deferred).await
    }
}

/// A libsql transaction holding the `nodes` relation operations
pub struct TursoTransaction {
    txn: Transaction,
}

impl TursoTransaction {
    /// Parse a timestamp from the database - handles both SQLite and RFC3339
    /// formats
    ///
    /// SQLite CURRENT_TIMESTAMP returns "YYYY-MM-DD HH:MM:SS"; rows written
    /// by external tooling may use RFC3339.
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(DatabaseError::sql_execution(format!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        )))
    }

    /// Convert a libsql Row to the Node model
    ///
    /// Expected columns, in order: id, name, parent_id, created_at.
    fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
        let id: NodeId = row
            .get(0)
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to get id: {}", e)))?;
        let name: String = row
            .get(1)
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to get name: {}", e)))?;
        let parent_id: Option<NodeId> = row
            .get(2)
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to get parent_id: {}", e)))?;
        let created_at_str: String = row
            .get(3)
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to get created_at: {}", e)))?;

        Ok(Node {
            id,
            name,
            parent_id,
            created_at: Self::parse_timestamp(&created_at_str)?,
        })
    }

    async fn fetch_nodes(&self, mut rows: libsql::Rows) -> Result<Vec<Node>, DatabaseError> {
        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to fetch row: {}", e)))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    /// Render an id set as a SQL IN-list
    ///
    /// Ids are integers, so inlining them avoids the per-backend placeholder
    /// limit on large subtree deletions.
    fn id_list(ids: &[NodeId]) -> String {
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl StoreTransaction for TursoTransaction {
    async fn get(&self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        let mut rows = self
            .txn
            .query(
                &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?"),
                [id],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to get node: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn root(&self) -> Result<Option<Node>, DatabaseError> {
        let mut rows = self
            .txn
            .query(
                &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE parent_id IS NULL LIMIT 1"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to get root: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn children_of(&self, parent_id: NodeId) -> Result<Vec<Node>, DatabaseError> {
        let rows = self
            .txn
            .query(
                &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE parent_id = ? ORDER BY id"),
                [parent_id],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to get children: {}", e)))?;

        self.fetch_nodes(rows).await
    }

    async fn insert(&self, name: &str, parent_id: NodeId) -> Result<NodeId, DatabaseError> {
        self.txn
            .execute(
                "INSERT INTO nodes (name, parent_id) VALUES (?, ?)",
                (name, parent_id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert node: {}", e)))?;

        Ok(self.txn.last_insert_rowid())
    }

    async fn delete_one(&self, id: NodeId) -> Result<(), DatabaseError> {
        self.txn
            .execute("DELETE FROM nodes WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete node: {}", e)))?;

        Ok(())
    }

    async fn delete_many(&self, ids: &[NodeId]) -> Result<u64, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let deleted = self
            .txn
            .execute(
                &format!("DELETE FROM nodes WHERE id IN ({})", Self::id_list(ids)),
                (),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to batch delete nodes: {}", e))
            })?;

        Ok(deleted)
    }

    async fn reparent(
        &self,
        child_ids: &[NodeId],
        new_parent_id: NodeId,
    ) -> Result<(), DatabaseError> {
        if child_ids.is_empty() {
            return Ok(());
        }

        self.txn
            .execute(
                &format!(
                    "UPDATE nodes SET parent_id = ? WHERE id IN ({})",
                    Self::id_list(child_ids)
                ),
                [new_parent_id],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to reparent nodes: {}", e))
            })?;

        Ok(())
    }

    async fn commit(self) -> Result<(), DatabaseError> {
        self.txn
            .commit()
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to commit transaction: {}", e)))
    }

    async fn rollback(self) -> Result<(), DatabaseError> {
        self.txn.rollback().await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to roll back transaction: {}", e))
        })
    }
}
