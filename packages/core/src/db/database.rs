//! Database Connection Management
//!
//! This module provides the core database connection and initialization
//! functionality using libsql for TaxoTree's single-relation schema.
//!
//! # Architecture
//!
//! - **Path-agnostic**: accepts any valid `PathBuf` (tests use `tempfile`)
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Foreign keys**: enabled per connection for referential integrity
//! - **Busy timeout**: 5 seconds, so concurrent operations wait and retry
//!   instead of failing immediately with `SQLITE_BUSY`
//!
//! # Connection Pattern
//!
//! Always acquire connections through [`DatabaseService::connect_with_timeout`]
//! in async contexts: it applies the busy timeout and the per-connection
//! `foreign_keys` pragma before the connection is handed out.

use crate::db::error::DatabaseError;
use crate::models::NodeId;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Database service for managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use taxotree_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("./data/taxotree.db")).await?;
///     let root_id = db.seed_root("Animalia").await?;
///     println!("root: {root_id}");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable WAL mode
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created, the
    /// connection fails, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;
        info!(path = %service.db_path.display(), "database ready");

        Ok(service)
    }

    /// Get a connection with the per-connection pragmas applied
    ///
    /// Sets a 5 second busy timeout (lock waits surface as a store error only
    /// after the timeout) and enables foreign key enforcement, which SQLite
    /// scopes to the connection, not the database file.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DatabaseError::connection_failed(self.db_path.clone(), e))?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of
    /// execute(). This helper encapsulates that pattern.
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Creates the `nodes` table and its parent index using CREATE TABLE IF
    /// NOT EXISTS, so initialization is idempotent.
    ///
    /// # Schema
    ///
    /// - `AUTOINCREMENT` keeps ids monotonic and never reused, and maintains
    ///   the `sqlite_sequence` row that [`Self::reset_sequence`] repairs
    /// - The parent foreign key is `DEFERRABLE INITIALLY DEFERRED`: a batch
    ///   subtree delete may remove parent and children in one statement, while
    ///   orphaning writes still fail at commit
    /// - Sibling-name uniqueness is deliberately NOT a constraint here; the
    ///   mutation engine enforces it so violations surface as typed errors
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // Enable WAL mode for better concurrency
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                parent_id INTEGER REFERENCES nodes(id) DEFERRABLE INITIALLY DEFERRED,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create nodes table: {}", e))
        })?;

        // Index on parent_id (hierarchy queries)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_nodes_parent': {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Seed the root node if the tree is empty
    ///
    /// The root is created here, out-of-band of the mutation engine, and is
    /// protected from deletion and re-parenting afterwards. Returns the id of
    /// the existing root when one is already present.
    pub async fn seed_root(&self, name: &str) -> Result<NodeId, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query("SELECT id FROM nodes WHERE parent_id IS NULL LIMIT 1", ())
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to look up root node: {}", e))
            })?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let id: NodeId = row
                .get(0)
                .map_err(|e| DatabaseError::sql_execution(format!("Failed to get root id: {}", e)))?;
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO nodes (name, parent_id) VALUES (?, NULL)",
            [name.trim()],
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to seed root node: {}", e)))?;

        let id = conn.last_insert_rowid();
        info!(id, name = name.trim(), "seeded root node");
        Ok(id)
    }

    /// Realign the id sequence with the table contents
    ///
    /// Maintenance hook for recovering from externally inserted rows that
    /// bypassed the autoincrement counter. Purely persistence-layer
    /// bookkeeping; has no bearing on the tree invariants.
    pub async fn reset_sequence(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // COALESCE keeps the counter when the table is empty; a NULL seq
        // would let the next insert restart at low ids
        conn.execute(
            "UPDATE sqlite_sequence
             SET seq = COALESCE((SELECT MAX(id) FROM nodes), seq)
             WHERE name = 'nodes'",
            (),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to reset sequence: {}", e)))?;

        debug!("id sequence realigned with MAX(id)");
        Ok(())
    }
}
