//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - The `nodes` relation `(id, name, parent_id, created_at)`
//! - Store abstraction traits consumed by the tree engines
//! - Transaction-scoped libsql implementation of the store contract
//!
//! # Architecture
//!
//! The engines never touch SQL directly. They talk to the [`NodeStore`] /
//! [`StoreTransaction`] traits, which keep the invariant-preservation logic
//! portable across backends. [`TursoStore`] is the libsql implementation.

mod database;
mod error;
mod node_store;
mod turso_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use node_store::{NodeStore, StoreTransaction};
pub use turso_store::{TursoStore, TursoTransaction};
