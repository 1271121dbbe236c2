//! Tree Engines
//!
//! This module contains the components with the tree logic:
//!
//! - `MutationEngine` - add/delete/re-parent operations with atomic
//!   invariant preservation
//! - `TraversalEngine` - read-only queries over the tree shape
//! - `validator` - pure precondition checks shared by the engines
//!
//! The engines coordinate validation, store calls, and transaction
//! boundaries; they never touch SQL directly.

pub mod error;
pub mod mutation;
pub mod traversal;
pub mod validator;

pub use error::TreeError;
pub use mutation::MutationEngine;
pub use traversal::TraversalEngine;
