//! Business Services
//!
//! This module contains the task tree business logic:
//!
//! - `TreeInvariants` - pure validation and path/order derivation
//! - `TaskService` - structural mutations and tree reads over a `TaskStore`
//! - `OperationHistory` - bounded undo/redo of recorded operations
//! - `TaskTreeCache` - a client's in-memory copy of the visible forest
//! - `TaskSession` - one client's history and cache behind a single lock
//!
//! Services sit between the repository and callers (the HTTP layer, tests),
//! enforcing the tree rules on every edit.

pub mod error;
pub mod history;
pub mod session;
pub mod task_service;
pub mod tree_cache;
pub mod tree_invariants;

pub use error::{TaskResult, TaskServiceError};
pub use history::{Operation, OperationHistory, TaskSnapshot};
pub use session::TaskSession;
pub use task_service::TaskService;
pub use tree_cache::TaskTreeCache;
pub use tree_invariants::TreeInvariants;
