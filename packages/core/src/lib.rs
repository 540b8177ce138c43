//! Task Tree Core Business Logic Layer
//!
//! This crate provides the hierarchy engine behind the task tree: a
//! materialized tree of tasks kept consistent under structural edits, and an
//! operation history that can undo and redo those edits.
//!
//! # Architecture
//!
//! - **Materialized Paths**: every task stores its ancestor chain, so subtree
//!   reads are a single repository query
//! - **Root Sentinel**: one synthetic task parents every top-level task
//! - **Validate, then Persist**: tree rules run before any write; partially
//!   applied writes are compensated
//! - **Repository Trait**: persistence is reached only through [`db::TaskStore`]
//!
//! # Modules
//!
//! - [`models`] - Data structures (Task, TaskInput, TaskPatch, TaskTree, ...)
//! - [`db`] - Repository trait, in-memory store and domain events
//! - [`services`] - TaskService, tree invariants, history, cache and sessions
//! - [`config`] - Tree configuration

pub mod config;
pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::{DeletePolicy, TreeConfig};
pub use models::*;
pub use services::*;
