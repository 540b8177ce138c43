//! Repository Layer
//!
//! This module holds everything the task service needs from persistence:
//!
//! - [`TaskStore`] - the async repository trait the service is written against
//! - [`InMemoryTaskStore`] - reference implementation backed by a `HashMap`
//! - [`TaskEvent`] - domain events broadcast after committed mutations
//!
//! The storage engine itself is outside this crate; a production backend only
//! has to implement [`TaskStore`].

pub mod events;
mod memory_store;
mod task_store;

pub use events::TaskEvent;
pub use memory_store::InMemoryTaskStore;
pub use task_store::TaskStore;
