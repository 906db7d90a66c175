//! Background Tasks Module
//!
//! Contains background tasks that run periodically during operation.
//!
//! # Tasks
//! - Cache sweep: removes expired entries, then trims to the size bound

mod cleanup;

pub use cleanup::spawn_cleanup_task;
