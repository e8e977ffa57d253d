//! Command handlers
//!
//! Each handler takes typed parameters, acts on a `HabitApp` and returns a
//! serializable response with a human-readable message. The CLI is a thin
//! layer over these.

pub mod data;
pub mod habits;
pub mod list;
pub mod notes;
pub mod preferences;

// Re-export command functions for easy access
pub use data::*;
pub use habits::*;
pub use list::*;
pub use notes::*;
pub use preferences::*;
