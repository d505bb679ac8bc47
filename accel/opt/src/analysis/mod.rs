//! Analyses over components.
//!
//! The analyses construct data-structures that make answering certain queries
//! about designs easier.
mod graph;
mod guard_exclusion;
mod read_write_set;

pub use graph::{InstancePaths, PortGraph};
pub use guard_exclusion::{GuardExclusion, MAX_CLAUSES};
pub use read_write_set::{Footprint, ReadWriteSet};
