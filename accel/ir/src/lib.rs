//! Construction model for control-driven hardware accelerators.
//!
//! A design is a [`Context`]: a registry of [`Component`] definitions, one of
//! which is the entrypoint. Components own their cells, their groups
//! (atomic actions with a `go`/`done` handshake), their combinational groups
//! and exactly one [`Control`] program. Everything inside a component is
//! stored in an arena and referred to by a typed index, so references between
//! parts of a design are plain `Copy` values.

// Modules defining internal structures.
mod builder;
mod component;
mod context;
mod control;
mod guard;
mod lib_sig;
mod macros;
mod printer;
mod structure;

// Re-export types at the module level.
pub use accel_utils::{GetName, Id};
pub use builder::Builder;
pub use component::Component;
pub use context::Context;
pub use control::{Control, Empty, Enable, If, Invoke, Par, Seq, While};
pub use guard::{Guard, PortComp};
pub use lib_sig::{LibrarySignatures, Primitive, Width};
pub use printer::Printer;
pub use structure::{
    Assignment, Cell, CellIdx, CellType, CombGroup, CombGroupIdx,
    ComponentIdx, Direction, Group, GroupIdx, PortDef, PortParent, PortRef,
};

/// Names of the interface ports every component and every group carries.
pub const GO: &str = "go";
pub const DONE: &str = "done";
