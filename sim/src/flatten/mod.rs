//! Flattening of a design into a global arena and its cycle-level
//! execution.
mod control;
pub mod primitives;
mod setup;
mod simulator;
pub mod structures;

pub use simulator::Simulator;
