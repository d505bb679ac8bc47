//! A cycle-level reference simulator for accelerator designs.
//!
//! The simulator flattens the component hierarchy of a [`accel_ir::Context`]
//! into one arena of ports and primitive cells and then interprets the
//! control program of the entrypoint cycle by cycle. It exists to observe
//! the behavior of designs in tests; it is not a lowering to hardware.
pub mod configuration;
pub mod errors;
pub mod flatten;
pub mod serialization;

pub use configuration::SimConfig;
pub use errors::{BoxedSimError, SimError, SimResult};
pub use flatten::Simulator;
pub use serialization::{FormatInfo, MemoryData, MemoryEntry, NumericType};
