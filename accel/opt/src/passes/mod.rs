//! Passes over whole designs.
mod well_formed;

pub use well_formed::WellFormed;
