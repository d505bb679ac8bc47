//! Shared utilities for the accelerator construction crates.
mod errors;
mod id;
mod namegenerator;
mod out_file;

pub mod math;

pub use errors::{AccelResult, Error};
pub use id::{GetName, Id};
pub use math::{bits_for_value, bits_needed_for};
pub use namegenerator::NameGenerator;
pub use out_file::OutputFile;
