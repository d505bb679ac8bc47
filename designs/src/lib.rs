//! Accelerator designs built with the construction API: the reusable top-k
//! tracker and membership filter, and the puzzle drivers that use them.
mod mem;

pub mod calories;
pub mod filter;
pub mod rps;
pub mod rucksack;
pub mod topk;

pub use mem::{build_lut, build_mem};

use accel_ir::Context;
use accel_utils::{AccelResult, Error};

/// Names accepted by [`build_design`].
pub const DESIGNS: [&str; 4] = ["calories", "rps", "rucksack", "topk"];

/// Initial contents of one external memory of a design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryInit {
    pub name: &'static str,
    pub data: Vec<u64>,
    pub width: u64,
}

impl MemoryInit {
    pub fn new(name: &'static str, data: Vec<u64>, width: u64) -> Self {
        Self { name, data, width }
    }
}

/// Zero-extend `data` to the `size` entries of a memory.
pub(crate) fn padded(mut data: Vec<u64>, size: u64) -> AccelResult<Vec<u64>> {
    if data.len() as u64 > size {
        return Err(Error::capacity(format!(
            "{} values do not fit in a memory of {size} entries",
            data.len()
        )));
    }
    data.resize(size as usize, 0);
    Ok(data)
}

/// Build the design called `name`.
pub fn build_design(name: &str) -> AccelResult<Context> {
    let ctx = match name {
        "calories" => calories::build()?,
        "rps" => rps::build()?,
        "rucksack" => rucksack::build()?,
        "topk" => topk::build_streaming(&topk::TopKConfig::default())?,
        _ => {
            return Err(Error::undefined(name.into(), "design"));
        }
    };
    log::debug!("built design `{name}'");
    Ok(ctx)
}

/// Encode the puzzle text `text` into the external memories of the design
/// called `name`.
pub fn design_inputs(name: &str, text: &str) -> AccelResult<Vec<MemoryInit>> {
    match name {
        "calories" => calories::inputs(text),
        "rps" => rps::inputs(text),
        "rucksack" => rucksack::inputs(text),
        "topk" => topk::streaming_inputs(text, topk::TopKConfig::default().width),
        _ => Err(Error::undefined(name.into(), "design")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_opt::passes::WellFormed;

    #[test]
    fn every_design_is_well_formed() {
        for name in DESIGNS {
            let ctx = build_design(name).unwrap();
            WellFormed::validate(&ctx).unwrap();
        }
    }

    #[test]
    fn unknown_design() {
        assert_eq!(build_design("day4").unwrap_err().kind(), "undefined");
    }

    #[test]
    fn padding_respects_capacity() {
        assert_eq!(padded(vec![1, 2], 4).unwrap(), [1, 2, 0, 0]);
        assert_eq!(padded(vec![1, 2], 1).unwrap_err().kind(), "capacity");
    }
}
