use super::{Primitive, combinational::*, stateful::*};
use crate::{errors::SimResult, flatten::structures::GlobalPortIdx};
use accel_ir::{self as ir, GetName};
use accel_utils::Error;
use baa::{BitVecValue, WidthInt};

fn param(cell: &ir::Cell, name: &str) -> SimResult<WidthInt> {
    cell.get_parameter(name)
        .map(|v| v as WidthInt)
        .ok_or_else(|| {
            Error::undefined(name.into(), format!("parameter of {}", cell.name()))
                .into()
        })
}

/// Build the simulation model of a primitive or constant cell whose ports
/// were allocated contiguously, in signature order, from `base_port`.
pub fn build_primitive(
    cell: &ir::Cell,
    base_port: GlobalPortIdx,
    path: &str,
) -> SimResult<Box<dyn Primitive>> {
    if let Some((val, width)) = cell.constant() {
        let v = BitVecValue::from_u64(val, width as WidthInt);
        return Ok(Box::new(StdConst::new(v, base_port)));
    }
    let Some(name) = cell.type_name() else {
        return Err(Error::malformed_structure(format!(
            "`{path}' is not a primitive"
        ))
        .into());
    };
    Ok(match name.as_str() {
        "std_reg" => Box::new(StdReg::new(base_port, param(cell, "WIDTH")?)),
        "seq_mem_d1" => Box::new(SeqMemD1::new(
            base_port,
            path,
            param(cell, "WIDTH")?,
            param(cell, "SIZE")? as usize,
        )),
        "std_wire" => Box::new(StdWire::new(base_port)),
        "std_not" => Box::new(StdNot::new(base_port)),
        "std_add" => Box::new(StdAdd::new(base_port)),
        "std_sub" => Box::new(StdSub::new(base_port)),
        "std_and" => Box::new(StdAnd::new(base_port)),
        "std_or" => Box::new(StdOr::new(base_port)),
        "std_lt" => Box::new(StdLt::new(base_port)),
        "std_gt" => Box::new(StdGt::new(base_port)),
        "std_eq" => Box::new(StdEq::new(base_port)),
        "std_neq" => Box::new(StdNeq::new(base_port)),
        "std_le" => Box::new(StdLe::new(base_port)),
        "std_ge" => Box::new(StdGe::new(base_port)),
        "std_slt" => Box::new(StdSlt::new(base_port)),
        "std_sgt" => Box::new(StdSgt::new(base_port)),
        "std_pad" => Box::new(StdPad::new(base_port, param(cell, "OUT_WIDTH")?)),
        "std_slice" => {
            Box::new(StdSlice::new(base_port, param(cell, "OUT_WIDTH")?))
        }
        "std_cat" => Box::new(StdCat::new(base_port)),
        _ => {
            return Err(
                Error::undefined(name, "primitive with a simulation model").into()
            );
        }
    })
}
