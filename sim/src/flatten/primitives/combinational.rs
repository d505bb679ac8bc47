use super::{
    Primitive,
    macros::{comb_primitive, ports},
    prim_trait::UpdateStatus,
};
use crate::flatten::structures::{GlobalPortIdx, PortMap};
use baa::{BitVecOps, BitVecValue};

/// A constant cell. Its value is driven at the start of every cycle.
#[derive(Clone, Debug)]
pub struct StdConst {
    value: BitVecValue,
    out: GlobalPortIdx,
}

impl StdConst {
    pub fn new(value: BitVecValue, out: GlobalPortIdx) -> Self {
        Self { value, out }
    }
}

impl Primitive for StdConst {
    fn exec_comb(&self, port_map: &mut PortMap) -> UpdateStatus {
        port_map.write_value(self.out, &self.value)
    }

    fn drive_state(&self, port_map: &mut PortMap) {
        port_map.write_value(self.out, &self.value);
    }

    fn is_combinational(&self) -> bool {
        true
    }

    fn clone_boxed(&self) -> Box<dyn Primitive> {
        Box::new(self.clone())
    }
}

comb_primitive!(StdWire(input [0]) -> (out [1]) {
    input.clone()
});

comb_primitive!(StdNot(input [0]) -> (out [1]) {
    input.not()
});

// ===================== Unsigned binary operations ======================
comb_primitive!(StdAdd(left [0], right [1]) -> (out [2]) {
    left.add(right)
});
comb_primitive!(StdSub(left [0], right [1]) -> (out [2]) {
    left.sub(right)
});

// ===================== Logial Operations ======================
comb_primitive!(StdAnd(left [0], right [1]) -> (out [2]) {
    left.and(right)
});
comb_primitive!(StdOr(left [0], right [1]) -> (out [2]) {
    left.or(right)
});

// ===================== Comparison Operations ======================
comb_primitive!(StdGt(left [0], right [1]) -> (out [2]) {
    left.is_greater(right).into()
});
comb_primitive!(StdLt(left [0], right [1]) -> (out [2]) {
    left.is_less(right).into()
});
comb_primitive!(StdGe(left [0], right [1]) -> (out [2]) {
    left.is_greater_or_equal(right).into()
});
comb_primitive!(StdLe(left [0], right [1]) -> (out [2]) {
    left.is_less_or_equal(right).into()
});
comb_primitive!(StdEq(left [0], right [1]) -> (out [2]) {
    left.is_equal(right).into()
});
comb_primitive!(StdNeq(left [0], right [1]) -> (out [2]) {
    left.is_not_equal(right).into()
});

// ===================== Signed Comparison Operations ======================
comb_primitive!(StdSgt(left [0], right [1]) -> (out [2]) {
    left.is_greater_signed(right).into()
});
comb_primitive!(StdSlt(left [0], right [1]) -> (out [2]) {
    left.is_less_signed(right).into()
});

// ===================== Resizing Operations ======================
comb_primitive!(StdSlice[OUT_WIDTH](input [0]) -> (out [1]) {
    input.slice(OUT_WIDTH - 1, 0)
});
comb_primitive!(StdPad[OUT_WIDTH](input [0]) -> (out [1]) {
    let by = OUT_WIDTH - input.width();
    input.zero_extend(by)
});
comb_primitive!(StdCat(left [0], right [1]) -> (out [2]) {
    left.concat(right)
});
