//! The flattened form of a design: one arena of ports shared by every
//! instance, primitive cells stored behind indices into it, and one
//! [`Instance`] per component instantiated in the hierarchy.
use super::primitives::prim_trait::UpdateStatus;
use accel_idx::{IndexRef, IndexedMap, impl_index};
use accel_ir::{self as ir, CellIdx, GroupIdx, Id, PortRef};
use accel_utils::math;
use ahash::AHashMap;
use baa::{BitVecOps, BitVecValue, WidthInt};

/// A port in the flattened design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalPortIdx(u32);
impl_index!(GlobalPortIdx);

/// A primitive cell in the flattened design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalCellIdx(u32);
impl_index!(GlobalCellIdx);

/// A component instance in the flattened design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceIdx(u32);
impl_index!(InstanceIdx);

/// Current value of every port.
#[derive(Debug, Clone, Default)]
pub struct PortMap {
    values: IndexedMap<GlobalPortIdx, BitVecValue>,
}

impl PortMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new port holding zero.
    pub fn push(&mut self, width: u64) -> GlobalPortIdx {
        self.values.push(BitVecValue::zero(width as WidthInt))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn width(&self, port: GlobalPortIdx) -> u64 {
        self.values[port].width() as u64
    }

    pub fn value(&self, port: GlobalPortIdx) -> &BitVecValue {
        &self.values[port]
    }

    /// Read a port as an unsigned integer. Widths never exceed 64 bits.
    pub fn read(&self, port: GlobalPortIdx) -> u64 {
        self.values[port].to_u64().unwrap_or_default()
    }

    pub fn read_bool(&self, port: GlobalPortIdx) -> bool {
        !self.values[port].is_zero()
    }

    /// Write `val`, truncated to the width of the port.
    pub fn write(&mut self, port: GlobalPortIdx, val: u64) -> UpdateStatus {
        let width = self.width(port);
        let val = val & math::mask(width);
        if self.read(port) == val {
            return UpdateStatus::Unchanged;
        }
        self.values[port] = BitVecValue::from_u64(val, width as WidthInt);
        UpdateStatus::Changed
    }

    pub fn write_bool(&mut self, port: GlobalPortIdx, val: bool) -> UpdateStatus {
        self.write(port, val as u64)
    }

    /// Copy a stored value onto a port of the same width.
    pub fn write_value(
        &mut self,
        port: GlobalPortIdx,
        val: &BitVecValue,
    ) -> UpdateStatus {
        self.write(port, val.to_u64().unwrap_or_default())
    }

    /// Reset every port to zero.
    pub fn clear(&mut self) {
        for (_, val) in self.values.iter_mut() {
            if !val.is_zero() {
                *val = BitVecValue::zero(val.width());
            }
        }
    }
}

/// What a cell of a component became in the flattened design.
#[derive(Debug, Clone)]
pub enum CellSlot {
    /// A primitive with its ports by name.
    Prim {
        cell: GlobalCellIdx,
        ports: AHashMap<Id, GlobalPortIdx>,
    },
    /// An instance of another component.
    Child(InstanceIdx),
    /// A by-reference cell, resolved through the bindings of the active
    /// invoke.
    Ref,
}

/// One instantiation of a component.
#[derive(Debug, Clone)]
pub struct Instance<'a> {
    /// Dotted path of the instance below the entrypoint. Empty for the
    /// entrypoint itself.
    pub path: String,
    pub comp: &'a ir::Component,
    /// The signature ports, shared with the parent's view of the cell.
    pub this_ports: AHashMap<Id, GlobalPortIdx>,
    /// Indexed by [CellIdx].
    pub cells: Vec<CellSlot>,
    /// `(go, done)` holes, indexed by [GroupIdx].
    pub holes: Vec<(GlobalPortIdx, GlobalPortIdx)>,
}

impl Instance<'_> {
    /// Dotted path of something named `name` inside this instance.
    pub fn child_path(&self, name: Id) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path)
        }
    }

    pub fn go(&self) -> Option<GlobalPortIdx> {
        self.this_ports.get(&Id::from(ir::GO)).copied()
    }

    pub fn done(&self) -> Option<GlobalPortIdx> {
        self.this_ports.get(&Id::from(ir::DONE)).copied()
    }

    pub fn hole(&self, group: GroupIdx, port: Id) -> Option<GlobalPortIdx> {
        let (go, done) = self.holes.get(group.index())?;
        if port == ir::GO {
            Some(*go)
        } else if port == ir::DONE {
            Some(*done)
        } else {
            None
        }
    }

    pub fn slot(&self, cell: CellIdx) -> Option<&CellSlot> {
        self.cells.get(cell.index())
    }

    /// Human readable name of `port` prefixed with the instance path.
    pub fn port_name(&self, port: &PortRef) -> String {
        let local = self.comp.port_name(port);
        if self.path.is_empty() {
            local
        } else {
            format!("{}.{local}", self.path)
        }
    }
}
