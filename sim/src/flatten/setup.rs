use super::{
    primitives::build_primitive,
    simulator::Simulator,
    structures::{CellSlot, GlobalPortIdx, Instance, InstanceIdx},
};
use crate::errors::SimResult;
use accel_ir::{self as ir, CellType, GetName, Id};
use accel_utils::Error;
use ahash::AHashMap;
use itertools::Itertools;

impl<'a> Simulator<'a> {
    fn alloc_port(&mut self, width: u64, name: String) -> GlobalPortIdx {
        let idx = self.ports.push(width);
        self.port_names.push(name);
        idx
    }

    /// Flatten `comp` and, recursively, every component it instantiates.
    /// `stack` holds the components currently being flattened so that
    /// recursive instantiation is reported instead of looping forever.
    pub(super) fn instantiate(
        &mut self,
        comp: &'a ir::Component,
        path: String,
        stack: &mut Vec<Id>,
    ) -> SimResult<InstanceIdx> {
        if stack.contains(&comp.name) {
            return Err(Error::malformed_structure(format!(
                "component `{}' instantiates itself: {} -> {}",
                comp.name,
                stack.iter().join(" -> "),
                comp.name
            ))
            .into());
        }
        stack.push(comp.name);

        let mut this_ports = AHashMap::new();
        for pd in comp.signature() {
            let name = if path.is_empty() {
                pd.name.to_string()
            } else {
                format!("{path}.{}", pd.name)
            };
            let idx = self.alloc_port(pd.width, name);
            this_ports.insert(pd.name, idx);
        }
        let mut inst = Instance {
            path,
            comp,
            this_ports,
            cells: Vec::with_capacity(comp.cells.len()),
            holes: Vec::with_capacity(comp.groups.len()),
        };

        for (_, cell) in comp.cells.iter() {
            let cell_path = inst.child_path(cell.name());
            let slot = if cell.is_reference() {
                CellSlot::Ref
            } else if let CellType::Component { name } = &cell.prototype {
                let child = self.ctx.get_component(*name)?;
                CellSlot::Child(self.instantiate(child, cell_path, stack)?)
            } else {
                let mut ports = AHashMap::new();
                let mut base = None;
                for pd in cell.ports() {
                    let idx =
                        self.alloc_port(pd.width, format!("{cell_path}.{}", pd.name));
                    base.get_or_insert(idx);
                    ports.insert(pd.name, idx);
                }
                let base = base.ok_or_else(|| {
                    Error::malformed_structure(format!("`{cell_path}' has no ports"))
                })?;
                let prim = build_primitive(cell, base, &cell_path)?;
                let idx = self.prims.push(prim);
                self.prim_names.push(cell_path);
                CellSlot::Prim { cell: idx, ports }
            };
            inst.cells.push(slot);
        }

        for (_, group) in comp.groups.iter() {
            let name = inst.child_path(group.name());
            let go = self.alloc_port(1, format!("{name}[{}]", ir::GO));
            let done = self.alloc_port(1, format!("{name}[{}]", ir::DONE));
            inst.holes.push((go, done));
        }

        stack.pop();
        log::trace!("instantiated `{}' as `{}'", comp.name, inst.path);
        Ok(self.instances.push(inst))
    }
}
