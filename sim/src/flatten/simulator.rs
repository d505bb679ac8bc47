use super::{
    control::{ExecNode, Finishing, Leaves},
    primitives::{Primitive, prim_trait::UpdateStatus, stateful::SeqMemD1},
    structures::{
        CellSlot, GlobalCellIdx, GlobalPortIdx, Instance, InstanceIdx, PortMap,
    },
};
use crate::{
    configuration::SimConfig,
    errors::{ConflictingAssignments, SimError, SimResult},
    serialization::MemoryData,
};
use accel_idx::IndexedMap;
use accel_ir::{self as ir, CellIdx, Context, GetName, PortParent, PortRef, Printer};
use accel_opt::passes::WellFormed;
use ahash::AHashMap;
use baa::BitVecOps;
use itertools::Itertools;
use std::collections::hash_map::Entry;

/// Something that drives a port during one cycle.
#[derive(Debug, Clone, Copy)]
pub(super) enum Driver<'a> {
    /// A guarded assignment of a component instance.
    Assign {
        inst: InstanceIdx,
        assign: &'a ir::Assignment,
    },
    /// An invoke connecting a port of the parent to a port of the child.
    Bind {
        dst: GlobalPortIdx,
        src: GlobalPortIdx,
    },
    /// A `go` or `done` signal raised by the control program.
    High { dst: GlobalPortIdx },
}

/// Executes the control program of a design one clock cycle at a time.
pub struct Simulator<'a> {
    pub(super) ctx: &'a Context,
    config: SimConfig,
    pub(super) ports: PortMap,
    pub(super) port_names: IndexedMap<GlobalPortIdx, String>,
    pub(super) prims: IndexedMap<GlobalCellIdx, Box<dyn Primitive>>,
    pub(super) prim_names: IndexedMap<GlobalCellIdx, String>,
    pub(super) instances: IndexedMap<InstanceIdx, Instance<'a>>,
    pub(super) top: InstanceIdx,
    /// By-reference cells of invoked instances, bound to the cell lent by
    /// the invoking parent.
    pub(super) ref_bindings: AHashMap<(InstanceIdx, CellIdx), (InstanceIdx, CellIdx)>,
    control: Option<ExecNode<'a>>,
    started: bool,
    cycles: u64,
}

impl<'a> Simulator<'a> {
    /// Flatten the design. Unless the configuration says otherwise the
    /// design is checked with [WellFormed] first.
    pub fn new(ctx: &'a Context, config: SimConfig) -> SimResult<Self> {
        if !config.skip_verification {
            WellFormed::validate(ctx)?;
        }
        let entry = ctx.entrypoint()?;
        let mut sim = Self {
            ctx,
            config,
            ports: PortMap::new(),
            port_names: IndexedMap::new(),
            prims: IndexedMap::new(),
            prim_names: IndexedMap::new(),
            instances: IndexedMap::new(),
            top: InstanceIdx::from(0_u32),
            ref_bindings: AHashMap::new(),
            control: None,
            started: false,
            cycles: 0,
        };
        sim.top = sim.instantiate(entry, String::new(), &mut vec![])?;
        log::debug!(
            "flattened `{}' into {} instances, {} primitives and {} ports",
            entry.name,
            sim.instances.len(),
            sim.prims.len(),
            sim.ports.len()
        );
        Ok(sim)
    }

    /// Number of cycles simulated so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run the entrypoint's control program to completion and return the
    /// total number of cycles simulated.
    pub fn run(&mut self) -> SimResult<u64> {
        if !self.started {
            self.started = true;
            let comp = self.instances[self.top].comp;
            self.control = self.start(self.top, &comp.control)?;
        }
        while let Some(control) = self.control.take() {
            if let Some(max) = self.config.max_cycles {
                if self.cycles >= max {
                    self.control = Some(control);
                    return Err(SimError::Stalled {
                        cycles: self.cycles,
                    }
                    .into());
                }
            }
            self.control = self.step(control)?;
        }
        log::info!("simulation finished after {} cycles", self.cycles);
        Ok(self.cycles)
    }

    /// Simulate one clock cycle of `control` and return what remains of it.
    fn step(&mut self, control: ExecNode<'a>) -> SimResult<Option<ExecNode<'a>>> {
        let mut leaves = Leaves::default();
        self.collect(&control, &mut leaves);

        self.reset_ports();
        let drivers = self.drivers(&leaves, &Finishing::default());
        self.converge(&drivers)?;
        let sampled = self.ports.clone();

        // Finishing groups and invokes drop their `go` for the rest of the
        // cycle, so their effects are not committed a second time.
        let mut finishing = Finishing::default();
        self.collect_finishing(&control, &sampled, &mut finishing);
        finishing.top = self.finishes(&control, &sampled);
        if !finishing.is_empty() {
            self.reset_ports();
            let drivers = self.drivers(&leaves, &finishing);
            self.converge(&drivers)?;
        }

        for prim in self.prims.values_mut() {
            prim.exec_cycle(&self.ports)?;
        }
        self.cycles += 1;
        self.advance(control, &sampled)
    }

    /// Clear every port, then drive the outputs of stateful cells and
    /// constants.
    fn reset_ports(&mut self) {
        self.ports.clear();
        for prim in self.prims.values() {
            prim.drive_state(&mut self.ports);
        }
    }

    /// Everything that drives a port in the current cycle.
    fn drivers(&self, leaves: &Leaves<'a>, finishing: &Finishing) -> Vec<Driver<'a>> {
        let mut drivers = vec![];
        for (idx, inst) in self.instances.iter() {
            let comp = inst.comp;
            drivers.extend(
                comp.continuous_assignments
                    .iter()
                    .map(|assign| Driver::Assign { inst: idx, assign }),
            );
        }

        let top = &self.instances[self.top];
        drivers.extend(top.go().map(|dst| Driver::High { dst }));
        if finishing.top {
            drivers.extend(top.done().map(|dst| Driver::High { dst }));
        }

        for &(idx, group) in &leaves.groups {
            if finishing.groups.contains(&(idx, group)) {
                continue;
            }
            let inst = &self.instances[idx];
            let comp = inst.comp;
            drivers.extend(
                inst.hole(group, ir::GO.into())
                    .map(|dst| Driver::High { dst }),
            );
            drivers.extend(
                comp.groups[group]
                    .assignments
                    .iter()
                    .map(|assign| Driver::Assign { inst: idx, assign }),
            );
        }

        for &(idx, cond) in &leaves.conds {
            let comp = self.instances[idx].comp;
            if let Some(group) = cond.and_then(|c| comp.comb_groups.get(c)) {
                drivers.extend(
                    group
                        .assignments
                        .iter()
                        .map(|assign| Driver::Assign { inst: idx, assign }),
                );
            }
        }

        for &(parent, invoke, child) in &leaves.invokes {
            let callee = &self.instances[child];
            if finishing.invokes.contains(&child) {
                drivers.extend(callee.done().map(|dst| Driver::High { dst }));
                continue;
            }
            drivers.extend(callee.go().map(|dst| Driver::High { dst }));
            for (name, src) in &invoke.inputs {
                if let (Some(dst), Some(src)) =
                    (callee.this_ports.get(name), self.resolve(parent, src))
                {
                    drivers.push(Driver::Bind { dst: *dst, src });
                }
            }
            for (name, dst) in &invoke.outputs {
                if let (Some(src), Some(dst)) =
                    (callee.this_ports.get(name), self.resolve(parent, dst))
                {
                    drivers.push(Driver::Bind { dst, src: *src });
                }
            }
        }
        drivers
    }

    /// Evaluate `drivers` and the combinational primitives until no port
    /// changes. Ports driven by no active driver hold zero.
    fn converge(&mut self, drivers: &[Driver<'a>]) -> SimResult<()> {
        let dsts = drivers.iter().map(|d| self.destination(d)).collect_vec();
        let limit = self.ports.len() + 4;
        for _ in 0..limit {
            let mut winners: AHashMap<GlobalPortIdx, (usize, u64)> = AHashMap::new();
            let mut conflict = None;
            for (idx, (driver, dst)) in drivers.iter().zip(&dsts).enumerate() {
                let Some(dst) = dst else { continue };
                let Some(val) = self.evaluate(driver) else {
                    continue;
                };
                match winners.entry(*dst) {
                    Entry::Occupied(prev) => {
                        conflict.get_or_insert((*dst, prev.get().0, idx));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert((idx, val));
                    }
                }
            }

            let mut status = UpdateStatus::Unchanged;
            for dst in dsts.iter().flatten() {
                let val = winners.get(dst).map_or(0, |(_, v)| *v);
                status |= self.ports.write(*dst, val);
            }
            for prim in self.prims.values() {
                if prim.is_combinational() {
                    status |= prim.exec_comb(&mut self.ports);
                }
            }

            if !status.as_bool() {
                if let Some((port, first, second)) = conflict {
                    return Err(SimError::from(ConflictingAssignments {
                        port: self.port_names[port].clone(),
                        first: self.describe(&drivers[first]),
                        second: self.describe(&drivers[second]),
                    })
                    .into());
                }
                return Ok(());
            }
        }
        Err(SimError::CombinationalLoop { passes: limit }.into())
    }

    fn destination(&self, driver: &Driver<'a>) -> Option<GlobalPortIdx> {
        match driver {
            Driver::Assign { inst, assign } => self.resolve(*inst, &assign.dst),
            Driver::Bind { dst, .. } | Driver::High { dst } => Some(*dst),
        }
    }

    /// The value a driver puts on its destination this pass, if it is active.
    fn evaluate(&self, driver: &Driver<'a>) -> Option<u64> {
        match driver {
            Driver::Assign { inst, assign } => {
                let read = |port: &PortRef| self.read(*inst, port);
                if !assign.guard.eval(&read) {
                    return None;
                }
                self.resolve(*inst, &assign.src).map(|src| self.ports.read(src))
            }
            Driver::Bind { src, .. } => Some(self.ports.read(*src)),
            Driver::High { .. } => Some(1),
        }
    }

    fn describe(&self, driver: &Driver<'a>) -> String {
        match driver {
            Driver::Assign { inst, assign } => {
                let inst = &self.instances[*inst];
                let assign = Printer::assignment_to_str(inst.comp, assign);
                if inst.path.is_empty() {
                    assign
                } else {
                    format!("{}: {assign}", inst.path)
                }
            }
            Driver::Bind { src, .. } => {
                format!("invoke binding from `{}'", self.port_names[*src])
            }
            Driver::High { .. } => "control program".to_string(),
        }
    }

    /// The global port `port` refers to inside `inst`. By-reference cells
    /// resolve through the active invoke; unbound ones resolve to nothing.
    pub(super) fn resolve(
        &self,
        inst: InstanceIdx,
        port: &PortRef,
    ) -> Option<GlobalPortIdx> {
        let instance = &self.instances[inst];
        match port.parent {
            PortParent::This => instance.this_ports.get(&port.port).copied(),
            PortParent::Group(group) => instance.hole(group, port.port),
            PortParent::Cell(cell) => self.resolve_cell_port(inst, cell, port.port),
        }
    }

    fn resolve_cell_port(
        &self,
        inst: InstanceIdx,
        cell: CellIdx,
        port: ir::Id,
    ) -> Option<GlobalPortIdx> {
        match self.instances[inst].slot(cell)? {
            CellSlot::Prim { ports, .. } => ports.get(&port).copied(),
            CellSlot::Child(child) => {
                self.instances[*child].this_ports.get(&port).copied()
            }
            CellSlot::Ref => {
                let (outer, outer_cell) = *self.ref_bindings.get(&(inst, cell))?;
                self.resolve_cell_port(outer, outer_cell, port)
            }
        }
    }

    /// Current value of `port` inside `inst`. Unresolvable ports read zero.
    pub(super) fn read(&self, inst: InstanceIdx, port: &PortRef) -> u64 {
        self.resolve(inst, port)
            .map_or(0, |idx| self.ports.read(idx))
    }

    fn find_prim(&self, path: &str) -> Option<GlobalCellIdx> {
        self.prim_names.find_key(|name| name == path)
    }

    /// The memory at the dotted `path` below the entrypoint, such as
    /// `answer` or `filter.markers`.
    fn find_memory(&self, path: &str) -> SimResult<&SeqMemD1> {
        self.find_prim(path)
            .and_then(|idx| self.prims[idx].as_memory())
            .ok_or_else(|| SimError::UnknownMemory(path.to_string()).into())
    }

    /// Contents of the memory at `path`.
    pub fn memory(&self, path: &str) -> SimResult<Vec<u64>> {
        Ok(self.find_memory(path)?.contents())
    }

    /// How many writes each address of the memory at `path` has received.
    pub fn write_counts(&self, path: &str) -> SimResult<&[u64]> {
        Ok(self.find_memory(path)?.write_counts())
    }

    /// Value stored in the register at `path`.
    pub fn register(&self, path: &str) -> SimResult<u64> {
        self.find_prim(path)
            .and_then(|idx| self.prims[idx].as_register())
            .and_then(|reg| reg.value().to_u64())
            .ok_or_else(|| SimError::UnknownRegister(path.to_string()).into())
    }

    /// Load initial contents of the external memories of the entrypoint.
    pub fn load_data(&mut self, data: &MemoryData) -> SimResult<()> {
        let top = self.instances[self.top].comp;
        for (name, entry) in data.iter() {
            entry.format.check(name)?;
            let prim = top
                .find_cell(name.as_str())
                .filter(|cell| top.cells[*cell].is_external())
                .and_then(|cell| match self.instances[self.top].slot(cell) {
                    Some(CellSlot::Prim { cell, .. }) => Some(*cell),
                    _ => None,
                })
                .ok_or_else(|| SimError::UnknownMemory(name.clone()))?;
            let mem = self.prims[prim]
                .as_memory_mut()
                .ok_or_else(|| SimError::UnknownMemory(name.clone()))?;
            if entry.format.width != mem.width() {
                log::warn!(
                    "data for `{name}' is declared {} bits wide but the memory is {} bits wide",
                    entry.format.width,
                    mem.width()
                );
            }
            if entry.data.len() < mem.size() {
                log::warn!(
                    "`{name}' has {} entries, padding the remaining {} with zeros",
                    entry.data.len(),
                    mem.size() - entry.data.len()
                );
            }
            mem.load(&entry.data)?;
            log::debug!("loaded {} values into `{name}'", entry.data.len());
        }
        Ok(())
    }

    /// Contents of the external memories of the entrypoint, or of every
    /// memory in the design when `all` is set.
    pub fn dump_memories(&self, all: bool) -> MemoryData {
        let mut dump = MemoryData::new();
        let top = &self.instances[self.top];
        for (idx, prim) in self.prims.iter() {
            let Some(mem) = prim.as_memory() else { continue };
            let name = &self.prim_names[idx];
            let external = top.comp.cells.iter().any(|(cell, def)| {
                def.is_external()
                    && matches!(top.slot(cell), Some(CellSlot::Prim { cell, .. }) if *cell == idx)
            });
            if all || external {
                dump.insert(name, mem.contents(), mem.width());
            }
        }
        dump
    }

    /// Name of the entrypoint component.
    pub fn entrypoint(&self) -> ir::Id {
        self.instances[self.top].comp.name()
    }
}
