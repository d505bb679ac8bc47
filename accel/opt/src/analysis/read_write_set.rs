use accel_ir::{self as ir, CellIdx, Control, GetName, PortRef};
use accel_utils::Error;
use std::collections::HashSet;

/// Everything a control subtree may touch while it runs.
#[derive(Debug, Default, Clone)]
pub struct Footprint {
    /// Ports driven by the subtree. Group holes are excluded.
    pub writes: HashSet<PortRef>,
    /// Ports read by the subtree. Group holes are excluded.
    pub reads: HashSet<PortRef>,
    /// Cells held for the duration of an invoke: the invoked cell itself and
    /// every cell lent to it by reference.
    pub held: HashSet<CellIdx>,
}

impl Footprint {
    fn extend(&mut self, other: Footprint) {
        self.writes.extend(other.writes);
        self.reads.extend(other.reads);
        self.held.extend(other.held);
    }

    /// Explain why the subtrees described by `self` and `other` may not run
    /// in parallel. Returns `None` when they are independent.
    pub fn conflict(&self, other: &Footprint, comp: &ir::Component) -> Option<Error> {
        if let Some(port) = self.writes.intersection(&other.writes).next() {
            return Some(Error::conflicting_drivers(
                comp.port_name(port),
                "written by more than one parallel branch",
            ));
        }
        if let Some(cell) = self.held.intersection(&other.held).next() {
            return Some(Error::malformed_control(format!(
                "`{}' is held by more than one parallel branch",
                comp.cells[*cell].name()
            )));
        }
        for (a, b) in [(self, other), (other, self)] {
            let touched = b.writes.iter().chain(b.reads.iter());
            if let Some(port) = touched
                .find(|p| p.cell_idx().is_some_and(|c| a.held.contains(&c)))
            {
                return Some(Error::malformed_control(format!(
                    "`{}' is accessed while its cell is held by a parallel invoke",
                    comp.port_name(port)
                )));
            }
        }
        None
    }
}

/// Calcuate the reads-from and writes-to set for a given set of assignments
/// or control program.
pub struct ReadWriteSet;

impl ReadWriteSet {
    /// Returns the ports that are read from in the given Assignment.
    pub fn port_reads(
        assign: &ir::Assignment,
    ) -> impl Iterator<Item = PortRef> + '_ {
        assign.reads().filter(|port| !port.is_hole())
    }

    /// Returns the ports which are read from in the assignments.
    pub fn port_read_set<'a>(
        assigns: impl Iterator<Item = &'a ir::Assignment> + 'a,
    ) -> impl Iterator<Item = PortRef> + 'a {
        assigns.flat_map(Self::port_reads)
    }

    /// Returns the ports which are written to in the assignments.
    pub fn port_write_set<'a>(
        assigns: impl Iterator<Item = &'a ir::Assignment> + 'a,
    ) -> impl Iterator<Item = PortRef> + 'a {
        assigns
            .map(|assign| assign.dst)
            .filter(|port| !port.is_hole())
    }

    /// Everything `control` touches, including the combinational groups its
    /// conditions use.
    pub fn control_footprint(
        comp: &ir::Component,
        control: &Control,
    ) -> Footprint {
        let mut fp = Footprint::default();
        match control {
            Control::Empty(_) => {}
            Control::Enable(ir::Enable { group }) => {
                if let Some(group) = comp.groups.get(*group) {
                    let assigns = &group.assignments;
                    fp.writes.extend(Self::port_write_set(assigns.iter()));
                    fp.reads.extend(Self::port_read_set(assigns.iter()));
                }
            }
            Control::Invoke(ir::Invoke {
                comp: cell,
                inputs,
                outputs,
                ref_cells,
            }) => {
                fp.held.insert(*cell);
                fp.held.extend(ref_cells.iter().map(|(_, outer)| *outer));
                for (name, src) in inputs {
                    fp.writes.insert(PortRef::cell(*cell, *name));
                    fp.reads.insert(*src);
                }
                for (name, dst) in outputs {
                    fp.reads.insert(PortRef::cell(*cell, *name));
                    fp.writes.insert(*dst);
                }
            }
            Control::Seq(ir::Seq { stmts }) | Control::Par(ir::Par { stmts }) => {
                for stmt in stmts {
                    fp.extend(Self::control_footprint(comp, stmt));
                }
            }
            Control::If(ir::If {
                port,
                cond,
                tbranch,
                fbranch,
            }) => {
                fp.reads.insert(*port);
                fp.extend(Self::cond_footprint(comp, *cond));
                fp.extend(Self::control_footprint(comp, tbranch));
                fp.extend(Self::control_footprint(comp, fbranch));
            }
            Control::While(ir::While { port, cond, body }) => {
                fp.reads.insert(*port);
                fp.extend(Self::cond_footprint(comp, *cond));
                fp.extend(Self::control_footprint(comp, body));
            }
        }
        fp
    }

    fn cond_footprint(
        comp: &ir::Component,
        cond: Option<ir::CombGroupIdx>,
    ) -> Footprint {
        let mut fp = Footprint::default();
        if let Some(group) = cond.and_then(|c| comp.comb_groups.get(c)) {
            let assigns = &group.assignments;
            fp.writes.extend(Self::port_write_set(assigns.iter()));
            fp.reads.extend(Self::port_read_set(assigns.iter()));
        }
        fp
    }
}
