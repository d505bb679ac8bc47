use crate::{
    Assignment, Cell, CellIdx, CombGroup, CombGroupIdx, Control, DONE,
    Direction, GO, Group, GroupIdx, Guard, PortDef, PortParent, PortRef,
};
use accel_idx::{IndexRef, IndexedMap};
use accel_utils::{AccelResult, Error, GetName, Id, NameGenerator};
use itertools::Itertools;
use smallvec::SmallVec;

/// In memory representation of a Component.
#[derive(Debug, Clone)]
pub struct Component {
    /// Name of the component.
    pub name: Id,
    /// The input/output signature of this component, including the `go` and
    /// `done` interface ports. Directions are as seen from outside.
    signature: Vec<PortDef>,
    /// The cells instantiated for this component.
    pub cells: IndexedMap<CellIdx, Cell>,
    /// Groups of assignment wires.
    pub groups: IndexedMap<GroupIdx, Group>,
    /// Groups of assignment wires.
    pub comb_groups: IndexedMap<CombGroupIdx, CombGroup>,
    /// The always active assignments in this component.
    pub continuous_assignments: Vec<Assignment>,
    /// The control program for this component.
    pub control: Control,
    /// Sets of 1-bit inputs of which at most one may be asserted by an
    /// invoke.
    pub exclusive_inputs: Vec<SmallVec<[Id; 4]>>,
    /// Namegenerator that contains the names currently defined in this
    /// component (cell and group names).
    namegen: NameGenerator,
}

impl GetName for Component {
    fn name(&self) -> Id {
        self.name
    }
}

/// Builder methods for extracting and construction IDs.
impl Component {
    /// Construct a new Component with the given `name` and signature fields.
    /// The `go` input and `done` output interface ports are added when
    /// `ports` does not declare them.
    pub fn new<S: Into<Id>>(name: S, ports: Vec<PortDef>) -> Self {
        let mut signature = ports;
        if !signature.iter().any(|p| p.name == GO) {
            signature.push(PortDef::input(GO, 1));
        }
        if !signature.iter().any(|p| p.name == DONE) {
            signature.push(PortDef::output(DONE, 1));
        }
        Component {
            name: name.into(),
            signature,
            cells: IndexedMap::new(),
            groups: IndexedMap::new(),
            comb_groups: IndexedMap::new(),
            continuous_assignments: vec![],
            control: Control::empty(),
            exclusive_inputs: vec![],
            namegen: NameGenerator::default(),
        }
    }

    /// The signature of this component as seen by the parent instantiating
    /// it.
    pub fn signature(&self) -> &[PortDef] {
        &self.signature
    }

    /// Input ports excluding the `go` interface port.
    pub fn inputs(&self) -> impl Iterator<Item = &PortDef> {
        self.signature
            .iter()
            .filter(|p| p.direction == Direction::Input && p.name != GO)
    }

    /// Output ports excluding the `done` interface port.
    pub fn outputs(&self) -> impl Iterator<Item = &PortDef> {
        self.signature
            .iter()
            .filter(|p| p.direction == Direction::Output && p.name != DONE)
    }

    /// Generate a unique name for a cell or group starting with `prefix`.
    pub fn generate_name<S>(&mut self, prefix: S) -> Id
    where
        S: Into<Id>,
    {
        self.namegen.gen_name(prefix)
    }

    /// Claim exactly `name` for a cell or group.
    pub fn reserve_name(&mut self, name: Id) -> AccelResult<()> {
        if self.namegen.reserve(name) {
            Ok(())
        } else {
            Err(Error::already_bound(name, "cell or group"))
        }
    }

    /// Return the index of the cell named `name`.
    pub fn find_cell<S: Into<Id>>(&self, name: S) -> Option<CellIdx> {
        let name = name.into();
        self.cells.find_key(|c| c.name() == name)
    }

    /// Return the index of the group named `name`.
    pub fn find_group<S: Into<Id>>(&self, name: S) -> Option<GroupIdx> {
        let name = name.into();
        self.groups.find_key(|g| g.name() == name)
    }

    /// Return the index of the combinational group named `name`.
    pub fn find_comb_group<S: Into<Id>>(&self, name: S) -> Option<CombGroupIdx> {
        let name = name.into();
        self.comb_groups.find_key(|g| g.name() == name)
    }

    /// Look up a port of the signature by name.
    pub fn find_port<S: Into<Id>>(&self, name: S) -> Option<&PortDef> {
        let name = name.into();
        self.signature.iter().find(|p| p.name == name)
    }

    /// Width and direction of `port` as seen from inside this component.
    /// Signature ports are reversed: an input of the component is read by
    /// its assignments.
    pub fn port_def(&self, port: &PortRef) -> AccelResult<(u64, Direction)> {
        match port.parent {
            PortParent::This => self
                .find_port(port.port)
                .map(|pd| (pd.width, pd.direction.reverse()))
                .ok_or_else(|| {
                    Error::undefined(
                        port.port,
                        format!("port of component {}", self.name),
                    )
                }),
            PortParent::Cell(idx) => {
                let cell = self.cells.get(idx).ok_or_else(|| {
                    Error::malformed_structure(format!(
                        "dangling cell index in {}",
                        self.name
                    ))
                })?;
                cell.find(port.port)
                    .map(|pd| (pd.width, pd.direction))
                    .ok_or_else(|| {
                        Error::undefined(
                            port.port,
                            format!("port of cell {}", cell.name()),
                        )
                    })
            }
            PortParent::Group(idx) => {
                if self.groups.get(idx).is_none() {
                    return Err(Error::malformed_structure(format!(
                        "dangling group index in {}",
                        self.name
                    )));
                }
                if port.port == GO || port.port == DONE {
                    Ok((1, Direction::Inout))
                } else {
                    Err(Error::undefined(port.port, "group hole"))
                }
            }
        }
    }

    /// Check that every port `guard` reads exists, that plain port guards are
    /// 1 bit wide, and that compared ports have equal widths.
    pub fn check_guard(&self, guard: &Guard) -> AccelResult<()> {
        match guard {
            Guard::Or(l, r) | Guard::And(l, r) => {
                self.check_guard(l)?;
                self.check_guard(r)
            }
            Guard::Not(g) => self.check_guard(g),
            Guard::True => Ok(()),
            Guard::Port(p) => {
                let (width, dir) = self.port_def(p)?;
                if !dir.is_readable() {
                    return Err(Error::malformed_structure(format!(
                        "guard reads `{}' which is not readable",
                        self.port_name(p)
                    )));
                }
                if width != 1 {
                    return Err(Error::width_mismatch(format!(
                        "guard port `{}' is {width} bits wide, expected 1",
                        self.port_name(p)
                    )));
                }
                Ok(())
            }
            Guard::CompOp(op, l, r) => {
                let (lw, ld) = self.port_def(l)?;
                let (rw, rd) = self.port_def(r)?;
                if !ld.is_readable() || !rd.is_readable() {
                    return Err(Error::malformed_structure(format!(
                        "comparison `{} {} {}' reads an unreadable port",
                        self.port_name(l),
                        op.op_str(),
                        self.port_name(r)
                    )));
                }
                if lw != rw {
                    return Err(Error::width_mismatch(format!(
                        "comparison `{} {} {}' between {lw} and {rw} bits",
                        self.port_name(l),
                        op.op_str(),
                        self.port_name(r)
                    )));
                }
                Ok(())
            }
        }
    }

    /// Check that the destination of `assign` is writable, its source is
    /// readable, both have the same width, and its guard is well formed.
    pub fn check_assignment(&self, assign: &Assignment) -> AccelResult<()> {
        let (dst_width, dst_dir) = self.port_def(&assign.dst)?;
        let (src_width, src_dir) = self.port_def(&assign.src)?;
        if !dst_dir.is_writable() {
            return Err(Error::malformed_structure(format!(
                "`{}' cannot be the destination of an assignment",
                self.port_name(&assign.dst)
            )));
        }
        if !src_dir.is_readable() {
            return Err(Error::malformed_structure(format!(
                "`{}' cannot be the source of an assignment",
                self.port_name(&assign.src)
            )));
        }
        if dst_width != src_width {
            return Err(Error::width_mismatch(format!(
                "`{}' ({dst_width} bits) = `{}' ({src_width} bits)",
                self.port_name(&assign.dst),
                self.port_name(&assign.src)
            )));
        }
        self.check_guard(&assign.guard)
    }

    /// The `(value, width)` of `port` if it is the output of a constant cell.
    pub fn constant_value(&self, port: &PortRef) -> Option<(u64, u64)> {
        port.cell_idx()
            .and_then(|idx| self.cells.get(idx))
            .and_then(Cell::constant)
    }

    /// Canonical, human readable name for a port: `cell.port`, `group[go]`
    /// or just the port name for the signature.
    pub fn port_name(&self, port: &PortRef) -> String {
        match port.parent {
            PortParent::This => port.port.to_string(),
            PortParent::Cell(idx) => match self.cells.get(idx) {
                Some(cell) => match cell.constant() {
                    Some((val, width)) => format!("{width}'d{val}"),
                    None => format!("{}.{}", cell.name(), port.port),
                },
                None => format!("<cell {idx:?}>.{}", port.port),
            },
            PortParent::Group(idx) => match self.groups.get(idx) {
                Some(group) => format!("{}[{}]", group.name(), port.port),
                None => format!("<group {idx:?}>[{}]", port.port),
            },
        }
    }

    /// Declare a set of 1-bit inputs as mutually exclusive request modes.
    pub fn add_exclusive_inputs<S: Into<Id>>(&mut self, names: Vec<S>) {
        self.exclusive_inputs
            .push(names.into_iter().map(Into::into).collect());
    }

    /// Returns the exclusive input set containing `name`, if any.
    pub fn exclusive_set(&self, name: Id) -> Option<&[Id]> {
        self.exclusive_inputs
            .iter()
            .find(|set| set.contains(&name))
            .map(|set| set.as_slice())
    }

    /// Groups never enabled by the control program.
    pub fn unused_groups(&self) -> Vec<GroupIdx> {
        let mut used = vec![false; self.groups.len()];
        self.control.for_each(&mut |c| {
            if let Control::Enable(en) = c {
                if let Some(slot) = used.get_mut(en.group.index()) {
                    *slot = true;
                }
            }
        });
        self.groups
            .keys()
            .filter(|g| !used[g.index()])
            .collect_vec()
    }

    /// Cells marked as passed by reference.
    pub fn reference_cells(&self) -> impl Iterator<Item = (CellIdx, &Cell)> {
        self.cells.iter().filter(|(_, c)| c.is_reference())
    }
}
