//! Representation for structure (wires and cells) in a component.
use crate::Guard;
use accel_idx::impl_index;
use accel_utils::{GetName, Id};
use smallvec::SmallVec;

/// Index of a [Cell] within its [crate::Component].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellIdx(u32);
impl_index!(CellIdx);

/// Index of a [Group] within its [crate::Component].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupIdx(u32);
impl_index!(GroupIdx);

/// Index of a [CombGroup] within its [crate::Component].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CombGroupIdx(u32);
impl_index!(CombGroupIdx);

/// Index of a [crate::Component] within the [crate::Context].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentIdx(u32);
impl_index!(ComponentIdx);

/// Direction of a port on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Input port.
    Input,
    /// Output port.
    Output,
    /// Input-Output "port". Should only be used by holes.
    Inout,
}

impl Direction {
    /// Return the direction opposite to the current direction
    pub fn reverse(&self) -> Self {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
            Direction::Inout => Direction::Inout,
        }
    }

    /// Can a port with this direction be read from?
    pub fn is_readable(&self) -> bool {
        matches!(self, Direction::Output | Direction::Inout)
    }

    /// Can a port with this direction be written to?
    pub fn is_writable(&self) -> bool {
        matches!(self, Direction::Input | Direction::Inout)
    }
}

/// Definition of a port: its name, fixed width and direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortDef {
    pub name: Id,
    pub width: u64,
    pub direction: Direction,
}

impl PortDef {
    pub fn new<S: Into<Id>>(name: S, width: u64, direction: Direction) -> Self {
        Self {
            name: name.into(),
            width,
            direction,
        }
    }

    pub fn input<S: Into<Id>>(name: S, width: u64) -> Self {
        Self::new(name, width, Direction::Input)
    }

    pub fn output<S: Into<Id>>(name: S, width: u64) -> Self {
        Self::new(name, width, Direction::Output)
    }
}

/// Owner of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortParent {
    /// The signature of the enclosing component.
    This,
    /// A cell of the enclosing component.
    Cell(CellIdx),
    /// A hole (`go` or `done`) of a group of the enclosing component.
    Group(GroupIdx),
}

/// A reference to a port, relative to the component it is used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortRef {
    pub parent: PortParent,
    pub port: Id,
}

impl PortRef {
    /// A port on the signature of the enclosing component.
    pub fn this<S: Into<Id>>(port: S) -> Self {
        Self {
            parent: PortParent::This,
            port: port.into(),
        }
    }

    /// A port on the cell `cell`.
    pub fn cell<S: Into<Id>>(cell: CellIdx, port: S) -> Self {
        Self {
            parent: PortParent::Cell(cell),
            port: port.into(),
        }
    }

    /// A hole of the group `group`.
    pub fn hole<S: Into<Id>>(group: GroupIdx, port: S) -> Self {
        Self {
            parent: PortParent::Group(group),
            port: port.into(),
        }
    }

    pub fn is_hole(&self) -> bool {
        matches!(self.parent, PortParent::Group(_))
    }

    pub fn cell_idx(&self) -> Option<CellIdx> {
        match self.parent {
            PortParent::Cell(idx) => Some(idx),
            _ => None,
        }
    }
}

/// The type for a Cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Cell constructed using a primitive definition
    Primitive {
        /// Name of the primitive cell used to instantiate this cell.
        name: Id,
        /// Bindings for the parameters. Uses Vec to retain the input order.
        param_binding: SmallVec<[(Id, u64); 4]>,
        /// True iff this is a combinational primitive
        is_comb: bool,
    },
    /// Cell constructed using an accelerator component
    Component {
        /// Name of the component used to instantiate this cell.
        name: Id,
    },
    /// Cell representing a Constant
    Constant {
        /// Value of this constant
        val: u64,
        /// Width of this constant
        width: u64,
    },
}

impl CellType {
    /// Return the name associated with this CellType if present
    pub fn get_name(&self) -> Option<Id> {
        match self {
            CellType::Primitive { name, .. } | CellType::Component { name } => {
                Some(*name)
            }
            CellType::Constant { .. } => None,
        }
    }

    /// Generate string representation of CellType appropriate for error messages.
    pub fn surface_name(&self) -> String {
        match self {
            CellType::Primitive {
                name,
                param_binding,
                ..
            } => format!(
                "{}({})",
                name,
                param_binding
                    .iter()
                    .map(|(_, v)| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CellType::Component { name } => name.to_string(),
            CellType::Constant { val, width } => {
                format!("{width}'d{val}")
            }
        }
    }
}

/// Represents an instantiated cell.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Name of this cell.
    name: Id,
    /// Ports on this cell
    ports: SmallVec<[PortDef; 8]>,
    /// Underlying type for this cell
    pub prototype: CellType,
    /// Visible to the memory data file. Only meaningful in the entrypoint.
    external: bool,
    /// Bound by the invoking parent for the duration of an invoke.
    reference: bool,
}

impl GetName for Cell {
    fn name(&self) -> Id {
        self.name
    }
}

impl Cell {
    pub fn new(name: Id, prototype: CellType, ports: Vec<PortDef>) -> Self {
        Self {
            name,
            ports: ports.into(),
            prototype,
            external: false,
            reference: false,
        }
    }

    /// Name used for the constant cell holding `val` in `width` bits.
    pub fn constant_name(val: u64, width: u64) -> Id {
        format!("_{val}_{width}").into()
    }

    /// Get a reference to the named port if it exists.
    pub fn find<S>(&self, name: S) -> Option<&PortDef>
    where
        S: Into<Id>,
    {
        let name = name.into();
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn ports(&self) -> &[PortDef] {
        &self.ports
    }

    /// Returns true iff this cell is an instance of the primitive `prim`.
    pub fn is_primitive<S: Into<Id>>(&self, prim: S) -> bool {
        let prim = prim.into();
        matches!(&self.prototype, CellType::Primitive { name, .. } if *name == prim)
    }

    /// Returns the value of the parameter `param` for primitive cells.
    pub fn get_parameter<S: Into<Id>>(&self, param: S) -> Option<u64> {
        let param = param.into();
        match &self.prototype {
            CellType::Primitive { param_binding, .. } => param_binding
                .iter()
                .find(|(key, _)| *key == param)
                .map(|(_, v)| *v),
            _ => None,
        }
    }

    /// Return the `(value, width)` pair of constant cells.
    pub fn constant(&self) -> Option<(u64, u64)> {
        match self.prototype {
            CellType::Constant { val, width } => Some((val, width)),
            _ => None,
        }
    }

    /// True for combinational primitives and constants.
    pub fn is_comb(&self) -> bool {
        match &self.prototype {
            CellType::Primitive { is_comb, .. } => *is_comb,
            CellType::Constant { .. } => true,
            CellType::Component { .. } => false,
        }
    }

    /// Name of the primitive or component this cell instantiates.
    pub fn type_name(&self) -> Option<Id> {
        self.prototype.get_name()
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn set_external(&mut self, external: bool) {
        self.external = external;
    }

    pub fn set_reference(&mut self, reference: bool) {
        self.reference = reference;
    }
}

/// Represents a guarded assignment in the program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// The destination for the assignment.
    pub dst: PortRef,
    /// The source for the assignment.
    pub src: PortRef,
    /// The guard for this assignment.
    pub guard: Box<Guard>,
}

impl Assignment {
    /// Build a new unguarded assignment
    pub fn new(dst: PortRef, src: PortRef) -> Self {
        Self {
            dst,
            src,
            guard: Box::new(Guard::True),
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Box::new(guard);
        self
    }

    /// All the ports read by this assignment, including the guard.
    pub fn reads(&self) -> impl Iterator<Item = PortRef> + '_ {
        std::iter::once(self.src).chain(self.guard.all_ports())
    }
}

/// An atomic action: a set of assignments active while the group's `go` hole
/// is high, with exactly one assignment to its own `done` hole.
#[derive(Debug, Clone)]
pub struct Group {
    /// Name of this group
    name: Id,
    /// The assignments used in this group
    pub assignments: Vec<Assignment>,
}

impl GetName for Group {
    fn name(&self) -> Id {
        self.name
    }
}

impl Group {
    pub fn new(name: Id) -> Self {
        Self {
            name,
            assignments: vec![],
        }
    }

    /// The assignments writing to the `done` hole of `this`, which must be the
    /// index of this group.
    pub fn done_assignments(
        &self,
        this: GroupIdx,
    ) -> impl Iterator<Item = &Assignment> {
        let done = PortRef::hole(this, crate::DONE);
        self.assignments.iter().filter(move |a| a.dst == done)
    }
}

/// A group of purely combinational assignments used to compute the
/// condition of an `if` or a `while`.
#[derive(Debug, Clone)]
pub struct CombGroup {
    /// Name of this group
    name: Id,
    /// The assignments used in this group
    pub assignments: Vec<Assignment>,
}

impl GetName for CombGroup {
    fn name(&self) -> Id {
        self.name
    }
}

impl CombGroup {
    pub fn new(name: Id) -> Self {
        Self {
            name,
            assignments: vec![],
        }
    }
}
