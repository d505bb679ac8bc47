//! IR Builder. Provides convience methods to build various parts of the internal
//! representation.
use crate::{
    Assignment, Cell, CellIdx, CellType, CombGroup, CombGroupIdx, Component,
    Control, DONE, Group, GroupIdx, Guard, LibrarySignatures, PortDef, PortRef,
    lib_sig::MAX_WIDTH,
};
use accel_utils::{AccelResult, Error, Id, math};

/// IR builder.
/// Uses internal references to the component to construct and validate
/// constructs. Every assignment is checked for undeclared ports, direction
/// and width when it is built, so a malformed design is rejected at the
/// call that introduced the problem.
pub struct Builder<'a> {
    /// Component for which this builder is constructing.
    pub component: &'a mut Component,
    /// Library signatures.
    lib: &'a LibrarySignatures,
}

impl<'a> Builder<'a> {
    /// Instantiate a new builder using for a component.
    pub fn new(component: &'a mut Component, lib: &'a LibrarySignatures) -> Self {
        Self { component, lib }
    }

    /// Construct a new group and add it to the Component.
    /// The group is guaranteed to start with `prefix`.
    pub fn add_group<S>(&mut self, prefix: S) -> GroupIdx
    where
        S: Into<Id>,
    {
        let prefix: Id = prefix.into();
        assert!(
            prefix != "",
            "Cannot construct group with empty name prefix"
        );
        let name = self.component.generate_name(prefix);
        log::debug!("{}: adding group {name}", self.component.name);
        self.component.groups.push(Group::new(name))
    }

    /// Construct a combinational group
    pub fn add_comb_group<S>(&mut self, prefix: S) -> CombGroupIdx
    where
        S: Into<Id>,
    {
        let name = self.component.generate_name(prefix);
        self.component.comb_groups.push(CombGroup::new(name))
    }

    /// Return the constant cell associated with the (val, width) pair,
    /// building and adding it to the component if needed.
    pub fn add_constant(&mut self, val: u64, width: u64) -> AccelResult<CellIdx> {
        if width == 0 || width > MAX_WIDTH {
            return Err(Error::capacity(format!(
                "constants must be between 1 and {MAX_WIDTH} bits, got {width}"
            )));
        }
        if math::bits_for_value(val) > width {
            return Err(Error::capacity(format!(
                "Constant value {val} cannot fit in {width} bits"
            )));
        }
        let name = Cell::constant_name(val, width);
        // If this constant has already been instantiated, return the relevant
        // cell.
        if let Some(cell) = self.component.find_cell(name) {
            return Ok(cell);
        }
        self.component.reserve_name(name)?;
        let cell = Cell::new(
            name,
            CellType::Constant { val, width },
            vec![PortDef::output("out", width)],
        );
        Ok(self.component.cells.push(cell))
    }

    /// The `out` port of the constant (val, width).
    pub fn constant(&mut self, val: u64, width: u64) -> AccelResult<PortRef> {
        let cell = self.add_constant(val, width)?;
        Ok(PortRef::cell(cell, "out"))
    }

    /// Consturcts a primitive cell of type `primitive`.
    /// The name of the cell is guaranteed to start with `prefix`.
    /// Fails when the primitive is unknown or the parameters are rejected.
    pub fn add_primitive<Pre, Prim>(
        &mut self,
        prefix: Pre,
        primitive: Prim,
        param_values: &[u64],
    ) -> AccelResult<CellIdx>
    where
        Pre: Into<Id>,
        Prim: Into<Id>,
    {
        let prim_id = primitive.into();
        let prim = self.lib.get_primitive(prim_id)?;
        let (param_binding, ports) = prim.resolve(param_values)?;
        let is_comb = prim.is_comb;

        let name = self.component.generate_name(prefix);
        log::debug!(
            "{}: adding cell {name} = {prim_id}({param_values:?})",
            self.component.name
        );
        let cell = Cell::new(
            name,
            CellType::Primitive {
                name: prim_id,
                param_binding,
                is_comb,
            },
            ports,
        );
        Ok(self.component.cells.push(cell))
    }

    /// Add a component instance to this component using its name and port
    /// signature.
    pub fn add_component<Pre, Comp>(
        &mut self,
        prefix: Pre,
        component: Comp,
        sig: &[PortDef],
    ) -> CellIdx
    where
        Pre: Into<Id>,
        Comp: Into<Id>,
    {
        let name = self.component.generate_name(prefix);
        let cell = Cell::new(
            name,
            CellType::Component {
                name: component.into(),
            },
            sig.to_vec(),
        );
        self.component.cells.push(cell)
    }

    /// Mark `cell` as visible to the memory data file.
    pub fn external(&mut self, cell: CellIdx) {
        self.component.cells[cell].set_external(true);
    }

    /// Mark `cell` as passed by reference by invoking parents.
    pub fn reference(&mut self, cell: CellIdx) {
        self.component.cells[cell].set_reference(true);
    }

    /// Construct an assignment, checking ports, directions and widths.
    pub fn build_assignment(
        &self,
        dst: PortRef,
        src: PortRef,
        guard: Guard,
    ) -> AccelResult<Assignment> {
        let assign = Assignment::new(dst, src).with_guard(guard);
        self.component.check_assignment(&assign)?;
        Ok(assign)
    }

    /// Add `dst = guard ? src` to `group`.
    pub fn group_assign(
        &mut self,
        group: GroupIdx,
        dst: PortRef,
        src: PortRef,
        guard: Guard,
    ) -> AccelResult<()> {
        let assign = self.build_assignment(dst, src, guard)?;
        self.component.groups[group].assignments.push(assign);
        Ok(())
    }

    /// Set the `done` condition of `group` to `guard ? src`.
    pub fn group_done(
        &mut self,
        group: GroupIdx,
        src: PortRef,
        guard: Guard,
    ) -> AccelResult<()> {
        self.group_assign(group, PortRef::hole(group, DONE), src, guard)
    }

    /// Add `dst = guard ? src` to the combinational group `group`.
    pub fn comb_assign(
        &mut self,
        group: CombGroupIdx,
        dst: PortRef,
        src: PortRef,
        guard: Guard,
    ) -> AccelResult<()> {
        let assign = self.build_assignment(dst, src, guard)?;
        self.component.comb_groups[group].assignments.push(assign);
        Ok(())
    }

    /// Add the always active assignment `dst = guard ? src`.
    pub fn continuous_assign(
        &mut self,
        dst: PortRef,
        src: PortRef,
        guard: Guard,
    ) -> AccelResult<()> {
        let assign = self.build_assignment(dst, src, guard)?;
        self.component.continuous_assignments.push(assign);
        Ok(())
    }

    /// Add assignments built with [Builder::build_assignment] to `group`.
    pub fn extend_group(&mut self, group: GroupIdx, assigns: Vec<Assignment>) {
        self.component.groups[group].assignments.extend(assigns);
    }

    /// Add assignments built with [Builder::build_assignment] to the
    /// combinational group `group`.
    pub fn extend_comb_group(&mut self, group: CombGroupIdx, assigns: Vec<Assignment>) {
        self.component.comb_groups[group].assignments.extend(assigns);
    }

    pub fn add_continuous_assignments(&mut self, assigns: Vec<Assignment>) {
        self.component.continuous_assignments.extend(assigns);
    }

    /// Install the control program of the component.
    pub fn set_control(&mut self, control: Control) {
        self.component.control = control;
    }
}
