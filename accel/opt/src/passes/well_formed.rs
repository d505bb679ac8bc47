use crate::analysis::{GuardExclusion, InstancePaths, PortGraph, ReadWriteSet};
use crate::traversal::Named;
use accel_ir::{
    self as ir, CellType, Component, Context, Control, GO, GetName, Id,
    PortParent, PortRef, Printer,
};
use accel_utils::{AccelResult, Error};
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use petgraph::{algo, graph::DiGraph};
use std::collections::{HashMap, HashSet};
use std::iter;

/// Pass to check if the design is well-formed.
///
/// Catches the following errors:
/// 1. References to cells, groups, ports or components that do not exist.
/// 2. Assignments that read writable-only ports, write read-only ports or
///    connect ports of different widths.
/// 3. Groups that don't write to their done signal exactly once, or that
///    touch the holes of another group.
/// 4. Combinational groups that drive holes or stateful cells.
/// 5. Ports with two drivers that may be active in the same cycle.
/// 6. Parallel branches that write the same port or hold the same cell.
/// 7. Combinational cycles, including cycles through component instances,
///    invoke bindings and the condition groups of parallel branches.
/// 8. Invokes with bad bindings, unbound ref cells, or more than one
///    exclusive mode requested.
/// 9. `@external` cells outside the entrypoint and ref cells that are
///    external or live in the entrypoint.
///
/// Groups and combinational groups that are never used only produce a
/// warning.
pub struct WellFormed {
    /// ref cell types of components used in the control.
    ref_cell_types: HashMap<Id, LinkedHashMap<Id, CellType>>,
    /// combinational paths through instances of each component.
    paths: InstancePaths,
}

/// Something a control statement may have active in a single cycle.
#[derive(Clone, Copy)]
enum Active<'a> {
    Group(ir::GroupIdx),
    Cond(ir::CombGroupIdx),
    Invoke(&'a ir::Invoke),
}

impl<'a> Active<'a> {
    /// Everything a statement may have active at some point while it runs.
    fn of(control: &'a Control) -> Vec<Self> {
        let mut active = vec![];
        control.for_each(&mut |c| match c {
            Control::Enable(en) => active.push(Active::Group(en.group)),
            Control::If(ir::If { cond: Some(c), .. })
            | Control::While(ir::While { cond: Some(c), .. }) => {
                active.push(Active::Cond(*c))
            }
            Control::Invoke(invoke) => active.push(Active::Invoke(invoke)),
            _ => {}
        });
        active
    }

    fn assignments(self, comp: &'a Component) -> &'a [ir::Assignment] {
        match self {
            Active::Group(g) => &comp.groups[g].assignments,
            Active::Cond(c) => &comp.comb_groups[c].assignments,
            Active::Invoke(_) => &[],
        }
    }

    fn edges(self) -> Vec<(PortRef, PortRef)> {
        match self {
            Active::Invoke(invoke) => PortGraph::invoke_edges(invoke).collect(),
            _ => vec![],
        }
    }

    fn describe(self, comp: &Component) -> String {
        match self {
            Active::Group(g) => format!("group `{}'", comp.groups[g].name()),
            Active::Cond(c) => format!("comb group `{}'", comp.comb_groups[c].name()),
            Active::Invoke(invoke) => {
                format!("invoke of `{}'", comp.cells[invoke.comp].name())
            }
        }
    }
}

impl Named for WellFormed {
    fn name() -> &'static str {
        "well-formed"
    }

    fn description() -> &'static str {
        "Check that the design is legal hardware"
    }
}

impl WellFormed {
    /// Collect the ref cells of every component and check cell attributes.
    pub fn from(ctx: &Context) -> AccelResult<Self> {
        let mut ref_cell_types = HashMap::new();
        for comp in ctx.components.values() {
            let cellmap: LinkedHashMap<Id, CellType> = comp
                .cells
                .values()
                .filter_map(|cell| {
                    if cell.is_external() && comp.name != ctx.entrypoint {
                        Some(Err(Error::malformed_structure(format!(
                            "Cell `{}' cannot be marked `@external' in non-entrypoint component `{}'",
                            cell.name(),
                            comp.name
                        ))))
                    } else if cell.is_reference() && cell.is_external() {
                        Some(Err(Error::malformed_structure(format!(
                            "ref cell `{}' cannot be `@external'",
                            cell.name()
                        ))))
                    } else if cell.is_reference() && comp.name == ctx.entrypoint
                    {
                        Some(Err(Error::malformed_structure(format!(
                            "entrypoint `{}' cannot have ref cell `{}' since nothing invokes it",
                            comp.name,
                            cell.name()
                        ))))
                    } else if cell.is_reference() && cell.constant().is_some() {
                        Some(Err(Error::malformed_structure(format!(
                            "constant `{}' cannot be a ref cell",
                            cell.name()
                        ))))
                    } else if cell.is_reference() {
                        Some(Ok((cell.name(), cell.prototype.clone())))
                    } else {
                        None
                    }
                })
                .collect::<AccelResult<_>>()?;
            ref_cell_types.insert(comp.name, cellmap);
        }
        Self::check_instantiation_order(ctx)?;
        Ok(WellFormed {
            ref_cell_types,
            paths: InstancePaths::new(ctx),
        })
    }

    /// Check every component of `ctx`, rejecting the design on the first
    /// failure.
    pub fn validate(ctx: &Context) -> AccelResult<()> {
        ctx.entrypoint()?;
        let wf = Self::from(ctx)?;
        for comp in ctx.components.values() {
            log::debug!("{}: checking `{}'", Self::name(), comp.name);
            wf.check_component(ctx, comp)?;
        }
        log::info!("{}: `{}' passed", Self::name(), ctx.entrypoint);
        Ok(())
    }

    /// Components may not instantiate themselves, directly or indirectly.
    fn check_instantiation_order(ctx: &Context) -> AccelResult<()> {
        let mut graph: DiGraph<Id, ()> = DiGraph::new();
        let nodes: HashMap<Id, _> = ctx
            .components
            .values()
            .map(|comp| (comp.name, graph.add_node(comp.name)))
            .collect();
        for comp in ctx.components.values() {
            for cell in comp.cells.values() {
                if let CellType::Component { name } = &cell.prototype {
                    let callee = nodes
                        .get(name)
                        .ok_or_else(|| Error::undefined(*name, "component"))?;
                    graph.add_edge(nodes[&comp.name], *callee, ());
                }
            }
        }
        if algo::is_cyclic_directed(&graph) {
            return Err(Error::malformed_structure(
                "components instantiate each other recursively",
            ));
        }
        Ok(())
    }

    fn check_component(&self, ctx: &Context, comp: &Component) -> AccelResult<()> {
        self.check_cells(ctx, comp)?;

        let all_assigns = comp
            .groups
            .values()
            .flat_map(|g| g.assignments.iter())
            .chain(comp.comb_groups.values().flat_map(|g| g.assignments.iter()))
            .chain(comp.continuous_assignments.iter());
        for assign in all_assigns {
            comp.check_assignment(assign)?;
        }

        Self::check_groups(comp)?;
        Self::check_comb_groups(comp)?;
        for assign in &comp.continuous_assignments {
            if assign.dst.is_hole() || assign.reads().any(|p| p.is_hole()) {
                return Err(Error::malformed_structure(format!(
                    "continuous assignment `{}' cannot use group holes",
                    Printer::assignment_to_str(comp, assign)
                )));
            }
        }

        self.check_control(ctx, comp, &comp.control)?;

        // Conflicting drivers and combinational cycles in every set of
        // assignments that can be active together.
        let continuous = &comp.continuous_assignments;
        Self::check_drivers(comp, continuous.iter(), "continuous assignments")?;
        self.check_cycles(
            comp,
            continuous.iter(),
            iter::empty(),
            "continuous assignments",
        )?;
        for group in comp.groups.values() {
            let scope = format!("group `{}'", group.name());
            let active = || group.assignments.iter().chain(continuous.iter());
            Self::check_drivers(comp, active(), &scope)?;
            self.check_cycles(comp, active(), iter::empty(), &scope)?;
        }
        for group in comp.comb_groups.values() {
            let scope = format!("comb group `{}'", group.name());
            let active = || group.assignments.iter().chain(continuous.iter());
            Self::check_drivers(comp, active(), &scope)?;
            self.check_cycles(comp, active(), iter::empty(), &scope)?;
        }

        Self::warn_unused(comp);
        Ok(())
    }

    /// Component instances must match the signature of the component they
    /// instantiate. Exclusive inputs must be 1-bit inputs.
    fn check_cells(&self, ctx: &Context, comp: &Component) -> AccelResult<()> {
        for cell in comp.cells.values() {
            let CellType::Component { name } = &cell.prototype else {
                continue;
            };
            let callee = ctx.get_component(*name)?;
            let matches = cell.ports().len() == callee.signature().len()
                && callee.signature().iter().all(|pd| {
                    cell.find(pd.name).is_some_and(|cp| cp == pd)
                });
            if !matches {
                return Err(Error::malformed_structure(format!(
                    "instance `{}' does not match the signature of component `{}'",
                    cell.name(),
                    callee.name
                )));
            }
        }
        for set in &comp.exclusive_inputs {
            for name in set {
                let pd = comp.inputs().find(|pd| pd.name == *name).ok_or_else(
                    || {
                        Error::undefined(
                            *name,
                            format!("input of component {}", comp.name),
                        )
                    },
                )?;
                if pd.width != 1 {
                    return Err(Error::width_mismatch(format!(
                        "exclusive input `{name}' of `{}' must be 1 bit wide",
                        comp.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_groups(comp: &Component) -> AccelResult<()> {
        for (idx, group) in comp.groups.iter() {
            let dones = group.done_assignments(idx).count();
            if dones != 1 {
                return Err(Error::malformed_structure(format!(
                    "group `{}' must write its done hole exactly once, found {dones} writes",
                    group.name()
                )));
            }
            for assign in &group.assignments {
                if let PortParent::Group(other) = assign.dst.parent {
                    if other != idx {
                        return Err(Error::malformed_structure(format!(
                            "group `{}' writes to the hole `{}'",
                            group.name(),
                            comp.port_name(&assign.dst)
                        )));
                    }
                    if assign.dst.port == GO {
                        return Err(Error::malformed_structure(format!(
                            "group `{}' cannot drive its own go hole",
                            group.name()
                        )));
                    }
                }
                let foreign = assign.reads().find(|p| {
                    matches!(p.parent, PortParent::Group(other) if other != idx)
                });
                if let Some(port) = foreign {
                    return Err(Error::malformed_structure(format!(
                        "group `{}' reads the hole `{}' of another group",
                        group.name(),
                        comp.port_name(&port)
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_comb_groups(comp: &Component) -> AccelResult<()> {
        for group in comp.comb_groups.values() {
            for assign in &group.assignments {
                if assign.dst.is_hole() || assign.reads().any(|p| p.is_hole()) {
                    return Err(Error::malformed_structure(format!(
                        "comb group `{}' cannot use group holes",
                        group.name()
                    )));
                }
                let drives_comb_cell = assign
                    .dst
                    .cell_idx()
                    .is_some_and(|idx| comp.cells[idx].is_comb());
                if !drives_comb_cell {
                    return Err(Error::malformed_structure(format!(
                        "comb group `{}' may only drive combinational cells, found `{}'",
                        group.name(),
                        Printer::assignment_to_str(comp, assign)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every pair of assignments to the same destination must have guards
    /// that are provably never true together.
    fn check_drivers<'a, I>(comp: &Component, assigns: I, scope: &str) -> AccelResult<()>
    where
        I: Iterator<Item = &'a ir::Assignment>,
    {
        let prover = GuardExclusion::new(comp);
        let by_dst = assigns.into_group_map_by(|a| a.dst);
        for (dst, drivers) in by_dst.iter().sorted_by_key(|(dst, _)| **dst) {
            for (a, b) in drivers.iter().tuple_combinations() {
                if !prover.exclusive(&a.guard, &b.guard) {
                    return Err(Error::conflicting_drivers(
                        comp.port_name(dst),
                        format!(
                            "`{}' and `{}' in {scope} may be active in the same cycle",
                            Printer::assignment_to_str(comp, a),
                            Printer::assignment_to_str(comp, b)
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_cycles<'a, I, E>(
        &self,
        comp: &Component,
        assigns: I,
        edges: E,
        scope: &str,
    ) -> AccelResult<()>
    where
        I: IntoIterator<Item = &'a ir::Assignment>,
        E: IntoIterator<Item = (PortRef, PortRef)>,
    {
        let graph = PortGraph::build(comp, assigns, edges, &self.paths);
        if let Some(cycle) = graph.cycles().first() {
            return Err(Error::comb_cycle(format!(
                "{scope} loops through {}",
                cycle.iter().map(|p| comp.port_name(p)).sorted().join(", ")
            )));
        }
        Ok(())
    }

    fn check_control(
        &self,
        ctx: &Context,
        comp: &Component,
        control: &Control,
    ) -> AccelResult<()> {
        match control {
            Control::Empty(_) => Ok(()),
            Control::Enable(ir::Enable { group }) => {
                if comp.groups.get(*group).is_none() {
                    return Err(Error::malformed_control(format!(
                        "`{}' enables a group it does not define",
                        comp.name
                    )));
                }
                Ok(())
            }
            Control::Seq(ir::Seq { stmts }) => stmts
                .iter()
                .try_for_each(|stmt| self.check_control(ctx, comp, stmt)),
            Control::Par(ir::Par { stmts }) => {
                for stmt in stmts {
                    self.check_control(ctx, comp, stmt)?;
                }
                self.check_par(comp, stmts)
            }
            Control::If(ir::If {
                port,
                cond,
                tbranch,
                fbranch,
            }) => {
                Self::check_cond(comp, port, *cond)?;
                self.check_control(ctx, comp, tbranch)?;
                self.check_control(ctx, comp, fbranch)
            }
            Control::While(ir::While { port, cond, body }) => {
                Self::check_cond(comp, port, *cond)?;
                self.check_control(ctx, comp, body)
            }
            Control::Invoke(invoke) => self.check_invoke(ctx, comp, invoke),
        }
    }

    fn check_cond(
        comp: &Component,
        port: &PortRef,
        cond: Option<ir::CombGroupIdx>,
    ) -> AccelResult<()> {
        let (width, dir) = comp.port_def(port)?;
        if !dir.is_readable() {
            return Err(Error::malformed_control(format!(
                "condition `{}' is not readable",
                comp.port_name(port)
            )));
        }
        if width != 1 {
            return Err(Error::width_mismatch(format!(
                "condition `{}' is {width} bits wide, expected 1",
                comp.port_name(port)
            )));
        }
        if cond.is_some_and(|c| comp.comb_groups.get(c).is_none()) {
            return Err(Error::malformed_control(format!(
                "condition `{}' uses a comb group `{}' does not define",
                comp.port_name(port),
                comp.name
            )));
        }
        Ok(())
    }

    /// Parallel branches must not write the same ports or hold the same
    /// cells, and nothing two branches may have active together can form a
    /// combinational cycle.
    fn check_par(&self, comp: &Component, stmts: &[Control]) -> AccelResult<()> {
        let footprints = stmts
            .iter()
            .map(|stmt| ReadWriteSet::control_footprint(comp, stmt))
            .collect_vec();
        for (a, b) in footprints.iter().tuple_combinations() {
            if let Some(err) = a.conflict(b, comp) {
                return Err(err);
            }
        }

        let active = stmts.iter().map(Active::of).collect_vec();
        for (left, right) in active.iter().tuple_combinations() {
            for (a, b) in left.iter().cartesian_product(right.iter()) {
                let assigns = a
                    .assignments(comp)
                    .iter()
                    .chain(b.assignments(comp))
                    .chain(comp.continuous_assignments.iter());
                let edges = a.edges().into_iter().chain(b.edges());
                self.check_cycles(
                    comp,
                    assigns,
                    edges,
                    &format!("{} and {} in par", a.describe(comp), b.describe(comp)),
                )?;
            }
        }
        Ok(())
    }

    fn check_invoke(
        &self,
        ctx: &Context,
        comp: &Component,
        invoke: &ir::Invoke,
    ) -> AccelResult<()> {
        let cell = comp.cells.get(invoke.comp).ok_or_else(|| {
            Error::malformed_control(format!(
                "`{}' invokes a cell it does not define",
                comp.name
            ))
        })?;
        let CellType::Component { name } = &cell.prototype else {
            return Err(Error::malformed_control(format!(
                "`{}' is not a component and cannot be invoked",
                cell.name()
            )));
        };
        let callee = ctx.get_component(*name)?;

        let mut bound = HashSet::new();
        for (port, src) in &invoke.inputs {
            if !bound.insert(*port) {
                return Err(Error::malformed_control(format!(
                    "input `{port}' of `{}' is bound twice",
                    cell.name()
                )));
            }
            let pd = callee.inputs().find(|pd| pd.name == *port).ok_or_else(
                || Error::undefined(*port, format!("input of component {}", callee.name)),
            )?;
            let (width, dir) = comp.port_def(src)?;
            if !dir.is_readable() {
                return Err(Error::malformed_control(format!(
                    "`{}' cannot be read to drive `{}.{port}'",
                    comp.port_name(src),
                    cell.name()
                )));
            }
            if width != pd.width {
                return Err(Error::width_mismatch(format!(
                    "`{}.{port}' ({} bits) bound to `{}' ({width} bits)",
                    cell.name(),
                    pd.width,
                    comp.port_name(src)
                )));
            }
            let target = PortRef::cell(invoke.comp, *port);
            if comp.continuous_assignments.iter().any(|a| a.dst == target) {
                return Err(Error::conflicting_drivers(
                    comp.port_name(&target),
                    "bound by an invoke and driven by a continuous assignment",
                ));
            }
        }

        for (port, dst) in &invoke.outputs {
            let pd = callee.outputs().find(|pd| pd.name == *port).ok_or_else(
                || Error::undefined(*port, format!("output of component {}", callee.name)),
            )?;
            let (width, dir) = comp.port_def(dst)?;
            if !dir.is_writable() {
                return Err(Error::malformed_control(format!(
                    "`{}' cannot be written by `{}.{port}'",
                    comp.port_name(dst),
                    cell.name()
                )));
            }
            if width != pd.width {
                return Err(Error::width_mismatch(format!(
                    "`{}.{port}' ({} bits) drives `{}' ({width} bits)",
                    cell.name(),
                    pd.width,
                    comp.port_name(dst)
                )));
            }
        }

        let empty = LinkedHashMap::new();
        let expected = self.ref_cell_types.get(&callee.name).unwrap_or(&empty);
        let mut lent = HashSet::new();
        for (inner, outer) in &invoke.ref_cells {
            let proto = expected.get(inner).ok_or_else(|| {
                Error::undefined(*inner, format!("ref cell of component {}", callee.name))
            })?;
            let outer_cell = comp.cells.get(*outer).ok_or_else(|| {
                Error::malformed_control(format!(
                    "invoke of `{}' lends a cell `{}' does not define",
                    cell.name(),
                    comp.name
                ))
            })?;
            if outer_cell.prototype != *proto {
                return Err(Error::malformed_control(format!(
                    "`{}' of type {} cannot be bound to ref cell `{inner}' of type {}",
                    outer_cell.name(),
                    outer_cell.prototype.surface_name(),
                    proto.surface_name()
                )));
            }
            if !lent.insert(*inner) {
                return Err(Error::malformed_control(format!(
                    "ref cell `{inner}' of `{}' is bound twice",
                    cell.name()
                )));
            }
        }
        if let Some(missing) = expected.keys().find(|k| !lent.contains(*k)) {
            return Err(Error::malformed_control(format!(
                "invoke of `{}' does not bind ref cell `{missing}'",
                cell.name()
            )));
        }

        for set in &callee.exclusive_inputs {
            let mut requested = vec![];
            for mode in set {
                let Some((_, src)) = invoke.inputs.iter().find(|(p, _)| p == mode)
                else {
                    continue;
                };
                match comp.constant_value(src) {
                    Some((0, _)) => {}
                    Some(_) => requested.push(*mode),
                    None => {
                        return Err(Error::malformed_control(format!(
                            "mode input `{mode}' of `{}' must be bound to a constant",
                            cell.name()
                        )));
                    }
                }
            }
            if requested.len() > 1 {
                return Err(Error::malformed_control(format!(
                    "invoke of `{}' requests more than one mode: {}",
                    cell.name(),
                    requested.iter().join(", ")
                )));
            }
        }

        self.check_cycles(
            comp,
            comp.continuous_assignments.iter(),
            PortGraph::invoke_edges(invoke),
            &format!("invoke of `{}'", cell.name()),
        )
    }

    fn warn_unused(comp: &Component) {
        for group in comp.unused_groups() {
            log::warn!(
                "{}: group `{}' in `{}' is never enabled",
                Self::name(),
                comp.groups[group].name(),
                comp.name
            );
        }
        let mut used = HashSet::new();
        comp.control.for_each(&mut |c| match c {
            Control::If(ir::If { cond: Some(c), .. })
            | Control::While(ir::While { cond: Some(c), .. }) => {
                used.insert(*c);
            }
            _ => {}
        });
        for (idx, group) in comp.comb_groups.iter() {
            if !used.contains(&idx) {
                log::warn!(
                    "{}: comb group `{}' in `{}' is never used",
                    Self::name(),
                    group.name(),
                    comp.name
                );
            }
        }
    }
}
