use accel_ir::{self as ir, CellType, Control, Direction, Id, PortRef};
use petgraph::{
    algo,
    graph::{DiGraph, NodeIndex},
};
use std::collections::HashMap;
use std::iter;

/// A petgraph::DiGraph where ports are the nodes and edges contain no
/// information.
pub type CellGraph = DiGraph<PortRef, ()>;

/// Graph based representation of a set of assignments that are active in the
/// same cycle. Each node represents a port and each directed edge (`X -> Y`)
/// means that `X`'s value flows into `Y` without passing through a register.
///
/// # Example
///  ```text
///  c.in = G[done] & b.done ? add.out
///  ```
/// creates the edges:
///  ```text
///  add.out -> c.in
///  G[done] -> c.in
///  b.done -> c.in
///  ```
/// Combinational primitives also connect each of their inputs to each of
/// their outputs, and component instances connect the inputs and outputs
/// joined by logic inside the component, so a cycle in this graph is a
/// combinational loop.
#[derive(Clone, Default, Debug)]
pub struct PortGraph {
    nodes: HashMap<PortRef, NodeIndex>,
    graph: CellGraph,
}

/// For every component, the `(input, output)` pairs of its signature joined
/// by a path that never passes through a register or memory.
///
/// The callee of an instance keeps running its continuous assignments while
/// the parent runs, and its groups while it is invoked, so these pairs are
/// combinational paths through the instance.
#[derive(Clone, Default, Debug)]
pub struct InstancePaths {
    paths: HashMap<Id, Vec<(Id, Id)>>,
}

impl InstancePaths {
    /// Summarize every component of `ctx`. Callees are summarized before
    /// their callers; components that instantiate each other recursively
    /// are left out.
    pub fn new(ctx: &ir::Context) -> Self {
        let mut summary = InstancePaths::default();
        loop {
            let ready = ctx
                .components
                .values()
                .filter(|comp| !summary.paths.contains_key(&comp.name))
                .filter(|comp| {
                    comp.cells.values().all(|cell| match &cell.prototype {
                        CellType::Component { name } => {
                            summary.paths.contains_key(name)
                        }
                        _ => true,
                    })
                })
                .collect::<Vec<_>>();
            if ready.is_empty() {
                return summary;
            }
            for comp in ready {
                let paths = summary.summarize(comp);
                summary.paths.insert(comp.name, paths);
            }
        }
    }

    /// Every assignment and invoke binding of `comp` may be active while a
    /// caller drives its inputs, so all of them are considered together.
    fn summarize(&self, comp: &ir::Component) -> Vec<(Id, Id)> {
        let assigns = comp
            .groups
            .values()
            .flat_map(|g| g.assignments.iter())
            .chain(comp.comb_groups.values().flat_map(|g| g.assignments.iter()))
            .chain(comp.continuous_assignments.iter());
        let mut bindings = vec![];
        comp.control.for_each(&mut |c| {
            if let Control::Invoke(invoke) = c {
                bindings.extend(PortGraph::invoke_edges(invoke));
            }
        });
        let graph = PortGraph::build(comp, assigns, bindings, self);
        comp.inputs()
            .flat_map(|i| comp.outputs().map(move |o| (i.name, o.name)))
            .filter(|(i, o)| graph.reaches(PortRef::this(*i), PortRef::this(*o)))
            .collect()
    }

    /// Paths through an instance of the component `name`.
    pub fn get(&self, name: Id) -> &[(Id, Id)] {
        self.paths.get(&name).map(Vec::as_slice).unwrap_or_default()
    }
}

impl PortGraph {
    /// Build the graph of `assigns` within `comp`, treating component
    /// instances as registered.
    pub fn from_assignments<'a, I>(comp: &ir::Component, assigns: I) -> Self
    where
        I: IntoIterator<Item = &'a ir::Assignment>,
    {
        Self::build(comp, assigns, iter::empty(), &InstancePaths::default())
    }

    /// Build the graph of `assigns` and the extra `(src, dst)` connections
    /// in `edges` within `comp`, using `paths` for component instances.
    pub fn build<'a, I, E>(
        comp: &ir::Component,
        assigns: I,
        edges: E,
        paths: &InstancePaths,
    ) -> Self
    where
        I: IntoIterator<Item = &'a ir::Assignment>,
        E: IntoIterator<Item = (PortRef, PortRef)>,
    {
        let mut analysis = PortGraph::default();
        for asgn in assigns {
            analysis.insert_assignment(asgn);
        }
        for (src, dst) in edges {
            let (src, dst) = (analysis.node(src), analysis.node(dst));
            analysis.graph.add_edge(src, dst, ());
        }
        analysis.add_cell_paths(comp);
        analysis.add_instance_paths(comp, paths);
        analysis
    }

    /// The connections an invoke makes while it is active: its input
    /// bindings into the instance and the instance outputs it forwards.
    pub fn invoke_edges(
        invoke: &ir::Invoke,
    ) -> impl Iterator<Item = (PortRef, PortRef)> + '_ {
        let inputs = invoke
            .inputs
            .iter()
            .map(|(port, src)| (*src, PortRef::cell(invoke.comp, *port)));
        let outputs = invoke
            .outputs
            .iter()
            .map(|(port, dst)| (PortRef::cell(invoke.comp, *port), *dst));
        inputs.chain(outputs)
    }

    fn node(&mut self, port: PortRef) -> NodeIndex {
        let PortGraph { nodes, graph } = self;
        *nodes.entry(port).or_insert_with(|| graph.add_node(port))
    }

    fn insert_assignment(&mut self, asgn: &ir::Assignment) {
        let dst = self.node(asgn.dst);
        let src = self.node(asgn.src);
        self.graph.add_edge(src, dst, ());
        // add edges for guards that read from the port in the guard
        // and write to the dst of the assignment
        for port in asgn.guard.all_ports() {
            let guard = self.node(port);
            self.graph.add_edge(guard, dst, ());
        }
    }

    /// Connect the inputs of every combinational primitive that appears in
    /// the graph to its outputs.
    fn add_cell_paths(&mut self, comp: &ir::Component) {
        for (idx, cell) in comp.cells.iter() {
            if !cell.is_comb() || cell.constant().is_some() {
                continue;
            }
            let (inputs, outputs): (Vec<_>, Vec<_>) = cell
                .ports()
                .iter()
                .map(|pd| (PortRef::cell(idx, pd.name), pd.direction))
                .partition(|(_, dir)| *dir == Direction::Input);
            for (i, _) in &inputs {
                if !self.nodes.contains_key(i) {
                    continue;
                }
                for (o, _) in &outputs {
                    if !self.nodes.contains_key(o) {
                        continue;
                    }
                    let (i, o) = (self.node(*i), self.node(*o));
                    self.graph.add_edge(i, o, ());
                }
            }
        }
    }

    fn add_instance_paths(&mut self, comp: &ir::Component, paths: &InstancePaths) {
        for (idx, cell) in comp.cells.iter() {
            let CellType::Component { name } = &cell.prototype else {
                continue;
            };
            for (i, o) in paths.get(*name) {
                let (i, o) = (PortRef::cell(idx, *i), PortRef::cell(idx, *o));
                if self.nodes.contains_key(&i) && self.nodes.contains_key(&o) {
                    let (i, o) = (self.node(i), self.node(o));
                    self.graph.add_edge(i, o, ());
                }
            }
        }
    }

    /// Returns true iff a value at `from` flows into `to`.
    pub fn reaches(&self, from: PortRef, to: PortRef) -> bool {
        match (self.nodes.get(&from), self.nodes.get(&to)) {
            (Some(f), Some(t)) => algo::has_path_connecting(&self.graph, *f, *t, None),
            _ => false,
        }
    }

    /// Returns true iff the graph contains a cycle.
    pub fn has_cycles(&self) -> bool {
        algo::is_cyclic_directed(&self.graph)
    }

    /// Ports that lie on some cycle of the graph, grouped by strongly
    /// connected component.
    pub fn cycles(&self) -> Vec<Vec<PortRef>> {
        algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1
                    || self.graph.contains_edge(scc[0], scc[0])
            })
            .map(|scc| scc.into_iter().map(|n| self.graph[n]).collect())
            .collect()
    }

    /// Number of ports in the graph.
    pub fn port_count(&self) -> usize {
        self.graph.node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_ir::{Builder, Component, Guard, LibrarySignatures, PortDef};

    #[test]
    fn adder_feedback_is_a_cycle() {
        let lib = LibrarySignatures::default();
        let mut comp = Component::new("main", vec![PortDef::input("x", 8)]);
        let mut b = Builder::new(&mut comp, &lib);
        let add = b.add_primitive("add", "std_add", &[8]).unwrap();
        let reg = b.add_primitive("r", "std_reg", &[8]).unwrap();
        let through_reg = vec![
            b.build_assignment(PortRef::cell(add, "left"), PortRef::this("x"), Guard::True)
                .unwrap(),
            b.build_assignment(PortRef::cell(add, "right"), PortRef::cell(reg, "out"), Guard::True)
                .unwrap(),
            b.build_assignment(PortRef::cell(reg, "in"), PortRef::cell(add, "out"), Guard::True)
                .unwrap(),
        ];
        let direct = b
            .build_assignment(
                PortRef::cell(add, "right"),
                PortRef::cell(add, "out"),
                Guard::True,
            )
            .unwrap();

        let graph = PortGraph::from_assignments(&comp, &through_reg);
        assert!(!graph.has_cycles());
        assert!(graph.cycles().is_empty());

        let graph = PortGraph::from_assignments(&comp, through_reg.iter().chain([&direct]));
        assert!(graph.has_cycles());
        assert_eq!(graph.cycles().len(), 1);
        assert!(graph.port_count() >= 4);
    }
}
